//! Metric rows as served by the backend: one labelled statistic per row, one column per model.

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Column naming the statistic a row reports.
pub const LABEL_FIELD: &str = "index";

/// Ordered rows; the caller decides which slice reaches the transform.
pub type MetricTable = Vec<MetricRow>;

#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    label: String,
    values: Map<String, Value>,
}

impl MetricRow {
    pub fn new<K: Into<String>>(label: &str, values: impl IntoIterator<Item = (K, Value)>) -> Self {
        let mut map = Map::new();
        for (k, v) in values {
            let k = k.into();
            if k != LABEL_FIELD {
                map.insert(k, v);
            }
        }
        Self { label: label.to_string(), values: map }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Model columns in the order the backend sent them.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Numeric value for `key`; absent or unparseable cells read as 0.0.
    pub fn value(&self, key: &str) -> f64 {
        self.values.get(key).map(parse_metric).unwrap_or(0.0)
    }

    /// Cell rendered for display, without quoting strings.
    pub fn display(&self, key: &str) -> String {
        match self.values.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }
}

impl<'de> Deserialize<'de> for MetricRow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        let mut label = None;
        let mut values = Map::new();
        for (k, v) in map {
            if k == LABEL_FIELD {
                label = Some(match v {
                    Value::String(s) => s,
                    Value::Null => return Err(de::Error::custom("metric row has a null `index` label")),
                    other => other.to_string(),
                });
            } else {
                values.insert(k, v);
            }
        }
        let label = label.ok_or_else(|| de::Error::missing_field(LABEL_FIELD))?;
        Ok(Self { label, values })
    }
}

impl Serialize for MetricRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        map.serialize_entry(LABEL_FIELD, &self.label)?;
        for (k, v) in &self.values {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Coerces a cell to a number the way the dashboard always has:
/// numbers pass through, strings parse by their longest numeric prefix,
/// and anything else (or NaN) becomes 0.0.
pub fn parse_metric(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => parse_float_prefix(s).unwrap_or(0.0),
        _ => 0.0,
    };
    if n.is_nan() {
        0.0
    } else {
        n
    }
}

fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    if s[end..].starts_with("Infinity") {
        let inf = f64::INFINITY;
        return Some(if bytes[0] == b'-' { -inf } else { inf });
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }
    s[..end].parse().ok()
}
