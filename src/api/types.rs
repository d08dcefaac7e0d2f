//! Wire shapes of the analysis backend, parsed at the boundary.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chart::{MetricRow, MetricTable, ModelKey};

/// Processing state of a submitted research question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionStatus {
    NotStarted,
    Starting,
    Success,
    Error,
    Other(String),
}

/// Display tone of a status cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Success,
    Failed,
    Pending,
}

impl QuestionStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "not started" => QuestionStatus::NotStarted,
            "starting" => QuestionStatus::Starting,
            "success" => QuestionStatus::Success,
            "error" => QuestionStatus::Error,
            _ => QuestionStatus::Other(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            QuestionStatus::NotStarted => "not started",
            QuestionStatus::Starting => "Starting",
            QuestionStatus::Success => "Success",
            QuestionStatus::Error => "Error",
            QuestionStatus::Other(s) => s,
        }
    }

    pub fn tone(&self) -> StatusTone {
        match self {
            QuestionStatus::Success => StatusTone::Success,
            QuestionStatus::Error => StatusTone::Failed,
            _ => StatusTone::Pending,
        }
    }
}

impl std::fmt::Display for QuestionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for QuestionStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for QuestionStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(QuestionStatus::parse(&raw))
    }
}

/// One row of `GET /api/results`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub id: u64,
    pub dependent_var: String,
    /// Comma-separated, as the backend joins them.
    pub independent_vars: String,
    pub status: QuestionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_importance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_comparison: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultList {
    pub data: Vec<ResultSummary>,
}

/// `GET /api/results/{id}`: the raw table row `[id, dependent_var, independent_vars, status, ...]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultDetail {
    pub id: u64,
    pub dependent_var: String,
    /// Stored form, usually a JSON list literal.
    pub independent_vars: String,
    pub status: QuestionStatus,
}

impl ResultDetail {
    /// Independent variables as a list, whether stored as JSON or comma-separated.
    pub fn independents(&self) -> Vec<String> {
        if let Ok(list) = serde_json::from_str::<Vec<String>>(&self.independent_vars) {
            return list;
        }
        self.independent_vars
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl<'de> Deserialize<'de> for ResultDetail {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let cells = Vec::<Value>::deserialize(deserializer)?;
        if cells.len() < 4 {
            return Err(de::Error::invalid_length(cells.len(), &"at least 4 result fields"));
        }
        let id = cells[0]
            .as_u64()
            .ok_or_else(|| de::Error::custom("result id is not an unsigned integer"))?;
        Ok(Self {
            id,
            dependent_var: text_cell(&cells[1]),
            independent_vars: text_cell(&cells[2]),
            status: QuestionStatus::parse(&text_cell(&cells[3])),
        })
    }
}

fn text_cell(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// `GET /metrics?result_id=`: the comparison table under `default`.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsResponse {
    pub default: MetricTable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureWeight {
    pub feature: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub importance: f64,
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let v = Value::deserialize(deserializer)?;
    Ok(crate::chart::parse_metric(&v))
}

/// Per-model payload of the feature-importance endpoint. The backend reports
/// a missing or unreadable file per model instead of failing the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureSeries {
    Ranked(Vec<FeatureWeight>),
    Unavailable { error: String },
}

impl FeatureSeries {
    pub fn weights(&self) -> &[FeatureWeight] {
        match self {
            FeatureSeries::Ranked(w) => w,
            FeatureSeries::Unavailable { .. } => &[],
        }
    }
}

/// ModelKey -> ranking, in the order the backend listed the models.
pub type FeatureImportance = Vec<(ModelKey, FeatureSeries)>;

pub(crate) fn parse_feature_importance(body: Value) -> anyhow::Result<FeatureImportance> {
    let map = match body {
        Value::Object(map) => map,
        other => anyhow::bail!("feature importance payload is not an object: {}", other),
    };
    let mut out = Vec::with_capacity(map.len());
    for (model, series) in map {
        let series: FeatureSeries = serde_json::from_value(series)
            .map_err(|e| anyhow::anyhow!("feature importance for {}: {}", model, e))?;
        out.push((model, series));
    }
    Ok(out)
}

/// One experiment in a submission batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionForm {
    pub dep_var: String,
    pub independents: Vec<String>,
    pub id: u64,
    pub status: QuestionStatus,
}

impl QuestionForm {
    pub fn blank(id: u64) -> Self {
        Self {
            dep_var: String::new(),
            independents: Vec::new(),
            id,
            status: QuestionStatus::NotStarted,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest<'a> {
    pub research_questions: &'a [QuestionForm],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedQuestion {
    pub id: u64,
    pub dependent_var: String,
    pub independent_vars: Vec<String>,
    pub status: QuestionStatus,
    #[serde(default)]
    pub results_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    pub message: String,
    #[serde(default)]
    pub processed_questions: Vec<ProcessedQuestion>,
}

/// Error body the backend attaches to non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Splits a metrics table into the rows that feed the chart and the trailing
/// display-only row.
pub fn split_index_row(mut table: MetricTable) -> (MetricTable, Option<MetricRow>) {
    let last = table.pop();
    (table, last)
}
