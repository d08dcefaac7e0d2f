//! Metric table -> bar chart series.
//!
//! The backend reports one row per evaluation statistic and one column per model.
//! Charts want the transpose: one series per model, one bar per statistic. The
//! model that wins on the `f1` row is drawn in the highlight color and keeps that
//! color in every follow-up chart (feature importance), so the assignment is
//! returned alongside the series.

use serde::Serialize;
use thiserror::Error;

pub mod palette;
pub mod table;

pub use palette::{palette_at, Color, HIGHLIGHT, PALETTE};
pub use table::{parse_metric, MetricRow, MetricTable, LABEL_FIELD};

/// Label of the row whose values pick the highlighted model (compared lower-cased).
pub const SELECTION_LABEL: &str = "f1";

/// How many bars `highlight_top_n` emphasizes when the caller has no preference.
pub const DEFAULT_TOP_BARS: usize = 5;

pub type ModelKey = String;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("metric table has no `f1` row to pick the best model from")]
    MissingSelectionRow,
}

/// One renderable bar series.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub key: ModelKey,
    pub label: String,
    pub data: Vec<f64>,
    pub background_color: Vec<Color>,
    pub border_color: Vec<Color>,
    pub border_width: u32,
}

impl ChartSeries {
    /// Single fill shared by every bar of the series.
    pub fn color(&self) -> Option<Color> {
        self.background_color.first().copied()
    }
}

/// Model -> fill color, in canonical model order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColorAssignment {
    entries: Vec<(ModelKey, Color)>,
    highlighted: Option<ModelKey>,
}

impl ColorAssignment {
    pub fn get(&self, key: &str) -> Option<Color> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, c)| *c)
    }

    pub fn highlighted(&self) -> Option<&str> {
        self.highlighted.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Datasets {
    pub series: Vec<ChartSeries>,
    pub keys: Vec<ModelKey>,
    pub colors: ColorAssignment,
}

/// Transposes `rows` into per-model series and picks the highlighted model.
///
/// Model order comes from the first row's columns. Cells that do not parse as
/// numbers count as 0.0. The highlighted model is the first one holding the
/// maximum value on the `f1` row; a table without that row is an error.
pub fn transform_to_datasets(rows: &[MetricRow]) -> Result<Datasets, TransformError> {
    let keys: Vec<ModelKey> = rows
        .first()
        .map(|r| r.keys().map(str::to_string).collect())
        .unwrap_or_default();

    let selection = rows
        .iter()
        .find(|r| r.label().to_lowercase() == SELECTION_LABEL)
        .ok_or(TransformError::MissingSelectionRow)?;

    let scores: Vec<f64> = keys.iter().map(|k| selection.value(k)).collect();
    let winner = first_max_index(&scores);

    let mut series = Vec::with_capacity(keys.len());
    let mut entries = Vec::with_capacity(keys.len());
    for (i, key) in keys.iter().enumerate() {
        let color = if Some(i) == winner {
            HIGHLIGHT
        } else {
            palette_at(i as i64)
        };
        let data: Vec<f64> = rows.iter().map(|r| r.value(key)).collect();
        let fill = vec![color; rows.len()];
        series.push(ChartSeries {
            key: key.clone(),
            label: format_label(key),
            data,
            background_color: fill.clone(),
            border_color: fill,
            border_width: 1,
        });
        entries.push((key.clone(), color));
    }

    Ok(Datasets {
        series,
        colors: ColorAssignment {
            entries,
            highlighted: winner.map(|i| keys[i].clone()),
        },
        keys,
    })
}

/// Colors one bar per value: the `n` largest (stable on ties) get the highlight,
/// the rest rotate through the palette offset by `n`.
pub fn highlight_top_n(values: &[f64], n: usize) -> Vec<Color> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        values[b]
            .partial_cmp(&values[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut top = vec![false; values.len()];
    for &i in order.iter().take(n) {
        top[i] = true;
    }

    (0..values.len())
        .map(|i| {
            if top[i] {
                HIGHLIGHT
            } else {
                palette_at(i as i64 - n as i64)
            }
        })
        .collect()
}

/// `logistic_regression` -> `Logistic Regression`.
pub fn format_label(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut out = String::with_capacity(spaced.len());
    let mut at_word_start = true;
    for ch in spaced.chars() {
        let is_word = ch.is_ascii_alphanumeric();
        if is_word && at_word_start {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        at_word_start = !is_word;
    }
    out
}

fn first_max_index(values: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some(b) if v <= values[b] => {}
            _ => best = Some(i),
        }
    }
    best
}
