//! Terminal rendering: plain tables and horizontal bar charts.

use std::fmt::Write as _;

use crate::api::{FeatureImportance, FeatureSeries, ResultDetail, StatusTone};
use crate::chart::{highlight_top_n, ColorAssignment, MetricRow};
use crate::dashboard::Comparison;
use crate::history::HistoryView;

const FULL: char = '█';
const LIGHT: char = '░';

pub fn history_table(view: &HistoryView) -> String {
    let mut out = String::from("Processing History\n");
    if view.is_empty() {
        out.push_str("No history available.\n");
        return out;
    }

    let rows: Vec<[String; 4]> = view
        .visible()
        .iter()
        .map(|r| {
            [
                r.id.to_string(),
                r.dependent_var.clone(),
                r.independent_vars.clone(),
                format!("{}{}", tone_marker(r.status.tone()), r.status),
            ]
        })
        .collect();
    let header = ["ID", "Dependent Variable", "Independent Variables", "Status"];
    let mut widths = header.map(|h| h.chars().count());
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(widths)
            .map(|(c, w)| pad(c, w))
            .collect::<Vec<_>>()
            .join(" | ")
    };
    let header: Vec<String> = header.iter().map(|h| h.to_string()).collect();
    let _ = writeln!(out, "{}", line(&header[..]).trim_end());
    let _ = writeln!(out, "{}", widths.map(|w| "-".repeat(w)).join("-+-"));
    for row in &rows {
        let _ = writeln!(out, "{}", line(&row[..]).trim_end());
    }
    let _ = writeln!(out, "Page {} of {}", view.page(), view.total_pages());
    out
}

pub fn result_detail(detail: &ResultDetail) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Research Question Number: {}", detail.id);
    let _ = writeln!(out, "Dependent Variable: {}", detail.dependent_var);
    let _ = writeln!(out, "Independent Variables: {}", detail.independents().join(", "));
    let _ = writeln!(out, "Status: {}{}", tone_marker(detail.status.tone()), detail.status);
    out
}

/// One block per statistic, one bar per model; the highlighted model is starred.
pub fn comparison_chart(c: &Comparison, width: usize) -> String {
    let series = &c.datasets.series;
    let mut out = String::from("Model Comparison\n");
    if series.is_empty() {
        out.push_str("(no models)\n");
        return out;
    }
    let max = series
        .iter()
        .flat_map(|s| s.data.iter().copied())
        .fold(0.0_f64, f64::max);
    let label_w = series.iter().map(|s| s.label.chars().count()).max().unwrap_or(0);
    let highlighted = c.datasets.colors.highlighted();

    for (row, stat) in c.labels.iter().enumerate() {
        let _ = writeln!(out, "{}", stat);
        for s in series {
            let v = s.data.get(row).copied().unwrap_or(0.0);
            let star = if Some(s.key.as_str()) == highlighted { " *" } else { "" };
            let _ = writeln!(
                out,
                "  {} {} {:.2}{}",
                pad(&s.label, label_w),
                bar(v, max, width, if star.is_empty() { LIGHT } else { FULL }),
                v,
                star
            );
        }
    }
    if let Some(key) = highlighted {
        if let Some(s) = series.iter().find(|s| s.key == key) {
            let _ = writeln!(out, "* best f1: {}", s.label);
        }
    }
    out
}

pub fn index_row(row: &MetricRow) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", row.label());
    for key in row.keys() {
        let _ = writeln!(out, "  {}: {}", crate::chart::format_label(key), row.display(key));
    }
    out
}

/// One chart per model. Without `top` every bar takes the model's assigned
/// color; with it the `top` largest bars are emphasized instead.
pub fn feature_charts(
    features: &FeatureImportance,
    colors: &ColorAssignment,
    top: Option<usize>,
    width: usize,
) -> String {
    let mut out = String::new();
    for (model, series) in features {
        let _ = writeln!(out, "{} Feature Importance", model);
        let weights = match series {
            FeatureSeries::Ranked(w) => w,
            FeatureSeries::Unavailable { error } => {
                let _ = writeln!(out, "  unavailable: {}", error);
                continue;
            }
        };
        let values: Vec<f64> = weights.iter().map(|w| w.importance).collect();
        let fills = match top {
            Some(n) => highlight_top_n(&values, n),
            None => {
                let c = colors.get(model).unwrap_or(crate::chart::PALETTE[0]);
                vec![c; values.len()]
            }
        };
        let max = values.iter().copied().map(f64::abs).fold(0.0_f64, f64::max);
        let label_w = weights.iter().map(|w| w.feature.chars().count()).max().unwrap_or(0);
        for ((w, v), fill) in weights.iter().zip(&values).zip(&fills) {
            let ch = if fill.is_highlight() { FULL } else { LIGHT };
            let _ = writeln!(out, "  {} {} {:.3}", pad(&w.feature, label_w), bar(v.abs(), max, width, ch), v);
        }
    }
    out
}

fn bar(value: f64, max: f64, width: usize, ch: char) -> String {
    if width == 0 || max <= 0.0 || !value.is_finite() || value <= 0.0 {
        return String::new();
    }
    let n = ((value / max) * width as f64).round() as usize;
    std::iter::repeat(ch).take(n.clamp(1, width)).collect()
}

fn pad(s: &str, width: usize) -> String {
    let n = s.chars().count();
    format!("{}{}", s, " ".repeat(width.saturating_sub(n)))
}

fn tone_marker(tone: StatusTone) -> &'static str {
    match tone {
        StatusTone::Success => "✓ ",
        StatusTone::Failed => "✗ ",
        StatusTone::Pending => "… ",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_scales_to_width() {
        assert_eq!(bar(1.0, 1.0, 10, FULL).chars().count(), 10);
        assert_eq!(bar(0.5, 1.0, 10, FULL).chars().count(), 5);
        assert_eq!(bar(0.001, 1.0, 10, FULL).chars().count(), 1);
        assert_eq!(bar(0.0, 1.0, 10, FULL), "");
        assert_eq!(bar(1.0, 0.0, 10, FULL), "");
    }

    #[test]
    fn pad_counts_chars() {
        assert_eq!(pad("é", 3), "é  ");
        assert_eq!(pad("long", 2), "long");
    }
}
