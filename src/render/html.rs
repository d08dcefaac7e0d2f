//! Self-contained HTML report: inline CSS and SVG, no scripts, works offline.

use std::fmt::Write as _;

use crate::api::{FeatureSeries, ResultDetail, StatusTone};
use crate::chart::palette::{shade, shades, HIGHLIGHT};
use crate::chart::{format_label, highlight_top_n, Color, PALETTE};
use crate::dashboard::Comparison;

const CHART_W: f64 = 960.0;
const CHART_H: f64 = 380.0;
const PAD_L: f64 = 48.0;
const PAD_R: f64 = 16.0;
const PAD_T: f64 = 40.0;
const PAD_B: f64 = 44.0;
const FEATURE_ROW_H: f64 = 26.0;
const FEATURE_LABEL_W: f64 = 180.0;

/// Full results page for one research question.
pub fn render_report(
    detail: Option<&ResultDetail>,
    comparison: &Comparison,
    top: Option<usize>,
    generated: &str,
) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Analysis Results - {id}</title>
  <style>{css}</style>
</head>
<body>
<main>
  <h1>Analysis Results</h1>
  {header}
  <section class="card">
    <h2>Model Comparison</h2>
    {chart}
  </section>
  {index_row}
  {features}
  <footer>generated {generated}</footer>
</main>
</body>
</html>
"#,
        id = comparison.result_id,
        css = CSS,
        header = detail.map(render_header).unwrap_or_default(),
        chart = comparison_svg(comparison),
        index_row = render_index_row(comparison),
        features = render_features(comparison, top),
        generated = escape(generated),
    )
}

fn render_header(d: &ResultDetail) -> String {
    let badge = match d.status.tone() {
        StatusTone::Success => "badge-green",
        StatusTone::Failed => "badge-red",
        StatusTone::Pending => "badge-yellow",
    };
    format!(
        r#"<section class="card">
    <h3>Research Question Number: {id}</h3>
    <p><strong>Dependent Variable:</strong> <span class="accent">{dep}</span></p>
    <p><strong>Independent Variables:</strong></p>
    <p class="inset">{indep}</p>
    <p><strong>Status:</strong> <span class="badge {badge}">{status}</span></p>
  </section>"#,
        id = d.id,
        dep = escape(&d.dependent_var),
        indep = escape(&d.independents().join(", ")),
        badge = badge,
        status = escape(d.status.as_str()),
    )
}

fn render_index_row(c: &Comparison) -> String {
    let row = match &c.index_row {
        Some(r) => r,
        None => return String::new(),
    };
    let mut items = String::new();
    for key in row.keys() {
        let _ = write!(
            items,
            r#"<div class="kv"><span class="k">{}:</span><span class="v">{}</span></div>"#,
            escape(&format_label(key)),
            escape(&row.display(key))
        );
    }
    format!(
        r#"<section class="card"><div class="kv"><span class="k">{}</span></div>{}</section>"#,
        escape(row.label()),
        items
    )
}

/// Grouped vertical bars: one group per statistic, one bar per model.
fn comparison_svg(c: &Comparison) -> String {
    let series = &c.datasets.series;
    if series.is_empty() || c.labels.is_empty() {
        return r#"<p class="muted">No models to compare.</p>"#.to_string();
    }
    let max = nice_max(series.iter().flat_map(|s| s.data.iter().copied()));
    let plot_w = CHART_W - PAD_L - PAD_R;
    let plot_h = CHART_H - PAD_T - PAD_B;
    let group_w = plot_w / c.labels.len() as f64;
    let bar_w = (group_w * 0.8) / series.len() as f64;
    let y = |v: f64| PAD_T + plot_h - (on_axis(v, max).max(0.0) / max) * plot_h;

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg viewBox="0 0 {w} {h}" class="chart" role="img" aria-label="Model comparison">"#,
        w = CHART_W,
        h = CHART_H
    );

    // legend
    let mut lx = PAD_L;
    for s in series {
        let fill = s.color().unwrap_or(PALETTE[0]);
        let _ = write!(
            svg,
            r#"<rect x="{lx:.1}" y="8" width="14" height="14" fill="{fill}" stroke="{stroke}"/><text x="{tx:.1}" y="19" class="legend">{label}</text>"#,
            lx = lx,
            fill = fill,
            stroke = shade(HIGHLIGHT, 0.25),
            tx = lx + 18.0,
            label = escape(&s.label)
        );
        lx += 28.0 + 7.0 * s.label.chars().count() as f64;
    }

    // y grid
    for i in 0..=4 {
        let v = max * i as f64 / 4.0;
        let gy = y(v);
        let _ = write!(
            svg,
            r#"<line x1="{x1}" y1="{gy:.1}" x2="{x2}" y2="{gy:.1}" class="grid"/><text x="{tx}" y="{ty:.1}" class="tick" text-anchor="end">{v:.2}</text>"#,
            x1 = PAD_L,
            x2 = CHART_W - PAD_R,
            gy = gy,
            tx = PAD_L - 6.0,
            ty = gy + 4.0,
            v = v
        );
    }

    for (row, stat) in c.labels.iter().enumerate() {
        let gx = PAD_L + group_w * row as f64 + group_w * 0.1;
        for (i, s) in series.iter().enumerate() {
            let v = s.data.get(row).copied().unwrap_or(0.0);
            let fill = s.background_color.get(row).copied().unwrap_or(PALETTE[0]);
            let border = s.border_color.get(row).copied().unwrap_or(fill);
            let x = gx + bar_w * i as f64;
            let top = y(v);
            let _ = write!(
                svg,
                r#"<rect x="{x:.1}" y="{top:.1}" width="{bw:.1}" height="{bh:.1}" fill="{fill}" stroke="{border}" stroke-width="{sw}"><title>{label}: {v:.4}</title></rect><text x="{cx:.1}" y="{ly:.1}" class="value" text-anchor="middle">{v:.2}</text>"#,
                x = x,
                top = top,
                bw = bar_w.max(1.0),
                bh = (PAD_T + plot_h - top).max(0.0),
                fill = fill,
                border = border,
                sw = s.border_width,
                label = escape(&s.label),
                v = v,
                cx = x + bar_w / 2.0,
                ly = top - 4.0
            );
        }
        let _ = write!(
            svg,
            r#"<text x="{cx:.1}" y="{ty:.1}" class="tick" text-anchor="middle">{stat}</text>"#,
            cx = PAD_L + group_w * (row as f64 + 0.5),
            ty = CHART_H - PAD_B + 18.0,
            stat = escape(stat)
        );
    }
    svg.push_str("</svg>");
    svg
}

fn render_features(c: &Comparison, top: Option<usize>) -> String {
    let mut out = String::new();
    for (model, series) in &c.features {
        let title = format!("{} Feature Importance", model);
        let body = match series {
            FeatureSeries::Ranked(weights) if !weights.is_empty() => {
                let values: Vec<f64> = weights.iter().map(|w| w.importance).collect();
                let fills = match top {
                    Some(n) => highlight_top_n(&values, n),
                    None => vec![c.datasets.colors.get(model).unwrap_or(PALETTE[0]); values.len()],
                };
                let labels: Vec<&str> = weights.iter().map(|w| w.feature.as_str()).collect();
                horizontal_svg(&title, &labels, &values, &fills)
            }
            FeatureSeries::Ranked(_) => r#"<p class="muted">No features recorded.</p>"#.to_string(),
            FeatureSeries::Unavailable { error } => {
                format!(r#"<p class="error">{}</p>"#, escape(error))
            }
        };
        let _ = write!(
            out,
            r#"<section class="card"><h2>{}</h2>{}</section>"#,
            escape(&title),
            body
        );
    }
    out
}

/// Horizontal bars, value printed inside the bar end in an ink that reads on its fill.
fn horizontal_svg(title: &str, labels: &[&str], values: &[f64], fills: &[Color]) -> String {
    let h = PAD_T / 2.0 + FEATURE_ROW_H * labels.len() as f64 + 8.0;
    let plot_w = CHART_W - FEATURE_LABEL_W - PAD_R;
    let max = nice_max(values.iter().map(|v| v.abs()));
    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg viewBox="0 0 {w} {h:.1}" class="chart" role="img" aria-label="{t}">"#,
        w = CHART_W,
        h = h,
        t = escape(title)
    );
    let stripes = shades(HIGHLIGHT, &[0.03, 0.07]);
    for (i, (label, (&v, &fill))) in labels.iter().zip(values.iter().zip(fills)).enumerate() {
        let y = PAD_T / 2.0 + FEATURE_ROW_H * i as f64;
        let w = (on_axis(v.abs(), max) / max * plot_w).max(1.0);
        let _ = write!(
            svg,
            r#"<rect x="0" y="{y:.1}" width="{w}" height="{h}" fill="{fill}"/>"#,
            y = y - FEATURE_ROW_H * 0.125,
            w = CHART_W,
            h = FEATURE_ROW_H,
            fill = stripes[i % stripes.len()]
        );
        let _ = write!(
            svg,
            r#"<text x="{lx}" y="{ty:.1}" class="tick" text-anchor="end">{label}</text><rect x="{x}" y="{y:.1}" width="{w:.1}" height="{bh:.1}" fill="{fill}"><title>{label}: {v:.4}</title></rect><text x="{vx:.1}" y="{ty:.1}" class="value" text-anchor="end" fill="{ink}">{v:.3}</text>"#,
            lx = FEATURE_LABEL_W - 8.0,
            ty = y + FEATURE_ROW_H * 0.6,
            label = escape(label),
            x = FEATURE_LABEL_W,
            y = y,
            w = w,
            bh = FEATURE_ROW_H * 0.75,
            fill = fill,
            v = v,
            vx = FEATURE_LABEL_W + w - 4.0,
            ink = fill.label_ink()
        );
    }
    svg.push_str("</svg>");
    svg
}

/// Axis ceiling: the data maximum, or 1.0 when nothing is positive.
fn nice_max(values: impl Iterator<Item = f64>) -> f64 {
    let m = values.filter(|v| v.is_finite()).fold(0.0_f64, f64::max);
    if m > 0.0 {
        m * 1.1
    } else {
        1.0
    }
}

/// Bar geometry for `v`: NaN draws as zero, infinities stop at the axis ends.
fn on_axis(v: f64, max: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(-max, max)
    }
}

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

const CSS: &str = r#"
    :root {
      --bg: #f5f7fa; --bg-raised: #ffffff; --bg-inset: #e5e7eb;
      --fg: #1f2937; --fg-muted: #4b5563; --fg-subtle: #9ca3af;
      --accent: #4f46e5;
      --green: #16a34a; --red: #dc2626; --yellow: #ca8a04;
      --border: #e5e7eb;
      --sans: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
      --radius: 8px;
      --shadow: 0 1px 3px rgba(0,0,0,0.12), 0 1px 2px rgba(0,0,0,0.08);
    }
    *, *::before, *::after { box-sizing: border-box; margin: 0; padding: 0; }
    body { font-family: var(--sans); background: var(--bg); color: var(--fg); line-height: 1.6; }
    main { max-width: 1080px; margin: 0 auto; padding: 2rem 1.5rem; display: flex; flex-direction: column; gap: 1.5rem; }
    h1 { font-size: 1.8rem; font-weight: 600; }
    h2 { font-size: 1.1rem; font-weight: 600; margin-bottom: 0.75rem; }
    h3 { font-size: 1.3rem; font-weight: 600; margin-bottom: 0.5rem; }
    .card { background: var(--bg-raised); border: 1px solid var(--border); border-radius: var(--radius); box-shadow: var(--shadow); padding: 1.25rem 1.5rem; }
    .accent { color: var(--accent); }
    .inset { background: var(--bg-inset); border-radius: 4px; padding: 0.6rem 0.9rem; font-size: 0.85rem; color: var(--fg-muted); }
    .badge { display: inline-block; padding: 0.1rem 0.5rem; border-radius: 4px; font-size: 0.85rem; font-weight: 600; }
    .badge-green { color: var(--green); }
    .badge-red { color: var(--red); }
    .badge-yellow { color: var(--yellow); }
    .kv { display: flex; gap: 1rem; padding: 0.2rem 0; }
    .kv .k { min-width: 12rem; font-weight: 500; color: var(--fg-muted); }
    .chart { width: 100%; height: auto; }
    .chart .grid { stroke: var(--border); stroke-width: 1; }
    .chart .tick { font-size: 11px; fill: var(--fg-muted); }
    .chart .legend { font-size: 12px; fill: var(--fg); }
    .chart .value { font-size: 10px; }
    .muted { color: var(--fg-subtle); }
    .error { color: var(--red); }
    footer { font-size: 0.75rem; color: var(--fg-subtle); }
"#;
