use rqdash::chart::{
    highlight_top_n, transform_to_datasets, Color, MetricRow, TransformError, HIGHLIGHT, PALETTE,
};
use serde_json::{json, Value};

fn row(label: &str, cells: &[(&str, Value)]) -> MetricRow {
    MetricRow::new(label, cells.iter().cloned())
}

fn table() -> Vec<MetricRow> {
    vec![
        row(
            "accuracy",
            &[("logistic_regression", json!(0.81)), ("random_forest", json!(0.86)), ("svm", json!(0.79))],
        ),
        row(
            "f1",
            &[("logistic_regression", json!(0.72)), ("random_forest", json!(0.70)), ("svm", json!(0.75))],
        ),
        row(
            "precision",
            &[("logistic_regression", json!("0.66")), ("random_forest", json!("n/a")), ("svm", json!(0.7))],
        ),
    ]
}

#[test]
fn best_f1_model_is_highlighted() {
    let rows = vec![row("f1", &[("modelA", json!(0.8)), ("modelB", json!(0.95))])];
    let d = transform_to_datasets(&rows).unwrap();
    assert_eq!(d.keys, vec!["modelA", "modelB"]);
    assert_eq!(d.colors.highlighted(), Some("modelB"));
    assert_eq!(d.colors.get("modelB"), Some(HIGHLIGHT));
    assert_eq!(d.colors.get("modelA"), Some(PALETTE[0]));
    assert_eq!(d.series[1].background_color, vec![HIGHLIGHT]);
}

#[test]
fn series_are_transposed_per_model() {
    let d = transform_to_datasets(&table()).unwrap();
    assert_eq!(d.series.len(), 3);
    let rf = &d.series[1];
    assert_eq!(rf.key, "random_forest");
    assert_eq!(rf.label, "Random Forest");
    assert_eq!(rf.data, vec![0.86, 0.70, 0.0]);
    assert_eq!(d.series[0].data[2], 0.66);
    assert_eq!(d.colors.highlighted(), Some("svm"));
    assert_eq!(d.colors.get("random_forest"), Some(PALETTE[1]));
    for s in &d.series {
        assert_eq!(s.background_color.len(), 3);
        assert_eq!(s.border_color, s.background_color);
    }
}

#[test]
fn unparseable_cells_read_as_zero() {
    let rows = vec![row("f1", &[("a", json!("abc")), ("b", json!(0.1))])];
    let d = transform_to_datasets(&rows).unwrap();
    assert_eq!(d.series[0].data, vec![0.0]);
    assert_eq!(d.colors.highlighted(), Some("b"));
}

#[test]
fn ties_go_to_first_model() {
    let rows = vec![row("F1", &[("a", json!(0.5)), ("b", json!(0.5))])];
    let d = transform_to_datasets(&rows).unwrap();
    assert_eq!(d.colors.highlighted(), Some("a"));
}

#[test]
fn missing_f1_row_is_an_error() {
    let rows = vec![row("accuracy", &[("a", json!(0.5))])];
    assert_eq!(transform_to_datasets(&rows), Err(TransformError::MissingSelectionRow));
    assert_eq!(transform_to_datasets(&[]), Err(TransformError::MissingSelectionRow));
}

#[test]
fn transform_is_deterministic() {
    let a = transform_to_datasets(&table()).unwrap();
    let b = transform_to_datasets(&table()).unwrap();
    assert_eq!(a, b);
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn top_n_highlights_largest_and_offsets_palette() {
    let colors = highlight_top_n(&[5.0, 3.0, 9.0, 1.0], 2);
    assert_eq!(colors, vec![HIGHLIGHT, PALETTE[8], HIGHLIGHT, PALETTE[1]]);
}

#[test]
fn top_n_edges() {
    assert!(highlight_top_n(&[], 3).is_empty());
    assert_eq!(highlight_top_n(&[1.0, 2.0], 5), vec![HIGHLIGHT, HIGHLIGHT]);
    let none: Vec<Color> = highlight_top_n(&[1.0, 2.0], 0);
    assert_eq!(none, vec![PALETTE[0], PALETTE[1]]);
    // ties keep input order
    assert_eq!(highlight_top_n(&[2.0, 2.0, 2.0], 1), vec![HIGHLIGHT, PALETTE[0], PALETTE[1]]);
}

#[test]
fn series_serialize_for_chart_clients() {
    let rows = vec![row("f1", &[("svm", json!(0.9))])];
    let d = transform_to_datasets(&rows).unwrap();
    let v = serde_json::to_value(&d.series[0]).unwrap();
    assert_eq!(v["backgroundColor"], json!(["#00008B"]));
    assert_eq!(v["borderWidth"], json!(1));
    assert_eq!(v["label"], json!("Svm"));
}
