use rqdash::api::{Backend, FeatureSeries, LocalBackend, QuestionForm, QuestionStatus};
use rqdash::chart::HIGHLIGHT;
use rqdash::dashboard::{self, ViewError, CHART_FAILED, RESULT_FAILED};
use rqdash::forms::{FormBatch, FormEvent};
use rqdash::history::HistoryView;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const EVALUATION: &str = "\
,logistic_regression,random_forest
accuracy,0.81,0.86
f1,0.72,0.80
precision,0.70,0.83
best_params,\"{'C': 1.0}\",\"{'max_depth': 10, 'n_estimators': 50}\"
";

fn seeded() -> (TempDir, LocalBackend, u64) {
    let dir = TempDir::new().unwrap();
    let folder = dir.path().join("analysis_results").join("analysis_1");
    fs::create_dir_all(&folder).unwrap();
    fs::write(folder.join("model_evaluation.csv"), EVALUATION).unwrap();
    fs::write(
        folder.join("feature_importance_random_forest.csv"),
        ",feature,importance\n0,income,0.41\n1,age,0.33\n2,region,0.26\n",
    )
    .unwrap();

    let backend = LocalBackend::open(&dir.path().join("results.db"), dir.path()).unwrap();
    let id = backend
        .record_result(
            "churn",
            &["income".to_string(), "age".to_string(), "region".to_string()],
            "Success",
            "analysis_results/analysis_1",
        )
        .unwrap();
    (dir, backend, id)
}

fn form(id: u64, dep: &str, indep: &[&str]) -> QuestionForm {
    QuestionForm {
        dep_var: dep.to_string(),
        independents: indep.iter().map(|s| s.to_string()).collect(),
        id,
        status: QuestionStatus::NotStarted,
    }
}

#[tokio::test]
async fn lists_and_fetches_recorded_results() {
    let (_dir, backend, id) = seeded();
    let rows = backend.list_results().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].independent_vars, "income, age, region");
    assert_eq!(rows[0].status, QuestionStatus::Success);

    let detail = backend.fetch_result(id).await.unwrap();
    assert_eq!(detail.dependent_var, "churn");
    assert_eq!(detail.independents(), vec!["income", "age", "region"]);
}

#[tokio::test]
async fn missing_result_maps_to_fixed_message() {
    let (_dir, backend, _) = seeded();
    match dashboard::load_result(&backend, 99).await {
        Err(ViewError::Fetch { message, cause }) => {
            assert_eq!(message, RESULT_FAILED);
            assert!(cause.contains("99"));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn comparison_highlights_best_model_and_keeps_its_color() {
    let (_dir, backend, id) = seeded();
    let c = dashboard::load_comparison(&backend, id).await.unwrap();

    assert_eq!(c.labels, vec!["accuracy", "f1", "precision"]);
    assert_eq!(c.datasets.keys, vec!["logistic_regression", "random_forest"]);
    assert_eq!(c.datasets.colors.highlighted(), Some("random_forest"));
    assert_eq!(c.datasets.series[1].data, vec![0.86, 0.80, 0.83]);

    let index_row = c.index_row.as_ref().unwrap();
    assert_eq!(index_row.label(), "best_params");
    assert_eq!(index_row.display("random_forest"), "{'max_depth': 10, 'n_estimators': 50}");

    assert_eq!(c.features.len(), 2);
    let (model, series) = &c.features[1];
    assert_eq!(model, "random_forest");
    let names: Vec<&str> = series.weights().iter().map(|w| w.feature.as_str()).collect();
    assert_eq!(names, vec!["income", "age", "region"]);
    assert_eq!(c.datasets.colors.get(model), Some(HIGHLIGHT));

    match &c.features[0].1 {
        FeatureSeries::Unavailable { error } => assert!(error.starts_with("File not found at path:")),
        other => panic!("expected missing file, got {:?}", other),
    }
}

#[tokio::test]
async fn comparison_without_metrics_file_fails_with_chart_message() {
    let (_dir, backend, _) = seeded();
    let id = backend.record_result("y", &["a".to_string(), "b".to_string()], "Error", "nowhere").unwrap();
    match dashboard::load_comparison(&backend, id).await {
        Err(ViewError::Fetch { message, .. }) => assert_eq!(message, CHART_FAILED),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn comparison_without_f1_row_is_a_transform_error() {
    let (dir, backend, _) = seeded();
    let folder = dir.path().join("no_f1");
    fs::create_dir_all(&folder).unwrap();
    fs::write(folder.join("model_evaluation.csv"), ",a,b\naccuracy,0.1,0.2\nbest_params,x,y\n").unwrap();
    let id = backend
        .record_result("y", &["a".to_string(), "b".to_string()], "Success", &folder.to_string_lossy())
        .unwrap();
    assert!(matches!(
        dashboard::load_comparison(&backend, id).await,
        Err(ViewError::Transform(_))
    ));
}

#[tokio::test]
async fn submit_records_valid_questions_only() {
    let (_dir, backend, _) = seeded();
    let receipt = backend
        .submit_questions(&[form(2, "salary", &["age", " tenure "]), form(3, "y", &["only_one"])])
        .await
        .unwrap();
    assert_eq!(receipt.message, "Processing complete.");
    assert_eq!(receipt.processed_questions.len(), 1);
    let q = &receipt.processed_questions[0];
    assert_eq!(q.independent_vars, vec!["age", "tenure"]);
    assert_eq!(q.status, QuestionStatus::Starting);

    let rows = backend.list_results().await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(backend.submit_questions(&[]).await.is_err());
}

#[tokio::test]
async fn dashboard_submit_resets_the_batch() {
    let (_dir, backend, _) = seeded();
    let history = dashboard::load_history(&backend, &HistoryView::new(10)).await.unwrap();
    let batch = FormBatch::new(history.len())
        .apply(FormEvent::SetDependent { slot: 0, text: "salary".into() })
        .apply(FormEvent::SetIndependents { slot: 0, text: "age, tenure".into() });
    assert_eq!(batch.forms()[0].id, 2);

    let done = dashboard::submit(&backend, &batch).await.unwrap();
    assert_eq!(done.receipt.processed_questions.len(), 1);
    assert_eq!(done.batch, FormBatch::new(1));

    let history = dashboard::load_history(&backend, &HistoryView::new(10)).await.unwrap();
    let ids: Vec<u64> = history.visible().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![2, 1]);
}

#[tokio::test]
async fn incomplete_batch_is_not_submitted() {
    let (_dir, backend, _) = seeded();
    let batch = FormBatch::new(1);
    assert!(matches!(dashboard::submit(&backend, &batch).await, Err(ViewError::NotReady)));
    assert_eq!(backend.list_results().await.unwrap().len(), 1);
}

#[test]
fn results_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("results.db");
    {
        let b = LocalBackend::open(&db, dir.path()).unwrap();
        b.record_result("y", &["a".to_string(), "b".to_string()], "Success", "x").unwrap();
    }
    let b = LocalBackend::open(&db, Path::new(".")).unwrap();
    let rt = tokio::runtime::Runtime::new().unwrap();
    assert_eq!(rt.block_on(b.list_results()).unwrap().len(), 1);
}
