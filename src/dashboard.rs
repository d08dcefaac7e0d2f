//! Page-level loads. Each view issues its own requests; a failure is scoped to
//! the view and reported with a fixed user-facing message while the cause goes
//! to the log.

use serde::Serialize;
use thiserror::Error;

use crate::api::types::split_index_row;
use crate::api::{Backend, FeatureImportance, ResultDetail, SubmitReceipt};
use crate::chart::{transform_to_datasets, Datasets, MetricRow, TransformError};
use crate::forms::{FormBatch, FormEvent};
use crate::history::{HistoryEvent, HistoryView};
use crate::logging::{log, log_highlight, log_view_failure, obj, Domain, Level};

pub const HISTORY_FAILED: &str = "Failed to load results. Please try again later.";
pub const RESULT_FAILED: &str = "Failed to fetch results";
pub const CHART_FAILED: &str = "Failed to load chart data.";
pub const SUBMIT_FAILED: &str = "Failed to process research questions";

#[derive(Debug, Error)]
pub enum ViewError {
    /// `cause` is the full error chain; show `message` to users.
    #[error("{message}")]
    Fetch { message: &'static str, cause: String },
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error("every form needs a dependent variable and at least one independent variable")]
    NotReady,
}

impl ViewError {
    fn fetch(view: &str, message: &'static str, result_id: Option<u64>, err: anyhow::Error) -> Self {
        let cause = format!("{:#}", err);
        log_view_failure(view, result_id, &cause);
        ViewError::Fetch { message, cause }
    }
}

/// Everything the comparison page shows for one result.
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub result_id: u64,
    /// Statistic names along the x axis.
    pub labels: Vec<String>,
    pub datasets: Datasets,
    /// Trailing display-only row (hyper-parameters), kept out of the chart.
    pub index_row: Option<MetricRow>,
    pub features: FeatureImportance,
}

pub async fn load_history(backend: &dyn Backend, view: &HistoryView) -> Result<HistoryView, ViewError> {
    let rows = backend
        .list_results()
        .await
        .map_err(|e| ViewError::fetch("history", HISTORY_FAILED, None, e))?;
    Ok(view.apply(HistoryEvent::Loaded(rows)))
}

pub async fn load_result(backend: &dyn Backend, id: u64) -> Result<ResultDetail, ViewError> {
    backend
        .fetch_result(id)
        .await
        .map_err(|e| ViewError::fetch("result", RESULT_FAILED, Some(id), e))
}

pub async fn load_comparison(backend: &dyn Backend, id: u64) -> Result<Comparison, ViewError> {
    let table = backend
        .fetch_metrics(id)
        .await
        .map_err(|e| ViewError::fetch("comparison", CHART_FAILED, Some(id), e))?;

    let (rows, index_row) = split_index_row(table);
    let datasets = match transform_to_datasets(&rows) {
        Ok(d) => d,
        Err(e) => {
            log_view_failure("comparison", Some(id), &e.to_string());
            return Err(e.into());
        }
    };
    log_highlight(id, datasets.colors.highlighted(), datasets.keys.len());

    let features = backend
        .fetch_feature_importance(id, &datasets.keys)
        .await
        .map_err(|e| ViewError::fetch("comparison", CHART_FAILED, Some(id), e))?;

    Ok(Comparison {
        result_id: id,
        labels: rows.iter().map(|r| r.label().to_string()).collect(),
        datasets,
        index_row,
        features,
    })
}

/// Outcome of a successful submission: the receipt and the batch to show next.
#[derive(Debug, Clone)]
pub struct Submission {
    pub receipt: SubmitReceipt,
    pub batch: FormBatch,
}

pub async fn submit(backend: &dyn Backend, batch: &FormBatch) -> Result<Submission, ViewError> {
    if !batch.can_submit() {
        return Err(ViewError::NotReady);
    }
    let pending = batch.apply(FormEvent::SubmitStarted);
    let receipt = backend
        .submit_questions(pending.forms())
        .await
        .map_err(|e| ViewError::fetch("submit", SUBMIT_FAILED, None, e))?;
    log(
        Level::Info,
        Domain::Form,
        "submitted",
        obj(&[
            ("forms", serde_json::json!(pending.forms().len())),
            ("accepted", serde_json::json!(receipt.processed_questions.len())),
        ]),
    );
    Ok(Submission {
        receipt,
        batch: pending.apply(FormEvent::Reset),
    })
}
