use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::chart::{MetricTable, ModelKey};
use crate::config::Config;

mod http;
mod local;
pub mod types;

pub use http::HttpBackend;
pub use local::LocalBackend;
pub use types::{
    FeatureImportance, FeatureSeries, FeatureWeight, QuestionForm, QuestionStatus, ResultDetail,
    ResultSummary, StatusTone, SubmitReceipt,
};

/// File stem the backend stores feature rankings under (`feature_importance_<model>.csv`).
pub const FEATURE_IMPORTANCE_FILE: &str = "feature_importance";
/// File stem of the model comparison table.
pub const MODEL_EVALUATION_FILE: &str = "model_evaluation";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{endpoint} returned HTTP {code}{}", detail_suffix(.detail))]
    Status {
        endpoint: String,
        code: u16,
        detail: Option<String>,
    },
    #[error("result {0} not found")]
    NotFound(u64),
    #[error("no research questions provided")]
    EmptySubmission,
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {}", d)).unwrap_or_default()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    Http,
    Local,
}

impl BackendKind {
    pub fn from_env() -> Self {
        match std::env::var("BACKEND").unwrap_or_else(|_| "http".to_string()).as_str() {
            "local" => BackendKind::Local,
            _ => BackendKind::Http,
        }
    }

    pub fn build(self, cfg: &Config) -> Result<Box<dyn Backend + Send + Sync>> {
        match self {
            BackendKind::Http => Ok(Box::new(HttpBackend::new(cfg)?)),
            BackendKind::Local => Ok(Box::new(LocalBackend::open(&cfg.results_db, &cfg.results_root)?)),
        }
    }
}

/// Everything the dashboard asks of the analysis backend.
#[async_trait]
pub trait Backend {
    async fn list_results(&self) -> Result<Vec<ResultSummary>>;
    async fn fetch_result(&self, id: u64) -> Result<ResultDetail>;
    /// Comparison table, trailing display row included.
    async fn fetch_metrics(&self, id: u64) -> Result<MetricTable>;
    async fn fetch_feature_importance(&self, id: u64, models: &[ModelKey]) -> Result<FeatureImportance>;
    async fn submit_questions(&self, forms: &[QuestionForm]) -> Result<SubmitReceipt>;
}
