use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::api::types::{
    parse_feature_importance, ErrorBody, FeatureImportance, MetricsResponse, QuestionForm,
    ResultDetail, ResultList, ResultSummary, SubmitReceipt, SubmitRequest,
};
use crate::api::{ApiError, Backend, FEATURE_IMPORTANCE_FILE};
use crate::chart::{MetricTable, ModelKey};
use crate::config::Config;
use crate::logging::{log, log_request, log_response, obj, v_str, Domain, Level, ProfileScope};

pub struct HttpBackend {
    client: Client,
    base: Url,
}

impl HttpBackend {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(cfg.http_timeout)
            .build()
            .context("building HTTP client")?;
        // Endpoints join relative to the base, so it must end in `/` to keep any path prefix.
        let mut base = cfg.api_base.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base)
            .with_context(|| format!("invalid API_BASE {:?}", cfg.api_base))?;
        Ok(Self { client, base })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .with_context(|| format!("joining {} onto {}", path, self.base))
    }

    /// Link the backend serves the zipped result folder under.
    pub fn download_url(&self, id: u64) -> Result<Url> {
        self.url(&format!("api/download_results/{}", id))
    }

    /// Zip archive of every file the analysis produced for `id`.
    pub async fn download_results(&self, id: u64) -> Result<Vec<u8>> {
        let url = self.download_url(id)?;
        let resp = self.send("GET", self.client.get(url.clone()), &url).await?;
        let resp = check_status(resp, url.path(), Some(id)).await?;
        let bytes = resp.bytes().await.context("reading download body")?;
        Ok(bytes.to_vec())
    }

    async fn send(&self, method: &str, req: reqwest::RequestBuilder, url: &Url) -> Result<Response> {
        log_request(method, url.path());
        let scope = ProfileScope::with_context("http", &[("endpoint", v_str(url.path()))]);
        let resp = req
            .send()
            .await
            .with_context(|| format!("request to {} failed", url.path()))?;
        log_response(url.path(), resp.status().as_u16(), scope.elapsed_ms());
        Ok(resp)
    }

    /// `result_id` turns a 404 into `ApiError::NotFound`; leave it unset where a
    /// 404 can also mean a missing result file.
    async fn get_json<T: DeserializeOwned>(&self, url: Url, result_id: Option<u64>) -> Result<T> {
        let resp = self.send("GET", self.client.get(url.clone()), &url).await?;
        let resp = check_status(resp, url.path(), result_id).await?;
        resp.json::<T>()
            .await
            .with_context(|| format!("decoding response of {}", url.path()))
    }
}

async fn check_status(resp: Response, endpoint: &str, result_id: Option<u64>) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        if let Some(id) = result_id {
            return Err(ApiError::NotFound(id).into());
        }
    }
    let body = match resp.text().await {
        Ok(body) => body,
        Err(err) => {
            log(
                Level::Debug,
                Domain::Api,
                "error_body_unreadable",
                obj(&[("endpoint", v_str(endpoint)), ("cause", v_str(&err.to_string()))]),
            );
            String::new()
        }
    };
    let detail = serde_json::from_str::<ErrorBody>(&body)
        .map(|e| e.error)
        .ok()
        .or_else(|| Some(body.trim().to_string()).filter(|s| !s.is_empty()));
    Err(ApiError::Status {
        endpoint: endpoint.to_string(),
        code: status.as_u16(),
        detail,
    }
    .into())
}

#[async_trait::async_trait]
impl Backend for HttpBackend {
    async fn list_results(&self) -> Result<Vec<ResultSummary>> {
        let list: ResultList = self.get_json(self.url("api/results")?, None).await?;
        Ok(list.data)
    }

    async fn fetch_result(&self, id: u64) -> Result<ResultDetail> {
        self.get_json(self.url(&format!("api/results/{}", id))?, Some(id)).await
    }

    async fn fetch_metrics(&self, id: u64) -> Result<MetricTable> {
        let mut url = self.url("metrics")?;
        url.query_pairs_mut().append_pair("result_id", &id.to_string());
        let resp: MetricsResponse = self.get_json(url, None).await?;
        Ok(resp.default)
    }

    async fn fetch_feature_importance(&self, id: u64, models: &[ModelKey]) -> Result<FeatureImportance> {
        let mut url = self.url("metrics")?;
        url.query_pairs_mut()
            .append_pair("filename", FEATURE_IMPORTANCE_FILE)
            .append_pair("models", &models.join(","))
            .append_pair("result_id", &id.to_string());
        let body: Value = self.get_json(url, None).await?;
        parse_feature_importance(body)
    }

    async fn submit_questions(&self, forms: &[QuestionForm]) -> Result<SubmitReceipt> {
        if forms.is_empty() {
            return Err(ApiError::EmptySubmission.into());
        }
        let url = self.url("api/research-questions")?;
        let req = self
            .client
            .post(url.clone())
            .json(&SubmitRequest { research_questions: forms });
        let resp = self.send("POST", req, &url).await?;
        let resp = check_status(resp, url.path(), None).await?;
        resp.json::<SubmitReceipt>()
            .await
            .context("decoding submission receipt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base: &str) -> HttpBackend {
        HttpBackend::new(&Config {
            api_base: base.to_string(),
            ..Config::default()
        })
        .unwrap()
    }

    #[test]
    fn download_url_joins_base() {
        let b = backend("http://127.0.0.1:5001");
        assert_eq!(
            b.download_url(12).unwrap().as_str(),
            "http://127.0.0.1:5001/api/download_results/12"
        );
    }

    #[test]
    fn base_path_prefix_is_kept() {
        for base in ["http://h:5001/backend", "http://h:5001/backend/"] {
            let b = backend(base);
            assert_eq!(
                b.download_url(7).unwrap().as_str(),
                "http://h:5001/backend/api/download_results/7"
            );
            assert_eq!(b.url("/api/results").unwrap().as_str(), "http://h:5001/backend/api/results");
            assert_eq!(b.url("metrics").unwrap().as_str(), "http://h:5001/backend/metrics");
        }
    }

    #[test]
    fn rejects_unparseable_base() {
        let err = HttpBackend::new(&Config {
            api_base: "not a url".to_string(),
            ..Config::default()
        });
        assert!(err.is_err());
    }
}
