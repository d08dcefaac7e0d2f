use std::path::PathBuf;
use std::time::Duration;

use crate::chart::DEFAULT_TOP_BARS;

#[derive(Clone, Debug)]
pub struct Config {
    /// Root of the REST backend, without trailing slash.
    pub api_base: String,
    pub http_timeout: Duration,
    /// SQLite file the backend records questions in (local backend only).
    pub results_db: PathBuf,
    /// Directory relative `results_path` entries are resolved against (local backend only).
    pub results_root: PathBuf,
    pub rows_per_page: usize,
    pub top_bars: usize,
    pub report_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: "http://127.0.0.1:5001".to_string(),
            http_timeout: Duration::from_secs(30),
            results_db: PathBuf::from("research_results.db"),
            results_root: PathBuf::from("."),
            rows_per_page: 10,
            top_bars: DEFAULT_TOP_BARS,
            report_dir: PathBuf::from("out/reports"),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            api_base: std::env::var("API_BASE")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(d.api_base),
            http_timeout: std::env::var("HTTP_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).map(Duration::from_secs).unwrap_or(d.http_timeout),
            results_db: std::env::var("RESULTS_DB").map(PathBuf::from).unwrap_or(d.results_db),
            results_root: std::env::var("RESULTS_ROOT").map(PathBuf::from).unwrap_or(d.results_root),
            rows_per_page: std::env::var("ROWS_PER_PAGE").ok().and_then(|v| v.parse().ok()).filter(|&n| n > 0).unwrap_or(d.rows_per_page),
            top_bars: std::env::var("TOP_BARS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.top_bars),
            report_dir: std::env::var("REPORT_DIR").map(PathBuf::from).unwrap_or(d.report_dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_backend() {
        let c = Config::default();
        assert_eq!(c.api_base, "http://127.0.0.1:5001");
        assert_eq!(c.rows_per_page, 10);
        assert_eq!(c.top_bars, 5);
    }
}
