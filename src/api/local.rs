//! Backend that reads the analysis service's own storage: the `research_results`
//! SQLite table and the CSV files each analysis leaves in its results folder.

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Number, Value};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::api::types::{
    FeatureImportance, FeatureSeries, FeatureWeight, ProcessedQuestion, QuestionForm,
    QuestionStatus, ResultDetail, ResultSummary, SubmitReceipt,
};
use crate::api::{ApiError, Backend, FEATURE_IMPORTANCE_FILE, MODEL_EVALUATION_FILE};
use crate::chart::{MetricRow, MetricTable, ModelKey, LABEL_FIELD};
use crate::logging::{log, obj, v_str, Domain, Level};

/// Questions need at least this many independent variables to be accepted.
const MIN_INDEPENDENTS: usize = 2;

pub struct LocalBackend {
    conn: Mutex<Connection>,
    root: PathBuf,
}

struct StoredRow {
    id: u64,
    dependent_var: String,
    independent_vars: String,
    status: String,
    results_path: String,
}

impl LocalBackend {
    pub fn open(db: &Path, root: &Path) -> Result<Self> {
        let conn = Connection::open(db).with_context(|| format!("opening {}", db.display()))?;
        let backend = Self {
            conn: Mutex::new(conn),
            root: root.to_path_buf(),
        };
        backend.init()?;
        Ok(backend)
    }

    pub fn init(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS research_results (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    dependent_var TEXT NOT NULL,
                    independent_vars TEXT,
                    status TEXT NOT NULL,
                    results_path TEXT NOT NULL
                );",
            )?;
            Ok(())
        })
    }

    /// Records a finished analysis whose files live under `results_path`.
    pub fn record_result(
        &self,
        dependent_var: &str,
        independents: &[String],
        status: &str,
        results_path: &str,
    ) -> Result<u64> {
        let independents = serde_json::to_string(independents)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO research_results (dependent_var, independent_vars, status, results_path)
                 VALUES (?1, ?2, ?3, ?4)",
                params![dependent_var, independents, status, results_path],
            )?;
            Ok(conn.last_insert_rowid() as u64)
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow!("results database lock poisoned"))?;
        f(&conn)
    }

    fn row(&self, id: u64) -> Result<StoredRow> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, dependent_var, independent_vars, status, results_path
                 FROM research_results WHERE id = ?1",
                params![id as i64],
                stored_row,
            )
            .optional()?
            .ok_or_else(|| ApiError::NotFound(id).into())
        })
    }

    fn folder(&self, results_path: &str) -> PathBuf {
        // Results written on Windows hosts carry backslash-separated paths; only the
        // final folder name is meaningful here.
        let path = Path::new(results_path);
        if results_path.contains('\\') {
            let name = results_path.rsplit('\\').next().unwrap_or(results_path);
            return self.root.join("analysis_results").join(name);
        }
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

fn stored_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<StoredRow> {
    Ok(StoredRow {
        id: r.get::<_, i64>(0)? as u64,
        dependent_var: r.get(1)?,
        independent_vars: r.get::<_, Option<String>>(2)?.unwrap_or_default(),
        status: r.get(3)?,
        results_path: r.get(4)?,
    })
}

fn independents_joined(stored: &str) -> String {
    serde_json::from_str::<Vec<String>>(stored)
        .map(|list| list.join(", "))
        .unwrap_or_else(|_| stored.to_string())
}

#[async_trait::async_trait]
impl Backend for LocalBackend {
    async fn list_results(&self) -> Result<Vec<ResultSummary>> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, dependent_var, independent_vars, status, results_path
                 FROM research_results",
            )?;
            let rows = stmt
                .query_map([], stored_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })?;
        Ok(rows
            .into_iter()
            .map(|r| {
                let folder = Path::new(&r.results_path);
                ResultSummary {
                    id: r.id,
                    dependent_var: r.dependent_var,
                    independent_vars: independents_joined(&r.independent_vars),
                    status: QuestionStatus::parse(&r.status),
                    feature_importance: Some(folder.join("feature_importance.csv").to_string_lossy().into_owned()),
                    model_comparison: Some(folder.join("model_comparison.csv").to_string_lossy().into_owned()),
                    results_path: Some(r.results_path),
                }
            })
            .collect())
    }

    async fn fetch_result(&self, id: u64) -> Result<ResultDetail> {
        let r = self.row(id)?;
        Ok(ResultDetail {
            id: r.id,
            dependent_var: r.dependent_var,
            independent_vars: r.independent_vars,
            status: QuestionStatus::parse(&r.status),
        })
    }

    async fn fetch_metrics(&self, id: u64) -> Result<MetricTable> {
        let r = self.row(id)?;
        let path = self.folder(&r.results_path).join(format!("{}.csv", MODEL_EVALUATION_FILE));
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("File not found at path: {}", path.display()))?;
        read_records(&text)?
            .into_iter()
            .map(|rec| row_from_record(rec).with_context(|| format!("parsing {}", path.display())))
            .collect()
    }

    async fn fetch_feature_importance(&self, id: u64, models: &[ModelKey]) -> Result<FeatureImportance> {
        let r = self.row(id)?;
        let folder = self.folder(&r.results_path);
        let mut out = Vec::with_capacity(models.len());
        for model in models {
            let path = folder.join(format!("{}_{}.csv", FEATURE_IMPORTANCE_FILE, model));
            let series = match std::fs::read_to_string(&path) {
                Ok(text) => match read_records(&text).map(|recs| weights_from_records(&recs)) {
                    Ok(weights) => FeatureSeries::Ranked(weights),
                    Err(e) => FeatureSeries::Unavailable {
                        error: format!("An error occurred: {}", e),
                    },
                },
                Err(_) => FeatureSeries::Unavailable {
                    error: format!("File not found at path: {}", path.display()),
                },
            };
            out.push((model.clone(), series));
        }
        Ok(out)
    }

    async fn submit_questions(&self, forms: &[QuestionForm]) -> Result<SubmitReceipt> {
        if forms.is_empty() {
            return Err(ApiError::EmptySubmission.into());
        }
        let mut processed = Vec::new();
        for form in forms {
            let independents: Vec<String> = form
                .independents
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            let dep_var = form.dep_var.trim();
            if dep_var.is_empty() || independents.len() < MIN_INDEPENDENTS {
                log(
                    Level::Warn,
                    Domain::Form,
                    "question_rejected",
                    obj(&[
                        ("form_id", serde_json::json!(form.id)),
                        ("reason", v_str("missing dependent variable or insufficient independent variables")),
                    ]),
                );
                continue;
            }
            let status = QuestionStatus::Starting;
            let id = self.record_result(dep_var, &independents, status.as_str(), "")?;
            processed.push(ProcessedQuestion {
                id,
                dependent_var: dep_var.to_string(),
                independent_vars: independents,
                status,
                results_path: String::new(),
            });
        }
        Ok(SubmitReceipt {
            message: "Processing complete.".to_string(),
            processed_questions: processed,
        })
    }
}

// =============================================================================
// CSV reading
// =============================================================================

/// Header + records of a CSV file, cells typed as numbers where they parse.
/// A blank first header cell is the written-out row index and is named `index`.
fn read_records(text: &str) -> Result<Vec<Vec<(String, Value)>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut columns: Vec<String> = reader
        .headers()
        .context("reading CSV header")?
        .iter()
        .map(str::to_string)
        .collect();
    if columns.is_empty() {
        return Err(anyhow!("CSV file is empty"));
    }
    if columns[0].trim().is_empty() {
        columns[0] = LABEL_FIELD.to_string();
    }

    let mut records = Vec::new();
    for result in reader.records() {
        let cells = result.context("reading CSV record")?;
        if cells.len() > columns.len() {
            let line = cells.position().map(|p| p.line()).unwrap_or(0);
            return Err(anyhow!("line {}: {} cells for {} columns", line, cells.len(), columns.len()));
        }
        let record = columns
            .iter()
            .enumerate()
            .map(|(i, col)| (col.clone(), typed_cell(cells.get(i).unwrap_or(""))))
            .collect();
        records.push(record);
    }
    Ok(records)
}

fn typed_cell(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    match trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
        Some(n) => Value::Number(n),
        None => Value::String(raw.to_string()),
    }
}

fn row_from_record(record: Vec<(String, Value)>) -> Result<MetricRow> {
    let mut label = None;
    let mut values = Map::new();
    for (k, v) in record {
        if k == LABEL_FIELD {
            label = Some(match v {
                Value::String(s) => s,
                Value::Null => return Err(anyhow!("row without a label")),
                other => other.to_string(),
            });
        } else {
            values.insert(k, v);
        }
    }
    let label = label.ok_or_else(|| anyhow!("no `{}` column", LABEL_FIELD))?;
    Ok(MetricRow::new(&label, values))
}

fn weights_from_records(records: &[Vec<(String, Value)>]) -> Vec<FeatureWeight> {
    records
        .iter()
        .map(|rec| {
            let get = |name: &str| rec.iter().find(|(k, _)| k == name).map(|(_, v)| v);
            FeatureWeight {
                feature: match get("feature") {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Null) | None => String::new(),
                    Some(other) => other.to_string(),
                },
                importance: get("importance").map(crate::chart::parse_metric).unwrap_or(0.0),
            }
        })
        .collect()
}
