//! Research results dashboard.
//!
//! Usage:
//!   rqdash <command> [options]
//!
//! Commands:
//!   history [--page=N]                        - Processing history, newest first
//!   show <id>                                 - One research question
//!   chart <id> [--top=N] [--html[=PATH]]      - Model comparison and feature importance
//!   submit --question=DEP:IND1,IND2 [...]     - Submit one or more research questions
//!   download <id> [--out=PATH]                - Zipped result folder (HTTP backend only)
//!
//! Environment:
//!   BACKEND=http|local, API_BASE, RESULTS_DB, RESULTS_ROOT, HTTP_TIMEOUT_SECS,
//!   ROWS_PER_PAGE, TOP_BARS, REPORT_DIR, LOG_LEVEL, LOG_DOMAINS, LOG_DIR

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde_json::json;

use rqdash::api::{Backend, BackendKind, HttpBackend};
use rqdash::config::Config;
use rqdash::dashboard::{self, ViewError};
use rqdash::forms::{FormBatch, FormEvent};
use rqdash::history::{HistoryEvent, HistoryView};
use rqdash::logging::{log, obj, ts_now, v_str, Domain, Level};
use rqdash::render::{html, text};

const BAR_WIDTH: usize = 40;

fn print_usage() {
    eprintln!("Usage: rqdash <command> [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  history [--page=N]");
    eprintln!("  show <id>");
    eprintln!("  chart <id> [--top=N] [--html[=PATH]]");
    eprintln!("  submit --question=DEP:IND1,IND2 [--question=...]");
    eprintln!("  download <id> [--out=PATH]");
}

fn parse_id(args: &[String]) -> u64 {
    match args.get(2).map(|s| s.parse::<u64>()) {
        Some(Ok(id)) => id,
        _ => {
            eprintln!("Error: expected a numeric result id");
            print_usage();
            std::process::exit(1);
        }
    }
}

/// Prints the user-facing message; the cause was already logged by the view.
fn report(err: ViewError) -> ! {
    eprintln!("{}", err);
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let cfg = Config::from_env();
    let kind = BackendKind::from_env();
    log(
        Level::Info,
        Domain::System,
        "start",
        obj(&[
            ("command", v_str(&args[1])),
            ("backend", json!(format!("{:?}", kind))),
            ("api_base", v_str(&cfg.api_base)),
        ]),
    );

    match args[1].as_str() {
        "history" => {
            let mut page = 1;
            for arg in &args[2..] {
                if let Some(v) = arg.strip_prefix("--page=") {
                    page = v.parse().context("--page must be a number")?;
                }
            }
            let backend = kind.build(&cfg)?;
            cmd_history(&*backend, &cfg, page).await
        }
        "show" => {
            let id = parse_id(&args);
            let backend = kind.build(&cfg)?;
            let detail = dashboard::load_result(&*backend, id).await.unwrap_or_else(|e| report(e));
            print!("{}", text::result_detail(&detail));
            Ok(())
        }
        "chart" => {
            let id = parse_id(&args);
            let mut top = None;
            let mut html_out = None;
            for arg in &args[3..] {
                if let Some(v) = arg.strip_prefix("--top=") {
                    top = Some(v.parse().context("--top must be a number")?);
                } else if arg == "--top" {
                    top = Some(cfg.top_bars);
                } else if let Some(v) = arg.strip_prefix("--html=") {
                    html_out = Some(PathBuf::from(v));
                } else if arg == "--html" {
                    html_out = Some(cfg.report_dir.join(format!("result_{}.html", id)));
                }
            }
            let backend = kind.build(&cfg)?;
            cmd_chart(&*backend, id, top, html_out).await
        }
        "submit" => {
            let questions: Vec<&str> = args[2..]
                .iter()
                .filter_map(|a| a.strip_prefix("--question="))
                .collect();
            if questions.is_empty() {
                print_usage();
                std::process::exit(1);
            }
            let backend = kind.build(&cfg)?;
            cmd_submit(&*backend, &cfg, &questions).await
        }
        "download" => {
            let id = parse_id(&args);
            let out = args[3..]
                .iter()
                .find_map(|a| a.strip_prefix("--out="))
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(format!("results_{}.zip", id)));
            if kind != BackendKind::Http {
                bail!("download needs the HTTP backend (BACKEND=http)");
            }
            let backend = HttpBackend::new(&cfg)?;
            let bytes = backend.download_results(id).await?;
            std::fs::write(&out, &bytes).with_context(|| format!("writing {}", out.display()))?;
            println!("Wrote {} bytes to {}", bytes.len(), out.display());
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {}", args[1]);
            print_usage();
            std::process::exit(1);
        }
    }
}

async fn cmd_history(backend: &dyn Backend, cfg: &Config, page: usize) -> Result<()> {
    let view = dashboard::load_history(backend, &HistoryView::new(cfg.rows_per_page))
        .await
        .unwrap_or_else(|e| report(e))
        .apply(HistoryEvent::GoTo(page));
    print!("{}", text::history_table(&view));
    Ok(())
}

async fn cmd_chart(backend: &dyn Backend, id: u64, top: Option<usize>, html_out: Option<PathBuf>) -> Result<()> {
    // The detail card is optional on this page; the chart still renders without it.
    let detail = match dashboard::load_result(backend, id).await {
        Ok(d) => Some(d),
        Err(e) => {
            eprintln!("{}", e);
            None
        }
    };
    let comparison = dashboard::load_comparison(backend, id).await.unwrap_or_else(|e| report(e));

    if let Some(d) = &detail {
        print!("{}", text::result_detail(d));
        println!();
    }
    print!("{}", text::comparison_chart(&comparison, BAR_WIDTH));
    if let Some(row) = &comparison.index_row {
        println!();
        print!("{}", text::index_row(row));
    }
    println!();
    print!(
        "{}",
        text::feature_charts(&comparison.features, &comparison.datasets.colors, top, BAR_WIDTH)
    );

    if let Some(path) = html_out {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        let page = html::render_report(detail.as_ref(), &comparison, top, &ts_now());
        std::fs::write(&path, page).with_context(|| format!("writing {}", path.display()))?;
        log(
            Level::Info,
            Domain::Render,
            "report_written",
            obj(&[("result_id", json!(id)), ("path", v_str(&path.to_string_lossy()))]),
        );
        println!("Report: {}", path.display());
    }
    Ok(())
}

async fn cmd_submit(backend: &dyn Backend, cfg: &Config, questions: &[&str]) -> Result<()> {
    // Form ids continue from the recorded history; an unreachable history numbers from 1.
    let history_len = match dashboard::load_history(backend, &HistoryView::new(cfg.rows_per_page)).await {
        Ok(view) => view.len(),
        Err(_) => 0,
    };

    let mut batch = FormBatch::new(history_len);
    for (i, q) in questions.iter().enumerate() {
        let (dep, indep) = q
            .split_once(':')
            .with_context(|| format!("--question={} is not DEP:IND1,IND2", q))?;
        if i > 0 {
            batch = batch.apply(FormEvent::AddForm).apply(FormEvent::NextPage);
        }
        batch = batch
            .apply(FormEvent::SetDependent { slot: 0, text: dep.to_string() })
            .apply(FormEvent::SetIndependents { slot: 0, text: indep.to_string() });
    }

    let submission = dashboard::submit(backend, &batch).await.unwrap_or_else(|e| report(e));
    println!("{}", submission.receipt.message);
    for q in &submission.receipt.processed_questions {
        println!(
            "  #{} {} ~ {} [{}]",
            q.id,
            q.dependent_var,
            q.independent_vars.join(", "),
            q.status
        );
    }
    Ok(())
}
