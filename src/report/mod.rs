//! CSV reports for a finished run.
//!
//! Every run gets its own directory under the output root. It holds the run
//! configuration, one raw event file per worker, the per-probe latency and
//! missing-delivery tables, and the summary.
mod rows;


use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info};

use crate::analysis::RunSummary;
use crate::error::ReportError;
use crate::orchestrator::{RunOutcome, RunSettings};

use rows::{
    CONFIG_HEADER, EVENTS_HEADER, LATENCY_HEADER, MISSING_HEADER, RESULT_HEADER, config_rows,
    event_row, latency_row, missing_row, result_rows,
};

pub use rows::summary_lines;

pub const CONFIG_FILE: &str = "config.csv";
pub const LATENCY_FILE: &str = "latency.csv";
pub const MISSING_FILE: &str = "missing.csv";
pub const RESULT_FILE: &str = "result.csv";

/// `n<workers>-<secs>s-<MMDD-HHMMSS>`.
#[must_use]
pub fn run_dir_name(workers: usize, duration_secs: u64, started_at: &DateTime<Local>) -> String {
    format!(
        "n{}-{}s-{}",
        workers,
        duration_secs,
        started_at.format("%m%d-%H%M%S")
    )
}

/// Creates the directory for this run below `root`.
///
/// # Errors
///
/// Returns an error when the directory cannot be created.
pub async fn create_run_dir(root: &Path, settings: &RunSettings) -> Result<PathBuf, ReportError> {
    let dir = root.join(run_dir_name(
        settings.workers,
        settings.duration.as_secs(),
        &Local::now(),
    ));
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|err| ReportError::CreateOutputDir {
            path: dir.clone(),
            source: err,
        })?;
    debug!(path = %dir.display(), "Created run directory");
    Ok(dir)
}

async fn write_csv(path: &Path, header: &str, rows: &[String]) -> Result<(), ReportError> {
    let wrap = |err: std::io::Error| ReportError::WriteFile {
        path: path.to_path_buf(),
        source: err,
    };
    let file = tokio::fs::File::create(path).await.map_err(wrap)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(header.as_bytes()).await.map_err(wrap)?;
    writer.write_all(b"\n").await.map_err(wrap)?;
    for row in rows {
        writer.write_all(row.as_bytes()).await.map_err(wrap)?;
        writer.write_all(b"\n").await.map_err(wrap)?;
    }
    writer.flush().await.map_err(wrap)?;
    Ok(())
}

/// Writes every report file of a run into `dir`.
///
/// # Errors
///
/// Returns the first file that could not be written.
pub async fn write_reports(
    dir: &Path,
    settings: &RunSettings,
    outcome: &RunOutcome,
) -> Result<(), ReportError> {
    let config = config_rows(settings, &outcome.reports);
    write_csv(&dir.join(CONFIG_FILE), CONFIG_HEADER, &config).await?;

    for report in &outcome.reports {
        let rows: Vec<String> = report.events.iter().map(event_row).collect();
        let path = dir.join(format!("{}.csv", report.identity));
        write_csv(&path, EVENTS_HEADER, &rows).await?;
    }

    let analysis = &outcome.analysis;
    let latency: Vec<String> = analysis.details.iter().map(latency_row).collect();
    write_csv(&dir.join(LATENCY_FILE), LATENCY_HEADER, &latency).await?;

    let missing: Vec<String> = analysis.missing.iter().map(missing_row).collect();
    write_csv(&dir.join(MISSING_FILE), MISSING_HEADER, &missing).await?;

    write_csv(
        &dir.join(RESULT_FILE),
        RESULT_HEADER,
        &result_rows(&analysis.summary),
    )
    .await?;

    info!(
        path = %dir.display(),
        files = outcome.reports.len().saturating_add(4),
        "Reports written"
    );
    Ok(())
}

pub fn print_summary(summary: &RunSummary, dir: &Path) {
    for line in summary_lines(summary) {
        println!("{}", line);
    }
    println!("Output: {}", dir.display());
}
