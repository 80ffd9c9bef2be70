//! Runs a fleet of traffic workers through connect, run, drain and report.
mod phases;
mod settings;

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::analysis::{Analysis, Analyst};
use crate::error::AppResult;
use crate::transport::Connector;
use crate::worker::{TrafficWorker, WorkerReport};

pub use phases::StopReason;
pub use settings::{
    DEFAULT_DRAIN_GRACE, DEFAULT_JITTER_MS, DEFAULT_MAX_CONNECTS, HEARTBEAT_INTERVAL, RunSettings,
};

/// Result of one completed run.
#[derive(Debug)]
pub struct RunOutcome {
    pub reports: Vec<WorkerReport>,
    pub analysis: Analysis,
    pub stop_reason: StopReason,
    pub elapsed: Duration,
}

impl RunOutcome {
    /// Workers that ended with a non-normal exit code.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.reports
            .iter()
            .filter(|report| report.exit_code.is_abnormal())
            .count()
    }
}

pub struct Orchestrator {
    settings: RunSettings,
    connector: Arc<dyn Connector>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(settings: RunSettings, connector: Arc<dyn Connector>) -> Self {
        Self {
            settings,
            connector,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Runs every phase and analyzes what the workers recorded.
    ///
    /// Worker failures never fail the run; they show up in the reports.
    ///
    /// # Errors
    ///
    /// Returns an error only when a phase task cannot be joined.
    pub async fn run(&self, interrupt: &CancellationToken) -> AppResult<RunOutcome> {
        let settings = &self.settings;
        let started = Instant::now();

        info!(
            workers = settings.workers,
            max_connects = settings.max_connects,
            "Connecting workers"
        );
        let workers = phases::init_workers(settings, &self.connector).await?;
        let connected = workers
            .iter()
            .filter(|worker| worker.is_connected())
            .count();
        info!(
            connected,
            failed = workers.len().saturating_sub(connected),
            "Connect phase finished"
        );

        let handles: Vec<_> = workers.into_iter().map(TrafficWorker::start).collect();
        info!(duration_secs = settings.duration.as_secs(), "Workers running");

        let stop_reason = phases::master_loop(&handles, settings.duration, interrupt).await;
        info!(
            reason = %stop_reason,
            grace_ms = u64::try_from(settings.drain_grace.as_millis()).unwrap_or(u64::MAX),
            "Stopping workers"
        );

        let reports = phases::stop_workers(handles, settings.drain_grace).await?;
        let analysis = analyze(settings.workers, &reports);
        let elapsed = started.elapsed();
        info!(
            sent = analysis.summary.total_sent,
            recv = analysis.summary.total_recv,
            errors = analysis.summary.error_clients,
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "Run finished"
        );

        Ok(RunOutcome {
            reports,
            analysis,
            stop_reason,
            elapsed,
        })
    }
}

/// Feeds every worker's events to a fresh analyst. Each probe is expected at
/// every configured worker except its sender.
fn analyze(workers: usize, reports: &[WorkerReport]) -> Analysis {
    let error_clients = reports
        .iter()
        .filter(|report| report.exit_code.is_abnormal())
        .count();
    let mut analyst = Analyst::new(u64::try_from(error_clients).unwrap_or(u64::MAX));
    for report in reports {
        analyst.ingest(report.events.iter().cloned());
    }
    let participants: Vec<String> = reports
        .iter()
        .map(|report| report.identity.clone())
        .collect();
    analyst.analyze(workers.saturating_sub(1), &participants)
}
