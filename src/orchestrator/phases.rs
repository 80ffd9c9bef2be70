use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::thread_rng;
use tokio::sync::Semaphore;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::AppResult;
use crate::transport::Connector;
use crate::worker::{TrafficWorker, WorkerHandle, WorkerPhase, WorkerReport, jittered_interval};

use super::settings::{HEARTBEAT_INTERVAL, RunSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Elapsed,
    Interrupted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Elapsed => f.write_str("duration elapsed"),
            StopReason::Interrupted => f.write_str("interrupted"),
        }
    }
}

fn worker_intervals(settings: &RunSettings) -> Vec<Duration> {
    let mut rng = thread_rng();
    (0..settings.workers)
        .map(|_| jittered_interval(settings.interval, settings.jitter_ms, &mut rng))
        .collect()
}

/// Connects every worker, at most `max_connects` at a time, and returns once
/// all attempts have finished. Workers that failed to connect are returned
/// too so they are reported.
pub(super) async fn init_workers(
    settings: &RunSettings,
    connector: &Arc<dyn Connector>,
) -> AppResult<Vec<TrafficWorker>> {
    let permits = Arc::new(Semaphore::new(settings.max_connects));
    let mut tasks = Vec::with_capacity(settings.workers);

    for (offset, interval) in worker_intervals(settings).into_iter().enumerate() {
        let permits = Arc::clone(&permits);
        let connector = Arc::clone(connector);
        tasks.push(tokio::spawn(async move {
            let mut worker = TrafficWorker::new(offset.saturating_add(1), interval);
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => Some(permit),
                Err(err) => {
                    warn!(worker = worker.identity(), error = %err, "Connect limiter closed");
                    None
                }
            };
            if let Err(err) = worker.init(connector.as_ref()).await {
                warn!(worker = worker.identity(), error = %err, "Connect failed");
            }
            worker
        }));
    }

    let mut workers = Vec::with_capacity(tasks.len());
    for task in tasks {
        workers.push(task.await?);
    }
    Ok(workers)
}

fn log_heartbeat(handles: &[WorkerHandle], started: Instant) {
    let mut sent: u64 = 0;
    let mut recv: u64 = 0;
    let mut error_count: usize = 0;
    for handle in handles {
        let counters = handle.counters();
        sent = sent.saturating_add(counters.sent());
        recv = recv.saturating_add(counters.received());
        if counters.exit_code().is_abnormal() {
            error_count = error_count.saturating_add(1);
        }
    }
    info!(
        sent,
        recv,
        error_count,
        seconds = started.elapsed().as_secs(),
        "Heartbeat"
    );
}

/// Waits for the run duration or the interrupt, whichever comes first,
/// logging aggregate counters every second.
pub(super) async fn master_loop(
    handles: &[WorkerHandle],
    duration: Duration,
    interrupt: &CancellationToken,
) -> StopReason {
    let started = Instant::now();
    let deadline = tokio::time::sleep(duration);
    tokio::pin!(deadline);
    let first_beat = started
        .checked_add(HEARTBEAT_INTERVAL)
        .unwrap_or_else(Instant::now);
    let mut heartbeat = interval_at(first_beat, HEARTBEAT_INTERVAL);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = interrupt.cancelled() => return StopReason::Interrupted,
            () = &mut deadline => return StopReason::Elapsed,
            _ = heartbeat.tick() => log_heartbeat(handles, started),
        }
    }
}

/// Stops every worker concurrently: stop sending, let receipts drain for
/// `grace`, then shut down and collect the report. Reports keep the order of
/// `handles`.
pub(super) async fn stop_workers(
    handles: Vec<WorkerHandle>,
    grace: Duration,
) -> AppResult<Vec<WorkerReport>> {
    let mut tasks = Vec::with_capacity(handles.len());
    for handle in handles {
        tasks.push(tokio::spawn(async move {
            handle.stop_sending();
            if handle.counters().phase() != WorkerPhase::Stopped {
                tokio::time::sleep(grace).await;
            }
            handle.shutdown().await
        }));
    }

    let mut reports = Vec::with_capacity(tasks.len());
    for task in tasks {
        reports.push(task.await?);
    }
    Ok(reports)
}
