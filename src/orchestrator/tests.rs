use super::*;
use crate::error::{AppError, AppResult, TransportError};
use crate::transport::{Connection, FrameSink, HubFault, MemoryHub};
use crate::worker::ExitCode;
use async_trait::async_trait;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

const GRACE: Duration = Duration::from_millis(200);
const CONNECT_DELAY: Duration = Duration::from_millis(20);

fn run_async_test<F>(future: F) -> AppResult<()>
where
    F: Future<Output = AppResult<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::validation(format!("Failed to build runtime: {}", err)))?;
    runtime.block_on(future)
}

/// One probe per worker: first tick at 600ms, stop at 1s.
fn one_probe_settings(workers: usize) -> RunSettings {
    RunSettings::new(
        workers,
        Duration::from_secs(1),
        Duration::from_millis(600),
    )
    .with_jitter_ms(0)
    .with_drain_grace(GRACE)
}

fn orchestrator(settings: RunSettings, hub: &MemoryHub) -> Orchestrator {
    Orchestrator::new(settings, Arc::new(hub.clone()))
}

#[derive(Debug, Default)]
struct ConnectGauge {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    done: AtomicUsize,
    early_sends: AtomicUsize,
}

/// Slow connector over a [`MemoryHub`] that tracks concurrent connects and
/// sends issued before every worker finished connecting.
struct GaugedConnector {
    hub: MemoryHub,
    gauge: Arc<ConnectGauge>,
    workers: usize,
}

#[async_trait]
impl Connector for GaugedConnector {
    async fn connect(&self, identity: &str) -> Result<Connection, TransportError> {
        let in_flight = self
            .gauge
            .in_flight
            .fetch_add(1, Ordering::SeqCst)
            .saturating_add(1);
        self.gauge.peak.fetch_max(in_flight, Ordering::SeqCst);
        tokio::time::sleep(CONNECT_DELAY).await;
        let connected = self.hub.connect(identity).await;
        self.gauge.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.gauge.done.fetch_add(1, Ordering::SeqCst);

        let Connection { outbound, inbound } = connected?;
        Ok(Connection {
            outbound: Box::new(GaugedSink {
                inner: outbound,
                gauge: Arc::clone(&self.gauge),
                workers: self.workers,
            }),
            inbound,
        })
    }
}

struct GaugedSink {
    inner: Box<dyn FrameSink>,
    gauge: Arc<ConnectGauge>,
    workers: usize,
}

#[async_trait]
impl FrameSink for GaugedSink {
    async fn send(&mut self, frame: Vec<u8>) -> Result<(), TransportError> {
        if self.gauge.done.load(Ordering::SeqCst) < self.workers {
            self.gauge.early_sends.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.send(frame).await
    }

    async fn close(&mut self) {
        self.inner.close().await;
    }
}

async fn gauged_run(settings: RunSettings) -> AppResult<(RunOutcome, Arc<ConnectGauge>)> {
    let gauge = Arc::new(ConnectGauge::default());
    let connector = GaugedConnector {
        hub: MemoryHub::new(),
        gauge: Arc::clone(&gauge),
        workers: settings.workers,
    };
    let outcome = Orchestrator::new(settings, Arc::new(connector))
        .run(&CancellationToken::new())
        .await?;
    Ok((outcome, gauge))
}

fn short_run(workers: usize) -> RunSettings {
    RunSettings::new(workers, Duration::from_millis(300), Duration::from_millis(100))
        .with_jitter_ms(0)
        .with_drain_grace(Duration::from_millis(50))
}

#[test]
fn settings_defaults() -> AppResult<()> {
    let settings = RunSettings::new(10, Duration::from_secs(30), Duration::from_millis(100));
    if settings.max_connects != 50 || settings.jitter_ms != 4 {
        return Err(AppError::validation("Unexpected default limits"));
    }
    if settings.drain_grace != Duration::from_secs(5) {
        return Err(AppError::validation("Unexpected default grace"));
    }
    if settings.with_max_connects(0).max_connects != 1 {
        return Err(AppError::validation("Connect limit must stay positive"));
    }
    Ok(())
}

#[test]
fn full_delivery_between_three_workers() -> AppResult<()> {
    run_async_test(async {
        let hub = MemoryHub::new();
        let outcome = orchestrator(one_probe_settings(3), &hub)
            .run(&CancellationToken::new())
            .await?;
        let summary = &outcome.analysis.summary;

        if outcome.stop_reason != StopReason::Elapsed {
            return Err(AppError::validation("Run should end on its duration"));
        }
        if summary.total_sent != 3 || summary.total_recv != 6 || summary.total_missing != 0 {
            return Err(AppError::validation(format!(
                "Unexpected totals: {:?}",
                summary
            )));
        }
        if outcome.error_count() != 0 || summary.error_clients != 0 {
            return Err(AppError::validation("No worker should fail"));
        }
        if hub.peer_count() != 0 {
            return Err(AppError::validation("Connections left open after the run"));
        }
        let identities: Vec<&str> = outcome
            .reports
            .iter()
            .map(|report| report.identity.as_str())
            .collect();
        if identities != ["sync-worker-1", "sync-worker-2", "sync-worker-3"] {
            return Err(AppError::validation(format!(
                "Unexpected report order: {:?}",
                identities
            )));
        }
        Ok(())
    })
}

#[test]
fn refused_worker_is_counted_and_missing_everywhere() -> AppResult<()> {
    run_async_test(async {
        let hub = MemoryHub::new();
        hub.inject("sync-worker-3", HubFault::RefuseConnect);
        let outcome = orchestrator(one_probe_settings(3), &hub)
            .run(&CancellationToken::new())
            .await?;
        let analysis = &outcome.analysis;

        if analysis.summary.error_clients != 1 || analysis.summary.total_sent != 2 {
            return Err(AppError::validation(format!(
                "Unexpected summary: {:?}",
                analysis.summary
            )));
        }
        if analysis.summary.total_missing != 2 || analysis.missing.len() != 2 {
            return Err(AppError::validation("Both probes should miss one receiver"));
        }
        if analysis
            .missing
            .iter()
            .any(|missing| missing.absent != ["sync-worker-3"])
        {
            return Err(AppError::validation(format!(
                "Unexpected absent receivers: {:?}",
                analysis.missing
            )));
        }
        let refused = outcome
            .reports
            .iter()
            .find(|report| report.identity == "sync-worker-3")
            .ok_or_else(|| AppError::validation("Missing report for refused worker"))?;
        if refused.exit_code != ExitCode::ConnectError {
            return Err(AppError::validation("Refused worker must report ConnectError"));
        }
        Ok(())
    })
}

#[test]
fn receive_failure_only_affects_its_worker() -> AppResult<()> {
    run_async_test(async {
        let hub = MemoryHub::new();
        hub.inject("sync-worker-2", HubFault::FailReceiveAfterSend);
        let outcome = orchestrator(one_probe_settings(3), &hub)
            .run(&CancellationToken::new())
            .await?;
        let analysis = &outcome.analysis;

        if analysis.summary.error_clients != 1 || analysis.summary.total_sent != 3 {
            return Err(AppError::validation(format!(
                "Failed worker's probe must still count: {:?}",
                analysis.summary
            )));
        }
        for missing in &analysis.missing {
            if missing.absent != ["sync-worker-2"] {
                return Err(AppError::validation(format!(
                    "Only the failed worker may be absent: {:?}",
                    missing
                )));
            }
        }
        if analysis.missing.len() != 2 || analysis.summary.total_missing != 2 {
            return Err(AppError::validation(format!(
                "Both peer probes must miss the failed worker: {:?}",
                analysis.missing
            )));
        }
        if analysis.summary.total_recv != 4 {
            return Err(AppError::validation(format!(
                "Unexpected receipts: {}",
                analysis.summary.total_recv
            )));
        }
        let own_probe_missing = analysis
            .missing
            .iter()
            .any(|missing| missing.sender == "sync-worker-2");
        if own_probe_missing {
            return Err(AppError::validation("Peers must receive the failed worker's probe"));
        }
        Ok(())
    })
}

#[test]
fn connect_attempts_never_exceed_default_limit() -> AppResult<()> {
    run_async_test(async {
        let (outcome, gauge) = gauged_run(short_run(120)).await?;

        let peak = gauge.peak.load(Ordering::SeqCst);
        if peak != DEFAULT_MAX_CONNECTS {
            return Err(AppError::validation(format!(
                "Expected {} concurrent connects, saw {}",
                DEFAULT_MAX_CONNECTS, peak
            )));
        }
        if gauge.done.load(Ordering::SeqCst) != 120 || outcome.reports.len() != 120 {
            return Err(AppError::validation("Every worker must connect and report"));
        }
        if outcome.error_count() != 0 {
            return Err(AppError::validation("No worker should fail"));
        }
        Ok(())
    })
}

#[test]
fn every_connect_finishes_before_the_first_send() -> AppResult<()> {
    run_async_test(async {
        let (outcome, gauge) = gauged_run(short_run(8).with_max_connects(3)).await?;

        let peak = gauge.peak.load(Ordering::SeqCst);
        if peak != 3 {
            return Err(AppError::validation(format!(
                "Expected 3 concurrent connects, saw {}",
                peak
            )));
        }
        if outcome.analysis.summary.total_sent == 0 {
            return Err(AppError::validation("Workers should have sent probes"));
        }
        let early = gauge.early_sends.load(Ordering::SeqCst);
        if early != 0 {
            return Err(AppError::validation(format!(
                "{} probes were sent while workers were still connecting",
                early
            )));
        }
        Ok(())
    })
}

#[test]
fn interrupt_ends_run_early() -> AppResult<()> {
    run_async_test(async {
        let hub = MemoryHub::new();
        let settings = RunSettings::new(2, Duration::from_secs(30), Duration::from_millis(20))
            .with_drain_grace(Duration::from_millis(50));
        let interrupt = CancellationToken::new();
        let trigger = interrupt.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            trigger.cancel();
        });

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            orchestrator(settings, &hub).run(&interrupt),
        )
        .await
        .map_err(|err| AppError::validation(format!("Run ignored the interrupt: {}", err)))??;

        if outcome.stop_reason != StopReason::Interrupted {
            return Err(AppError::validation("Expected an interrupted run"));
        }
        if outcome
            .reports
            .iter()
            .any(|report| report.exit_code != ExitCode::Normal)
        {
            return Err(AppError::validation("Interrupted workers exit normally"));
        }
        Ok(())
    })
}

#[test]
fn stop_is_bounded_by_grace_after_failures() -> AppResult<()> {
    run_async_test(async {
        let hub = MemoryHub::new();
        hub.inject("sync-worker-1", HubFault::FailSend);
        hub.inject("sync-worker-2", HubFault::FailReceiveAfterSend);
        let settings = RunSettings::new(4, Duration::from_millis(300), Duration::from_millis(30))
            .with_drain_grace(GRACE);

        let started = Instant::now();
        let outcome = orchestrator(settings, &hub)
            .run(&CancellationToken::new())
            .await?;
        let elapsed = started.elapsed();

        if elapsed > Duration::from_millis(1_500) {
            return Err(AppError::validation(format!(
                "Stop took too long: {:?}",
                elapsed
            )));
        }
        if outcome.error_count() != 2 {
            return Err(AppError::validation(format!(
                "Expected two failed workers, got {}",
                outcome.error_count()
            )));
        }
        if hub.peer_count() != 0 {
            return Err(AppError::validation("Connections left open after the run"));
        }
        Ok(())
    })
}
