//! Traffic worker: one simulated client.
//!
//! A worker connects once, then runs two tasks until it stops: a control
//! task that sends a probe on every tick and owns the event list, and a
//! receive task that reads broadcasts and forwards their correlation ids to
//! the control task through a bounded queue. Any send or receive failure is
//! final for the worker.
mod run;
mod state;


use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::domain::Event;
use crate::error::TransportError;
use crate::transport::{Connection, Connector};

use run::{ControlLoop, receive_loop};

pub use state::{ExitCode, WorkerCounters, WorkerPhase};

/// Receipts buffered between the receive task and the control task.
const RECEIPT_QUEUE_CAPACITY: usize = 1000;
/// Lower bound for a jittered send interval.
const MIN_INTERVAL_MS: u64 = 1;

/// Identity a worker connects with, `index` starting at 1.
#[must_use]
pub fn worker_identity(index: usize) -> String {
    format!("sync-worker-{}", index)
}

/// Applies a uniform random offset in `[-jitter_ms, +jitter_ms]` to `nominal`
/// so workers sharing an interval do not tick in lockstep.
pub fn jittered_interval<R>(nominal: Duration, jitter_ms: u64, rng: &mut R) -> Duration
where
    R: Rng + ?Sized,
{
    let nominal_ms = u64::try_from(nominal.as_millis()).unwrap_or(u64::MAX);
    let jitter = i64::try_from(jitter_ms).unwrap_or(i64::MAX);
    let offset = if jitter == 0 {
        0
    } else {
        rng.gen_range(jitter.saturating_neg()..=jitter)
    };
    let interval_ms = if offset < 0 {
        nominal_ms.saturating_sub(offset.unsigned_abs())
    } else {
        nominal_ms.saturating_add(offset.unsigned_abs())
    };
    Duration::from_millis(interval_ms.max(MIN_INTERVAL_MS))
}

/// Everything a worker recorded, handed over once it has stopped.
#[derive(Debug, Clone)]
pub struct WorkerReport {
    pub identity: String,
    pub name: String,
    pub sent: u64,
    pub received: u64,
    pub exit_code: ExitCode,
    pub events: Vec<Event>,
}

impl WorkerReport {
    fn from_counters(identity: String, name: String, counters: &WorkerCounters) -> Self {
        Self {
            identity,
            name,
            sent: counters.sent(),
            received: counters.received(),
            exit_code: counters.exit_code(),
            events: Vec::new(),
        }
    }
}

pub struct TrafficWorker {
    identity: String,
    name: String,
    interval: Duration,
    counters: Arc<WorkerCounters>,
    connection: Option<Connection>,
}

impl TrafficWorker {
    #[must_use]
    pub fn new(index: usize, interval: Duration) -> Self {
        Self {
            identity: worker_identity(index),
            name: format!("#{}", index),
            interval,
            counters: Arc::new(WorkerCounters::default()),
            connection: None,
        }
    }

    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn counters(&self) -> Arc<WorkerCounters> {
        Arc::clone(&self.counters)
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Connects the worker.
    ///
    /// # Errors
    ///
    /// Returns the transport error when the connection cannot be opened; the
    /// worker is then finished with [`ExitCode::ConnectError`] and never runs.
    pub async fn init(&mut self, connector: &dyn Connector) -> Result<(), TransportError> {
        match connector.connect(&self.identity).await {
            Ok(connection) => {
                self.connection = Some(connection);
                self.counters.set_phase(WorkerPhase::Connected);
                Ok(())
            }
            Err(err) => {
                self.counters.finish(ExitCode::ConnectError);
                self.counters.set_phase(WorkerPhase::Stopped);
                Err(err)
            }
        }
    }

    /// Starts the send and receive tasks.
    ///
    /// A worker that never connected gets a handle whose report is available
    /// immediately.
    #[must_use]
    pub fn start(self) -> WorkerHandle {
        let send_stop = CancellationToken::new();
        let shutdown = CancellationToken::new();
        let TrafficWorker {
            identity,
            name,
            interval,
            counters,
            connection,
        } = self;

        let task = match connection {
            Some(Connection { outbound, inbound }) => {
                let (receipt_tx, receipt_rx) = mpsc::channel(RECEIPT_QUEUE_CAPACITY);
                let recv_cancel = CancellationToken::new();
                let receiver = tokio::spawn(receive_loop(
                    identity.clone(),
                    inbound,
                    receipt_tx,
                    recv_cancel.clone(),
                ));
                let control = ControlLoop {
                    identity: identity.clone(),
                    name: name.clone(),
                    interval,
                    counters: Arc::clone(&counters),
                    outbound,
                    receipts: receipt_rx,
                    receiver,
                    recv_cancel,
                    send_stop: send_stop.clone(),
                    shutdown: shutdown.clone(),
                    events: Vec::new(),
                    seq: 0,
                };
                tokio::spawn(control.run())
            }
            None => {
                counters.set_phase(WorkerPhase::Stopped);
                let report = WorkerReport::from_counters(identity.clone(), name.clone(), &counters);
                tokio::spawn(async move { report })
            }
        };

        WorkerHandle {
            identity,
            name,
            counters,
            send_stop,
            shutdown,
            task,
        }
    }
}

/// Control surface of a running worker.
pub struct WorkerHandle {
    identity: String,
    name: String,
    counters: Arc<WorkerCounters>,
    send_stop: CancellationToken,
    shutdown: CancellationToken,
    task: JoinHandle<WorkerReport>,
}

impl WorkerHandle {
    #[must_use]
    pub fn counters(&self) -> Arc<WorkerCounters> {
        Arc::clone(&self.counters)
    }

    /// Stops sending probes. Inbound broadcasts keep being recorded.
    pub fn stop_sending(&self) {
        self.send_stop.cancel();
    }

    /// Stops the worker with [`ExitCode::Normal`] and waits for its report.
    /// A worker that already failed keeps its failure code.
    pub async fn shutdown(self) -> WorkerReport {
        let WorkerHandle {
            identity,
            name,
            counters,
            shutdown,
            task,
            ..
        } = self;
        shutdown.cancel();
        match task.await {
            Ok(report) => report,
            Err(err) => {
                warn!(worker = %identity, error = %err, "Worker task ended without a report");
                counters.finish(ExitCode::Aborted);
                counters.set_phase(WorkerPhase::Stopped);
                WorkerReport::from_counters(identity, name, &counters)
            }
        }
    }
}
