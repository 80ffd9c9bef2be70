use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::{Event, correlation_id};
use crate::error::TransportError;
use crate::transport::{FrameSink, FrameStream, decode_correlation_id, encode_probe};

use super::WorkerReport;
use super::state::{ExitCode, WorkerCounters, WorkerPhase};

pub(super) enum Inbound {
    Receipt {
        correlation_id: String,
        received_at_ms: i64,
    },
    Failed(TransportError),
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Owns the event list and the outbound half of the connection.
pub(super) struct ControlLoop {
    pub(super) identity: String,
    pub(super) name: String,
    pub(super) interval: Duration,
    pub(super) counters: Arc<WorkerCounters>,
    pub(super) outbound: Box<dyn FrameSink>,
    pub(super) receipts: mpsc::Receiver<Inbound>,
    pub(super) receiver: JoinHandle<()>,
    pub(super) recv_cancel: CancellationToken,
    pub(super) send_stop: CancellationToken,
    pub(super) shutdown: CancellationToken,
    pub(super) events: Vec<Event>,
    pub(super) seq: u64,
}

impl ControlLoop {
    pub(super) async fn run(mut self) -> WorkerReport {
        self.counters.set_phase(WorkerPhase::Running);
        let first_tick = Instant::now()
            .checked_add(self.interval)
            .unwrap_or_else(Instant::now);
        let mut ticker = interval_at(first_tick, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut sending = true;

        let code = loop {
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => break ExitCode::Normal,
                () = self.send_stop.cancelled(), if sending => {
                    sending = false;
                    self.counters.set_phase(WorkerPhase::Draining);
                    debug!(worker = %self.identity, sent = self.counters.sent(), "Stopped sending");
                }
                _ = ticker.tick(), if sending => {
                    if let Err(err) = self.send_probe().await {
                        warn!(worker = %self.identity, error = %err, "Send failed");
                        break ExitCode::SendError;
                    }
                }
                inbound = self.receipts.recv() => match inbound {
                    Some(Inbound::Receipt { correlation_id, received_at_ms }) => {
                        self.record_receipt(correlation_id, received_at_ms);
                    }
                    Some(Inbound::Failed(err)) => {
                        warn!(worker = %self.identity, error = %err, "Receive failed");
                        break ExitCode::RecvError;
                    }
                    None => break ExitCode::RecvError,
                },
            }
        };

        self.finish(code).await
    }

    async fn send_probe(&mut self) -> Result<(), TransportError> {
        let seq = self.seq.saturating_add(1);
        let cid = correlation_id(&self.identity, seq);
        let frame = encode_probe(&cid)?;
        self.outbound.send(frame).await?;
        self.seq = seq;
        self.counters.record_sent();
        debug!(worker = %self.identity, cid = %cid, "Record sent");
        self.events.push(Event::outbound(&self.identity, now_ms(), cid));
        Ok(())
    }

    fn record_receipt(&mut self, correlation_id: String, received_at_ms: i64) {
        self.counters.record_received();
        debug!(worker = %self.identity, cid = %correlation_id, "Record received");
        self.events
            .push(Event::inbound(&self.identity, received_at_ms, correlation_id));
    }

    async fn finish(mut self, code: ExitCode) -> WorkerReport {
        let code = self.counters.finish(code);
        self.recv_cancel.cancel();
        self.outbound.close().await;

        // Receipts that were already queued still count.
        self.receipts.close();
        while let Ok(inbound) = self.receipts.try_recv() {
            if let Inbound::Receipt {
                correlation_id,
                received_at_ms,
            } = inbound
            {
                self.record_receipt(correlation_id, received_at_ms);
            }
        }
        if let Err(err) = (&mut self.receiver).await {
            warn!(worker = %self.identity, error = %err, "Receive task failed");
        }

        self.counters.set_phase(WorkerPhase::Stopped);
        if code.is_abnormal() {
            warn!(worker = %self.identity, code = %code, "Worker shut down early");
        } else {
            debug!(worker = %self.identity, code = %code, "Worker stopped");
        }

        WorkerReport {
            identity: self.identity,
            name: self.name,
            sent: self.counters.sent(),
            received: self.counters.received(),
            exit_code: code,
            events: self.events,
        }
    }
}

/// Reads frames until cancelled or the connection fails.
pub(super) async fn receive_loop(
    identity: String,
    mut inbound: Box<dyn FrameStream>,
    receipts: mpsc::Sender<Inbound>,
    cancel: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            next = inbound.recv() => next,
        };
        let frame = match next {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                if !cancel.is_cancelled() {
                    drop(receipts.send(Inbound::Failed(TransportError::Closed)).await);
                }
                return;
            }
            Err(err) => {
                if !cancel.is_cancelled() {
                    drop(receipts.send(Inbound::Failed(err)).await);
                }
                return;
            }
        };
        let received_at_ms = now_ms();
        match decode_correlation_id(&frame) {
            Ok(Some(correlation_id)) => {
                let receipt = Inbound::Receipt {
                    correlation_id,
                    received_at_ms,
                };
                if receipts.send(receipt).await.is_err() {
                    return;
                }
            }
            Ok(None) => {}
            Err(err) => {
                warn!(worker = %identity, error = %err, "Dropping malformed payload");
            }
        }
    }
}
