//! Latency analysis over the events collected from every worker.
//!
//! Events arrive in no particular order and from any worker. They are grouped
//! by correlation id; each group with a send and at least one receipt yields
//! one average latency, and the distribution of those averages is reported.
mod correlation;
mod percentiles;
mod summary;


use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::domain::{Direction, Event};

pub use correlation::{CorrelationGroup, Stamp};
pub use percentiles::{LatencyStats, format_x100, mean_x100, nearest_rank};
pub use summary::{
    KEY_AVG, KEY_CLOCK_ANOMALY, KEY_MISSING_GROUPS, KEY_ORPHAN_GROUPS, KEY_P15, KEY_P25, KEY_P50,
    KEY_P75, KEY_P90, KEY_P95, KEY_P99, KEY_TOTAL_ERROR_CLIENT, KEY_TOTAL_MISSING, KEY_TOTAL_RECV,
    KEY_TOTAL_SENT, RunSummary,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverLatency {
    pub participant_id: String,
    pub latency_ms: i64,
}

/// One row per correlation group that has a send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatencyDetail {
    pub correlation_id: String,
    pub sender: String,
    pub sent_at_ms: i64,
    /// `None` when nobody received the probe.
    pub average_latency_x100: Option<i64>,
    pub receivers: Vec<ReceiverLatency>,
    pub clock_anomaly: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingDelivery {
    pub correlation_id: String,
    pub sender: String,
    pub received: usize,
    pub absent: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub summary: RunSummary,
    pub details: Vec<LatencyDetail>,
    pub missing: Vec<MissingDelivery>,
    /// Correlation ids that were received but never recorded as sent.
    pub orphans: Vec<String>,
}

#[derive(Debug, Default)]
pub struct Analyst {
    groups: BTreeMap<String, CorrelationGroup>,
    total_sent: u64,
    total_recv: u64,
    error_clients: u64,
}

impl Analyst {
    #[must_use]
    pub fn new(error_clients: u64) -> Self {
        Self {
            error_clients,
            ..Self::default()
        }
    }

    /// Adds events to their correlation groups.
    pub fn ingest<I>(&mut self, events: I)
    where
        I: IntoIterator<Item = Event>,
    {
        for event in events {
            match event.direction {
                Direction::Out => {
                    self.total_sent = self.total_sent.saturating_add(1);
                }
                Direction::In => {
                    self.total_recv = self.total_recv.saturating_add(1);
                }
            }
            self.groups
                .entry(event.correlation_id.clone())
                .or_default()
                .add(event);
        }
    }

    #[must_use]
    pub fn group(&self, correlation_id: &str) -> Option<&CorrelationGroup> {
        self.groups.get(correlation_id)
    }

    /// Correlates sends with receipts.
    ///
    /// `expected_receivers` is the number of receipts a fully delivered probe
    /// has; `participant_ids` are all identities taking part in the run, used
    /// to name who missed a probe.
    #[must_use]
    pub fn analyze(&self, expected_receivers: usize, participant_ids: &[String]) -> Analysis {
        let participants: BTreeSet<&str> = participant_ids.iter().map(String::as_str).collect();
        let mut details = Vec::new();
        let mut missing = Vec::new();
        let mut orphans = Vec::new();
        let mut averages = Vec::new();
        let mut clock_anomalies: u64 = 0;

        for (correlation_id, group) in &self.groups {
            let Some(sent) = group.sent.as_ref() else {
                orphans.push(correlation_id.clone());
                continue;
            };
            if group.duplicate_sends > 0 {
                warn!(
                    cid = %correlation_id,
                    duplicates = group.duplicate_sends,
                    "Correlation id sent more than once"
                );
            }

            let receivers: Vec<ReceiverLatency> = group
                .sorted_receipts()
                .into_iter()
                .map(|receipt| ReceiverLatency {
                    participant_id: receipt.participant_id.clone(),
                    latency_ms: receipt.timestamp_ms.saturating_sub(sent.timestamp_ms),
                })
                .collect();
            let negative = receivers
                .iter()
                .filter(|receiver| receiver.latency_ms < 0)
                .count();
            if negative > 0 {
                warn!(cid = %correlation_id, negative, "Receipt precedes its send");
                clock_anomalies =
                    clock_anomalies.saturating_add(u64::try_from(negative).unwrap_or(u64::MAX));
            }

            let average_latency_x100 = if receivers.is_empty() {
                None
            } else {
                let latencies: Vec<i64> = receivers.iter().map(|r| r.latency_ms).collect();
                let average = mean_x100(&latencies);
                averages.push(average);
                Some(average)
            };

            if receivers.len() < expected_receivers {
                let reported: BTreeSet<&str> = receivers
                    .iter()
                    .map(|receiver| receiver.participant_id.as_str())
                    .collect();
                let absent = participants
                    .iter()
                    .filter(|id| **id != sent.participant_id && !reported.contains(*id))
                    .map(|id| (*id).to_owned())
                    .collect();
                missing.push(MissingDelivery {
                    correlation_id: correlation_id.clone(),
                    sender: sent.participant_id.clone(),
                    received: receivers.len(),
                    absent,
                });
            }

            details.push(LatencyDetail {
                correlation_id: correlation_id.clone(),
                sender: sent.participant_id.clone(),
                sent_at_ms: sent.timestamp_ms,
                average_latency_x100,
                clock_anomaly: negative > 0,
                receivers,
            });
        }

        if !orphans.is_empty() {
            warn!(count = orphans.len(), "Receipts without a recorded send");
        }

        let expected = i64::try_from(expected_receivers).unwrap_or(i64::MAX);
        let sent_count = i64::try_from(self.total_sent).unwrap_or(i64::MAX);
        let recv_count = i64::try_from(self.total_recv).unwrap_or(i64::MAX);
        let summary = RunSummary {
            total_sent: self.total_sent,
            total_recv: self.total_recv,
            total_missing: expected
                .saturating_mul(sent_count)
                .saturating_sub(recv_count),
            missing_groups: u64::try_from(missing.len()).unwrap_or(u64::MAX),
            error_clients: self.error_clients,
            clock_anomalies,
            orphan_groups: u64::try_from(orphans.len()).unwrap_or(u64::MAX),
            latency: LatencyStats::from_samples(averages),
        };

        Analysis {
            summary,
            details,
            missing,
            orphans,
        }
    }
}
