use super::percentiles::{LatencyStats, format_x100};

pub const KEY_P15: &str = "P15_Latency(msec)";
pub const KEY_P25: &str = "P25_Latency(msec)";
pub const KEY_P50: &str = "P50_Latency(msec)";
pub const KEY_P75: &str = "P75_Latency(msec)";
pub const KEY_P90: &str = "P90_Latency(msec)";
pub const KEY_P95: &str = "P95_Latency(msec)";
pub const KEY_P99: &str = "P99_Latency(msec)";
pub const KEY_AVG: &str = "Avg_Latency(msec)";
pub const KEY_TOTAL_SENT: &str = "Total_Sent";
pub const KEY_TOTAL_RECV: &str = "Total_Recv";
pub const KEY_TOTAL_MISSING: &str = "Total_Missing";
pub const KEY_TOTAL_ERROR_CLIENT: &str = "Total_Error_Client";
pub const KEY_MISSING_GROUPS: &str = "Total_Missing_Groups";
pub const KEY_CLOCK_ANOMALY: &str = "Total_Clock_Anomaly";
pub const KEY_ORPHAN_GROUPS: &str = "Total_Orphan_Groups";

/// Aggregate result of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total_sent: u64,
    pub total_recv: u64,
    /// `expected_receivers * total_sent - total_recv`.
    pub total_missing: i64,
    pub missing_groups: u64,
    pub error_clients: u64,
    pub clock_anomalies: u64,
    pub orphan_groups: u64,
    pub latency: LatencyStats,
}

impl RunSummary {
    /// Key/value pairs sorted by key.
    #[must_use]
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let latency = &self.latency;
        let mut entries = vec![
            (KEY_P15, format_x100(latency.p15_x100)),
            (KEY_P25, format_x100(latency.p25_x100)),
            (KEY_P50, format_x100(latency.p50_x100)),
            (KEY_P75, format_x100(latency.p75_x100)),
            (KEY_P90, format_x100(latency.p90_x100)),
            (KEY_P95, format_x100(latency.p95_x100)),
            (KEY_P99, format_x100(latency.p99_x100)),
            (KEY_AVG, format_x100(latency.avg_x100)),
            (KEY_TOTAL_SENT, self.total_sent.to_string()),
            (KEY_TOTAL_RECV, self.total_recv.to_string()),
            (KEY_TOTAL_MISSING, self.total_missing.to_string()),
            (KEY_TOTAL_ERROR_CLIENT, self.error_clients.to_string()),
            (KEY_MISSING_GROUPS, self.missing_groups.to_string()),
            (KEY_CLOCK_ANOMALY, self.clock_anomalies.to_string()),
            (KEY_ORPHAN_GROUPS, self.orphan_groups.to_string()),
        ];
        entries.sort_unstable_by(|left, right| left.0.cmp(right.0));
        entries
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries()
            .into_iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value)
    }
}
