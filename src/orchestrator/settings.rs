use std::time::Duration;

/// Concurrent connection attempts allowed during the connect phase.
pub const DEFAULT_MAX_CONNECTS: usize = 50;
/// Time between `stop_sending` and shutdown, while receipts still drain.
pub const DEFAULT_DRAIN_GRACE: Duration = Duration::from_secs(5);
/// Per-worker random offset applied to the nominal send interval.
pub const DEFAULT_JITTER_MS: u64 = 4;
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub workers: usize,
    pub duration: Duration,
    pub interval: Duration,
    pub jitter_ms: u64,
    pub max_connects: usize,
    pub drain_grace: Duration,
}

impl RunSettings {
    #[must_use]
    pub const fn new(workers: usize, duration: Duration, interval: Duration) -> Self {
        Self {
            workers,
            duration,
            interval,
            jitter_ms: DEFAULT_JITTER_MS,
            max_connects: DEFAULT_MAX_CONNECTS,
            drain_grace: DEFAULT_DRAIN_GRACE,
        }
    }

    #[must_use]
    pub const fn with_jitter_ms(mut self, jitter_ms: u64) -> Self {
        self.jitter_ms = jitter_ms;
        self
    }

    /// Zero is raised to one so the connect phase can make progress.
    #[must_use]
    pub fn with_max_connects(mut self, max_connects: usize) -> Self {
        self.max_connects = max_connects.max(1);
        self
    }

    #[must_use]
    pub const fn with_drain_grace(mut self, drain_grace: Duration) -> Self {
        self.drain_grace = drain_grace;
        self
    }
}
