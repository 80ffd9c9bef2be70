use std::fmt;

/// Which side of a probe an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Direction {
    Out,
    In,
}

impl Direction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Out => "OUT",
            Direction::In => "IN",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single timestamped send or receipt, owned by the worker that observed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub participant_id: String,
    pub timestamp_ms: i64,
    pub direction: Direction,
    pub correlation_id: String,
}

impl Event {
    #[must_use]
    pub fn outbound(participant_id: &str, timestamp_ms: i64, correlation_id: String) -> Self {
        Self {
            participant_id: participant_id.to_owned(),
            timestamp_ms,
            direction: Direction::Out,
            correlation_id,
        }
    }

    #[must_use]
    pub fn inbound(participant_id: &str, timestamp_ms: i64, correlation_id: String) -> Self {
        Self {
            participant_id: participant_id.to_owned(),
            timestamp_ms,
            direction: Direction::In,
            correlation_id,
        }
    }
}

/// Builds the correlation id for the `seq`-th probe of a worker.
///
/// Unique within a run as long as worker identities are unique.
#[must_use]
pub fn correlation_id(identity: &str, seq: u64) -> String {
    format!("msg-{}-{}", identity, seq)
}
