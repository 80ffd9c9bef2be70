use crate::domain::{Direction, Event};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Stamp {
    pub timestamp_ms: i64,
    pub participant_id: String,
}

impl Stamp {
    fn of(event: Event) -> Self {
        Self {
            timestamp_ms: event.timestamp_ms,
            participant_id: event.participant_id,
        }
    }
}

/// All events sharing one correlation id.
#[derive(Debug, Clone, Default)]
pub struct CorrelationGroup {
    pub sent: Option<Stamp>,
    pub receipts: Vec<Stamp>,
    pub duplicate_sends: u64,
}

impl CorrelationGroup {
    /// Adds an event of this group. A second OUT event is counted as a
    /// duplicate; the earliest one is kept so the result does not depend on
    /// arrival order.
    pub fn add(&mut self, event: Event) {
        match event.direction {
            Direction::Out => {
                let stamp = Stamp::of(event);
                match self.sent.as_mut() {
                    None => self.sent = Some(stamp),
                    Some(current) => {
                        self.duplicate_sends = self.duplicate_sends.saturating_add(1);
                        if stamp < *current {
                            *current = stamp;
                        }
                    }
                }
            }
            Direction::In => self.receipts.push(Stamp::of(event)),
        }
    }

    /// Receipts ordered by time, then participant.
    #[must_use]
    pub fn sorted_receipts(&self) -> Vec<&Stamp> {
        let mut receipts: Vec<&Stamp> = self.receipts.iter().collect();
        receipts.sort_unstable();
        receipts
    }
}
