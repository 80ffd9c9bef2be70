//! Records shared between workers and the analyst.
mod event;

pub use event::{Direction, Event, correlation_id};
