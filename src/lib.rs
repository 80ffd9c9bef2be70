//! Core library for the `syncprobe` CLI.
//!
//! `syncprobe` connects many simulated clients to a broadcast server, has each
//! of them send correlation-tagged probes on a timer, and records every
//! broadcast each client receives. After the run the recorded events are
//! correlated into per-probe latencies, missing deliveries and percentile
//! statistics, and written out as CSV reports.
pub mod analysis;
pub mod args;
pub mod config;
pub mod domain;
pub mod entry;
pub mod error;
pub mod logger;
pub mod orchestrator;
pub mod report;
pub mod shutdown_handlers;
pub mod transport;
pub mod worker;
