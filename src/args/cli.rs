use clap::{Parser, ValueEnum};

use super::parsers::{parse_bool_env, parse_positive_u64, parse_positive_usize, parse_server};
use super::types::{PositiveU64, PositiveUsize};

/// Traffic pattern driven by the workers.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum Scenario {
    /// Every worker sends probes and records every broadcast it receives.
    Sync,
}

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Broadcast latency probe: many WebSocket clients send tagged messages, every peer records what it receives, and the run reports delivery gaps and latency percentiles."
)]
pub struct SyncArgs {
    /// Traffic scenario
    #[arg(default_value = "sync", value_enum)]
    pub scenario: Scenario,

    /// Number of simulated clients
    #[arg(long = "nclients", short = 'n', default_value = "10", value_parser = parse_positive_usize)]
    pub nclients: PositiveUsize,

    /// Run duration in seconds
    #[arg(long, short = 'd', default_value = "30", value_parser = parse_positive_u64)]
    pub duration: PositiveU64,

    /// Nominal send interval per client in milliseconds
    #[arg(long, short = 'i', default_value = "100", value_parser = parse_positive_u64)]
    pub interval: PositiveU64,

    /// Random per-client offset applied to the interval, in milliseconds
    #[arg(long = "jitter-ms", default_value_t = 4)]
    pub jitter_ms: u64,

    /// Server host
    #[arg(long, short = 's', default_value = "localhost", value_parser = parse_server)]
    pub server: String,

    /// Server port
    #[arg(long, short = 'p', default_value_t = 8888)]
    pub port: u16,

    /// Root directory for per-run report directories
    #[arg(long = "out-dir", default_value = "log/sync")]
    pub out_dir: String,

    /// Maximum concurrent connection attempts while clients connect
    #[arg(long = "max-connects", default_value = "50", value_parser = parse_positive_usize)]
    pub max_connects: PositiveUsize,

    /// Path to config file (TOML/JSON). Defaults to ./syncprobe.toml or ./syncprobe.json if present.
    #[arg(long)]
    pub config: Option<String>,

    /// Enable verbose logging (sets log level to debug unless overridden by SYNCPROBE_LOG/RUST_LOG)
    #[arg(long, short = 'v', alias = "debug")]
    pub verbose: bool,

    /// Disable color output
    #[arg(
        long = "no-color",
        env = "NO_COLOR",
        value_parser = parse_bool_env,
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true"
    )]
    pub no_color: bool,
}
