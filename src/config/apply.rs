use clap::ArgMatches;
use clap::parser::ValueSource;

use crate::args::{PositiveU64, PositiveUsize, SyncArgs};
use crate::error::{AppError, AppResult, ConfigError};

use super::types::ConfigFile;

fn is_cli(matches: &ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(ValueSource::CommandLine)
}

fn ensure_positive_u64(value: u64, field: &str) -> AppResult<PositiveU64> {
    PositiveU64::try_from(value).map_err(|err| {
        AppError::config(ConfigError::FieldMustBePositive {
            field: field.to_owned(),
            source: err,
        })
    })
}

fn ensure_positive_usize(value: usize, field: &str) -> AppResult<PositiveUsize> {
    PositiveUsize::try_from(value).map_err(|err| {
        AppError::config(ConfigError::FieldMustBePositive {
            field: field.to_owned(),
            source: err,
        })
    })
}

/// Applies configuration values to CLI arguments.
///
/// # Errors
///
/// Returns an error when a config value is out of range.
pub fn apply_config(
    args: &mut SyncArgs,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> AppResult<()> {
    if !is_cli(matches, "nclients")
        && let Some(nclients) = config.nclients
    {
        args.nclients = ensure_positive_usize(nclients, "nclients")?;
    }

    if !is_cli(matches, "duration")
        && let Some(duration) = config.duration
    {
        args.duration = ensure_positive_u64(duration, "duration")?;
    }

    if !is_cli(matches, "interval")
        && let Some(interval) = config.interval
    {
        args.interval = ensure_positive_u64(interval, "interval")?;
    }

    if !is_cli(matches, "jitter_ms")
        && let Some(jitter_ms) = config.jitter_ms
    {
        args.jitter_ms = jitter_ms;
    }

    if !is_cli(matches, "server")
        && let Some(server) = config.server.as_deref()
    {
        let server = server.trim();
        if server.is_empty() {
            return Err(AppError::config(ConfigError::EmptyServer));
        }
        server.clone_into(&mut args.server);
    }

    if !is_cli(matches, "port")
        && let Some(port) = config.port
    {
        args.port = port;
    }

    if !is_cli(matches, "out_dir")
        && let Some(out_dir) = config.out_dir.as_ref()
    {
        args.out_dir.clone_from(out_dir);
    }

    if !is_cli(matches, "max_connects")
        && let Some(max_connects) = config.max_connects
    {
        args.max_connects = ensure_positive_usize(max_connects, "max_connects")?;
    }

    if !is_cli(matches, "verbose")
        && let Some(verbose) = config.verbose
    {
        args.verbose = verbose;
    }

    if !is_cli(matches, "no_color")
        && let Some(no_color) = config.no_color
    {
        args.no_color = no_color;
    }

    Ok(())
}
