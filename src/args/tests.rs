use super::parsers::{parse_bool_env, parse_server};
use super::test_support::parse_test_args;
use super::*;
use crate::error::{AppError, AppResult, ValidationError};

#[test]
fn parse_args_defaults() -> AppResult<()> {
    let args = parse_test_args(["syncprobe"])?;

    let expected_no_color = std::env::var("NO_COLOR")
        .ok()
        .and_then(|value| parse_bool_env(&value).ok())
        .unwrap_or(false);

    let checks = [
        (args.scenario == Scenario::Sync, "Expected sync scenario"),
        (args.nclients.get() == 10, "Unexpected nclients"),
        (args.duration.get() == 30, "Unexpected duration"),
        (args.interval.get() == 100, "Unexpected interval"),
        (args.jitter_ms == 4, "Unexpected jitter"),
        (args.server == "localhost", "Unexpected server"),
        (args.port == 8888, "Unexpected port"),
        (args.out_dir == "log/sync", "Unexpected out dir"),
        (args.max_connects.get() == 50, "Unexpected max_connects"),
        (args.config.is_none(), "Expected no config path"),
        (!args.verbose, "Expected verbose to be false"),
        (args.no_color == expected_no_color, "Unexpected no_color"),
    ];
    for (ok, message) in checks {
        if !ok {
            return Err(AppError::validation(message));
        }
    }
    Ok(())
}

#[test]
fn parse_args_short_flags() -> AppResult<()> {
    let args = parse_test_args([
        "syncprobe", "sync", "-n", "3", "-d", "5", "-i", "250", "-s", "10.0.0.7", "-p", "9000",
        "-v",
    ])?;
    if args.nclients.get() != 3 || args.duration.get() != 5 || args.interval.get() != 250 {
        return Err(AppError::validation("Unexpected run shape"));
    }
    if args.server != "10.0.0.7" || args.port != 9000 || !args.verbose {
        return Err(AppError::validation("Unexpected target or verbosity"));
    }
    Ok(())
}

#[test]
fn parse_args_rejects_zero_clients() -> AppResult<()> {
    if parse_test_args(["syncprobe", "-n", "0"]).is_ok() {
        return Err(AppError::validation("Zero clients must be rejected"));
    }
    if parse_test_args(["syncprobe", "--interval", "0"]).is_ok() {
        return Err(AppError::validation("Zero interval must be rejected"));
    }
    if parse_test_args(["syncprobe", "--max-connects", "x"]).is_ok() {
        return Err(AppError::validation("Non-numeric limit must be rejected"));
    }
    Ok(())
}

#[test]
fn parse_args_rejects_unknown_scenario() -> AppResult<()> {
    if parse_test_args(["syncprobe", "chat"]).is_ok() {
        return Err(AppError::validation("Only the sync scenario exists"));
    }
    Ok(())
}

#[test]
fn no_color_flag_without_value() -> AppResult<()> {
    let args = parse_test_args(["syncprobe", "--no-color"])?;
    if !args.no_color {
        return Err(AppError::validation("Expected no_color to be true"));
    }
    Ok(())
}

#[test]
fn positive_types_reject_zero() -> AppResult<()> {
    match PositiveU64::try_from(0) {
        Err(ValidationError::ValueTooSmall { min: 1 }) => {}
        Err(err) => return Err(AppError::validation(format!("Unexpected error: {}", err))),
        Ok(_) => return Err(AppError::validation("Zero must be rejected")),
    }
    let parsed: PositiveUsize = " 7 ".parse()?;
    if parsed.get() != 7 {
        return Err(AppError::validation("Expected 7"));
    }
    Ok(())
}

#[test]
fn server_must_not_be_blank() -> AppResult<()> {
    if parse_server("   ").is_ok() {
        return Err(AppError::validation("Blank server must be rejected"));
    }
    if parse_server(" example.com ")? != "example.com" {
        return Err(AppError::validation("Server must be trimmed"));
    }
    Ok(())
}

#[test]
fn bool_env_values() -> AppResult<()> {
    for value in ["1", "TRUE", "yes", "On"] {
        if !parse_bool_env(value)? {
            return Err(AppError::validation(format!("Expected true for {}", value)));
        }
    }
    if parse_bool_env("off")? || parse_bool_env("maybe").is_ok() {
        return Err(AppError::validation("Unexpected bool parsing"));
    }
    Ok(())
}
