use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgMatches, CommandFactory, FromArgMatches};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::args::SyncArgs;
use crate::error::AppResult;
use crate::orchestrator::{Orchestrator, RunSettings};
use crate::report;
use crate::shutdown_handlers::setup_signal_shutdown_handler;
use crate::transport::WebSocketConnector;

/// Parses the command line, runs one probe session and writes its reports.
///
/// # Errors
///
/// Returns an error for invalid arguments or configuration, when the output
/// directory cannot be created, or when a report cannot be written.
pub fn run() -> AppResult<()> {
    let (mut args, matches) = parse_args()?;
    apply_config(&mut args, &matches)?;

    crate::logger::init_logging(args.verbose, args.no_color);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run_async(args))
}

fn parse_args() -> AppResult<(SyncArgs, ArgMatches)> {
    let matches = SyncArgs::command().get_matches();
    let args = SyncArgs::from_arg_matches(&matches)?;
    Ok((args, matches))
}

fn apply_config(args: &mut SyncArgs, matches: &ArgMatches) -> AppResult<()> {
    if let Some(config) = crate::config::load_config(args.config.as_deref())? {
        crate::config::apply_config(args, matches, &config)?;
    }
    Ok(())
}

/// Run settings for the given arguments.
#[must_use]
pub fn run_settings(args: &SyncArgs) -> RunSettings {
    RunSettings::new(
        args.nclients.get(),
        Duration::from_secs(args.duration.get()),
        Duration::from_millis(args.interval.get()),
    )
    .with_jitter_ms(args.jitter_ms)
    .with_max_connects(args.max_connects.get())
}

async fn run_async(args: SyncArgs) -> AppResult<()> {
    let settings = run_settings(&args);
    let connector = WebSocketConnector::new(&args.server, args.port)?;
    let dir = report::create_run_dir(Path::new(&args.out_dir), &settings).await?;
    info!(
        scenario = ?args.scenario,
        server = %args.server,
        port = args.port,
        out_dir = %dir.display(),
        "Starting run"
    );

    let interrupt = CancellationToken::new();
    let signals = setup_signal_shutdown_handler(&interrupt);
    let orchestrator = Orchestrator::new(settings, Arc::new(connector));
    let outcome = orchestrator.run(&interrupt).await;
    interrupt.cancel();
    signals.await?;
    let outcome = outcome?;

    report::write_reports(&dir, orchestrator.settings(), &outcome).await?;
    report::print_summary(&outcome.analysis.summary, &dir);
    Ok(())
}
