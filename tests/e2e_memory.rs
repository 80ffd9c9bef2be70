use std::fs;
use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

use syncprobe::analysis::KEY_TOTAL_ERROR_CLIENT;
use syncprobe::orchestrator::{Orchestrator, RunOutcome, RunSettings};
use syncprobe::report::{MISSING_FILE, create_run_dir, write_reports};
use syncprobe::transport::{HubFault, MemoryHub};
use syncprobe::worker::ExitCode;

fn block_on<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = Result<T, String>>,
{
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("runtime failed: {}", err))?
        .block_on(future)
}

fn settings(workers: usize) -> RunSettings {
    RunSettings::new(workers, Duration::from_secs(1), Duration::from_millis(600))
        .with_jitter_ms(0)
        .with_drain_grace(Duration::from_millis(250))
}

async fn run(hub: &MemoryHub, settings: RunSettings) -> Result<RunOutcome, String> {
    Orchestrator::new(settings, Arc::new(hub.clone()))
        .run(&CancellationToken::new())
        .await
        .map_err(|err| format!("run failed: {}", err))
}

#[test]
fn e2e_memory_receive_failure_is_isolated() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let hub = MemoryHub::new();
    hub.inject("sync-worker-3", HubFault::FailReceiveAfterSend);

    let (outcome, run_dir) = block_on(async {
        let settings = settings(3);
        let run_dir = create_run_dir(dir.path(), &settings)
            .await
            .map_err(|err| format!("create run dir failed: {}", err))?;
        let outcome = run(&hub, settings.clone()).await?;
        write_reports(&run_dir, &settings, &outcome)
            .await
            .map_err(|err| format!("write reports failed: {}", err))?;
        Ok((outcome, run_dir))
    })?;

    let failed: Vec<&str> = outcome
        .reports
        .iter()
        .filter(|report| report.exit_code == ExitCode::RecvError)
        .map(|report| report.identity.as_str())
        .collect();
    if failed != ["sync-worker-3"] {
        return Err(format!("Unexpected failed workers: {:?}", failed));
    }
    let summary = &outcome.analysis.summary;
    if summary.get(KEY_TOTAL_ERROR_CLIENT).as_deref() != Some("1") || summary.total_sent != 3 {
        return Err(format!("Unexpected summary: {:?}", summary));
    }

    let missing = fs::read_to_string(run_dir.join(MISSING_FILE))
        .map_err(|err| format!("read missing.csv failed: {}", err))?;
    let rows: Vec<&str> = missing.lines().skip(1).collect();
    if rows.len() != 2 {
        return Err(format!("Expected both peer probes to be missing: {:?}", rows));
    }
    for row in rows {
        if !row.ends_with(",sync-worker-3") {
            return Err(format!("Only the failed worker may be missing: {}", row));
        }
        if row.contains(",sync-worker-3,") {
            return Err(format!("The failed worker's own probe was flagged missing: {}", row));
        }
    }
    Ok(())
}

#[test]
fn e2e_memory_every_worker_stops() -> Result<(), String> {
    let hub = MemoryHub::new();
    hub.inject("sync-worker-2", HubFault::FailSend);
    hub.inject("sync-worker-4", HubFault::RefuseConnect);

    let outcome = block_on(async {
        tokio::time::timeout(Duration::from_secs(5), run(&hub, settings(5)))
            .await
            .map_err(|err| format!("run did not finish: {}", err))?
    })?;

    if outcome.reports.len() != 5 || hub.peer_count() != 0 {
        return Err("Every worker must report and disconnect".to_owned());
    }
    let codes: Vec<ExitCode> = outcome
        .reports
        .iter()
        .map(|report| report.exit_code)
        .collect();
    let expected = [
        ExitCode::Normal,
        ExitCode::SendError,
        ExitCode::Normal,
        ExitCode::ConnectError,
        ExitCode::Normal,
    ];
    if codes != expected {
        return Err(format!("Unexpected exit codes: {:?}", codes));
    }
    if outcome.analysis.summary.error_clients != 2 {
        return Err("Send and connect failures both count".to_owned());
    }
    Ok(())
}
