use crate::analysis::{LatencyDetail, MissingDelivery, RunSummary, format_x100};
use crate::domain::Event;
use crate::orchestrator::RunSettings;
use crate::worker::WorkerReport;

pub(super) const CONFIG_HEADER: &str = "nclients,duration,interval";
pub(super) const EVENTS_HEADER: &str = "Direction,Timestamp,Hash";
pub(super) const LATENCY_HEADER: &str = "Hash,Sent_By,Sent_Timestamp,Average_Duration,Recv_By";
pub(super) const MISSING_HEADER: &str = "Hash,Sent_By,Received,Missing_Receivers";
pub(super) const RESULT_HEADER: &str = "key,value";

/// Quotes a field when it would otherwise split the row.
pub(super) fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_owned()
    }
}

pub(super) fn config_rows(settings: &RunSettings, reports: &[WorkerReport]) -> Vec<String> {
    let mut rows = Vec::with_capacity(reports.len().saturating_add(2));
    rows.push(format!(
        "{},{},{}",
        settings.workers,
        settings.duration.as_secs(),
        settings.interval.as_millis()
    ));
    rows.push("name,identity".to_owned());
    for report in reports {
        rows.push(format!(
            "{},{}",
            csv_field(&report.name),
            csv_field(&report.identity)
        ));
    }
    rows
}

pub(super) fn event_row(event: &Event) -> String {
    format!(
        "{},{},{}",
        event.direction,
        event.timestamp_ms,
        csv_field(&event.correlation_id)
    )
}

pub(super) fn latency_row(detail: &LatencyDetail) -> String {
    let receivers = detail
        .receivers
        .iter()
        .map(|receiver| format!("{}({})", receiver.participant_id, receiver.latency_ms))
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "{},{},{},{},{}",
        csv_field(&detail.correlation_id),
        csv_field(&detail.sender),
        detail.sent_at_ms,
        detail
            .average_latency_x100
            .map(format_x100)
            .unwrap_or_default(),
        csv_field(&receivers)
    )
}

pub(super) fn missing_row(missing: &MissingDelivery) -> String {
    format!(
        "{},{},{},{}",
        csv_field(&missing.correlation_id),
        csv_field(&missing.sender),
        missing.received,
        csv_field(&missing.absent.join(","))
    )
}

pub(super) fn result_rows(summary: &RunSummary) -> Vec<String> {
    summary
        .entries()
        .into_iter()
        .map(|(key, value)| format!("{},{}", key, value))
        .collect()
}

/// Summary as printed to stdout, one `key: value` line per entry.
#[must_use]
pub fn summary_lines(summary: &RunSummary) -> Vec<String> {
    summary
        .entries()
        .into_iter()
        .map(|(key, value)| format!("{}: {}", key, value))
        .collect()
}
