//! Text rendering for responses, batch logs and monitor samples

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use crate::diagnosis::Diagnosis;
use crate::models::ApiResponse;
use crate::monitor::{MonitorStats, ProbeSample};
use crate::transmit::{EngineSnapshot, TransmissionResult};
use super::terminal::{self, colors};

/// `200 OK · 12 ms · 1.00 KiB`
pub fn response_summary(response: &ApiResponse) -> String {
    format!(
        "{} {} {} {} {} {}",
        terminal::status(response.status),
        terminal::bold(&response.status_text, terminal::status_color(response.status)),
        terminal::muted("·"),
        terminal::number(&format!("{} ms", response.time)),
        terminal::muted("·"),
        terminal::number(&terminal::format_bytes(response.size as u64, 2)),
    )
}

pub fn response_headers(headers: &BTreeMap<String, String>) -> String {
    headers
        .iter()
        .map(|(k, v)| format!("{}: {}", terminal::key(k), v))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Pretty JSON for structured data, the raw text otherwise
pub fn response_body(data: &JsonValue) -> String {
    match data {
        JsonValue::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

pub fn diagnosis(d: &Diagnosis) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} {}\n", terminal::error("Transmission fault:"), d.error));
    out.push_str(&format!("{} {}\n", terminal::label("Likely cause:"), d.likely_cause));
    out.push_str(&format!(
        "{} {}\n",
        terminal::label("Target:"),
        match d.locality {
            crate::diagnosis::Locality::Local => "local",
            crate::diagnosis::Locality::Remote => "remote",
        }
    ));
    if d.is_validation_error() {
        out.push_str(&format!("{}\n", terminal::warning("Validation failed")));
        for violation in &d.validation_errors {
            out.push_str(&format!("  {}\n", terminal::key(&violation.field)));
            for message in &violation.messages {
                out.push_str(&format!("    - {}\n", message));
            }
        }
    }
    out
}

/// One log entry: `#3   200  Record 3: OK  (12 ms)`
pub fn log_line(result: &TransmissionResult) -> String {
    let time = if result.is_transport_failure() {
        String::new()
    } else {
        format!("  {}", terminal::muted(&format!("({} ms)", result.time)))
    };
    format!(
        "{:<5} {:>3}  {}{}",
        terminal::muted(&format!("#{}", result.sequence)),
        terminal::status(result.status),
        result.text,
        time
    )
}

pub fn batch_summary(snapshot: &EngineSnapshot) -> String {
    let ok = snapshot.log.iter().filter(|r| r.is_success()).count();
    let failed = snapshot.failures();
    let rejected = snapshot.log.len() - ok - failed;
    let completed: Vec<u64> = snapshot
        .log
        .iter()
        .filter(|r| !r.is_transport_failure())
        .map(|r| r.time)
        .collect();
    let avg = if completed.is_empty() {
        0
    } else {
        completed.iter().sum::<u64>() / completed.len() as u64
    };

    format!(
        "{} {}/{} sent  {} {}  {} {}  {} {}  {} {}",
        terminal::info("Batch:"),
        terminal::number(&snapshot.log.len().to_string()),
        terminal::number(&snapshot.total.to_string()),
        terminal::colorize("2xx", colors::GREEN),
        terminal::number(&ok.to_string()),
        terminal::colorize("non-2xx", colors::ORANGE),
        terminal::number(&rejected.to_string()),
        terminal::colorize("errors", colors::RED),
        terminal::number(&failed.to_string()),
        terminal::muted("avg"),
        terminal::number(&format!("{} ms", avg)),
    )
}

pub fn probe_line(sample: &ProbeSample) -> String {
    let state = if sample.up {
        terminal::success("UP")
    } else {
        terminal::error("DOWN")
    };
    let detail = match &sample.error {
        Some(e) => e.clone(),
        None => format!("{} ms", sample.latency_ms),
    };
    format!(
        "{} {:>4} {} {}",
        terminal::muted(&sample.at.format("%H:%M:%S").to_string()),
        state,
        terminal::status(sample.status),
        detail
    )
}

pub fn monitor_summary(stats: &MonitorStats) -> String {
    format!(
        "{} {}%  {} {} ms  {} {} ms  {} {}/{}",
        terminal::label("uptime"),
        terminal::number(&stats.uptime.to_string()),
        terminal::label("avg"),
        terminal::number(&stats.avg_latency_ms.to_string()),
        terminal::label("peak"),
        terminal::number(&stats.peak_latency_ms.to_string()),
        terminal::label("ok/fail"),
        terminal::number(&stats.success.to_string()),
        terminal::number(&stats.fail.to_string()),
    )
}
