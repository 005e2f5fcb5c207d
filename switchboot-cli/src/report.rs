//! Batch report rendering.

use std::io::{self, Write};

use switchboot::driver::{OutcomeStatus, SessionOutcome};
use switchboot::BatchResult;

/// Write a per-device summary, with transcripts for failed devices.
pub fn render_text(result: &BatchResult, out: &mut impl Write) -> io::Result<()> {
    let width = result
        .iter()
        .map(|outcome| outcome.device.len())
        .max()
        .unwrap_or(0)
        .max(6);

    writeln!(out, "{:<width$}  {:<9}  DETAIL", "DEVICE", "STATUS")?;
    for outcome in result {
        writeln!(
            out,
            "{:<width$}  {:<9}  {}",
            outcome.device,
            status_label(outcome.status),
            detail(outcome)
        )?;
        for warning in &outcome.warnings {
            writeln!(out, "{:<width$}  {:<9}  warning: {warning}", "", "")?;
        }
    }

    for outcome in result.failed().filter(|o| !o.transcript.is_empty()) {
        writeln!(out)?;
        writeln!(out, "--- {} transcript ---", outcome.device)?;
        for exchange in &outcome.transcript {
            writeln!(out, "> {}", exchange.request)?;
            for line in exchange.response.lines() {
                writeln!(out, "  {line}")?;
            }
        }
    }

    writeln!(out)?;
    writeln!(
        out,
        "{} devices: {} succeeded, {} failed, {} cancelled",
        result.len(),
        result.succeeded().count(),
        result.failed().count(),
        result.cancelled().count()
    )
}

/// Write the batch result as pretty JSON.
pub fn render_json(result: &BatchResult, out: &mut impl Write) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, result)?;
    writeln!(out)
}

fn status_label(status: OutcomeStatus) -> &'static str {
    match status {
        OutcomeStatus::Success => "ok",
        OutcomeStatus::Failed => "FAILED",
        OutcomeStatus::Cancelled => "cancelled",
    }
}

fn detail(outcome: &SessionOutcome) -> String {
    match &outcome.error {
        Some(error) => error.clone(),
        None => format!(
            "{} exchanges in {:.1}s",
            outcome.transcript.len(),
            outcome.elapsed.as_secs_f64()
        ),
    }
}
