use loggen_core::Analytics;
use std::{fmt::Write, time::Duration};

const RULE: &str = "---------------------------------";

/// Formats the analysis summary printed by `loggen analyze`.
pub fn render(analytics: &Analytics, elapsed: Duration) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = write_report(&mut out, analytics, elapsed);
    out
}

fn write_report(out: &mut String, analytics: &Analytics, elapsed: Duration) -> std::fmt::Result {
    writeln!(out, "--- Log Analysis Report ---")?;
    writeln!(out, "Processing Time: {:.2} seconds", elapsed.as_secs_f64())?;
    writeln!(out, "{RULE}")?;
    writeln!(out, "Total Requests Processed: {}", analytics.total_lines)?;
    writeln!(out, "Total Errors: {}", analytics.error_count)?;
    writeln!(out, "Total Warnings: {}", analytics.warning_count)?;
    if analytics.malformed_lines > 0 {
        writeln!(
            out,
            "Malformed Lines Skipped: {}",
            analytics.malformed_lines
        )?;
    }
    if let (Some(rate), Some(avg)) = (analytics.error_rate(), analytics.avg_response_ms()) {
        writeln!(out, "Error Rate: {rate:.2}%")?;
        writeln!(out, "Average Response Time: {avg:.2} ms")?;
    }

    writeln!(out, "\n--- HTTP Status Codes ---")?;
    for (status, count) in &analytics.status_counts {
        writeln!(out, "  {status}: {count} requests")?;
    }

    writeln!(out, "\n--- HTTP Method Distribution ---")?;
    for (method, count) in &analytics.method_counts {
        writeln!(out, "  {method}: {count} requests")?;
    }
    writeln!(out, "{RULE}")
}
