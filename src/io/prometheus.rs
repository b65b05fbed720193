//! Prometheus text exposition of board metrics

use crate::infra::metrics::MetricsSummary;
use std::fmt::Write;

/// Write one unlabelled counter
fn write_counter(output: &mut String, name: &str, help: &str, val: u64) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} counter");
    let _ = writeln!(output, "{name} {val}");
}

/// Format metrics in Prometheus text exposition format
pub fn format_prometheus_metrics(summary: &MetricsSummary) -> String {
    let counters = [
        ("flow_board_requests_total", "Total HTTP requests handled", summary.requests_total),
        (
            "flow_board_progress_served_total",
            "Progress views returned with rows",
            summary.progress_served,
        ),
        (
            "flow_board_no_data_total",
            "Progress views with no data for the pathway",
            summary.no_data_served,
        ),
        ("flow_board_rejected_total", "Requests rejected by validation", summary.requests_rejected),
        (
            "flow_board_server_errors_total",
            "Requests that failed with a server error",
            summary.server_errors,
        ),
        ("flow_board_scans_skipped_total", "Malformed scan records excluded", summary.scans_skipped),
    ];

    let mut output = String::with_capacity(1024);
    for (name, help, val) in counters {
        write_counter(&mut output, name, help, val);
    }
    output
}
