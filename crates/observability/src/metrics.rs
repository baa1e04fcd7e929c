//! Fanout counters
//!
//! Thin wrappers over the `metrics` facade; they are no-ops until a recorder
//! (e.g. the Prometheus exporter) is installed.

use metrics::counter;

/// Record an incoming trigger and whether its feed id was known
pub fn record_trigger(feed: &str, found: bool) {
    let status = if found { "found" } else { "not_found" };
    counter!(
        "fanouter_triggers_total",
        "feed" => feed.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record a signal accepted into a limiter's admission buffer
pub fn record_signal_admitted(destination: &str, feed: &str) {
    counter!(
        "fanouter_signals_admitted_total",
        "destination" => destination.to_string(),
        "feed" => feed.to_string()
    )
    .increment(1);
}

/// Record a signal discarded because the admission buffer was full
pub fn record_signal_dropped(destination: &str, feed: &str) {
    counter!(
        "fanouter_signals_dropped_total",
        "destination" => destination.to_string(),
        "feed" => feed.to_string()
    )
    .increment(1);
}

/// Record one outbound request outcome
pub fn record_request(destination: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "fanouter_requests_total",
        "destination" => destination.to_string(),
        "status" => status
    )
    .increment(1);
}
