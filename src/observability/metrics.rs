//! Metrics collection.
//!
//! # Metrics
//! - `gateway_proposal_dispatch_total` (counter): per-target dispatch outcomes
//! - `gateway_fanout_duration_seconds` (histogram): fan-out wall time by proposal kind
//! - `gateway_endorsement_total` (counter): validation verdicts by kind and reason
//! - `gateway_submission_total` (counter): ordering outcomes
//! - `gateway_query_total` (counter): ledger queries by kind and result
//!
//! Recording goes through the `metrics` facade; without an installed
//! recorder every call is a no-op.

use std::time::Duration;

pub fn record_dispatch(outcome: &'static str) {
    ::metrics::counter!("gateway_proposal_dispatch_total", "outcome" => outcome).increment(1);
}

pub fn record_fanout_duration(kind: &'static str, elapsed: Duration) {
    ::metrics::histogram!("gateway_fanout_duration_seconds", "kind" => kind)
        .record(elapsed.as_secs_f64());
}

pub fn record_endorsement(kind: &'static str, verdict: &'static str) {
    ::metrics::counter!("gateway_endorsement_total", "kind" => kind, "verdict" => verdict)
        .increment(1);
}

pub fn record_submission(outcome: &'static str) {
    ::metrics::counter!("gateway_submission_total", "outcome" => outcome).increment(1);
}

pub fn record_query(kind: &'static str, success: bool) {
    let result = if success { "ok" } else { "error" };
    ::metrics::counter!("gateway_query_total", "kind" => kind, "result" => result).increment(1);
}
