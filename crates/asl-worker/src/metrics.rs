//! # Worker Metrics
//!
//! Recorded through the `metrics` facade, so they are no-ops until a
//! recorder is installed. The binary installs the Prometheus exporter when
//! `METRICS_ADDR` is configured.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder};

use crate::processor::Outcome;

pub const MESSAGES_PROCESSED: &str = "asl_worker_messages_processed_total";
pub const MESSAGE_ERRORS: &str = "asl_worker_message_errors_total";
pub const MESSAGE_DURATION: &str = "asl_worker_message_duration_seconds";

const DURATION_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Install the Prometheus recorder and its HTTP listener on `addr`.
///
/// Must run inside a Tokio runtime; the listener is spawned onto it.
pub fn install(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(Matcher::Full(MESSAGE_DURATION.to_string()), DURATION_BUCKETS)?
        .install()?;
    describe();
    tracing::info!(%addr, "metrics exporter listening");
    Ok(())
}

fn describe() {
    describe_counter!(MESSAGES_PROCESSED, "Messages settled, by outcome");
    describe_counter!(MESSAGE_ERRORS, "Messages whose change request failed");
    describe_histogram!(MESSAGE_DURATION, Unit::Seconds, "Time from receipt to settlement");
}

/// Record one message's outcome and duration.
///
/// Every settled message bumps the error counter, by zero on success, so
/// the error series exists from the first message on.
pub fn record(outcome: Outcome, elapsed: Duration) {
    counter!(MESSAGES_PROCESSED, "outcome" => outcome.as_str()).increment(1);
    histogram!(MESSAGE_DURATION).record(elapsed.as_secs_f64());
    match outcome {
        Outcome::Failed => counter!(MESSAGE_ERRORS).increment(1),
        Outcome::Committed => counter!(MESSAGE_ERRORS).increment(0),
        Outcome::Retry => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusRecorder;

    fn value(rendered: &str, series: &str) -> Option<f64> {
        rendered
            .lines()
            .filter(|line| !line.starts_with('#'))
            .find(|line| line.split_whitespace().next() == Some(series))
            .and_then(|line| line.split_whitespace().last())
            .and_then(|v| v.parse().ok())
    }

    fn recorded(recorder: &PrometheusRecorder, outcomes: &[Outcome]) -> String {
        metrics::with_local_recorder(recorder, || {
            for outcome in outcomes {
                record(*outcome, Duration::from_millis(20));
            }
        });
        recorder.handle().render()
    }

    #[test]
    fn error_series_exists_at_zero_after_success() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let rendered = recorded(&recorder, &[Outcome::Committed]);
        assert_eq!(value(&rendered, MESSAGE_ERRORS), Some(0.0));
        assert_eq!(
            value(&rendered, &format!("{MESSAGES_PROCESSED}{{outcome=\"committed\"}}")),
            Some(1.0)
        );
        assert_eq!(value(&rendered, &format!("{MESSAGE_DURATION}_count")), Some(1.0));
    }

    #[test]
    fn failure_increments_error_series() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let rendered = recorded(&recorder, &[Outcome::Committed, Outcome::Failed]);
        assert_eq!(value(&rendered, MESSAGE_ERRORS), Some(1.0));
        assert_eq!(
            value(&rendered, &format!("{MESSAGES_PROCESSED}{{outcome=\"failed\"}}")),
            Some(1.0)
        );
        assert_eq!(value(&rendered, &format!("{MESSAGE_DURATION}_count")), Some(2.0));
    }

    #[test]
    fn retry_is_counted_without_touching_errors() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let rendered = recorded(&recorder, &[Outcome::Retry]);
        assert_eq!(value(&rendered, MESSAGE_ERRORS), None);
        assert_eq!(
            value(&rendered, &format!("{MESSAGES_PROCESSED}{{outcome=\"retry\"}}")),
            Some(1.0)
        );
    }
}
