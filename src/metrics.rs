use std::time::Duration;

use metrics::{counter, histogram};

/// Metric name constants and recording helpers.
///
/// Leaf modules also emit their own counters (`botfeed_sampler_draws_total`,
/// `botfeed_associations_total`, `botfeed_users_registered_total`,
/// `botfeed_auth_failures_total`); the names here cover the cross-cutting
/// service measurements.
#[derive(Debug, Clone, Copy)]
pub struct MetricsCollector {
    /// Counter of service operations by name and status
    pub operations_total: &'static str,
    /// Histogram of service operation durations
    pub operation_duration: &'static str,
    /// Counter of errors by type and operation
    pub errors_total: &'static str,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self {
            operations_total: "botfeed_operations_total",
            operation_duration: "botfeed_operation_duration_seconds",
            errors_total: "botfeed_errors_total",
        }
    }
}

impl MetricsCollector {
    /// Record a service operation's outcome and duration
    pub fn record_operation(&self, operation: &str, duration: Duration, success: bool) {
        let status = if success { "success" } else { "error" };

        counter!(
            self.operations_total,
            "operation" => operation.to_string(),
            "status" => status
        )
        .increment(1);
        histogram!(self.operation_duration, "operation" => operation.to_string())
            .record(duration.as_secs_f64());
    }

    /// Record an error by type
    pub fn record_error(&self, error_type: &str, operation: &str) {
        counter!(
            self.errors_total,
            "type" => error_type.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
    }
}

/// Timing wrapper that reports into the operations metrics on finish
pub struct MetricsTimer {
    collector: MetricsCollector,
    operation: String,
    start: std::time::Instant,
}

impl MetricsTimer {
    /// Start timing an operation
    #[must_use]
    pub fn new(collector: MetricsCollector, operation: &str) -> Self {
        Self {
            collector,
            operation: operation.to_string(),
            start: std::time::Instant::now(),
        }
    }

    /// Stop and record the measurement
    pub fn finish(self, success: bool) {
        let duration = self.start.elapsed();
        self.collector
            .record_operation(&self.operation, duration, success);
    }
}
