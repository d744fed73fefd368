//! Client metrics definitions
//!
//! OpenTelemetry instruments for the dispatcher and the client. They are
//! created when observability is enabled via `ClientBuilder::with_observability()`
//! and exported through whatever meter provider is installed globally.
//!
//! # Metrics Collected
//!
//! - **requests_total**: Exchanges completed, by method and outcome (counter)
//! - **request_duration**: Transport round-trip time (histogram)
//! - **errors_total**: Failures by category (counter)
//! - **pacing_wait**: Time spent waiting out advisory delays (histogram)
//! - **pacing_exceeded**: Requests refused because the advised wait was too long (counter)
//! - **bits_left** / **requests_left**: Remaining daily quota (gauges)

use opentelemetry::{
    global,
    metrics::{Counter, Gauge, Histogram, Meter},
    KeyValue,
};

/// Client metrics for monitoring
pub struct ClientMetrics {
    /// Total number of completed exchanges
    pub requests_total: Counter<u64>,
    /// Round-trip duration in seconds
    pub request_duration: Histogram<f64>,
    /// Total number of errors
    pub errors_total: Counter<u64>,
    /// Advisory delay actually waited, in seconds
    pub pacing_wait: Histogram<f64>,
    /// Requests refused with PacingExceeded
    pub pacing_exceeded: Counter<u64>,
    /// Remaining random bits reported by the service
    pub bits_left: Gauge<i64>,
    /// Remaining requests reported by the service
    pub requests_left: Gauge<i64>,
}

impl ClientMetrics {
    /// Create a new ClientMetrics instance on the global meter provider
    pub fn new(service_name: impl Into<String>) -> Self {
        let name: &'static str = Box::leak(service_name.into().into_boxed_str());
        let meter = global::meter(name);
        Self::new_with_meter(&meter)
    }

    /// Create a new ClientMetrics instance with a custom meter
    pub fn new_with_meter(meter: &Meter) -> Self {
        Self {
            requests_total: meter
                .u64_counter("randrpc.client.requests.total")
                .with_description("Total number of completed exchanges")
                .build(),
            request_duration: meter
                .f64_histogram("randrpc.client.request.duration")
                .with_description("Transport round-trip duration in seconds")
                .build(),
            errors_total: meter
                .u64_counter("randrpc.client.errors.total")
                .with_description("Total number of errors encountered")
                .build(),
            pacing_wait: meter
                .f64_histogram("randrpc.client.pacing.wait")
                .with_description("Time spent honouring advisory delays in seconds")
                .build(),
            pacing_exceeded: meter
                .u64_counter("randrpc.client.pacing.exceeded")
                .with_description("Requests refused because the advised wait exceeded the blocking limit")
                .build(),
            bits_left: meter
                .i64_gauge("randrpc.client.quota.bits_left")
                .with_description("Random bits left on the API key")
                .build(),
            requests_left: meter
                .i64_gauge("randrpc.client.quota.requests_left")
                .with_description("Requests left on the API key")
                .build(),
        }
    }

    /// Record a completed exchange
    pub fn record_request(&self, method: &str, status: &str, duration_secs: f64) {
        let attributes = &[
            KeyValue::new("method", method.to_string()),
            KeyValue::new("status", status.to_string()),
        ];
        self.requests_total.add(1, attributes);
        self.request_duration.record(duration_secs, attributes);
    }

    /// Record an error
    pub fn record_error(&self, error_type: &str) {
        let attributes = &[KeyValue::new("error_type", error_type.to_string())];
        self.errors_total.add(1, attributes);
    }

    /// Record a pacing suspension
    pub fn record_pacing_wait(&self, wait_secs: f64) {
        self.pacing_wait.record(wait_secs, &[]);
    }

    /// Record a pacing refusal
    pub fn record_pacing_exceeded(&self) {
        self.pacing_exceeded.add(1, &[]);
        self.record_error("pacing_exceeded");
    }

    /// Update the remaining quota
    pub fn update_quota(&self, bits_left: i64, requests_left: i64) {
        self.bits_left.record(bits_left, &[]);
        self.requests_left.record(requests_left, &[]);
    }
}
