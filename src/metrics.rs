//! Prometheus metrics for request latency and domain events.
//!
//! This module provides:
//! - HTTP request latency and status counters
//! - Authentication outcomes (logins, refreshes)
//! - Tenant, invitation and call session lifecycle counters
//! - Password hashing latency

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::debug;

// === Metric Name Constants ===

/// HTTP request latency metric name.
pub const METRIC_HTTP_REQUEST_LATENCY: &str = "http_request_latency_ms";
/// HTTP requests counter metric name.
pub const METRIC_HTTP_REQUESTS: &str = "http_requests_total";
/// Password hashing latency metric name.
pub const METRIC_PASSWORD_HASH_LATENCY: &str = "password_hash_latency_ms";
/// Login attempts counter metric name.
pub const METRIC_LOGINS: &str = "auth_logins_total";
/// Refresh token rotations counter metric name.
pub const METRIC_TOKEN_REFRESHES: &str = "auth_token_refreshes_total";
/// Refresh token reuse counter metric name.
pub const METRIC_REFRESH_REUSE: &str = "auth_refresh_token_reuse_total";
/// Registered users counter metric name.
pub const METRIC_USERS_REGISTERED: &str = "users_registered_total";
/// Tenants created counter metric name.
pub const METRIC_TENANTS_CREATED: &str = "tenants_created_total";
/// Invitations sent counter metric name.
pub const METRIC_INVITES_SENT: &str = "invites_sent_total";
/// Invitations accepted counter metric name.
pub const METRIC_INVITES_ACCEPTED: &str = "invites_accepted_total";
/// Call sessions started counter metric name.
pub const METRIC_CALLS_STARTED: &str = "call_sessions_started_total";
/// Call sessions ended counter metric name.
pub const METRIC_CALLS_ENDED: &str = "call_sessions_ended_total";
/// Telephony webhook events counter metric name.
pub const METRIC_WEBHOOK_EVENTS: &str = "voice_webhook_events_total";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    // Latency histograms
    describe_histogram!(
        METRIC_HTTP_REQUEST_LATENCY,
        "HTTP request latency in milliseconds"
    );
    describe_histogram!(
        METRIC_PASSWORD_HASH_LATENCY,
        "Password hashing latency in milliseconds"
    );

    // Counters
    describe_counter!(METRIC_HTTP_REQUESTS, "Total number of HTTP requests");
    describe_counter!(METRIC_LOGINS, "Total number of login attempts by outcome");
    describe_counter!(
        METRIC_TOKEN_REFRESHES,
        "Total number of refresh token rotations"
    );
    describe_counter!(
        METRIC_REFRESH_REUSE,
        "Total number of revoked refresh tokens presented again"
    );
    describe_counter!(METRIC_USERS_REGISTERED, "Total number of registered users");
    describe_counter!(METRIC_TENANTS_CREATED, "Total number of tenants created");
    describe_counter!(METRIC_INVITES_SENT, "Total number of invitations sent");
    describe_counter!(
        METRIC_INVITES_ACCEPTED,
        "Total number of invitations accepted"
    );
    describe_counter!(METRIC_CALLS_STARTED, "Total number of call sessions started");
    describe_counter!(
        METRIC_CALLS_ENDED,
        "Total number of call sessions reaching a terminal status"
    );
    describe_counter!(
        METRIC_WEBHOOK_EVENTS,
        "Total number of telephony status callbacks received"
    );

    debug!("Metrics initialized");
}

/// Install the Prometheus recorder and describe every metric.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    init_metrics();
    Ok(handle)
}

/// Record HTTP request latency and count the response.
pub fn record_http_request(start: Instant, method: &str, endpoint: &str, status: u16) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_HTTP_REQUEST_LATENCY, "endpoint" => endpoint.to_string()).record(latency_ms);
    counter!(
        METRIC_HTTP_REQUESTS,
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Count a login attempt.
pub fn inc_logins(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!(METRIC_LOGINS, "outcome" => outcome).increment(1);
}

/// Increment refresh token rotations counter.
pub fn inc_token_refreshes() {
    counter!(METRIC_TOKEN_REFRESHES).increment(1);
}

/// Increment refresh token reuse counter.
pub fn inc_refresh_reuse() {
    counter!(METRIC_REFRESH_REUSE).increment(1);
}

/// Increment registered users counter.
pub fn inc_users_registered() {
    counter!(METRIC_USERS_REGISTERED).increment(1);
}

/// Increment tenants created counter.
pub fn inc_tenants_created() {
    counter!(METRIC_TENANTS_CREATED).increment(1);
}

/// Increment invitations sent counter.
pub fn inc_invites_sent() {
    counter!(METRIC_INVITES_SENT).increment(1);
}

/// Increment invitations accepted counter.
pub fn inc_invites_accepted() {
    counter!(METRIC_INVITES_ACCEPTED).increment(1);
}

/// Increment call sessions started counter.
pub fn inc_calls_started() {
    counter!(METRIC_CALLS_STARTED).increment(1);
}

/// Count a call session reaching `status`.
pub fn inc_calls_ended(status: &str) {
    counter!(METRIC_CALLS_ENDED, "status" => status.to_string()).increment(1);
}

/// Count a telephony status callback.
pub fn inc_webhook_events(provider_status: &str) {
    counter!(METRIC_WEBHOOK_EVENTS, "status" => provider_status.to_string()).increment(1);
}

/// RAII guard for timing operations.
/// Automatically records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    metric_name: &'static str,
}

impl LatencyTimer {
    /// Create a new latency timer for the given metric.
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        let latency_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        histogram!(self.metric_name).record(latency_ms);
    }
}

/// Create a latency timer for password hashing.
pub fn timer_password_hash() -> LatencyTimer {
    LatencyTimer::new(METRIC_PASSWORD_HASH_LATENCY)
}
