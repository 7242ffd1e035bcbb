use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, IntCounterVec, TextEncoder};

// Metrics registry
static LOGIN_ATTEMPTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "helpdesk_login_attempts_total",
        "Login attempts by outcome",
        &["outcome"]
    )
    .expect("login attempts counter registers once")
});

static RATE_LIMIT_EXCEEDED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "helpdesk_rate_limit_exceeded_total",
        "Requests rejected by a rate limiter",
        &["limiter"]
    )
    .expect("rate limit counter registers once")
});

static SESSION_GATE_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "helpdesk_session_gate_total",
        "Session gate decisions by outcome",
        &["outcome"]
    )
    .expect("session gate counter registers once")
});

static AUDIT_WRITE_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "helpdesk_audit_write_failures_total",
        "Audit entries that could not be persisted",
        &["action"]
    )
    .expect("audit failure counter registers once")
});

pub struct MetricsRecorder;

impl MetricsRecorder {
    pub fn record_login(outcome: &str) {
        LOGIN_ATTEMPTS_TOTAL.with_label_values(&[outcome]).inc();
    }

    pub fn record_rate_limit_exceeded(limiter: &str) {
        RATE_LIMIT_EXCEEDED_TOTAL.with_label_values(&[limiter]).inc();
    }

    pub fn record_session_gate(outcome: &str) {
        SESSION_GATE_TOTAL.with_label_values(&[outcome]).inc();
    }

    pub fn record_audit_failure(action: &str) {
        AUDIT_WRITE_FAILURES_TOTAL.with_label_values(&[action]).inc();
    }

    /// Export all metrics in Prometheus format
    pub fn export() -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = prometheus::gather();
        encoder.encode_to_string(&metric_families)
    }
}
