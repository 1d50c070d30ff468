//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("visit_iraq_http_requests_total", "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    ).expect("metric can be created");
    pub static ref HTTP_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "visit_iraq_http_request_duration_seconds",
            "HTTP request duration in seconds"
        ).buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["method", "endpoint"]
    ).expect("metric can be created");

    // Database Metrics
    pub static ref DB_QUERIES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("visit_iraq_db_queries_total", "Total number of database queries"),
        &["operation", "table"]
    ).expect("metric can be created");

    // Domain Metrics
    pub static ref LISTINGS_CREATED_TOTAL: IntCounter = IntCounter::new(
        "visit_iraq_listings_created_total",
        "Total number of listings submitted"
    ).expect("metric can be created");
    pub static ref MODERATION_ACTIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("visit_iraq_moderation_actions_total", "Total number of admin moderation actions"),
        &["action"]
    ).expect("metric can be created");
    pub static ref ROLE_CHANGES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("visit_iraq_role_changes_total", "Total number of role assignments"),
        &["role"]
    ).expect("metric can be created");
    pub static ref ADMIN_LOGINS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("visit_iraq_admin_logins_total", "Operator login attempts"),
        &["outcome"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("visit_iraq_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
///
/// Safe to call more than once; repeated registrations are ignored.
pub fn init_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(HTTP_REQUESTS_TOTAL.clone()),
        Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()),
        Box::new(DB_QUERIES_TOTAL.clone()),
        Box::new(LISTINGS_CREATED_TOTAL.clone()),
        Box::new(MODERATION_ACTIONS_TOTAL.clone()),
        Box::new(ROLE_CHANGES_TOTAL.clone()),
        Box::new(ADMIN_LOGINS_TOTAL.clone()),
        Box::new(ERRORS_TOTAL.clone()),
    ];

    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(error) => tracing::warn!(%error, "Failed to register metric"),
        }
    }

    tracing::info!("Metrics registry initialized");
}

/// Record a completed request against the per-endpoint counter.
pub fn record_request(method: &str, endpoint: &str, status: u16) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, endpoint, &status.to_string()])
        .inc();
}

/// Record a database query by operation and table.
pub fn record_query(operation: &str, table: &str) {
    DB_QUERIES_TOTAL.with_label_values(&[operation, table]).inc();
}
