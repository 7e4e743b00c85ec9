//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{
    HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder,
};
use std::sync::Once;

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Pagination Metrics
    pub static ref FETCH_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("fedilist_fetch_requests_total", "Total number of collection page requests"),
        &["collection", "phase", "outcome"]
    ).expect("metric can be created");
    pub static ref FETCH_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "fedilist_fetch_duration_seconds",
            "Collection page request duration in seconds"
        ).buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["collection", "phase"]
    ).expect("metric can be created");
    pub static ref CURSOR_ITEMS: IntGaugeVec = IntGaugeVec::new(
        Opts::new("fedilist_cursor_items", "Current number of items held by a cursor"),
        &["collection"]
    ).expect("metric can be created");
    pub static ref PENDING_REQUESTS: IntGauge = IntGauge::new(
        "fedilist_pending_requests",
        "Requests currently shown on the loading indicator"
    ).expect("metric can be created");

    // Store Metrics
    pub static ref ENTITIES_IMPORTED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("fedilist_entities_imported_total", "Total number of entities imported into the store"),
        &["entity"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("fedilist_errors_total", "Total number of errors"),
        &["error_type", "collection"]
    ).expect("metric can be created");
}

static INIT: Once = Once::new();

/// Initialize metrics registry.
///
/// Safe to call more than once; registration happens on the first call only.
pub fn init_metrics() {
    INIT.call_once(|| {
        REGISTRY
            .register(Box::new(FETCH_REQUESTS_TOTAL.clone()))
            .expect("FETCH_REQUESTS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(FETCH_DURATION_SECONDS.clone()))
            .expect("FETCH_DURATION_SECONDS can be registered");
        REGISTRY
            .register(Box::new(CURSOR_ITEMS.clone()))
            .expect("CURSOR_ITEMS can be registered");
        REGISTRY
            .register(Box::new(PENDING_REQUESTS.clone()))
            .expect("PENDING_REQUESTS can be registered");
        REGISTRY
            .register(Box::new(ENTITIES_IMPORTED_TOTAL.clone()))
            .expect("ENTITIES_IMPORTED_TOTAL can be registered");
        REGISTRY
            .register(Box::new(ERRORS_TOTAL.clone()))
            .expect("ERRORS_TOTAL can be registered");

        tracing::info!("Metrics registry initialized");
    });
}

/// Render all registered metrics in Prometheus text format.
pub fn render() -> Result<String, crate::error::ClientError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    encoder
        .encode_to_string(&metric_families)
        .map_err(|e| crate::error::ClientError::Internal(e.into()))
}
