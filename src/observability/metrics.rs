//! # Metrics
//!
//! Prometheus metrics for monitoring cache effectiveness and backend traffic.
//!
//! ## Metrics Exposed
//!
//! - `paramstore_backend_requests_total` - Backend calls by backend and operation
//! - `paramstore_backend_errors_total` - Failed backend calls by backend and operation
//! - `paramstore_backend_request_duration_seconds` - Duration of backend calls
//! - `paramstore_cache_hits_total` - Leaf reads served from the cache
//! - `paramstore_cache_evictions_total` - Cached leaf values dropped (expired or caching disabled)
//! - `paramstore_refreshes_total` - Key tree rebuilds

use anyhow::Result;
use prometheus::{Encoder, HistogramVec, IntCounter, IntCounterVec, Registry, TextEncoder};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static BACKEND_REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "paramstore_backend_requests_total",
            "Total number of backend requests",
        ),
        &["backend", "operation"],
    )
    .expect("Failed to create BACKEND_REQUESTS_TOTAL metric - this should never happen")
});

static BACKEND_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "paramstore_backend_errors_total",
            "Total number of failed backend requests",
        ),
        &["backend", "operation"],
    )
    .expect("Failed to create BACKEND_ERRORS_TOTAL metric - this should never happen")
});

static BACKEND_REQUEST_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "paramstore_backend_request_duration_seconds",
            "Duration of backend requests in seconds",
        )
        .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["backend", "operation"],
    )
    .expect("Failed to create BACKEND_REQUEST_DURATION metric - this should never happen")
});

static CACHE_HITS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "paramstore_cache_hits_total",
        "Total number of parameter reads served from the cache",
    )
    .expect("Failed to create CACHE_HITS_TOTAL metric - this should never happen")
});

static CACHE_EVICTIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "paramstore_cache_evictions_total",
        "Total number of cached parameter values evicted",
    )
    .expect("Failed to create CACHE_EVICTIONS_TOTAL metric - this should never happen")
});

static REFRESHES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "paramstore_refreshes_total",
        "Total number of key tree refreshes",
    )
    .expect("Failed to create REFRESHES_TOTAL metric - this should never happen")
});

/// Register all metrics with the crate registry
///
/// Call once at startup; a second call fails with `AlreadyReg`.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(BACKEND_REQUESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(BACKEND_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(BACKEND_REQUEST_DURATION.clone()))?;
    REGISTRY.register(Box::new(CACHE_HITS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CACHE_EVICTIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REFRESHES_TOTAL.clone()))?;

    Ok(())
}

/// Render registered metrics in the Prometheus text exposition format
pub fn gather_text() -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

pub fn record_backend_request(backend: &str, operation: &str, duration: f64) {
    BACKEND_REQUESTS_TOTAL
        .with_label_values(&[backend, operation])
        .inc();
    BACKEND_REQUEST_DURATION
        .with_label_values(&[backend, operation])
        .observe(duration);
}

pub fn increment_backend_errors(backend: &str, operation: &str) {
    BACKEND_ERRORS_TOTAL
        .with_label_values(&[backend, operation])
        .inc();
}

pub fn increment_cache_hits() {
    CACHE_HITS_TOTAL.inc();
}

pub fn increment_cache_evictions() {
    CACHE_EVICTIONS_TOTAL.inc();
}

pub fn increment_refreshes() {
    REFRESHES_TOTAL.inc();
}
