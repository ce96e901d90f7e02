//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{Histogram, HistogramOpts, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Thread Metrics
    pub static ref THREADS_OPENED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("socialgraph_threads_opened_total", "Total number of open-thread calls by outcome"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref THREAD_REQUESTS_CREATED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("socialgraph_thread_requests_created_total", "Total number of thread requests created by initial status"),
        &["status"]
    ).expect("metric can be created");

    // Relationship Metrics
    pub static ref RELATIONSHIP_BATCH_SIZE: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "socialgraph_relationship_batch_size",
            "Number of targets resolved per relationship status batch"
        ).buckets(vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0])
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("socialgraph_errors_total", "Total number of errors returned to callers"),
        &["type"]
    ).expect("metric can be created");
}

/// Outcome label for `THREADS_OPENED_TOTAL`
pub fn record_thread_opened(outcome: &str) {
    THREADS_OPENED_TOTAL.with_label_values(&[outcome]).inc();
}

/// Initialize metrics registry
///
/// Registers all metrics with the global registry.
/// Should be called once at application startup.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(THREADS_OPENED_TOTAL.clone()))
        .expect("THREADS_OPENED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(THREAD_REQUESTS_CREATED_TOTAL.clone()))
        .expect("THREAD_REQUESTS_CREATED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(RELATIONSHIP_BATCH_SIZE.clone()))
        .expect("RELATIONSHIP_BATCH_SIZE can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}
