//! Prometheus counters for the lookup flow.

use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec, TextEncoder};

pub static LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "chemid_lookups_total",
        "Identifier lookups by kind and outcome",
        &["kind", "outcome"]
    )
    .expect("register chemid_lookups_total")
});

pub static POLL_REQUESTS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "chemid_poll_requests_total",
        "Listkey follow-up requests sent to the compound-search service"
    )
    .expect("register chemid_poll_requests_total")
});

pub static CACHE_WRITE_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "chemid_cache_write_failures_total",
        "Cache writes that failed after a successful lookup"
    )
    .expect("register chemid_cache_write_failures_total")
});

pub fn record_lookup(kind: &str, outcome: &str) {
    LOOKUPS.with_label_values(&[kind, outcome]).inc();
}

pub fn render() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_else(|_| "Error encoding metrics".to_string())
}
