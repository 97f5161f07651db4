use lazy_static::lazy_static;
use prometheus::{
    Counter, Encoder, Gauge, Histogram, TextEncoder, register_counter, register_gauge,
    register_histogram,
};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("url_tracker_requests_total", "Total number of API requests").unwrap();
    pub static ref THROTTLED_TOTAL: Counter =
        register_counter!("url_tracker_throttled_total", "Requests rejected by the throttle").unwrap();
    pub static ref FETCH_SUCCESS: Counter =
        register_counter!("url_tracker_fetch_success_total", "Successful background fetches").unwrap();
    pub static ref FETCH_FAILURE: Counter =
        register_counter!("url_tracker_fetch_failure_total", "Failed background fetches").unwrap();
    pub static ref FETCH_LATENCY: Histogram = register_histogram!(
        "url_tracker_fetch_latency_seconds",
        "Background fetch latency in seconds"
    )
    .unwrap();
    pub static ref TRACKED_URLS: Gauge =
        register_gauge!("url_tracker_tracked_urls", "Current number of tracked URLs").unwrap();
    pub static ref SNAPSHOT_FAILURES: Counter =
        register_counter!("url_tracker_snapshot_failures_total", "Failed snapshot saves").unwrap();
}

// Text exposition of every registered metric
pub fn render() -> Result<String, String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| e.to_string())?;
    String::from_utf8(buffer).map_err(|e| e.to_string())
}
