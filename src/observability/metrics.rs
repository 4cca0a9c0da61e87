//! Metrics for the cleaning step.
//!
//! Names follow the Prometheus conventions under a `listings_` prefix. No
//! exporter is installed by this crate; recording goes through the `metrics`
//! facade so the embedding process can attach a recorder.

/// Metrics for traffic against the artifact store.
pub struct StoreMetrics;

impl StoreMetrics {
    /// Record a successful artifact fetch
    pub fn record_fetch_success(duration_secs: f64, payload_bytes: u64) {
        ::metrics::counter!("listings_store_fetch_success_total").increment(1);
        ::metrics::histogram!("listings_store_fetch_duration_seconds").record(duration_secs);
        ::metrics::histogram!("listings_store_payload_bytes").record(payload_bytes as f64);
    }

    /// Record a failed artifact fetch
    pub fn record_fetch_error() {
        ::metrics::counter!("listings_store_fetch_error_total").increment(1);
    }

    /// Record a successful publish
    pub fn record_publish_success(duration_secs: f64, payload_bytes: u64) {
        ::metrics::counter!("listings_store_publish_success_total").increment(1);
        ::metrics::histogram!("listings_store_publish_duration_seconds").record(duration_secs);
        ::metrics::histogram!("listings_store_payload_bytes").record(payload_bytes as f64);
    }

    /// Record a failed publish
    pub fn record_publish_error() {
        ::metrics::counter!("listings_store_publish_error_total").increment(1);
    }

    /// Record a publish that matched existing content byte for byte
    pub fn record_publish_deduplicated() {
        ::metrics::counter!("listings_store_publish_deduplicated_total").increment(1);
    }
}

/// Metrics for the filter passes.
pub struct CleaningMetrics;

impl CleaningMetrics {
    pub fn record_rows_in(count: usize) {
        ::metrics::counter!("listings_cleaning_rows_in_total").increment(count as u64);
    }

    pub fn record_rows_out(count: usize) {
        ::metrics::counter!("listings_cleaning_rows_out_total").increment(count as u64);
    }

    /// Record rows dropped by one filter pass
    pub fn record_rows_dropped(filter: &'static str, count: usize) {
        ::metrics::counter!("listings_cleaning_rows_dropped_total", "filter" => filter)
            .increment(count as u64);
    }

    pub fn record_step_duration(duration_secs: f64) {
        ::metrics::histogram!("listings_cleaning_step_duration_seconds").record(duration_secs);
    }
}
