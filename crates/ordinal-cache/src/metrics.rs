//! Cache counters.

use metrics::{counter, gauge};

/// Metric names as constants for consistency.
pub mod names {
    pub const CACHE_HITS_TOTAL: &str = "cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "cache_misses_total";
    pub const CACHE_ERRORS_TOTAL: &str = "cache_errors_total";
    pub const CACHE_ENTRIES: &str = "cache_entries";
}

pub fn record_cache_hit(mode: &'static str) {
    counter!(names::CACHE_HITS_TOTAL, "mode" => mode).increment(1);
}

pub fn record_cache_miss(mode: &'static str) {
    counter!(names::CACHE_MISSES_TOTAL, "mode" => mode).increment(1);
}

/// `operation` is one of `get`, `set`, `delete`.
pub fn record_cache_error(mode: &'static str, operation: &'static str) {
    counter!(names::CACHE_ERRORS_TOTAL, "mode" => mode, "operation" => operation).increment(1);
}

pub fn set_cache_entries(count: usize) {
    gauge!(names::CACHE_ENTRIES).set(count as f64);
}
