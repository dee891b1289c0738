//! Relay counters.

use metrics::{counter, gauge};

/// Metric names as constants for consistency.
pub mod names {
    pub const RELAY_ENQUEUED_TOTAL: &str = "relay_enqueued_total";
    pub const RELAY_PUBLISHED_TOTAL: &str = "relay_published_total";
    pub const RELAY_PUBLISH_FAILED_TOTAL: &str = "relay_publish_failed_total";
    pub const RELAY_DROPPED_TOTAL: &str = "relay_dropped_total";
    pub const RELAY_QUEUE_DEPTH: &str = "relay_queue_depth";
}

pub fn record_enqueued(depth: usize) {
    counter!(names::RELAY_ENQUEUED_TOTAL).increment(1);
    gauge!(names::RELAY_QUEUE_DEPTH).set(depth as f64);
}

pub fn record_published(sink: &'static str) {
    counter!(names::RELAY_PUBLISHED_TOTAL, "sink" => sink).increment(1);
}

pub fn record_publish_failed(sink: &'static str) {
    counter!(names::RELAY_PUBLISH_FAILED_TOTAL, "sink" => sink).increment(1);
}

/// `reason` is `full` or `closed`.
pub fn record_dropped(reason: &'static str) {
    counter!(names::RELAY_DROPPED_TOTAL, "reason" => reason).increment(1);
}
