//! Counters for access decisions, chain routing and listener delivery.
//!
//! Recording goes through the `metrics` facade. Nothing is exported unless
//! the embedding application installs a recorder.

use metrics::{counter, describe_counter};

use crate::access::Decision;

pub const DECISIONS_TOTAL: &str = "geoguard_decisions_total";
pub const CHAIN_RESOLUTIONS_TOTAL: &str = "geoguard_chain_resolutions_total";
pub const ROUTING_MISSES_TOTAL: &str = "geoguard_routing_misses_total";
pub const LISTENER_FAILURES_TOTAL: &str = "geoguard_listener_failures_total";
pub const ERRORS_TOTAL: &str = "geoguard_errors_total";

/// Register descriptions for every geoguard counter.
pub fn describe_metrics() {
    describe_counter!(DECISIONS_TOTAL, "Access decisions by outcome");
    describe_counter!(CHAIN_RESOLUTIONS_TOTAL, "Request paths resolved, by chain name");
    describe_counter!(ROUTING_MISSES_TOTAL, "Request paths no chain matched");
    describe_counter!(LISTENER_FAILURES_TOTAL, "Security listeners that failed a notification");
    describe_counter!(ERRORS_TOTAL, "Errors by code, category and severity");
}

pub fn record_decision(decision: &Decision) {
    counter!(DECISIONS_TOTAL, "outcome" => decision.outcome_label()).increment(1);
}

pub fn record_resolution(chain: &str) {
    counter!(CHAIN_RESOLUTIONS_TOTAL, "chain" => chain.to_string()).increment(1);
}

pub fn record_routing_miss() {
    counter!(ROUTING_MISSES_TOTAL).increment(1);
}

pub fn record_listener_failures(count: usize) {
    if count > 0 {
        counter!(LISTENER_FAILURES_TOTAL).increment(count as u64);
    }
}
