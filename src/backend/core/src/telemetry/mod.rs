//! Telemetry: structured logging and counters.
//!
//! # Example
//!
//! ```rust,no_run
//! use geoguard_core::telemetry::{init_telemetry, LoggingConfig};
//!
//! init_telemetry(&LoggingConfig::default(), "production").expect("Failed to initialize telemetry");
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{build_filter, init_logging, LogFormat, LoggingConfig, SpanEventConfig};
pub use metrics::describe_metrics;

/// Initialize logging and register metric descriptions.
///
/// Call once at application startup.
pub fn init_telemetry(logging: &LoggingConfig, environment: &str) -> anyhow::Result<()> {
    describe_metrics();
    init_logging(logging, environment)
}
