//! Lightweight in-process enforcement metrics.
//!
//! Counters and histograms are stored as atomics and rendered in Prometheus
//! text format so operators can tell denials apart from unavailable policy
//! services.

pub mod metrics;

pub use metrics::EnforcementMetrics;
