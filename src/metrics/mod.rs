//! Host metric collection and the data shapes pushed to the API.
//!
//! This module provides the [`MetricsProvider`] seam that reads CPU, memory and
//! disk usage, the default [`SystemCollector`] implementation, and the
//! [`Snapshot`] / [`MetricEntry`] types built from those readings.

pub mod collector;
pub mod data;
pub mod traits;

// Re-export commonly used items
pub use collector::SystemCollector;
pub use data::{DiskUsage, MetricEntry, Snapshot};
pub use traits::MetricsProvider;
