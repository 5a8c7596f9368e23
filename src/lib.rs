//! # Tethered - uptime and host metrics reporting
//!
//! A small blocking client for the [Tethered](https://tethered.app) monitoring
//! service. It pushes uptime status, host resource usage (CPU, memory, disk),
//! custom metrics and incidents for one monitor.
//!
//! ## Features
//!
//! - **Status and metrics sync**: one [`Tethered::sync`] call pushes an uptime
//!   status and a host snapshot
//! - **Modifiers**: ordered, typed transforms applied to data before it is sent
//! - **Listeners**: observers for lifecycle events such as `ready`,
//!   `status.complete` or `request.complete`
//! - **Defensive transport**: every call returns a [`RequestResult`]; network
//!   and decoding failures are recorded on it instead of being raised
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tethered::{tags, ClientOptions, Tethered};
//!
//! let options = ClientOptions::new()
//!     .with_apikey("your-api-key")
//!     .with_monitor_id(42)
//!     .with_modifier(tags::STATUS_TIME, |_: u64| 120)
//!     .with_listener(tags::STATUS_COMPLETE, |result: &tethered::RequestResult| {
//!         println!("status pushed: {}", result.success);
//!     });
//!
//! let client = Tethered::new(options);
//!
//! // Call on your own schedule (cron, timer, ...)
//! client.sync();
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod hooks;
pub mod metrics;

// Re-export public API
pub use api::{Method, Page, RequestInfo, RequestResult};
pub use client::{SyncReport, Tethered};
pub use config::{ClientOptions, Configuration, MetricFlag, SyncFlag, TransportOptions};
pub use error::{Result, TetheredError};
pub use hooks::{tags, HookRegistry, Listener, Modifier, Tag};
pub use metrics::{DiskUsage, MetricEntry, MetricsProvider, Snapshot, SystemCollector};

/// Root of the Tethered API
pub const API_BASE: &str = "https://tethered.app/app/api";

/// API version, used as the `v{N}` path segment
pub const API_VERSION: u32 = 1;

/// Status code pushed by `sync`
pub const DEFAULT_STATUS_CODE: u16 = 200;

/// Response time pushed by `sync`
pub const DEFAULT_STATUS_TIME: u64 = 0;
