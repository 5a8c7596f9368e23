//! Traits for host metric collection.

use crate::error::Result;
use crate::metrics::data::DiskUsage;

/// Source of raw host readings.
///
/// Implementations wrap the platform-specific calls. Each reading is
/// independent: a failure in one does not prevent the others from being
/// taken, and the client reports a failed reading as an absent field.
pub trait MetricsProvider: Send + Sync {
    /// Used memory in megabytes.
    fn read_memory_mb(&self) -> Result<f64>;

    /// CPU utilisation as a percentage in `[0, 100]`.
    ///
    /// May block while sampling; the default collector waits one second
    /// between two reads.
    fn read_cpu_percent(&self) -> Result<f64>;

    /// Usage of the filesystem holding `directory`.
    fn read_disk_usage(&self, directory: &str) -> Result<DiskUsage>;
}
