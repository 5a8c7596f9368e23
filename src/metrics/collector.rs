//! Default host metrics provider using sysinfo and direct /proc access.

use std::path::Path;
use std::thread;
use std::time::Duration;

use sysinfo::{Disks, System};

use crate::error::{Result, TetheredError};
use crate::metrics::{data::DiskUsage, traits::MetricsProvider};

/// Wall-clock gap between the two CPU counter reads.
pub const CPU_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Directory whose filesystem is reported when no `disk.directory` modifier changes it.
pub fn default_disk_directory() -> &'static str {
    if cfg!(windows) {
        "C:"
    } else {
        "/"
    }
}

/// Name shown for a disk directory in the `Disk {name}` label.
pub fn disk_display_name(directory: &str) -> String {
    if directory == "/" {
        "root".to_string()
    } else {
        directory.to_string()
    }
}

/// Host metrics collector.
///
/// Every reading queries the OS afresh; nothing is cached between calls.
/// [`read_cpu_percent`](MetricsProvider::read_cpu_percent) blocks the calling
/// thread for the sample interval.
#[derive(Debug, Clone)]
pub struct SystemCollector {
    sample_interval: Duration,
}

impl SystemCollector {
    /// Create a collector with the standard one-second CPU sample.
    pub fn new() -> Self {
        Self {
            sample_interval: CPU_SAMPLE_INTERVAL,
        }
    }

    /// Use a different gap between CPU counter reads.
    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    #[cfg(target_os = "linux")]
    fn sample_cpu(&self) -> Result<f64> {
        let first = read_proc_stat()?;
        thread::sleep(self.sample_interval);
        let second = read_proc_stat()?;

        second
            .usage_since(&first)
            .ok_or_else(|| TetheredError::metrics_error("CPU counters did not advance"))
    }

    #[cfg(not(target_os = "linux"))]
    fn sample_cpu(&self) -> Result<f64> {
        let mut system = System::new();
        system.refresh_cpu_usage();
        thread::sleep(self.sample_interval.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL));
        system.refresh_cpu_usage();

        Ok(f64::from(system.global_cpu_usage()))
    }
}

impl Default for SystemCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsProvider for SystemCollector {
    fn read_memory_mb(&self) -> Result<f64> {
        let mut system = System::new();
        system.refresh_memory();

        if system.total_memory() == 0 {
            return Err(TetheredError::metrics_error("No memory information available"));
        }

        Ok(system.used_memory() as f64 / 1024.0 / 1024.0)
    }

    fn read_cpu_percent(&self) -> Result<f64> {
        self.sample_cpu().map(|usage| usage.clamp(0.0, 100.0))
    }

    fn read_disk_usage(&self, directory: &str) -> Result<DiskUsage> {
        // A bare drive letter names the drive root
        let target = if directory.ends_with(':') {
            format!("{directory}\\")
        } else {
            directory.to_string()
        };
        let target = Path::new(&target);

        let disks = Disks::new_with_refreshed_list();
        let disk = disks
            .iter()
            .filter(|disk| target.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len())
            .ok_or_else(|| {
                TetheredError::metrics_error(format!("No mounted filesystem holds {directory}"))
            })?;

        let total = disk.total_space();
        if total == 0 {
            return Err(TetheredError::metrics_error(format!(
                "Filesystem at {} reports no capacity",
                disk.mount_point().display()
            )));
        }
        let used = total.saturating_sub(disk.available_space());

        Ok(DiskUsage {
            name: disk_display_name(directory),
            capacity: used as f64 / total as f64 * 100.0,
        })
    }
}

/// Aggregate CPU time counters from the `cpu` line of `/proc/stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
}

impl CpuTimes {
    /// Parse the aggregate `cpu` line out of a `/proc/stat` dump.
    pub fn parse(stat: &str) -> Option<Self> {
        stat.lines().find_map(|line| {
            let mut fields = line.split_whitespace();
            if fields.next()? != "cpu" {
                return None;
            }
            let mut next = || fields.next()?.parse::<u64>().ok();
            Some(Self {
                user: next()?,
                nice: next()?,
                system: next()?,
                idle: next()?,
            })
        })
    }

    fn total(&self) -> u64 {
        self.user + self.nice + self.system + self.idle
    }

    /// Busy percentage between an earlier sample and this one.
    ///
    /// `None` when no time elapsed between the two samples.
    pub fn usage_since(&self, earlier: &CpuTimes) -> Option<f64> {
        let total = self.total().saturating_sub(earlier.total());
        if total == 0 {
            return None;
        }
        let idle = self.idle.saturating_sub(earlier.idle);

        Some(100.0 - (idle as f64 * 100.0 / total as f64))
    }
}

#[cfg(target_os = "linux")]
fn read_proc_stat() -> Result<CpuTimes> {
    let stat = std::fs::read_to_string("/proc/stat")?;
    CpuTimes::parse(&stat)
        .ok_or_else(|| TetheredError::metrics_error("No aggregate cpu line in /proc/stat"))
}
