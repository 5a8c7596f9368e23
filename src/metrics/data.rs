//! Data structures for host metrics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::MetricFlag;

/// A point-in-time capture of host resource readings.
///
/// A reading that could not be taken is `None` and is left out of the
/// pushed metric list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Used memory in megabytes
    pub memory: Option<f64>,
    /// CPU usage percentage (0.0 to 100.0)
    pub cpu: Option<f64>,
    /// Usage of the monitored disk
    pub disk: Option<DiskUsage>,
    /// When the readings were taken
    pub taken_at: DateTime<Utc>,
}

impl Snapshot {
    /// Create a snapshot stamped with the current time.
    pub fn new(memory: Option<f64>, cpu: Option<f64>, disk: Option<DiskUsage>) -> Self {
        Self {
            memory,
            cpu,
            disk,
            taken_at: Utc::now(),
        }
    }

    /// Build the metric entries enabled by `flags`, in CPU, memory, drive order.
    pub fn metric_entries(&self, flags: &[MetricFlag]) -> Vec<MetricEntry> {
        let mut list = Vec::new();

        if flags.contains(&MetricFlag::Cpu) {
            if let Some(cpu) = self.cpu {
                list.push(MetricEntry::new("cpu", cpu).describe("CPU", "percentage", "donut"));
            }
        }

        if flags.contains(&MetricFlag::Memory) {
            if let Some(memory) = self.memory {
                list.push(
                    MetricEntry::new("memory", memory).describe("Memory {{}}MB", "average", "area"),
                );
            }
        }

        if flags.contains(&MetricFlag::Drive) {
            if let Some(disk) = &self.disk {
                list.push(
                    MetricEntry::new("disk_primary", disk.capacity).describe(
                        format!("Disk {}", disk.name),
                        "percentage",
                        "pie",
                    ),
                );
            }
        }

        list
    }
}

/// Usage of one filesystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskUsage {
    /// Display name: `root` for `/`, otherwise the directory
    pub name: String,
    /// Used space percentage (0.0 to 100.0)
    pub capacity: f64,
}

/// One metric as sent to the API.
///
/// `label`, `type` and `widget` are omitted from the payload when unset.
/// A label may carry a suffix marker: `"Memory {{}}MB"` displays values with
/// an `MB` suffix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEntry {
    pub key: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// How the API aggregates the metric, e.g. `counter`, `average`, `percentage`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Chart used on the dashboard, e.g. `line`, `area`, `pie`, `donut`, `radar`, `heatmap`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget: Option<String>,
}

impl MetricEntry {
    pub fn new(key: impl Into<String>, value: f64) -> Self {
        Self {
            key: key.into(),
            value,
            label: None,
            kind: None,
            widget: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_widget(mut self, widget: impl Into<String>) -> Self {
        self.widget = Some(widget.into());
        self
    }

    fn describe(self, label: impl Into<String>, kind: &str, widget: &str) -> Self {
        self.with_label(label).with_kind(kind).with_widget(widget)
    }
}
