//! Turns snapshots into named metric data points.
//!
//! Which metrics are emitted is controlled by [`MetricsConfig`]. Each point
//! carries the mount's `device`, `mountpoint`, `type` and `mode` attributes.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::MetricsConfig;
use crate::model::{FilesystemInfo, Snapshot};

pub const FILESYSTEM_USAGE: &str = "system.filesystem.usage";
pub const FILESYSTEM_INODES_USAGE: &str = "system.filesystem.inodes.usage";
pub const FILESYSTEM_UTILIZATION: &str = "system.filesystem.utilization";

/// Value of a data point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Int(u64),
    Double(f64),
}

/// A single data point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricPoint {
    pub name: &'static str,
    pub unit: &'static str,
    pub timestamp: i64,
    pub attributes: BTreeMap<&'static str, String>,
    pub value: MetricValue,
}

/// Builds metric points from snapshots according to the emission toggles.
#[derive(Debug, Clone)]
pub struct MetricsBuilder {
    config: MetricsConfig,
}

impl MetricsBuilder {
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// Emits the enabled metrics for every filesystem in `snapshot`.
    pub fn build(&self, snapshot: &Snapshot) -> Vec<MetricPoint> {
        let mut points = Vec::new();

        for fs in &snapshot.filesystems {
            if self.config.usage.enabled {
                for (state, bytes) in [
                    ("used", fs.usage.used),
                    ("free", fs.usage.free),
                    ("reserved", fs.usage.reserved),
                ] {
                    points.push(point(
                        FILESYSTEM_USAGE,
                        "By",
                        snapshot.timestamp,
                        fs,
                        Some(state),
                        MetricValue::Int(bytes),
                    ));
                }
            }

            if self.config.inodes_usage.enabled {
                for (state, count) in [("used", fs.inodes.used), ("free", fs.inodes.free)] {
                    points.push(point(
                        FILESYSTEM_INODES_USAGE,
                        "{inodes}",
                        snapshot.timestamp,
                        fs,
                        Some(state),
                        MetricValue::Int(count),
                    ));
                }
            }

            if self.config.utilization.enabled {
                points.push(point(
                    FILESYSTEM_UTILIZATION,
                    "1",
                    snapshot.timestamp,
                    fs,
                    None,
                    MetricValue::Double(fs.usage.utilization()),
                ));
            }
        }

        points
    }
}

fn point(
    name: &'static str,
    unit: &'static str,
    timestamp: i64,
    fs: &FilesystemInfo,
    state: Option<&str>,
    value: MetricValue,
) -> MetricPoint {
    let mut attributes = BTreeMap::new();
    attributes.insert("device", fs.device.clone());
    attributes.insert("mountpoint", fs.mount_point.clone());
    attributes.insert("type", fs.fs_type.clone());
    attributes.insert("mode", fs.mode.as_str().to_string());
    if let Some(state) = state {
        attributes.insert("state", state.to_string());
    }

    MetricPoint {
        name,
        unit,
        timestamp,
        attributes,
        value,
    }
}
