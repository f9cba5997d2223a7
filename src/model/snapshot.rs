//! Snapshot structures handed to the metrics builder on every tick.
//!
//! A snapshot is built fresh by each scrape and never cached between ticks.

use serde::{Deserialize, Serialize};

/// Access mode a filesystem is mounted with.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MountMode {
    #[default]
    Rw,
    Ro,
}

impl MountMode {
    /// Derives the mode from a comma-separated mount option string.
    pub fn from_options(options: &str) -> Self {
        if options.split(',').any(|opt| opt == "ro") {
            MountMode::Ro
        } else {
            MountMode::Rw
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MountMode::Rw => "rw",
            MountMode::Ro => "ro",
        }
    }
}

/// Capacity figures of a filesystem, in bytes.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
pub struct FilesystemUsage {
    /// Total size of the filesystem.
    pub total: u64,
    /// Bytes in use.
    pub used: u64,
    /// Bytes available to unprivileged users.
    pub free: u64,
    /// Bytes reserved for the superuser (`total - used - free`).
    pub reserved: u64,
}

impl FilesystemUsage {
    /// Fraction of the user-visible space that is in use, in `0.0..=1.0`.
    ///
    /// Reserved blocks are excluded from the denominator, matching what `df`
    /// shows as `Use%`.
    pub fn utilization(&self) -> f64 {
        let visible = self.used as f64 + self.free as f64;
        if visible == 0.0 {
            return 0.0;
        }
        self.used as f64 / visible
    }
}

/// Inode usage of a filesystem.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
pub struct InodeUsage {
    pub used: u64,
    pub free: u64,
}

/// State of a single mounted filesystem.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct FilesystemInfo {
    /// Backing device (e.g. `/dev/sda1`, `tmpfs`).
    pub device: String,
    /// Mount point as seen by the host, independent of `root_path`.
    pub mount_point: String,
    /// Filesystem type (e.g. `ext4`, `xfs`).
    pub fs_type: String,
    pub mode: MountMode,
    pub usage: FilesystemUsage,
    pub inodes: InodeUsage,
}

/// All filesystems observed in one scrape.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct Snapshot {
    /// Unix timestamp (seconds) the scrape started at.
    pub timestamp: i64,
    pub filesystems: Vec<FilesystemInfo>,
}

impl Snapshot {
    /// Returns the mount points in snapshot order.
    pub fn mount_points(&self) -> Vec<&str> {
        self.filesystems
            .iter()
            .map(|fs| fs.mount_point.as_str())
            .collect()
    }
}

/// A mount whose statistics could not be read during a scrape.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct MountFailure {
    pub device: String,
    pub mount_point: String,
    pub error: String,
}

/// Result of a successful scrape: the snapshot plus any per-mount failures.
///
/// A non-empty `failures` list makes this a partial result. The snapshot
/// still carries every mount that could be read.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct ScrapeOutput {
    pub snapshot: Snapshot,
    pub failures: Vec<MountFailure>,
}

impl ScrapeOutput {
    /// Returns `true` if at least one mount could not be read.
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}
