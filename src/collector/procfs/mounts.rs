//! Mount collector: enumerates mounted filesystems and reads their capacity.

use crate::collector::procfs::parser::{
    MountEntry, parse_mountinfo, parse_mounts, parse_virtual_fs_types,
};
use crate::collector::traits::{FileSystem, FsStats};
use crate::model::{FilesystemUsage, InodeUsage};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Error type for collection failures.
#[derive(Debug)]
pub enum CollectError {
    /// I/O error reading a mount table or querying a filesystem.
    Io(std::io::Error),
    /// Parse error in a mount table.
    Parse(String),
}

impl std::fmt::Display for CollectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectError::Io(e) => write!(f, "I/O error: {}", e),
            CollectError::Parse(msg) => write!(f, "parse error: {}", msg),
        }
    }
}

impl std::error::Error for CollectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectError::Io(e) => Some(e),
            CollectError::Parse(_) => None,
        }
    }
}

impl From<std::io::Error> for CollectError {
    fn from(e: std::io::Error) -> Self {
        CollectError::Io(e)
    }
}

/// Location of the mount table a scrape enumerates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountTable {
    pub mountinfo: PathBuf,
    /// Read when `mountinfo` is missing.
    pub mounts: PathBuf,
}

impl MountTable {
    /// Mount namespace of this process.
    pub fn own(proc_path: &str) -> Self {
        Self {
            mountinfo: PathBuf::from(format!("{}/self/mountinfo", proc_path)),
            mounts: PathBuf::from(format!("{}/mounts", proc_path)),
        }
    }

    /// Mount namespace of the host's init process, seen through the host
    /// filesystem mounted at `root`.
    pub fn host(root: &Path) -> Self {
        Self {
            mountinfo: root.join("proc/1/mountinfo"),
            mounts: root.join("proc/1/mounts"),
        }
    }
}

/// Collects the mount table and per-mount usage through a `FileSystem`.
pub struct MountCollector<F: FileSystem> {
    fs: F,
    proc_path: String,
}

impl<F: FileSystem> MountCollector<F> {
    /// Creates a new mount collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
        }
    }

    /// Mount table of this process's namespace under the collector's proc path.
    pub fn own_table(&self) -> MountTable {
        MountTable::own(&self.proc_path)
    }

    /// Enumerates mounted filesystems listed in `table`.
    ///
    /// Reads the `mountinfo` file, falling back to the `mounts` file on kernels
    /// or sandboxes that do not expose it. An empty mount table is an error:
    /// every Linux system has at least its root mount.
    pub fn collect_mounts(&self, table: &MountTable) -> Result<Vec<MountEntry>, CollectError> {
        let mounts = match self.fs.read_to_string(&table.mountinfo) {
            Ok(content) => parse_mountinfo(&content),
            Err(_) => {
                let content = self.fs.read_to_string(&table.mounts)?;
                parse_mounts(&content)
            }
        };

        if mounts.is_empty() {
            return Err(CollectError::Parse(format!(
                "no mounts found in {}",
                table.mountinfo.display()
            )));
        }

        Ok(mounts)
    }

    /// Collects the set of virtual filesystem types from `/proc/filesystems`.
    pub fn collect_virtual_fs_types(&self) -> Result<HashSet<String>, CollectError> {
        let path = format!("{}/filesystems", self.proc_path);
        let content = self.fs.read_to_string(Path::new(&path))?;
        parse_virtual_fs_types(&content).map_err(|e| CollectError::Parse(e.message))
    }

    /// Reads capacity and inode usage of the filesystem mounted at `path`.
    pub fn collect_usage(&self, path: &Path) -> Result<(FilesystemUsage, InodeUsage), CollectError> {
        let stats = self.fs.statfs(path)?;
        Ok(usage_from_stats(&stats))
    }
}

/// Reduces a mount table to the mounts visible at each mount point.
///
/// A later entry on the same mount point is stacked over the earlier ones,
/// and `statvfs` on that path reports the top mount. Only the last entry per
/// mount point is kept, in the position it appears in the table.
pub fn visible_mounts(mounts: Vec<MountEntry>) -> Vec<MountEntry> {
    let mut seen = HashSet::new();
    let mut visible: Vec<MountEntry> = mounts
        .into_iter()
        .rev()
        .filter(|m| seen.insert(m.mount_point.clone()))
        .collect();
    visible.reverse();
    visible
}

/// Converts raw `statvfs` figures into byte and inode usage.
///
/// `used` counts blocks not free for anyone; `free` is what unprivileged
/// users may still allocate; `reserved` is the remainder kept for root.
pub fn usage_from_stats(stats: &FsStats) -> (FilesystemUsage, InodeUsage) {
    let total = stats.blocks.saturating_mul(stats.fragment_size);
    let used = stats
        .blocks
        .saturating_sub(stats.blocks_free)
        .saturating_mul(stats.fragment_size);
    let free = stats.blocks_available.saturating_mul(stats.fragment_size);
    let reserved = total.saturating_sub(used).saturating_sub(free);

    let usage = FilesystemUsage {
        total,
        used,
        free,
        reserved,
    };
    let inodes = InodeUsage {
        used: stats.files.saturating_sub(stats.files_free),
        free: stats.files_free,
    };

    (usage, inodes)
}
