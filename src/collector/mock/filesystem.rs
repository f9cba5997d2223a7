//! In-memory mock filesystem for testing collectors without a real host.
//!
//! This module provides `MockFs` which simulates mount tables and `statvfs`
//! results in memory, allowing tests to run on any platform.

use crate::collector::traits::{FileSystem, FsStats};
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory filesystem for testing.
///
/// Stores files, directories and per-path `statvfs` results. Clones share the
/// `statfs` call counter so tests can observe calls made through a scraper
/// that owns its own copy.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    /// Map from path to file contents.
    files: HashMap<PathBuf, String>,
    /// Set of directories.
    directories: HashSet<PathBuf>,
    /// Map from path to `statvfs` result.
    stats: HashMap<PathBuf, FsStats>,
    /// Paths whose `statvfs` call fails with the given error kind.
    stat_errors: HashMap<PathBuf, io::ErrorKind>,
    statfs_calls: Arc<AtomicUsize>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file with the given content.
    ///
    /// Parent directories are automatically created.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.files.insert(path, content.into());
    }

    /// Adds an empty directory.
    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.directories.insert(path);
    }

    /// Registers the `statvfs` result for a mount point.
    ///
    /// The mount point itself is added as a directory.
    pub fn add_mount_stats(&mut self, path: impl AsRef<Path>, stats: FsStats) {
        let path = path.as_ref().to_path_buf();
        self.add_dir(&path);
        self.stat_errors.remove(&path);
        self.stats.insert(path, stats);
    }

    /// Makes `statvfs` on `path` fail with the given error kind.
    pub fn fail_statfs(&mut self, path: impl AsRef<Path>, kind: io::ErrorKind) {
        self.stat_errors.insert(path.as_ref().to_path_buf(), kind);
    }

    /// Removes a file, e.g. to simulate an unreadable mount table.
    pub fn remove_file(&mut self, path: impl AsRef<Path>) {
        self.files.remove(path.as_ref());
    }

    /// Number of `statfs` calls made on this filesystem and all its clones.
    pub fn statfs_calls(&self) -> usize {
        self.statfs_calls.load(Ordering::SeqCst)
    }

    fn add_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                self.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {:?}", path),
            )
        })
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.directories.contains(path)
    }

    fn statfs(&self, path: &Path) -> io::Result<FsStats> {
        self.statfs_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(kind) = self.stat_errors.get(path) {
            return Err(io::Error::new(
                *kind,
                format!("statfs failed: {:?}", path),
            ));
        }

        self.stats.get(path).copied().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no filesystem at {:?}", path),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_fs_add_file() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/filesystems", "nodev\tproc\n");

        assert!(fs.exists(Path::new("/proc/filesystems")));
        assert!(fs.exists(Path::new("/proc")));

        let content = fs.read_to_string(Path::new("/proc/filesystems")).unwrap();
        assert_eq!(content, "nodev\tproc\n");
    }

    #[test]
    fn test_mock_fs_not_found() {
        let fs = MockFs::new();
        let result = fs.read_to_string(Path::new("/nonexistent"));
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_mock_fs_statfs() {
        let mut fs = MockFs::new();
        let stats = FsStats {
            fragment_size: 4096,
            blocks: 100,
            blocks_free: 40,
            blocks_available: 30,
            files: 10,
            files_free: 5,
        };
        fs.add_mount_stats("/data", stats);

        assert!(fs.exists(Path::new("/data")));
        assert_eq!(fs.statfs(Path::new("/data")).unwrap(), stats);
        assert_eq!(
            fs.statfs(Path::new("/other")).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }

    #[test]
    fn test_mock_fs_fail_statfs_and_counter() {
        let mut fs = MockFs::new();
        fs.add_mount_stats("/data", FsStats::default());
        fs.fail_statfs("/data", io::ErrorKind::PermissionDenied);

        let clone = fs.clone();
        let err = clone.statfs(Path::new("/data")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);

        // The counter is shared between clones
        assert_eq!(fs.statfs_calls(), 1);
    }
}
