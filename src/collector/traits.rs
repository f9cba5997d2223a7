//! Abstractions for filesystem access to enable testing and mocking.
//!
//! The `FileSystem` trait lets the scraper read mount tables and usage
//! statistics from the real host or from an in-memory mock in tests.

use std::io;
use std::path::Path;

/// Raw figures returned by `statvfs(3)`.
///
/// Block counts are in units of `fragment_size`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FsStats {
    pub fragment_size: u64,
    pub blocks: u64,
    pub blocks_free: u64,
    pub blocks_available: u64,
    pub files: u64,
    pub files_free: u64,
}

/// Abstraction for filesystem operations.
///
/// This trait allows collectors to read from the real filesystem or from
/// a mock implementation for testing purposes.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a string.
    ///
    /// # Arguments
    /// * `path` - Path to the file to read
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Checks if a path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Reads capacity statistics of the filesystem containing `path`.
    ///
    /// # Arguments
    /// * `path` - Any path on the filesystem, usually its mount point
    ///
    /// # Returns
    /// The raw `statvfs` figures, or an I/O error if the mount cannot be queried
    /// (e.g. it disappeared or is a stale network mount).
    fn statfs(&self, path: &Path) -> io::Result<FsStats>;
}

/// Real filesystem implementation that delegates to `std::fs` and `statvfs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    /// Creates a new `RealFs` instance.
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    #[cfg(unix)]
    #[allow(clippy::unnecessary_cast)]
    fn statfs(&self, path: &Path) -> io::Result<FsStats> {
        let stat = nix::sys::statvfs::statvfs(path)?;

        Ok(FsStats {
            fragment_size: stat.fragment_size() as u64,
            blocks: stat.blocks() as u64,
            blocks_free: stat.blocks_free() as u64,
            blocks_available: stat.blocks_available() as u64,
            files: stat.files() as u64,
            files_free: stat.files_free() as u64,
        })
    }

    #[cfg(not(unix))]
    fn statfs(&self, path: &Path) -> io::Result<FsStats> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("statvfs is not available for {:?}", path),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_real_fs_read_to_string() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ext4").unwrap();

        let fs = RealFs::new();
        let content = fs.read_to_string(file.path()).unwrap();
        assert_eq!(content, "ext4\n");
    }

    #[test]
    fn test_real_fs_exists() {
        let dir = tempfile::tempdir().unwrap();
        let fs = RealFs::new();
        assert!(fs.exists(dir.path()));
        assert!(!fs.exists(&dir.path().join("missing")));
    }

    #[cfg(unix)]
    #[test]
    fn test_real_fs_statfs() {
        let dir = tempfile::tempdir().unwrap();
        let fs = RealFs::new();
        let stats = fs.statfs(dir.path()).unwrap();
        assert!(stats.fragment_size > 0);
        assert!(stats.blocks >= stats.blocks_free);
        assert!(stats.blocks_free >= stats.blocks_available);
    }

    #[cfg(unix)]
    #[test]
    fn test_real_fs_statfs_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let fs = RealFs::new();
        let err = fs.statfs(&dir.path().join("missing")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
