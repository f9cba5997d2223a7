//! Filesystem metrics collection for Linux.
//!
//! This module provides infrastructure for enumerating mounts and reading
//! their capacity, with support for mocking for testing on any platform.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     FilesystemScraper                       │
//! │  ┌─────────────────────┐   ┌─────────────────────────────┐  │
//! │  │    MountCollector   │   │        MountFilter          │  │
//! │  │  - mountinfo        │   │  - devices / fs types       │  │
//! │  │  - /proc/filesystems│   │  - mount points             │  │
//! │  │  - statvfs          │   │  - virtual filesystems      │  │
//! │  └──────────┬──────────┘   └─────────────────────────────┘  │
//! │             │                                               │
//! │      ┌──────▼──────┐                                        │
//! │      │  FileSystem │ (trait)                                │
//! │      └──────┬──────┘                                        │
//! └─────────────┼───────────────────────────────────────────────┘
//!               │
//!       ┌───────┴───────┐
//!       │               │
//! ┌─────▼─────┐   ┌─────▼─────┐
//! │  RealFs   │   │  MockFs   │
//! │ (Linux)   │   │ (Testing) │
//! └───────────┘   └───────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use fsmetrics::collector::{MockFs, MountCollector};
//!
//! let collector = MountCollector::new(MockFs::typical_host(), "/proc");
//! let mounts = collector.collect_mounts(&collector.own_table()).unwrap();
//! assert!(!mounts.is_empty());
//! ```

pub mod filter;
pub mod mock;
pub mod procfs;
pub mod traits;

pub use filter::{FilterError, MountFilter};
pub use mock::MockFs;
pub use procfs::{CollectError, MountCollector, MountEntry, MountTable};
pub use traits::{FileSystem, FsStats, RealFs};
