//! Collectors for Linux `/proc` mount tables.
//!
//! This module provides parsers for `/proc/self/mountinfo`, `/proc/mounts`
//! and `/proc/filesystems`, and a collector that reads per-mount capacity.

pub mod mounts;
pub mod parser;

pub use mounts::{CollectError, MountCollector, MountTable, visible_mounts};
pub use parser::{MountEntry, ParseError};
