//! Data model produced by the filesystem scraper.

mod snapshot;

pub use snapshot::{
    FilesystemInfo, FilesystemUsage, InodeUsage, MountFailure, MountMode, ScrapeOutput, Snapshot,
};
