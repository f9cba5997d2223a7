//! Filesystem scraper and its lifecycle.
//!
//! A scraper is built by the [`Factory`](crate::factory::Factory), started
//! exactly once, then scraped on every tick of the host pipeline:
//!
//! ```text
//! Uninitialized ──start()──▶ Started ──scrape()──▶ Started ──shutdown()──▶ Stopped
//!       │                                                                     ▲
//!       └──start() fails──▶ Failed ─────────────shutdown()────────────────────┘
//! ```
//!
//! The pipeline serializes calls, so the scraper holds no locks. Each scrape
//! is independent: only the configuration and what `start` prepared carry
//! over between ticks.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;

use tracing::{Span, debug, info, warn};

use crate::collector::filter::{FilterError, MountFilter};
use crate::collector::procfs::{
    CollectError, MountCollector, MountEntry, MountTable, visible_mounts,
};
use crate::collector::traits::FileSystem;
use crate::config::Config;
use crate::context::{Context, Interrupted};
use crate::model::{FilesystemInfo, MountFailure, MountMode, ScrapeOutput, Snapshot};

/// Lifecycle interface the host pipeline drives.
pub trait Scraper: Send {
    /// One-time preparation. Must succeed before the first `scrape`.
    fn start(&mut self, ctx: &Context) -> Result<(), StartError>;

    /// Collects one snapshot.
    fn scrape(&mut self, ctx: &Context) -> Result<ScrapeOutput, ScrapeError>;

    /// Releases whatever `start` prepared. Further calls are rejected.
    fn shutdown(&mut self);
}

/// Error returned by [`Scraper::start`].
#[derive(Debug)]
pub enum StartError {
    /// `start` was already called successfully.
    AlreadyStarted,
    /// A previous `start` failed; the scraper must be rebuilt.
    Failed,
    /// The scraper was shut down.
    Stopped,
    Cancelled,
    DeadlineExceeded,
    /// The configured `root_path` does not exist.
    RootPath(PathBuf),
    /// A filter pattern does not compile.
    Filter(FilterError),
}

impl std::fmt::Display for StartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartError::AlreadyStarted => write!(f, "scraper already started"),
            StartError::Failed => write!(f, "scraper failed to start earlier and must be rebuilt"),
            StartError::Stopped => write!(f, "scraper is shut down"),
            StartError::Cancelled => write!(f, "start cancelled"),
            StartError::DeadlineExceeded => write!(f, "start deadline exceeded"),
            StartError::RootPath(path) => {
                write!(f, "root_path {} does not exist", path.display())
            }
            StartError::Filter(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for StartError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StartError::Filter(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FilterError> for StartError {
    fn from(e: FilterError) -> Self {
        StartError::Filter(e)
    }
}

impl From<Interrupted> for StartError {
    fn from(i: Interrupted) -> Self {
        match i {
            Interrupted::Cancelled => StartError::Cancelled,
            Interrupted::DeadlineExceeded => StartError::DeadlineExceeded,
        }
    }
}

/// Error returned by [`Scraper::scrape`].
///
/// Failures of individual mounts are not errors; they are reported in
/// [`ScrapeOutput::failures`].
#[derive(Debug)]
pub enum ScrapeError {
    /// `scrape` was called without a successful `start`.
    NotStarted,
    /// The scraper was shut down.
    Stopped,
    Cancelled,
    DeadlineExceeded,
    /// The mount table could not be read at all.
    Enumerate(CollectError),
}

impl std::fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScrapeError::NotStarted => write!(f, "scrape called before a successful start"),
            ScrapeError::Stopped => write!(f, "scraper is shut down"),
            ScrapeError::Cancelled => write!(f, "scrape cancelled"),
            ScrapeError::DeadlineExceeded => write!(f, "scrape deadline exceeded"),
            ScrapeError::Enumerate(e) => write!(f, "cannot enumerate mounts: {}", e),
        }
    }
}

impl std::error::Error for ScrapeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScrapeError::Enumerate(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Interrupted> for ScrapeError {
    fn from(i: Interrupted) -> Self {
        match i {
            Interrupted::Cancelled => ScrapeError::Cancelled,
            Interrupted::DeadlineExceeded => ScrapeError::DeadlineExceeded,
        }
    }
}

/// What `start` prepares for the scrapes that follow.
#[derive(Debug)]
struct Prepared {
    /// Where host mount points are reachable from this process.
    root: PathBuf,
    /// The host's mount table when `root_path` is set, our own otherwise.
    mount_table: MountTable,
    filter: MountFilter,
    /// Filesystem types flagged `nodev` in `/proc/filesystems`.
    virtual_fs_types: HashSet<String>,
}

impl Prepared {
    fn is_virtual(&self, mount: &MountEntry) -> bool {
        if self.virtual_fs_types.is_empty() {
            // No type table: only block devices have absolute device paths.
            return !mount.device.starts_with('/');
        }
        self.virtual_fs_types.contains(&mount.fs_type)
    }

    /// Path to query for a host mount point.
    fn stat_path(&self, mount_point: &str) -> PathBuf {
        let relative = mount_point.trim_start_matches('/');
        if relative.is_empty() {
            self.root.clone()
        } else {
            self.root.join(relative)
        }
    }
}

#[derive(Debug)]
enum State {
    Uninitialized,
    Started(Prepared),
    Failed,
    Stopped,
}

/// Scraper reporting capacity of mounted filesystems.
pub struct FilesystemScraper<F: FileSystem + Clone> {
    fs: F,
    collector: MountCollector<F>,
    config: Config,
    span: Span,
    state: State,
}

impl<F: FileSystem + Clone> FilesystemScraper<F> {
    /// Creates an unstarted scraper.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    /// * `config` - Resolved configuration, fixed for the scraper's lifetime
    /// * `span` - Span all log events of this scraper are recorded in
    pub fn new(fs: F, proc_path: impl Into<String>, config: Config, span: Span) -> Self {
        Self {
            collector: MountCollector::new(fs.clone(), proc_path),
            fs,
            config,
            span,
            state: State::Uninitialized,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_started(&self) -> bool {
        matches!(self.state, State::Started(_))
    }

    fn prepare(&self, ctx: &Context) -> Result<Prepared, StartError> {
        ctx.check()?;

        let (root, mount_table) = if self.config.has_root_path() {
            let root = PathBuf::from(&self.config.root_path);
            if !self.fs.exists(&root) {
                return Err(StartError::RootPath(root));
            }
            let table = MountTable::host(&root);
            (root, table)
        } else {
            (PathBuf::from("/"), self.collector.own_table())
        };

        let filter = MountFilter::compile(&self.config)?;

        let virtual_fs_types = match self.collector.collect_virtual_fs_types() {
            Ok(types) => types,
            Err(e) => {
                debug!(
                    "Filesystem type table unavailable ({}), classifying mounts by device path",
                    e
                );
                HashSet::new()
            }
        };

        Ok(Prepared {
            root,
            mount_table,
            filter,
            virtual_fs_types,
        })
    }

    fn collect(&self, ctx: &Context, prepared: &Prepared) -> Result<ScrapeOutput, ScrapeError> {
        ctx.check()?;

        let timestamp = chrono::Utc::now().timestamp();
        let mounts = self
            .collector
            .collect_mounts(&prepared.mount_table)
            .map_err(ScrapeError::Enumerate)?;
        ctx.check()?;

        let mut filesystems = Vec::new();
        let mut failures = Vec::new();

        // Stacking is resolved before filtering: a filtered-out top mount
        // still hides the mount it covers.
        for mount in visible_mounts(mounts) {
            if !prepared
                .filter
                .allows(&mount, prepared.is_virtual(&mount))
            {
                continue;
            }

            ctx.check()?;

            let path = prepared.stat_path(&mount.mount_point);
            match self.collector.collect_usage(&path) {
                Ok((usage, inodes)) => filesystems.push(FilesystemInfo {
                    mode: MountMode::from_options(&mount.options),
                    device: mount.device,
                    mount_point: mount.mount_point,
                    fs_type: mount.fs_type,
                    usage,
                    inodes,
                }),
                Err(e) => {
                    warn!(
                        "Failed to read usage of {} ({}): {}",
                        mount.mount_point, mount.device, e
                    );
                    failures.push(MountFailure {
                        device: mount.device,
                        mount_point: mount.mount_point,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(ScrapeOutput {
            snapshot: Snapshot {
                timestamp,
                filesystems,
            },
            failures,
        })
    }
}

impl<F: FileSystem + Clone> Scraper for FilesystemScraper<F> {
    fn start(&mut self, ctx: &Context) -> Result<(), StartError> {
        let _enter = self.span.clone().entered();

        match self.state {
            State::Uninitialized => {}
            State::Started(_) => return Err(StartError::AlreadyStarted),
            State::Failed => return Err(StartError::Failed),
            State::Stopped => return Err(StartError::Stopped),
        }

        match self.prepare(ctx) {
            Ok(prepared) => {
                info!(
                    "Filesystem scraper started: root={}, mount_table={}, virtual_fs_types={}",
                    prepared.root.display(),
                    prepared.mount_table.mountinfo.display(),
                    prepared.virtual_fs_types.len()
                );
                self.state = State::Started(prepared);
                Ok(())
            }
            Err(e @ (StartError::Cancelled | StartError::DeadlineExceeded)) => {
                // Interrupted before anything was validated; a retry may succeed.
                Err(e)
            }
            Err(e) => {
                self.state = State::Failed;
                Err(e)
            }
        }
    }

    fn scrape(&mut self, ctx: &Context) -> Result<ScrapeOutput, ScrapeError> {
        let _enter = self.span.clone().entered();

        let prepared = match &self.state {
            State::Started(prepared) => prepared,
            State::Stopped => return Err(ScrapeError::Stopped),
            State::Uninitialized | State::Failed => return Err(ScrapeError::NotStarted),
        };

        let started = Instant::now();
        let output = self.collect(ctx, prepared)?;
        debug!(
            "Scrape complete: {} filesystems, {} failures in {:?}",
            output.snapshot.filesystems.len(),
            output.failures.len(),
            started.elapsed()
        );

        Ok(output)
    }

    fn shutdown(&mut self) {
        let _enter = self.span.clone().entered();
        if !matches!(self.state, State::Stopped) {
            debug!("Filesystem scraper stopped");
        }
        self.state = State::Stopped;
    }
}
