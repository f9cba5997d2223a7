//! Factory the host pipeline uses to build filesystem scrapers.
//!
//! The factory resolves the user configuration (running the container probe
//! when no `root_path` is set) and hands back an unstarted
//! [`FilesystemScraper`].

use std::sync::Arc;

use tracing::{info_span, warn};

use crate::collector::traits::{FileSystem, RealFs};
use crate::config::Config;
use crate::context::{Context, Interrupted};
use crate::scraper::FilesystemScraper;
use crate::util::{EnvironmentInspector, HostEnvironment, likely_in_container};

/// Value of the `type` key identifying this scraper in pipeline configs.
pub const TYPE: &str = "filesystem";

const CONTAINER_ADVISORY: &str = "No `root_path` config set when running in a container environment, \
     will report container filesystem stats. Mount the host filesystem into the container \
     and set `root_path` to it to collect host filesystem stats.";

/// Per-scraper settings supplied by the host pipeline.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Name of the scraper instance, recorded on its log span.
    pub id: String,
    /// Base path of the proc filesystem the mount table is read from.
    pub proc_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            id: TYPE.to_string(),
            proc_path: "/proc".to_string(),
        }
    }
}

/// Error building a scraper.
#[derive(Debug)]
pub enum FactoryError {
    Cancelled,
    DeadlineExceeded,
    /// `Settings` cannot be used (e.g. empty `proc_path`).
    InvalidSettings(String),
}

impl std::fmt::Display for FactoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FactoryError::Cancelled => write!(f, "scraper creation cancelled"),
            FactoryError::DeadlineExceeded => write!(f, "scraper creation deadline exceeded"),
            FactoryError::InvalidSettings(msg) => write!(f, "invalid settings: {}", msg),
        }
    }
}

impl std::error::Error for FactoryError {}

impl From<Interrupted> for FactoryError {
    fn from(i: Interrupted) -> Self {
        match i {
            Interrupted::Cancelled => FactoryError::Cancelled,
            Interrupted::DeadlineExceeded => FactoryError::DeadlineExceeded,
        }
    }
}

/// Default configuration: host root, no filters, physical filesystems only,
/// default metric toggles.
pub fn create_default_config() -> Config {
    Config::default()
}

/// Builds filesystem scrapers over a filesystem and environment inspector.
pub struct Factory<F: FileSystem + Clone = RealFs> {
    fs: F,
    env: Arc<dyn EnvironmentInspector>,
}

impl Factory<RealFs> {
    /// Factory over the real host.
    pub fn new() -> Self {
        Self::with_parts(RealFs::new(), Arc::new(HostEnvironment))
    }
}

impl Default for Factory<RealFs> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FileSystem + Clone> Factory<F> {
    /// Factory over the given filesystem and environment inspector.
    pub fn with_parts(fs: F, env: Arc<dyn EnvironmentInspector>) -> Self {
        Self { fs, env }
    }

    pub fn create_default_config(&self) -> Config {
        create_default_config()
    }

    /// Produces the effective configuration.
    ///
    /// The configuration is returned unchanged; missing sub-sections were
    /// already defaulted when it was built or deserialized. When `root_path`
    /// is empty and the process looks containerized, an advisory warning is
    /// logged. With `root_path` set the environment is not probed at all.
    pub fn resolve_config(&self, config: Config) -> Config {
        if !config.has_root_path() && likely_in_container(self.env.as_ref()) {
            warn!("{}", CONTAINER_ADVISORY);
        }
        config
    }

    /// Creates an unstarted scraper for `config`.
    pub fn create_scraper(
        &self,
        ctx: &Context,
        settings: &Settings,
        config: Config,
    ) -> Result<FilesystemScraper<F>, FactoryError> {
        ctx.check()?;

        if settings.proc_path.is_empty() {
            return Err(FactoryError::InvalidSettings(
                "proc_path must not be empty".to_string(),
            ));
        }

        let span = info_span!("scraper", kind = TYPE, id = %settings.id);
        let config = span.in_scope(|| self.resolve_config(config));

        Ok(FilesystemScraper::new(
            self.fs.clone(),
            settings.proc_path.clone(),
            config,
            span,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;
    use crate::scraper::Scraper;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::Level;
    use tracing_subscriber::layer::{Context as LayerContext, SubscriberExt};
    use tracing_subscriber::Layer;

    /// Environment inspector that counts every probe.
    #[derive(Default)]
    struct CountingEnv {
        pid_one: bool,
        markers: Vec<&'static str>,
        pid_checks: AtomicUsize,
        stat_calls: AtomicUsize,
    }

    impl EnvironmentInspector for CountingEnv {
        fn is_process_root_of_namespace(&self) -> bool {
            self.pid_checks.fetch_add(1, Ordering::SeqCst);
            self.pid_one
        }

        fn marker_path_exists(&self, path: &Path) -> bool {
            self.stat_calls.fetch_add(1, Ordering::SeqCst);
            self.markers.iter().any(|m| Path::new(m) == path)
        }
    }

    /// Counts WARN events.
    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: LayerContext<'_, S>) {
            if *event.metadata().level() == Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    /// Creates and starts a scraper, returning the number of warnings logged.
    fn create_and_start(env: Arc<CountingEnv>, fs: MockFs, config: Config) -> (usize, Config) {
        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(Arc::clone(&warnings)));

        let resolved = tracing::subscriber::with_default(subscriber, || {
            let factory = Factory::with_parts(fs, env);
            let mut scraper = factory
                .create_scraper(&Context::background(), &Settings::default(), config)
                .unwrap();
            scraper.start(&Context::background()).unwrap();
            scraper.config().clone()
        });

        (warnings.load(Ordering::SeqCst), resolved)
    }

    #[test]
    fn test_create_default_config() {
        let factory = Factory::with_parts(MockFs::new(), Arc::new(CountingEnv::default()));
        assert_eq!(factory.create_default_config(), Config::default());
        assert_eq!(create_default_config(), Config::default());
    }

    #[test]
    fn test_root_path_set_skips_probe() {
        let env = Arc::new(CountingEnv {
            pid_one: true,
            markers: vec!["/.dockerenv"],
            ..Default::default()
        });
        let config = Config {
            root_path: "/hostfs".to_string(),
            ..Default::default()
        };

        let (warnings, resolved) =
            create_and_start(Arc::clone(&env), MockFs::host_under_root("/hostfs"), config);

        assert_eq!(env.stat_calls.load(Ordering::SeqCst), 0);
        assert_eq!(env.pid_checks.load(Ordering::SeqCst), 0);
        assert_eq!(warnings, 0);
        assert_eq!(resolved.root_path, "/hostfs");
    }

    #[test]
    fn test_marker_present_emits_one_advisory() {
        let env = Arc::new(CountingEnv {
            markers: vec!["/run/.containerenv"],
            ..Default::default()
        });

        let (warnings, resolved) =
            create_and_start(Arc::clone(&env), MockFs::typical_host(), Config::default());

        assert_eq!(warnings, 1);
        assert_eq!(resolved.root_path, "");
        assert_eq!(env.stat_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_pid_one_emits_one_advisory() {
        let env = Arc::new(CountingEnv {
            pid_one: true,
            ..Default::default()
        });

        let (warnings, resolved) =
            create_and_start(Arc::clone(&env), MockFs::typical_host(), Config::default());

        assert_eq!(warnings, 1);
        assert_eq!(resolved, Config::default());
        // Process identity alone is conclusive
        assert_eq!(env.stat_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_bare_host_emits_no_advisory() {
        let env = Arc::new(CountingEnv::default());

        let (warnings, _) =
            create_and_start(Arc::clone(&env), MockFs::typical_host(), Config::default());

        assert_eq!(warnings, 0);
        assert_eq!(env.pid_checks.load(Ordering::SeqCst), 1);
        assert_eq!(env.stat_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_create_scraper_cancelled() {
        let factory = Factory::with_parts(MockFs::typical_host(), Arc::new(CountingEnv::default()));
        let ctx = Context::background();
        ctx.cancel_handle().cancel();

        let err = factory
            .create_scraper(&ctx, &Settings::default(), Config::default())
            .err()
            .unwrap();
        assert!(matches!(err, FactoryError::Cancelled));
    }

    #[test]
    fn test_create_scraper_rejects_empty_proc_path() {
        let factory = Factory::with_parts(MockFs::typical_host(), Arc::new(CountingEnv::default()));
        let settings = Settings {
            proc_path: String::new(),
            ..Default::default()
        };

        let err = factory
            .create_scraper(&Context::background(), &settings, Config::default())
            .err()
            .unwrap();
        assert!(matches!(err, FactoryError::InvalidSettings(_)));
    }

    #[test]
    fn test_scrapers_are_independent() {
        let factory = Factory::with_parts(MockFs::typical_host(), Arc::new(CountingEnv::default()));
        let ctx = Context::background();

        let mut a = factory
            .create_scraper(&ctx, &Settings::default(), Config::default())
            .unwrap();
        let mut b = factory
            .create_scraper(
                &ctx,
                &Settings {
                    id: "filesystem/2".to_string(),
                    ..Default::default()
                },
                Config {
                    include_virtual_filesystems: true,
                    ..Default::default()
                },
            )
            .unwrap();

        a.start(&ctx).unwrap();
        b.start(&ctx).unwrap();
        a.shutdown();

        let output = b.scrape(&ctx).unwrap();
        assert!(output.snapshot.filesystems.len() > 4);
    }
}
