//! fsmetricsd - Filesystem metrics scraper daemon.
//!
//! Drives a filesystem scraper the way a metrics pipeline would: builds it
//! through the factory, starts it once, then scrapes it on a fixed interval
//! and writes every emitted metric point to stdout as a JSON line.

use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use fsmetrics::metrics::MetricsBuilder;
use fsmetrics::model::ScrapeOutput;
use fsmetrics::{Config, Context, Factory, ScrapeError, Scraper, Settings};

/// Filesystem metrics scraper daemon.
#[derive(Parser)]
#[command(name = "fsmetricsd", about = "Filesystem metrics scraper daemon", version)]
struct Args {
    /// Scrape interval in seconds.
    #[arg(short, long, default_value = "10", value_parser = clap::value_parser!(u64).range(1..))]
    interval: u64,

    /// Path to a JSON scraper configuration.
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Root under which the host filesystem is mounted (overrides the config file).
    #[arg(long, value_name = "PATH")]
    root_path: Option<String>,

    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, default_value = "/proc")]
    proc_path: String,

    /// Report virtual filesystems (tmpfs, proc, ...) too.
    #[arg(long)]
    include_virtual: bool,

    /// Per-scrape timeout in seconds. Defaults to the interval.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    scrape_timeout: Option<u64>,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Logs go to stderr so stdout carries only metric lines.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["fsmetricsd", "fsmetrics"] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Builds the effective user configuration from the config file and CLI flags.
fn load_config(args: &Args) -> Result<Config, fsmetrics::config::ConfigError> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => fsmetrics::create_default_config(),
    };

    if let Some(ref root_path) = args.root_path {
        config.root_path = root_path.clone();
    }
    if args.include_virtual {
        config.include_virtual_filesystems = true;
    }

    Ok(config)
}

/// Describes a scrape result for logging.
fn describe_output(output: &ScrapeOutput) -> String {
    let mut description = format!("{} filesystems", output.snapshot.filesystems.len());
    if output.is_partial() {
        let failed: Vec<&str> = output
            .failures
            .iter()
            .map(|f| f.mount_point.as_str())
            .collect();
        description.push_str(&format!(", {} failed ({})", failed.len(), failed.join(", ")));
    }
    description
}

fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    info!("fsmetricsd {} starting", env!("CARGO_PKG_VERSION"));

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let metrics = MetricsBuilder::new(config.metrics.clone());

    info!(
        "Config: interval={}s, root_path={:?}, proc={}",
        args.interval, config.root_path, args.proc_path
    );

    // Cancelled by Ctrl-C; every per-tick context derives from it.
    let root_ctx = Context::background();
    let handle = root_ctx.cancel_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        handle.cancel();
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let settings = Settings {
        proc_path: args.proc_path.clone(),
        ..Default::default()
    };

    let factory = Factory::new();
    let mut scraper = match factory.create_scraper(&root_ctx, &settings, config) {
        Ok(scraper) => scraper,
        Err(e) => {
            error!("Failed to create scraper: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = scraper.start(&root_ctx) {
        error!("Failed to start scraper: {}", e);
        return ExitCode::FAILURE;
    }

    let interval = Duration::from_secs(args.interval);
    let timeout = args
        .scrape_timeout
        .map(Duration::from_secs)
        .unwrap_or(interval);
    let mut scrape_count: u64 = 0;
    let mut stdout = std::io::stdout().lock();

    info!("Starting scrape loop");

    while !root_ctx.is_cancelled() {
        let ctx = root_ctx.with_timeout(timeout);

        match scraper.scrape(&ctx) {
            Ok(output) => {
                scrape_count += 1;
                info!("Scrape #{}: {}", scrape_count, describe_output(&output));

                for point in metrics.build(&output.snapshot) {
                    match serde_json::to_string(&point) {
                        Ok(line) => {
                            if let Err(e) = writeln!(stdout, "{}", line) {
                                error!("Failed to write metrics: {}", e);
                                break;
                            }
                        }
                        Err(e) => error!("Failed to encode metric point: {}", e),
                    }
                }
                if let Err(e) = stdout.flush() {
                    error!("Failed to flush metrics: {}", e);
                }
            }
            Err(ScrapeError::Cancelled) => break,
            Err(e) => {
                error!("Scrape failed: {}", e);
            }
        }

        // Sleep with periodic checks for shutdown signal
        let sleep_interval = Duration::from_millis(100);
        let mut remaining = interval;
        while remaining > Duration::ZERO && !root_ctx.is_cancelled() {
            let sleep_time = remaining.min(sleep_interval);
            std::thread::sleep(sleep_time);
            remaining = remaining.saturating_sub(sleep_time);
        }
    }

    info!("Shutting down...");
    scraper.shutdown();
    debug!("Completed {} scrapes", scrape_count);
    info!("Shutdown complete");

    ExitCode::SUCCESS
}
