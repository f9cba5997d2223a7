//! fsmetrics — filesystem metrics scraper for metrics-collection pipelines.
//!
//! Provides:
//! - `factory` — builds scrapers from configuration, probing for containers
//! - `scraper` — the `Scraper` lifecycle (`start` once, `scrape` per tick)
//! - `collector` — mount table parsing, filters, `FileSystem` abstraction
//! - `config` — declarative scraper configuration
//! - `context` — cancellation and deadlines for scraper calls
//! - `model` — snapshots produced by each scrape
//! - `metrics` — metric points built from snapshots
//! - `util` — container environment detection

pub mod collector;
pub mod config;
pub mod context;
pub mod factory;
pub mod metrics;
pub mod model;
pub mod scraper;
pub mod util;

pub use config::Config;
pub use context::Context;
pub use factory::{Factory, Settings, create_default_config};
pub use scraper::{FilesystemScraper, ScrapeError, Scraper, StartError};
