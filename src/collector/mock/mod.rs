//! Mock filesystem for testing.
//!
//! This module provides `MockFs` and pre-built host scenarios for testing
//! the scraper without touching the real mount table or calling `statvfs`.

mod filesystem;
mod scenarios;

pub use filesystem::MockFs;
