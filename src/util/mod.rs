//! Utility modules for fsmetrics.

mod container;

pub use container::{CONTAINER_MARKERS, EnvironmentInspector, HostEnvironment, likely_in_container};
