//! Container environment detection.
//!
//! Decides whether the current process is likely running inside a container
//! (Docker, Podman, ...). The result only drives an advisory log message and
//! never changes configuration values.

use std::path::Path;

/// Marker files created by container runtimes.
///
/// `/.dockerenv` is mounted by dockerd by default; `/run/.containerenv` is
/// mounted by podman.
pub const CONTAINER_MARKERS: [&str; 2] = ["/.dockerenv", "/run/.containerenv"];

/// Read-only view of the process environment used for container detection.
///
/// Implemented by [`HostEnvironment`] in production; tests substitute mocks
/// so the real process table and filesystem are never touched.
pub trait EnvironmentInspector: Send + Sync {
    /// Returns `true` if this process is the root process (PID 1) of its
    /// PID namespace.
    fn is_process_root_of_namespace(&self) -> bool;

    /// Returns `true` if `path` exists. Any stat error counts as absent.
    fn marker_path_exists(&self, path: &Path) -> bool;
}

/// Inspects the real process and filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostEnvironment;

impl EnvironmentInspector for HostEnvironment {
    fn is_process_root_of_namespace(&self) -> bool {
        std::process::id() == 1
    }

    fn marker_path_exists(&self, path: &Path) -> bool {
        std::fs::metadata(path).is_ok()
    }
}

/// Returns `true` if the process is likely running inside a container.
///
/// Checks the process identity first, then each marker file, stopping at the
/// first positive signal.
pub fn likely_in_container(env: &dyn EnvironmentInspector) -> bool {
    env.is_process_root_of_namespace()
        || CONTAINER_MARKERS
            .iter()
            .any(|marker| env.marker_path_exists(Path::new(marker)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeEnv {
        pid_one: bool,
        present: Vec<&'static str>,
        probed: Mutex<Vec<String>>,
    }

    impl EnvironmentInspector for FakeEnv {
        fn is_process_root_of_namespace(&self) -> bool {
            self.pid_one
        }

        fn marker_path_exists(&self, path: &Path) -> bool {
            let path = path.to_string_lossy().into_owned();
            let found = self.present.iter().any(|p| *p == path);
            self.probed.lock().unwrap().push(path);
            found
        }
    }

    #[test]
    fn test_no_signals() {
        let env = FakeEnv::default();
        assert!(!likely_in_container(&env));
        assert_eq!(env.probed.lock().unwrap().len(), CONTAINER_MARKERS.len());
    }

    #[test]
    fn test_pid_one_skips_marker_probe() {
        let env = FakeEnv {
            pid_one: true,
            ..Default::default()
        };
        assert!(likely_in_container(&env));
        assert!(env.probed.lock().unwrap().is_empty());
    }

    #[test]
    fn test_docker_marker_short_circuits() {
        let env = FakeEnv {
            present: vec!["/.dockerenv"],
            ..Default::default()
        };
        assert!(likely_in_container(&env));
        assert_eq!(*env.probed.lock().unwrap(), vec!["/.dockerenv".to_string()]);
    }

    #[test]
    fn test_podman_marker() {
        let env = FakeEnv {
            present: vec!["/run/.containerenv"],
            ..Default::default()
        };
        assert!(likely_in_container(&env));
        assert_eq!(env.probed.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_host_environment_missing_marker() {
        let dir = tempfile::tempdir().unwrap();
        let env = HostEnvironment;
        assert!(!env.marker_path_exists(&dir.path().join(".dockerenv")));
        assert!(env.marker_path_exists(dir.path()));
    }
}
