//! Include/exclude filters over mount attributes.
//!
//! Filters are compiled once when the scraper starts; a pattern that does not
//! compile fails `start` instead of surfacing on every tick.

use std::collections::HashSet;

use regex::RegexSet;

use crate::collector::procfs::MountEntry;
use crate::config::{Config, MatchConfig, MatchType};

/// A filter pattern that failed to compile.
#[derive(Debug)]
pub struct FilterError {
    /// Configuration field holding the pattern (e.g. `exclude_mount_points`).
    pub field: &'static str,
    pub source: regex::Error,
}

impl std::fmt::Display for FilterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid pattern in {}: {}", self.field, self.source)
    }
}

impl std::error::Error for FilterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

#[derive(Debug)]
enum Matcher {
    Strict(HashSet<String>),
    Regexp(RegexSet),
}

impl Matcher {
    fn compile(config: &MatchConfig, field: &'static str) -> Result<Self, FilterError> {
        match config.match_type {
            MatchType::Strict => Ok(Matcher::Strict(config.values.iter().cloned().collect())),
            MatchType::Regexp => RegexSet::new(&config.values)
                .map(Matcher::Regexp)
                .map_err(|source| FilterError { field, source }),
        }
    }

    fn matches(&self, value: &str) -> bool {
        match self {
            Matcher::Strict(values) => values.contains(value),
            Matcher::Regexp(set) => set.is_match(value),
        }
    }
}

/// Include and exclude matchers for one attribute.
#[derive(Debug, Default)]
struct Rule {
    include: Option<Matcher>,
    exclude: Option<Matcher>,
}

impl Rule {
    fn compile(
        include: Option<&MatchConfig>,
        include_field: &'static str,
        exclude: Option<&MatchConfig>,
        exclude_field: &'static str,
    ) -> Result<Self, FilterError> {
        // An include list with no values installs no include filter.
        Ok(Self {
            include: include
                .filter(|cfg| !cfg.values.is_empty())
                .map(|cfg| Matcher::compile(cfg, include_field))
                .transpose()?,
            exclude: exclude
                .map(|cfg| Matcher::compile(cfg, exclude_field))
                .transpose()?,
        })
    }

    /// An attribute passes if it matches the include list (when present) and
    /// does not match the exclude list.
    fn allows(&self, value: &str) -> bool {
        self.include.as_ref().is_none_or(|m| m.matches(value))
            && !self.exclude.as_ref().is_some_and(|m| m.matches(value))
    }
}

/// Compiled mount filter.
#[derive(Debug, Default)]
pub struct MountFilter {
    devices: Rule,
    fs_types: Rule,
    mount_points: Rule,
    include_virtual: bool,
}

impl MountFilter {
    /// Compiles every filter in `config`.
    pub fn compile(config: &Config) -> Result<Self, FilterError> {
        Ok(Self {
            devices: Rule::compile(
                config.include_devices.as_ref(),
                "include_devices",
                config.exclude_devices.as_ref(),
                "exclude_devices",
            )?,
            fs_types: Rule::compile(
                config.include_fs_types.as_ref(),
                "include_fs_types",
                config.exclude_fs_types.as_ref(),
                "exclude_fs_types",
            )?,
            mount_points: Rule::compile(
                config.include_mount_points.as_ref(),
                "include_mount_points",
                config.exclude_mount_points.as_ref(),
                "exclude_mount_points",
            )?,
            include_virtual: config.include_virtual_filesystems,
        })
    }

    /// Returns `true` if the mount should be reported.
    pub fn allows(&self, mount: &MountEntry, is_virtual: bool) -> bool {
        if is_virtual && !self.include_virtual {
            return false;
        }
        self.devices.allows(&mount.device)
            && self.fs_types.allows(&mount.fs_type)
            && self.mount_points.allows(&mount.mount_point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mount(device: &str, mount_point: &str, fs_type: &str) -> MountEntry {
        MountEntry {
            device: device.to_string(),
            mount_point: mount_point.to_string(),
            fs_type: fs_type.to_string(),
            options: "rw".to_string(),
        }
    }

    #[test]
    fn test_default_filter_allows_physical_only() {
        let filter = MountFilter::compile(&Config::default()).unwrap();
        assert!(filter.allows(&mount("/dev/sda1", "/", "ext4"), false));
        assert!(!filter.allows(&mount("tmpfs", "/run", "tmpfs"), true));
    }

    #[test]
    fn test_include_virtual() {
        let config = Config {
            include_virtual_filesystems: true,
            ..Default::default()
        };
        let filter = MountFilter::compile(&config).unwrap();
        assert!(filter.allows(&mount("tmpfs", "/run", "tmpfs"), true));
    }

    #[test]
    fn test_strict_fs_type_include() {
        let config = Config {
            include_fs_types: Some(MatchConfig::strict(["ext4"])),
            ..Default::default()
        };
        let filter = MountFilter::compile(&config).unwrap();
        assert!(filter.allows(&mount("/dev/sda1", "/", "ext4"), false));
        assert!(!filter.allows(&mount("/dev/sdb1", "/home", "xfs"), false));
        // Strict matching is exact, not a prefix match
        assert!(!filter.allows(&mount("/dev/sdc1", "/old", "ext"), false));
    }

    #[test]
    fn test_regexp_mount_point_exclude() {
        let config = Config {
            exclude_mount_points: Some(MatchConfig::regexp(["^/(boot|mnt)($|/)"])),
            ..Default::default()
        };
        let filter = MountFilter::compile(&config).unwrap();
        assert!(filter.allows(&mount("/dev/sda1", "/", "ext4"), false));
        assert!(!filter.allows(&mount("/dev/sda2", "/boot", "ext4"), false));
        assert!(!filter.allows(&mount("/dev/sdc1", "/mnt/backup disk", "ext4"), false));
        assert!(filter.allows(&mount("/dev/sdd1", "/mnt2", "ext4"), false));
    }

    #[test]
    fn test_exclude_wins_over_include() {
        let config = Config {
            include_devices: Some(MatchConfig::regexp(["^/dev/sd"])),
            exclude_devices: Some(MatchConfig::strict(["/dev/sdb1"])),
            ..Default::default()
        };
        let filter = MountFilter::compile(&config).unwrap();
        assert!(filter.allows(&mount("/dev/sda1", "/", "ext4"), false));
        assert!(!filter.allows(&mount("/dev/sdb1", "/home", "xfs"), false));
        assert!(!filter.allows(&mount("/dev/nvme0n1p1", "/data", "xfs"), false));
    }

    #[test]
    fn test_invalid_pattern_names_field() {
        let config = Config {
            exclude_fs_types: Some(MatchConfig::regexp(["(unclosed"])),
            ..Default::default()
        };
        let err = MountFilter::compile(&config).unwrap_err();
        assert_eq!(err.field, "exclude_fs_types");
        assert!(err.to_string().contains("exclude_fs_types"));
    }

    #[test]
    fn test_invalid_pattern_ignored_for_strict() {
        let config = Config {
            exclude_fs_types: Some(MatchConfig::strict(["(unclosed"])),
            ..Default::default()
        };
        assert!(MountFilter::compile(&config).is_ok());
    }

    #[test]
    fn test_empty_include_list_allows_everything() {
        let config = Config {
            include_fs_types: Some(MatchConfig::strict(Vec::<String>::new())),
            include_mount_points: Some(MatchConfig::regexp(Vec::<String>::new())),
            ..Default::default()
        };
        let filter = MountFilter::compile(&config).unwrap();
        assert!(filter.allows(&mount("/dev/sda1", "/", "ext4"), false));
        assert!(filter.allows(&mount("/dev/sdb1", "/home", "xfs"), false));
    }

    #[test]
    fn test_empty_exclude_list_excludes_nothing() {
        let config = Config {
            exclude_devices: Some(MatchConfig::regexp(Vec::<String>::new())),
            ..Default::default()
        };
        let filter = MountFilter::compile(&config).unwrap();
        assert!(filter.allows(&mount("/dev/sda1", "/", "ext4"), false));
    }
}
