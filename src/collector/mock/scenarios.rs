//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios provide realistic mount tables and capacity figures
//! for a bare-metal host and for a container that sees the host under a
//! bind-mounted root.

use super::filesystem::MockFs;
use crate::collector::traits::FsStats;
use std::path::Path;

/// `/proc/filesystems` of a typical Linux kernel.
pub const PROC_FILESYSTEMS: &str = "\
nodev\tsysfs
nodev\ttmpfs
nodev\tbdev
nodev\tproc
nodev\tcgroup2
nodev\tdevtmpfs
nodev\tdebugfs
nodev\tsecurityfs
nodev\tmqueue
nodev\toverlay
\text3
\text4
\txfs
\tbtrfs
\tvfat
";

/// `/proc/self/mountinfo` of a typical host.
pub const HOST_MOUNTINFO: &str = "\
21 1 8:1 / / rw,relatime shared:1 - ext4 /dev/sda1 rw,errors=remount-ro
22 21 0:20 / /proc rw,nosuid,nodev,noexec,relatime shared:12 - proc proc rw
23 21 0:21 / /sys rw,nosuid,nodev,noexec,relatime shared:7 - sysfs sysfs rw
24 21 0:5 / /dev rw,nosuid,relatime shared:2 - devtmpfs udev rw,size=8123456k,nr_inodes=2030864,mode=755
25 21 0:24 / /run rw,nosuid,nodev,noexec,relatime shared:5 - tmpfs tmpfs rw,size=1634256k,mode=755
26 21 8:2 / /boot rw,relatime shared:29 - ext4 /dev/sda2 rw
27 21 8:17 / /home rw,relatime shared:30 - xfs /dev/sdb1 rw,attr2,inode64
28 21 8:33 / /mnt/backup\\040disk ro,relatime shared:31 - ext4 /dev/sdc1 ro
";

/// `/proc/self/mountinfo` of a container with the host root bind-mounted
/// at `/hostfs`.
pub const CONTAINER_MOUNTINFO: &str = "\
612 540 0:55 / / rw,relatime - overlay overlay rw,lowerdir=/var/lib/docker/overlay2/l/A:/var/lib/docker/overlay2/l/B
613 612 0:58 / /proc rw,nosuid,nodev,noexec,relatime - proc proc rw
620 612 8:1 /var/lib/docker/containers/abc/hosts /etc/hosts rw,relatime - ext4 /dev/sda1 rw
621 612 8:1 / /hostfs ro,relatime - ext4 /dev/sda1 ro
";

/// Capacity figures keyed by mount point for `HOST_MOUNTINFO`.
pub fn host_mount_stats() -> Vec<(&'static str, FsStats)> {
    vec![
        (
            "/",
            FsStats {
                fragment_size: 4096,
                blocks: 25_000_000,
                blocks_free: 10_000_000,
                blocks_available: 8_750_000,
                files: 6_553_600,
                files_free: 6_000_000,
            },
        ),
        (
            "/dev",
            FsStats {
                fragment_size: 4096,
                blocks: 2_030_864,
                blocks_free: 2_030_864,
                blocks_available: 2_030_864,
                files: 2_030_864,
                files_free: 2_030_300,
            },
        ),
        (
            "/run",
            FsStats {
                fragment_size: 4096,
                blocks: 408_564,
                blocks_free: 400_000,
                blocks_available: 400_000,
                files: 2_042_820,
                files_free: 2_041_000,
            },
        ),
        (
            "/boot",
            FsStats {
                fragment_size: 1024,
                blocks: 1_000_000,
                blocks_free: 700_000,
                blocks_available: 650_000,
                files: 65_536,
                files_free: 65_000,
            },
        ),
        (
            "/home",
            FsStats {
                fragment_size: 4096,
                blocks: 50_000_000,
                blocks_free: 30_000_000,
                blocks_available: 30_000_000,
                files: 25_000_000,
                files_free: 24_000_000,
            },
        ),
        (
            "/mnt/backup disk",
            FsStats {
                fragment_size: 4096,
                blocks: 100_000_000,
                blocks_free: 90_000_000,
                blocks_available: 85_000_000,
                files: 6_000_000,
                files_free: 5_999_000,
            },
        ),
    ]
}

impl MockFs {
    /// Creates a bare-metal host with four block-device mounts and a few
    /// virtual ones (`proc`, `sysfs`, `devtmpfs`, `tmpfs`).
    ///
    /// `/proc` and `/sys` have no capacity figures registered.
    pub fn typical_host() -> Self {
        let mut fs = Self::new();
        fs.add_file("/proc/filesystems", PROC_FILESYSTEMS);
        fs.add_file("/proc/self/mountinfo", HOST_MOUNTINFO);
        fs.add_host_stats(Path::new("/"));
        fs
    }

    /// Creates a container that sees the host's filesystems under `root`
    /// (e.g. `/hostfs`).
    ///
    /// The container's own `/proc/self/mountinfo` lists its overlay and bind
    /// mounts; the host's table is `<root>/proc/1/mountinfo`. Capacity
    /// figures exist only for the host mounts, under `root`.
    pub fn host_under_root(root: &str) -> Self {
        let mut fs = Self::new();
        fs.add_file("/proc/filesystems", PROC_FILESYSTEMS);
        fs.add_file("/proc/self/mountinfo", CONTAINER_MOUNTINFO);
        fs.add_dir(root);

        let root = Path::new(root);
        fs.add_file(root.join("proc/1/mountinfo"), HOST_MOUNTINFO);
        fs.add_host_stats(root);
        fs
    }

    fn add_host_stats(&mut self, root: &Path) {
        for (mount_point, stats) in host_mount_stats() {
            let relative = mount_point.trim_start_matches('/');
            let path = if relative.is_empty() {
                root.to_path_buf()
            } else {
                root.join(relative)
            };
            self.add_mount_stats(path, stats);
        }
    }
}
