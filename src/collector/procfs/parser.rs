//! Parsers for the mount tables exposed under `/proc`.

use std::collections::HashSet;

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// One entry of a mount table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountEntry {
    /// Mount source (e.g. `/dev/sda1`, `tmpfs`, `overlay`).
    pub device: String,
    /// Mount point with octal escapes decoded.
    pub mount_point: String,
    pub fs_type: String,
    /// Per-mount options (`rw,relatime`, ...).
    pub options: String,
}

/// Decodes the octal escapes the kernel uses for whitespace and backslashes
/// in mount table paths (`\040` space, `\011` tab, `\012` newline, `\134` backslash).
pub fn unescape_octal(s: &str) -> String {
    if !s.contains('\\') {
        return s.to_string();
    }

    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\'
            && i + 3 < bytes.len()
            && bytes[i + 1..i + 4].iter().all(|b| (b'0'..=b'7').contains(b))
        {
            let value = (bytes[i + 1] - b'0') as u32 * 64
                + (bytes[i + 2] - b'0') as u32 * 8
                + (bytes[i + 3] - b'0') as u32;
            if let Ok(byte) = u8::try_from(value) {
                out.push(byte);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

/// Parses `/proc/[pid]/mountinfo`.
///
/// Format (see `proc(5)`):
/// ```text
/// 36 35 98:0 /mnt1 /mnt/parent rw,noatime master:1 - ext3 /dev/root rw,errors=continue
/// ```
/// Optional fields are terminated by a single `-`. Malformed lines are skipped.
pub fn parse_mountinfo(content: &str) -> Vec<MountEntry> {
    let mut mounts = Vec::new();

    for line in content.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        // mount_id parent_id major:minor root mount_point options ... - fstype source
        if fields.len() < 10 {
            continue;
        }

        let Some(sep) = fields.iter().skip(6).position(|f| *f == "-") else {
            continue;
        };
        let sep = sep + 6;
        if fields.len() < sep + 3 {
            continue;
        }

        mounts.push(MountEntry {
            device: unescape_octal(fields[sep + 2]),
            mount_point: unescape_octal(fields[4]),
            fs_type: fields[sep + 1].to_string(),
            options: fields[5].to_string(),
        });
    }

    mounts
}

/// Parses `/proc/mounts` (fstab format).
///
/// Format:
/// ```text
/// /dev/sda1 / ext4 rw,relatime 0 0
/// ```
pub fn parse_mounts(content: &str) -> Vec<MountEntry> {
    let mut mounts = Vec::new();

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let (Some(device), Some(mount_point), Some(fs_type), Some(options)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            continue;
        };

        mounts.push(MountEntry {
            device: unescape_octal(device),
            mount_point: unescape_octal(mount_point),
            fs_type: fs_type.to_string(),
            options: options.to_string(),
        });
    }

    mounts
}

/// Parses `/proc/filesystems` and returns the filesystem types flagged
/// `nodev`, i.e. those not backed by a block device.
///
/// Returns an error if the content holds no recognizable entry at all.
pub fn parse_virtual_fs_types(content: &str) -> Result<HashSet<String>, ParseError> {
    let mut virtual_types = HashSet::new();
    let mut seen = 0usize;

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("nodev"), Some(fs_type)) => {
                virtual_types.insert(fs_type.to_string());
                seen += 1;
            }
            (Some(_), None) => seen += 1,
            _ => {}
        }
    }

    if seen == 0 {
        return Err(ParseError::new("no filesystem types in /proc/filesystems"));
    }

    Ok(virtual_types)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_octal() {
        assert_eq!(unescape_octal("/mnt/plain"), "/mnt/plain");
        assert_eq!(unescape_octal("/mnt/my\\040disk"), "/mnt/my disk");
        assert_eq!(unescape_octal("/a\\011b\\134c"), "/a\tb\\c");
        // Truncated or non-octal escapes are kept verbatim
        assert_eq!(unescape_octal("/mnt/x\\04"), "/mnt/x\\04");
        assert_eq!(unescape_octal("/mnt/x\\9ab"), "/mnt/x\\9ab");
    }

    #[test]
    fn test_parse_mountinfo() {
        let content = "\
21 1 8:1 / / rw,relatime shared:1 - ext4 /dev/sda1 rw,errors=remount-ro
22 21 0:20 / /proc rw,nosuid,nodev,noexec,relatime - proc proc rw
28 21 8:33 / /mnt/backup\\040disk ro,relatime shared:31 master:2 - ext4 /dev/sdc1 ro
";
        let mounts = parse_mountinfo(content);
        assert_eq!(mounts.len(), 3);

        assert_eq!(mounts[0].device, "/dev/sda1");
        assert_eq!(mounts[0].mount_point, "/");
        assert_eq!(mounts[0].fs_type, "ext4");
        assert_eq!(mounts[0].options, "rw,relatime");

        // No optional fields before the separator
        assert_eq!(mounts[1].fs_type, "proc");
        assert_eq!(mounts[1].device, "proc");

        // Two optional fields and an escaped space
        assert_eq!(mounts[2].mount_point, "/mnt/backup disk");
        assert_eq!(mounts[2].device, "/dev/sdc1");
        assert_eq!(mounts[2].options, "ro,relatime");
    }

    #[test]
    fn test_parse_mountinfo_skips_malformed_lines() {
        let content = "\
garbage
21 1 8:1 / / rw,relatime shared:1 ext4 /dev/sda1 rw
26 21 8:2 / /boot rw,relatime shared:29 - ext4 /dev/sda2 rw
";
        let mounts = parse_mountinfo(content);
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].mount_point, "/boot");
    }

    #[test]
    fn test_parse_mounts() {
        let content = "\
/dev/sda1 / ext4 rw,relatime 0 0
proc /proc proc rw,nosuid,nodev,noexec,relatime 0 0
//server/share /mnt/nas\\040share cifs ro,vers=3.0 0 0
short line
";
        let mounts = parse_mounts(content);
        assert_eq!(mounts.len(), 3);
        assert_eq!(mounts[0].device, "/dev/sda1");
        assert_eq!(mounts[1].fs_type, "proc");
        assert_eq!(mounts[2].mount_point, "/mnt/nas share");
        assert_eq!(mounts[2].options, "ro,vers=3.0");
    }

    #[test]
    fn test_parse_virtual_fs_types() {
        let content = "nodev\tsysfs\nnodev\ttmpfs\n\text4\n\txfs\nnodev\toverlay\n";
        let types = parse_virtual_fs_types(content).unwrap();
        assert_eq!(types.len(), 3);
        assert!(types.contains("tmpfs"));
        assert!(types.contains("overlay"));
        assert!(!types.contains("ext4"));
    }

    #[test]
    fn test_parse_virtual_fs_types_empty() {
        assert!(parse_virtual_fs_types("").is_err());
    }
}
