//! Utility functions for termfs
//!
//! Small helpers shared by the storage backends and the command-line tool:
//! atomic file writes and human-readable byte and usage formatting.

use crate::error::{Result, TermfsError};
use crate::types::StorageUsage;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Format a byte count using IEC units, one decimal above bytes
///
/// ```rust
/// use termfs::utils::format_bytes;
///
/// assert_eq!(format_bytes(1023), "1023 B");
/// assert_eq!(format_bytes(1536), "1.5 KiB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut scaled = bytes as f64 / 1024.0;
    let mut unit = 0;
    while scaled >= 1024.0 && unit + 1 < UNITS.len() {
        scaled /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", scaled, UNITS[unit])
}

/// One-line summary of store consumption, with the quota share when bounded
///
/// ```rust
/// use termfs::utils::format_usage;
/// use termfs::StorageUsage;
///
/// let usage = StorageUsage { used_bytes: 512, quota_bytes: Some(2048) };
/// assert_eq!(format_usage(&usage), "512 B of 2.0 KiB used (25.0%)");
/// ```
pub fn format_usage(usage: &StorageUsage) -> String {
    match (usage.quota_bytes, usage.percentage()) {
        (Some(quota), Some(percent)) => format!(
            "{} of {} used ({:.1}%)",
            format_bytes(usage.used_bytes),
            format_bytes(quota),
            percent
        ),
        _ => format!("{} used", format_bytes(usage.used_bytes)),
    }
}

/// Atomic file write (write to temp file then rename)
///
/// The temporary file is created next to the target so the final rename
/// never crosses filesystems. Either the whole content becomes visible or
/// the previous file is left untouched.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| TermfsError::storage(format!("{:?} has no parent directory", path)))?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| TermfsError::Io(e.error))?;

    Ok(())
}
