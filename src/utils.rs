//! Utility functions for formatting and scratch-file naming.
//!
//! The formatting helpers convert raw measurement values into the
//! human-readable strings used by the table sink. The structured sink
//! intentionally bypasses them and emits raw values.

use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

/// Format a byte count in a human-readable way.
///
/// Uses binary (1024-based) scaling, which is standard for memory and
/// storage sizes.
///
/// ## Examples
///
/// ```rust
/// # use compress_bench::utils::format_bytes;
/// assert_eq!(format_bytes(512), "512 B");
/// assert_eq!(format_bytes(1536), "1.50 KiB");
/// assert_eq!(format_bytes(2_621_440), "2.50 MiB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;

    let b = bytes as f64;
    if b < KIB {
        format!("{} B", bytes)
    } else if b < MIB {
        format!("{:.2} KiB", b / KIB)
    } else if b < GIB {
        format!("{:.2} MiB", b / MIB)
    } else {
        format!("{:.2} GiB", b / GIB)
    }
}

/// Format a duration in a human-readable way.
///
/// Selects the most appropriate unit for the magnitude. Sub-second values
/// use two decimal places; longer durations switch to compound
/// minute/second form so long-running tool measurements stay readable.
///
/// ## Examples
///
/// ```rust
/// # use compress_bench::utils::format_duration;
/// # use std::time::Duration;
/// assert_eq!(format_duration(Duration::from_nanos(750)), "750ns");
/// assert_eq!(format_duration(Duration::from_micros(2500)), "2.50ms");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ns = duration.as_nanos();

    if total_ns < 1_000 {
        format!("{}ns", total_ns)
    } else if total_ns < 1_000_000 {
        format!("{:.2}us", total_ns as f64 / 1_000.0)
    } else if total_ns < 1_000_000_000 {
        format!("{:.2}ms", total_ns as f64 / 1_000_000.0)
    } else if total_ns < 60_000_000_000 {
        format!("{:.2}s", total_ns as f64 / 1_000_000_000.0)
    } else {
        let seconds = duration.as_secs();
        let minutes = seconds / 60;
        let remaining = seconds % 60;
        format!("{}m {}s", minutes, remaining)
    }
}

/// Generate a fresh, collision-free scratch path under `dir`.
///
/// Every measurement gets its own uniquely named scratch file so that
/// concurrent harness runs (or leftovers from a crashed run) can never
/// clobber each other.
pub fn temp_path(dir: &Path, label: &str) -> PathBuf {
    dir.join(format!("compress-bench-{}-{}", label, Uuid::new_v4()))
}

/// Remove a file if it exists, ignoring a missing target.
///
/// Used for end-of-run cleanup where the file may already have been
/// removed by an earlier error path.
pub fn remove_if_exists(path: &Path) {
    if path.exists() {
        let _ = std::fs::remove_file(path);
    }
}
