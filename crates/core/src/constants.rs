//! Shared constants for the status bar

use std::time::Duration;

/// Interval between periodic refreshes of every field
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1000);

/// Longest the main loop blocks waiting for a notification
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_millis(50);

/// File other programs write dirty sets to
pub const DEFAULT_NOTIFY_PATH: &str = "/tmp/status_bar";

/// Binary size multipliers
pub const BYTES_PER_KB: f64 = 1024.0;
pub const BYTES_PER_MB: f64 = BYTES_PER_KB * 1024.0;
pub const BYTES_PER_GB: f64 = BYTES_PER_MB * 1024.0;
pub const BYTES_PER_TB: f64 = BYTES_PER_GB * 1024.0;

/// Size of one block-layer sector, as sysfs counts them
pub const SECTOR_SIZE: u64 = 512;
