//! Value formatting shared by the providers

use sbar_core::constants::{BYTES_PER_GB, BYTES_PER_KB, BYTES_PER_MB, BYTES_PER_TB};

/// Indicator for a boolean attribute
pub fn indicator(set: bool) -> &'static str {
    if set {
        "🟢"
    } else {
        "🔴"
    }
}

/// Integer percentage of `part` in `total`
pub fn percent(part: f64, total: f64) -> Option<String> {
    if total <= 0.0 {
        return None;
    }
    Some(format!("{:.0}", part / total * 100.0))
}

/// Byte count in binary units, one decimal above KiB
pub fn human_bytes(bytes: u64) -> String {
    let value = bytes as f64;
    if value >= BYTES_PER_TB {
        format!("{:.1}T", value / BYTES_PER_TB)
    } else if value >= BYTES_PER_GB {
        format!("{:.1}G", value / BYTES_PER_GB)
    } else if value >= BYTES_PER_MB {
        format!("{:.1}M", value / BYTES_PER_MB)
    } else if value >= BYTES_PER_KB {
        format!("{:.1}K", value / BYTES_PER_KB)
    } else {
        format!("{}B", bytes)
    }
}

/// `days-hh:mm:ss`
pub fn uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;
    format!("{}-{:02}:{:02}:{:02}", days, hours, minutes, secs)
}

/// `h:mm` for a duration given in hours
pub fn hours_minutes(hours: f64) -> Option<String> {
    if !hours.is_finite() || hours < 0.0 {
        return None;
    }
    let total_minutes = (hours * 60.0).round() as u64;
    Some(format!("{}:{:02}", total_minutes / 60, total_minutes % 60))
}
