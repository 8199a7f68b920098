//! Format strings, one per template scope

use serde::{Deserialize, Serialize};

use crate::registry::Scope;

/// Format strings for the status line and every composite's nested template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    /// Top-level status line
    pub status: String,
    /// Rendered once per block device
    pub disk: String,
    /// Rendered once per partition, inside a disk
    pub partition: String,
    /// Rendered once per backlight device
    pub backlight: String,
    /// Rendered once per battery
    pub battery: String,
    /// Rendered once per network interface
    pub network: String,
    /// Rendered once per playback control
    pub audio_playback: String,
    /// Rendered once per capture control
    pub audio_capture: String,
}

impl FormatConfig {
    pub fn format_for(&self, scope: Scope) -> &str {
        match scope {
            Scope::Status => &self.status,
            Scope::Disk => &self.disk,
            Scope::Partition => &self.partition,
            Scope::Backlight => &self.backlight,
            Scope::Battery => &self.battery,
            Scope::Network => &self.network,
            Scope::AudioPlayback => &self.audio_playback,
            Scope::AudioCapture => &self.audio_capture,
        }
    }
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            status: " /d/B/b/n| CPU /c% /h°C | MEM /m% SWP /s% | /1 /5 /F | /t ".to_string(),
            disk: "/p".to_string(),
            partition: "/m /u% | ".to_string(),
            backlight: "☀ /b% | ".to_string(),
            battery: "/s /c% /t | ".to_string(),
            network: "/n /s ↓/D ↑/U | ".to_string(),
            audio_playback: "🔊 /s /v% | ".to_string(),
            audio_capture: "🎤 /s /v% | ".to_string(),
        }
    }
}
