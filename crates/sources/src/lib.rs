//! sbar-sources: Field provider implementations for the sbar status line.
//!
//! [`SystemProvider`] answers every field from the running Linux system using
//! sysinfo for host metrics and direct sysfs/procfs reads for devices.

mod audio;
mod disk;
mod format;
mod host;
mod kernel;
mod network;
mod power;
mod sysfs;
mod system;
mod wireless;

pub use audio::Direction;
pub use disk::{MountInfo, MountTable};
pub use host::HostMonitor;
pub use network::{Counters, NetworkMonitor, TrafficMeter};
pub use system::{SystemPaths, SystemProvider, DEFAULT_TIME_FORMAT};
