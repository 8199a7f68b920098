//! The Linux field provider

use anyhow::{anyhow, Result};
use chrono::Local;
use sbar_core::{Entity, FieldProvider};
use sbar_types::{Field, FieldSet};
use std::fmt::Write;
use std::path::PathBuf;
use sysinfo::Disks;

use crate::audio::{audio_field, discover_cards, microphone_status, Direction};
use crate::disk::{discover_disks, discover_partitions, disk_field, partition_field, MountTable};
use crate::host::{running_release, HostMonitor};
use crate::kernel::{outdated_kernel, username};
use crate::network::NetworkMonitor;
use crate::power::{backlight_field, battery_field, discover_backlights, discover_batteries};

/// Default strftime pattern for the time field
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Filesystem roots the provider reads from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemPaths {
    /// sysfs mount, normally `/sys`
    pub sysfs: PathBuf,
    /// procfs mount, normally `/proc`
    pub procfs: PathBuf,
    /// Installed kernel modules, one directory per release
    pub modules: PathBuf,
}

impl Default for SystemPaths {
    fn default() -> Self {
        Self {
            sysfs: PathBuf::from("/sys"),
            procfs: PathBuf::from("/proc"),
            modules: PathBuf::from("/usr/lib/modules"),
        }
    }
}

impl SystemPaths {
    fn block(&self) -> PathBuf {
        self.sysfs.join("block")
    }

    fn class(&self, class: &str) -> PathBuf {
        self.sysfs.join("class").join(class)
    }

    fn asound(&self) -> PathBuf {
        self.procfs.join("asound")
    }

    fn wireless(&self) -> PathBuf {
        self.procfs.join("net").join("wireless")
    }
}

/// Reads every field from the running Linux system
pub struct SystemProvider {
    paths: SystemPaths,
    time_format: String,
    host: HostMonitor,
    disks: Disks,
    mounts: MountTable,
    networks: NetworkMonitor,
}

impl SystemProvider {
    pub fn new(time_format: impl Into<String>) -> Self {
        Self::with_paths(time_format, SystemPaths::default())
    }

    pub fn with_paths(time_format: impl Into<String>, paths: SystemPaths) -> Self {
        let networks = NetworkMonitor::new(paths.class("net"), paths.wireless());
        Self {
            time_format: time_format.into(),
            host: HostMonitor::new(),
            disks: Disks::new_with_refreshed_list(),
            mounts: MountTable::new(),
            networks,
            paths,
        }
    }

    pub fn paths(&self) -> &SystemPaths {
        &self.paths
    }

    fn top_level(&self, field: Field) -> Result<String> {
        match field {
            Field::Time => {
                let mut time = String::new();
                write!(time, "{}", Local::now().format(&self.time_format))
                    .map_err(|_| anyhow!("Invalid time format {:?}", self.time_format))?;
                Ok(time)
            }
            Field::Username => username(),
            Field::Microphone => microphone_status(&self.paths.asound()),
            Field::OutdatedKernel => outdated_kernel(&self.paths.modules, &running_release()?),
            other => self.host.field(other),
        }
    }
}

impl Default for SystemProvider {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_FORMAT)
    }
}

impl FieldProvider for SystemProvider {
    fn prepare(&mut self, dirty: FieldSet) {
        self.host.refresh(dirty);
        if dirty.intersects(Field::Part.subtree()) {
            self.disks.refresh_list();
            self.mounts.refresh(&self.disks);
        }
        if dirty.intersects(Field::Network.subtree()) {
            self.networks.refresh();
        }
    }

    fn get(&mut self, field: Field, entity: Option<&Entity>) -> Result<String> {
        let Some(parent) = field.parent() else {
            return self.top_level(field);
        };
        let entity = entity.ok_or_else(|| anyhow!("{} needs a {} entity", field, parent))?;
        match parent {
            Field::Disk => disk_field(field, entity),
            Field::Part => partition_field(field, entity, &self.mounts),
            Field::Backlight => backlight_field(field, entity),
            Field::Battery => battery_field(field, entity),
            Field::Network => self.networks.field(field, entity),
            Field::AudioPlayback | Field::AudioCapture => audio_field(field, entity),
            other => Err(anyhow!("{} has no entities", other)),
        }
    }

    fn discover(&mut self, composite: Field, parent: Option<&Entity>) -> Result<Vec<Entity>> {
        match composite {
            Field::Disk => discover_disks(&self.paths.block()),
            Field::Part => {
                let disk = parent.ok_or_else(|| anyhow!("Partitions need a parent disk"))?;
                discover_partitions(disk)
            }
            Field::Backlight => discover_backlights(&self.paths.class("backlight")),
            Field::Battery => discover_batteries(&self.paths.class("power_supply")),
            Field::Network => Ok(self.networks.discover()),
            Field::AudioPlayback | Field::AudioCapture => {
                let direction = Direction::for_composite(composite)
                    .ok_or_else(|| anyhow!("{} is not an audio composite", composite))?;
                discover_cards(&self.paths.asound(), direction)
            }
            other => Err(anyhow!("{} is not a composite", other)),
        }
    }
}
