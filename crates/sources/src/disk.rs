//! Block devices and their partitions
//!
//! Devices are discovered from `/sys/block`; mount information comes from
//! sysinfo's mounted filesystem list.

use anyhow::{anyhow, Result};
use sbar_core::constants::SECTOR_SIZE;
use sbar_core::Entity;
use sbar_types::Field;
use std::collections::HashMap;
use std::path::Path;
use sysinfo::Disks;

use crate::format::{human_bytes, indicator, percent};
use crate::sysfs::{list_dirs, read_attr, read_flag, read_u64};

/// Virtual devices that never hold user data
const SKIPPED_PREFIXES: &[&str] = &["loop", "ram", "zram"];

/// Mount point shown for a partition that is not mounted
const UNMOUNTED: &str = "-";

/// A mounted filesystem
#[derive(Debug, Clone, PartialEq)]
pub struct MountInfo {
    pub mount_point: String,
    pub file_system: String,
    pub total_space: u64,
    pub available_space: u64,
}

/// Mounted filesystems keyed by device name (`sda1`, `nvme0n1p2`)
#[derive(Debug, Default)]
pub struct MountTable {
    mounts: HashMap<String, MountInfo>,
}

impl MountTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from sysinfo's view of mounted filesystems
    pub fn refresh(&mut self, disks: &Disks) {
        self.mounts.clear();
        for disk in disks.list() {
            let name = disk.name().to_string_lossy();
            let device = name.rsplit('/').next().unwrap_or(&name).to_string();
            // The first mount of a device wins
            self.mounts.entry(device).or_insert_with(|| MountInfo {
                mount_point: disk.mount_point().to_string_lossy().to_string(),
                file_system: disk.file_system().to_string_lossy().to_string(),
                total_space: disk.total_space(),
                available_space: disk.available_space(),
            });
        }
        log::debug!("Mount table holds {} devices", self.mounts.len());
    }

    pub fn insert(&mut self, device: impl Into<String>, info: MountInfo) {
        self.mounts.insert(device.into(), info);
    }

    pub fn get(&self, device: &str) -> Option<&MountInfo> {
        self.mounts.get(device)
    }
}

/// Block devices under `sys_block`, virtual ones excluded
pub fn discover_disks(sys_block: &Path) -> Result<Vec<Entity>> {
    let disks = list_dirs(sys_block, |name, _| {
        !SKIPPED_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
    })?;
    Ok(disks
        .into_iter()
        .map(|(name, path)| Entity::with_path(name, path))
        .collect())
}

/// Partitions of a disk: its subdirectories carrying a `partition` attribute
pub fn discover_partitions(disk: &Entity) -> Result<Vec<Entity>> {
    let path = entity_path(disk)?;
    let parts = list_dirs(path, |_, dir| dir.join("partition").exists())?;
    Ok(parts
        .into_iter()
        .map(|(name, path)| Entity::with_path(name, path))
        .collect())
}

/// Value of a disk-level field
pub fn disk_field(field: Field, disk: &Entity) -> Result<String> {
    let path = entity_path(disk)?;
    match field {
        Field::DiskName => Ok(disk.id.clone()),
        Field::DiskRotational => {
            Ok(indicator(read_flag(&path.join("queue/rotational"))?).to_string())
        }
        Field::DiskReadOnly => Ok(indicator(read_flag(&path.join("ro"))?).to_string()),
        Field::DiskRemovable => Ok(indicator(read_flag(&path.join("removable"))?).to_string()),
        Field::DiskSize => size(path),
        Field::DiskInFlight => in_flight(path),
        other => Err(anyhow!("{} is not a disk field", other)),
    }
}

/// Value of a partition-level field
pub fn partition_field(field: Field, part: &Entity, mounts: &MountTable) -> Result<String> {
    let path = entity_path(part)?;
    let mount = mounts.get(&part.id);
    match field {
        Field::PartName => Ok(part.id.clone()),
        Field::PartReadOnly => Ok(indicator(read_flag(&path.join("ro"))?).to_string()),
        Field::PartMount => Ok(mount
            .map(|m| m.mount_point.clone())
            .unwrap_or_else(|| UNMOUNTED.to_string())),
        Field::PartFilesystem => Ok(mount
            .map(|m| m.file_system.clone())
            .unwrap_or_else(|| UNMOUNTED.to_string())),
        Field::PartSize => size(path),
        Field::PartUsage => {
            let mount = mount.ok_or_else(|| anyhow!("{} is not mounted", part.id))?;
            let used = mount.total_space.saturating_sub(mount.available_space);
            percent(used as f64, mount.total_space as f64)
                .ok_or_else(|| anyhow!("{} reports zero size", mount.mount_point))
        }
        Field::PartInFlight => in_flight(path),
        other => Err(anyhow!("{} is not a partition field", other)),
    }
}

fn entity_path(entity: &Entity) -> Result<&Path> {
    entity
        .path()
        .ok_or_else(|| anyhow!("Block device {} has no sysfs path", entity.id))
}

fn size(device: &Path) -> Result<String> {
    let sectors = read_u64(&device.join("size"))?;
    Ok(human_bytes(sectors.saturating_mul(SECTOR_SIZE)))
}

/// `reads/writes` currently queued
fn in_flight(device: &Path) -> Result<String> {
    let path = device.join("inflight");
    let counters = read_attr(&path)?;
    let mut parts = counters.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(reads), Some(writes)) => Ok(format!("{}/{}", reads, writes)),
        _ => Err(anyhow!(
            "Invalid inflight counters {:?} in {}",
            counters,
            path.display()
        )),
    }
}
