//! Network interfaces and their traffic
//!
//! Counters come from sysinfo; link state comes from `operstate` in
//! `/sys/class/net`. Traffic fields cover the time between the last two
//! samples, and a sample is taken whenever a cycle refreshes network fields.

use anyhow::{anyhow, Result};
use sbar_core::Entity;
use sbar_types::{Field, STANDBY_MARKER};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use sysinfo::Networks;

use crate::format::human_bytes;
use crate::sysfs::read_attr;
use crate::wireless;

/// Interfaces never shown
const SKIPPED_INTERFACES: &[&str] = &["lo"];

/// Cumulative counters of one interface
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub packets_down: u64,
    pub packets_up: u64,
    pub bytes_down: u64,
    pub bytes_up: u64,
}

impl Counters {
    fn since(&self, earlier: &Counters) -> Counters {
        Counters {
            packets_down: self.packets_down.saturating_sub(earlier.packets_down),
            packets_up: self.packets_up.saturating_sub(earlier.packets_up),
            bytes_down: self.bytes_down.saturating_sub(earlier.bytes_down),
            bytes_up: self.bytes_up.saturating_sub(earlier.bytes_up),
        }
    }
}

/// Traffic between the last two readings of every interface
#[derive(Debug, Default)]
pub struct TrafficMeter {
    /// (latest, previous) readings
    readings: HashMap<String, (Counters, Option<Counters>)>,
}

impl TrafficMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, interface: &str, counters: Counters) {
        match self.readings.get_mut(interface) {
            Some((latest, previous)) => {
                *previous = Some(*latest);
                *latest = counters;
            }
            None => {
                self.readings.insert(interface.to_string(), (counters, None));
            }
        }
    }

    /// Drop interfaces that are no longer present
    pub fn retain(&mut self, present: &[String]) {
        self.readings.retain(|name, _| present.contains(name));
    }

    /// Traffic since the previous reading, `None` after only one reading
    pub fn delta(&self, interface: &str) -> Option<Counters> {
        let (latest, previous) = self.readings.get(interface)?;
        previous.as_ref().map(|earlier| latest.since(earlier))
    }
}

/// Interface list and traffic, refreshed through sysinfo
pub struct NetworkMonitor {
    networks: Networks,
    traffic: TrafficMeter,
    class_dir: PathBuf,
    /// `/proc/net/wireless`
    wireless_stats: PathBuf,
}

impl NetworkMonitor {
    pub fn new(class_dir: PathBuf, wireless_stats: PathBuf) -> Self {
        Self {
            networks: Networks::new_with_refreshed_list(),
            traffic: TrafficMeter::new(),
            class_dir,
            wireless_stats,
        }
    }

    /// Take a new counter reading for every interface
    pub fn refresh(&mut self) {
        self.networks.refresh_list();
        let mut present = Vec::new();
        for (name, data) in self.networks.iter() {
            self.traffic.record(
                name,
                Counters {
                    packets_down: data.total_packets_received(),
                    packets_up: data.total_packets_transmitted(),
                    bytes_down: data.total_received(),
                    bytes_up: data.total_transmitted(),
                },
            );
            present.push(name.clone());
        }
        self.traffic.retain(&present);
    }

    /// Interfaces sorted by name, loopback excluded
    pub fn discover(&self) -> Vec<Entity> {
        let mut names: Vec<&String> = self
            .networks
            .keys()
            .filter(|name| !SKIPPED_INTERFACES.contains(&name.as_str()))
            .collect();
        names.sort();
        names
            .into_iter()
            .map(|name| Entity::with_path(name.clone(), self.class_dir.join(name)))
            .collect()
    }

    pub fn field(&self, field: Field, interface: &Entity) -> Result<String> {
        network_field(field, interface, &self.traffic, &self.wireless_stats)
    }
}

pub fn network_field(
    field: Field,
    interface: &Entity,
    traffic: &TrafficMeter,
    wireless_stats: &Path,
) -> Result<String> {
    match field {
        Field::NetworkName => return Ok(interface.id.clone()),
        Field::NetworkStatus => return link_status(interface_dir(interface)?),
        Field::NetworkSsid | Field::NetworkStrength => {
            if operstate(interface_dir(interface)?)? != "up" {
                return Ok(STANDBY_MARKER.to_string());
            }
            return match field {
                Field::NetworkSsid => wireless::ssid(&interface.id),
                _ => wireless::signal_strength(wireless_stats, &interface.id),
            };
        }
        _ => {}
    }

    let Some(delta) = traffic.delta(&interface.id) else {
        return Ok(STANDBY_MARKER.to_string());
    };
    match field {
        Field::NetworkPacketsDown => Ok(delta.packets_down.to_string()),
        Field::NetworkPacketsUp => Ok(delta.packets_up.to_string()),
        Field::NetworkBytesDown => Ok(human_bytes(delta.bytes_down)),
        Field::NetworkBytesUp => Ok(human_bytes(delta.bytes_up)),
        other => Err(anyhow!("{} is not a network field", other)),
    }
}

fn interface_dir(interface: &Entity) -> Result<&Path> {
    interface
        .path()
        .ok_or_else(|| anyhow!("Interface {} has no sysfs path", interface.id))
}

fn operstate(interface_dir: &Path) -> Result<String> {
    read_attr(&interface_dir.join("operstate"))
}

fn link_status(interface_dir: &Path) -> Result<String> {
    let state = operstate(interface_dir)?;
    let indicator = match state.as_str() {
        "up" => "🟢",
        "dormant" => "🟡",
        _ => "🔴",
    };
    Ok(indicator.to_string())
}
