//! Host-wide metrics read through sysinfo

use anyhow::{anyhow, Result};
use sbar_types::{Field, FieldSet, STANDBY_MARKER};
use std::time::Instant;
use sysinfo::{Components, System, MINIMUM_CPU_UPDATE_INTERVAL};

use crate::format::{percent, uptime};

/// CPU usage is a difference between two samples
const CPU_SAMPLES_NEEDED: u32 = 2;

/// CPU, memory, temperatures and load
///
/// Only the parts a cycle needs are refreshed, since sysinfo reads several
/// procfs files per refresh. CPU usage covers the time since the previous
/// CPU sample; samples closer together than sysinfo's minimum interval are
/// skipped, so a notification right after a tick keeps the tick's figures.
pub struct HostMonitor {
    system: System,
    components: Components,
    cpu_samples: u32,
    last_cpu_sample: Option<Instant>,
}

impl HostMonitor {
    pub fn new() -> Self {
        let components = Components::new_with_refreshed_list();
        log::info!("Found {} temperature sensors", components.len());

        Self {
            system: System::new(),
            components,
            cpu_samples: 0,
            last_cpu_sample: None,
        }
    }

    pub fn refresh(&mut self, dirty: FieldSet) {
        self.refresh_at(dirty, Instant::now());
    }

    fn refresh_at(&mut self, dirty: FieldSet, now: Instant) {
        if dirty.intersects(Field::Cpu | Field::CpuPerCore) && self.cpu_sample_due(now) {
            self.system.refresh_cpu_usage();
            self.cpu_samples = self.cpu_samples.saturating_add(1);
            self.last_cpu_sample = Some(now);
        }
        if dirty.intersects(Field::Memory | Field::Swap) {
            self.system.refresh_memory();
        }
        if dirty.intersects(Field::HighestTemp | Field::LowestTemp) {
            self.components.refresh();
        }
    }

    pub fn field(&self, field: Field) -> Result<String> {
        match field {
            Field::Uptime => Ok(uptime(System::uptime())),
            Field::Memory => percent(
                self.system.used_memory() as f64,
                self.system.total_memory() as f64,
            )
            .ok_or_else(|| anyhow!("Total memory is unknown")),
            Field::Swap => percent(
                self.system.used_swap() as f64,
                self.system.total_swap() as f64,
            )
            .ok_or_else(|| anyhow!("No swap configured")),
            Field::Cpu => Ok(self.cpu_usage()),
            Field::CpuPerCore => Ok(self.per_core_usage()),
            Field::HighestTemp => self.temperature(f32::max),
            Field::LowestTemp => self.temperature(f32::min),
            Field::Load1 => Ok(format!("{:.1}", System::load_average().one)),
            Field::Load5 => Ok(format!("{:.1}", System::load_average().five)),
            Field::Load15 => Ok(format!("{:.1}", System::load_average().fifteen)),
            Field::Kernel => running_release(),
            other => Err(anyhow!("{} is not a host field", other)),
        }
    }

    fn cpu_sample_due(&self, now: Instant) -> bool {
        self.last_cpu_sample.map_or(true, |last| {
            now.saturating_duration_since(last) >= MINIMUM_CPU_UPDATE_INTERVAL
        })
    }

    fn cpu_usage(&self) -> String {
        if self.cpu_samples < CPU_SAMPLES_NEEDED {
            return STANDBY_MARKER.to_string();
        }
        format!("{:.0}", self.system.global_cpu_usage())
    }

    fn per_core_usage(&self) -> String {
        if self.cpu_samples < CPU_SAMPLES_NEEDED {
            return STANDBY_MARKER.to_string();
        }
        self.system
            .cpus()
            .iter()
            .map(|cpu| format!("{:.0}", cpu.cpu_usage()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Fold of all finite sensor readings, whole °C
    fn temperature(&self, pick: fn(f32, f32) -> f32) -> Result<String> {
        self.components
            .iter()
            .map(|component| component.temperature())
            .filter(|celsius| celsius.is_finite())
            .reduce(pick)
            .map(|celsius| format!("{:.0}", celsius))
            .ok_or_else(|| anyhow!("No temperature sensors"))
    }
}

impl Default for HostMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Release of the running kernel
pub fn running_release() -> Result<String> {
    System::kernel_version().ok_or_else(|| anyhow!("Kernel release is unknown"))
}
