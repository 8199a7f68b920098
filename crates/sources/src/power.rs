//! Backlights and batteries from `/sys/class`

use anyhow::{anyhow, Result};
use sbar_core::Entity;
use sbar_types::{Field, STANDBY_MARKER};
use std::path::Path;

use crate::format::{hours_minutes, percent};
use crate::sysfs::{list_dirs, read_attr, read_u64};

/// Discharging charge levels at or below which the status indicator changes
const MEDIUM_BATTERY_PERCENT: u64 = 60;
const LOW_BATTERY_PERCENT: u64 = 40;
const VERY_LOW_BATTERY_PERCENT: u64 = 20;

/// sysfs reports micro-units (µA, µV, µW, µWh, µAh)
const MICRO: f64 = 1_000_000.0;

pub fn discover_backlights(class_dir: &Path) -> Result<Vec<Entity>> {
    let devices = list_dirs(class_dir, |_, dir| {
        dir.join("brightness").exists() && dir.join("max_brightness").exists()
    })?;
    Ok(devices
        .into_iter()
        .map(|(name, path)| Entity::with_path(name, path))
        .collect())
}

pub fn backlight_field(field: Field, device: &Entity) -> Result<String> {
    let path = device_path(device)?;
    match field {
        Field::BacklightName => Ok(device.id.clone()),
        Field::BacklightBrightness => {
            let brightness = read_u64(&path.join("brightness"))?;
            let max = read_u64(&path.join("max_brightness"))?;
            percent(brightness as f64, max as f64)
                .ok_or_else(|| anyhow!("{} has zero max_brightness", device.id))
        }
        other => Err(anyhow!("{} is not a backlight field", other)),
    }
}

/// Power supplies of type `Battery` that report a charge level
pub fn discover_batteries(class_dir: &Path) -> Result<Vec<Entity>> {
    let devices = list_dirs(class_dir, |_, dir| {
        read_attr(&dir.join("type")).is_ok_and(|kind| kind == "Battery")
            && dir.join("capacity").exists()
    })?;
    Ok(devices
        .into_iter()
        .map(|(name, path)| Entity::with_path(name, path))
        .collect())
}

pub fn battery_field(field: Field, battery: &Entity) -> Result<String> {
    let path = device_path(battery)?;
    match field {
        Field::BatteryName => Ok(battery.id.clone()),
        Field::BatteryStatus => battery_status(path),
        Field::BatteryCharge => Ok(read_u64(&path.join("capacity"))?.to_string()),
        Field::BatteryCapacity => battery_health(path),
        Field::BatteryCurrent => {
            let current = read_u64(&path.join("current_now"))? as f64 / MICRO;
            Ok(format!("{:.2}", current))
        }
        Field::BatteryPower => Ok(format!("{:.2}", power_watts(path)?)),
        Field::BatteryTime => battery_time(path),
        other => Err(anyhow!("{} is not a battery field", other)),
    }
}

fn device_path(device: &Entity) -> Result<&Path> {
    device
        .path()
        .ok_or_else(|| anyhow!("Device {} has no sysfs path", device.id))
}

fn battery_status(path: &Path) -> Result<String> {
    let status = read_attr(&path.join("status"))?;
    let indicator = match status.as_str() {
        "Full" | "Charging" => "🟢",
        "Not charging" => "❌",
        "Discharging" => {
            let charge = read_u64(&path.join("capacity"))?;
            if charge <= VERY_LOW_BATTERY_PERCENT {
                "🔴"
            } else if charge <= LOW_BATTERY_PERCENT {
                "🟠"
            } else if charge <= MEDIUM_BATTERY_PERCENT {
                "🟡"
            } else {
                "🔵"
            }
        }
        other => return Err(anyhow!("Unknown battery status {:?}", other)),
    };
    Ok(indicator.to_string())
}

/// Full charge relative to the design capacity
fn battery_health(path: &Path) -> Result<String> {
    let (full, design) = match (
        read_u64(&path.join("energy_full")),
        read_u64(&path.join("energy_full_design")),
    ) {
        (Ok(full), Ok(design)) => (full, design),
        _ => (
            read_u64(&path.join("charge_full"))?,
            read_u64(&path.join("charge_full_design"))?,
        ),
    };
    percent(full as f64, design as f64)
        .ok_or_else(|| anyhow!("Battery reports zero design capacity"))
}

/// Drawn power, derived from current and voltage when `power_now` is absent
fn power_watts(path: &Path) -> Result<f64> {
    if let Ok(power) = read_u64(&path.join("power_now")) {
        return Ok(power as f64 / MICRO);
    }
    let current = read_u64(&path.join("current_now"))? as f64 / MICRO;
    let voltage = read_u64(&path.join("voltage_now"))? as f64 / MICRO;
    Ok(current * voltage)
}

/// Time to empty while discharging, time to full while charging
fn battery_time(path: &Path) -> Result<String> {
    let status = read_attr(&path.join("status"))?;
    let charging = match status.as_str() {
        "Discharging" => false,
        "Charging" => true,
        _ => return Ok(STANDBY_MARKER.to_string()),
    };

    // Energy over power, or charge over current on batteries reporting µAh
    let (now, full, rate) = match (
        read_u64(&path.join("energy_now")),
        read_u64(&path.join("energy_full")),
        read_u64(&path.join("power_now")),
    ) {
        (Ok(now), Ok(full), Ok(rate)) => (now, full, rate),
        _ => (
            read_u64(&path.join("charge_now"))?,
            read_u64(&path.join("charge_full"))?,
            read_u64(&path.join("current_now"))?,
        ),
    };
    if rate == 0 {
        return Ok(STANDBY_MARKER.to_string());
    }

    let remaining = if charging {
        full.saturating_sub(now)
    } else {
        now
    };
    Ok(hours_minutes(remaining as f64 / rate as f64)
        .unwrap_or_else(|| STANDBY_MARKER.to_string()))
}
