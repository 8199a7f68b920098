//! Field identifiers describing every metric the status line can show

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::field_set::FieldSet;

/// Whether a field renders a single value or expands per entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// A single value (e.g., "memory", "disk_size")
    Leaf,
    /// Expands a nested template once per discovered entity (e.g., "disk")
    Composite,
}

macro_rules! fields {
    ($( $variant:ident = $index:literal => $name:literal, $description:literal; )*) => {
        /// One addressable metric in the status line.
        ///
        /// The discriminant is the bit index used by [`FieldSet`] and by the
        /// notification wire format. Never reorder or reuse a discriminant.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[repr(u8)]
        pub enum Field {
            $(
                #[serde(rename = $name)]
                $variant = $index,
            )*
        }

        impl Field {
            /// Every field, in bit order
            pub const ALL: [Field; FIELD_COUNT] = [ $( Field::$variant, )* ];

            /// Snake-case name used on the command line and in logs
            pub const fn name(self) -> &'static str {
                match self {
                    $( Field::$variant => $name, )*
                }
            }

            /// Short human-readable description
            pub const fn description(self) -> &'static str {
                match self {
                    $( Field::$variant => $description, )*
                }
            }
        }
    };
}

/// Number of fields in the universe
pub const FIELD_COUNT: usize = 58;

fields! {
    Time = 0 => "time", "Local date and time";
    Uptime = 1 => "uptime", "Time since boot";
    Disk = 2 => "disk", "Block devices";
    DiskName = 3 => "disk_name", "Block device name";
    DiskRotational = 4 => "disk_rotational", "Rotational media indicator";
    DiskReadOnly = 5 => "disk_read_only", "Read-only indicator";
    DiskRemovable = 6 => "disk_removable", "Removable media indicator";
    DiskSize = 7 => "disk_size", "Block device size";
    DiskInFlight = 8 => "disk_in_flight", "In-flight reads/writes";
    Part = 9 => "part", "Partitions of a block device";
    PartName = 10 => "part_name", "Partition name";
    PartReadOnly = 11 => "part_read_only", "Partition read-only indicator";
    PartMount = 12 => "part_mount", "Partition mount point";
    PartFilesystem = 13 => "part_filesystem", "Partition filesystem type";
    PartSize = 14 => "part_size", "Partition size";
    PartUsage = 15 => "part_usage", "Partition usage percent";
    PartInFlight = 16 => "part_in_flight", "Partition in-flight reads/writes";
    Swap = 17 => "swap", "Swap usage percent";
    Memory = 18 => "memory", "Memory usage percent";
    Cpu = 19 => "cpu", "Total CPU usage percent";
    CpuPerCore = 20 => "cpu_per_core", "Per-core CPU usage percent";
    HighestTemp = 21 => "highest_temp", "Highest sensor temperature";
    LowestTemp = 22 => "lowest_temp", "Lowest sensor temperature";
    Load1 = 23 => "load_1", "One minute load average";
    Load5 = 24 => "load_5", "Five minute load average";
    Load15 = 25 => "load_15", "Fifteen minute load average";
    Backlight = 26 => "backlight", "Backlight devices";
    BacklightName = 27 => "backlight_name", "Backlight device name";
    BacklightBrightness = 28 => "backlight_brightness", "Backlight brightness percent";
    Battery = 29 => "battery", "Batteries";
    BatteryName = 30 => "battery_name", "Battery name";
    BatteryStatus = 31 => "battery_status", "Battery charging status";
    BatteryCharge = 32 => "battery_charge", "Battery charge percent";
    BatteryCapacity = 33 => "battery_capacity", "Battery health percent";
    BatteryCurrent = 34 => "battery_current", "Battery current draw";
    BatteryPower = 35 => "battery_power", "Battery power draw";
    BatteryTime = 36 => "battery_time", "Battery time remaining";
    Network = 37 => "network", "Network interfaces";
    NetworkName = 38 => "network_name", "Interface name";
    NetworkStatus = 39 => "network_status", "Interface operational status";
    NetworkPacketsDown = 40 => "network_packets_down", "Packets received since the previous sample";
    NetworkPacketsUp = 41 => "network_packets_up", "Packets sent since the previous sample";
    NetworkBytesDown = 42 => "network_bytes_down", "Bytes received since the previous sample";
    NetworkBytesUp = 43 => "network_bytes_up", "Bytes sent since the previous sample";
    AudioPlayback = 44 => "audio_playback", "Audio playback controls";
    AudioPlaybackName = 45 => "audio_playback_name", "Playback control name";
    AudioPlaybackStatus = 46 => "audio_playback_status", "Playback mute status";
    AudioPlaybackVolume = 47 => "audio_playback_volume", "Playback volume percent";
    AudioCapture = 48 => "audio_capture", "Audio capture controls";
    AudioCaptureName = 49 => "audio_capture_name", "Capture control name";
    AudioCaptureStatus = 50 => "audio_capture_status", "Capture mute status";
    AudioCaptureVolume = 51 => "audio_capture_volume", "Capture volume percent";
    Username = 52 => "username", "Current user";
    Kernel = 53 => "kernel", "Running kernel release";
    OutdatedKernel = 54 => "outdated_kernel", "Running kernel differs from newest installed";
    NetworkSsid = 55 => "network_ssid", "Wireless network name";
    NetworkStrength = 56 => "network_strength", "Wireless signal strength percent";
    Microphone = 57 => "microphone", "Whether any capture device is in use";
}

/// Composite fields and the sub-fields they own, transitively.
///
/// `Disk` owns `Part` and every partition field since partitions are rendered
/// inside each disk.
const COMPOSITES: [(Field, &[Field]); 7] = [
    (
        Field::Disk,
        &[
            Field::DiskName,
            Field::DiskRotational,
            Field::DiskReadOnly,
            Field::DiskRemovable,
            Field::DiskSize,
            Field::DiskInFlight,
            Field::Part,
            Field::PartName,
            Field::PartReadOnly,
            Field::PartMount,
            Field::PartFilesystem,
            Field::PartSize,
            Field::PartUsage,
            Field::PartInFlight,
        ],
    ),
    (
        Field::Part,
        &[
            Field::PartName,
            Field::PartReadOnly,
            Field::PartMount,
            Field::PartFilesystem,
            Field::PartSize,
            Field::PartUsage,
            Field::PartInFlight,
        ],
    ),
    (
        Field::Backlight,
        &[Field::BacklightName, Field::BacklightBrightness],
    ),
    (
        Field::Battery,
        &[
            Field::BatteryName,
            Field::BatteryStatus,
            Field::BatteryCharge,
            Field::BatteryCapacity,
            Field::BatteryCurrent,
            Field::BatteryPower,
            Field::BatteryTime,
        ],
    ),
    (
        Field::Network,
        &[
            Field::NetworkName,
            Field::NetworkStatus,
            Field::NetworkPacketsDown,
            Field::NetworkPacketsUp,
            Field::NetworkBytesDown,
            Field::NetworkBytesUp,
            Field::NetworkSsid,
            Field::NetworkStrength,
        ],
    ),
    (
        Field::AudioPlayback,
        &[
            Field::AudioPlaybackName,
            Field::AudioPlaybackStatus,
            Field::AudioPlaybackVolume,
        ],
    ),
    (
        Field::AudioCapture,
        &[
            Field::AudioCaptureName,
            Field::AudioCaptureStatus,
            Field::AudioCaptureVolume,
        ],
    ),
];

impl Field {
    /// Bit index of this field
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Single-bit mask of this field
    pub const fn bit(self) -> u64 {
        1u64 << (self as u8)
    }

    /// Look up a field by its bit index
    pub fn from_index(index: usize) -> Option<Field> {
        Self::ALL.get(index).copied()
    }

    /// Whether this field expands per entity
    pub fn kind(self) -> FieldKind {
        if COMPOSITES.iter().any(|(field, _)| *field == self) {
            FieldKind::Composite
        } else {
            FieldKind::Leaf
        }
    }

    pub fn is_composite(self) -> bool {
        self.kind() == FieldKind::Composite
    }

    /// Union of every sub-field owned by this composite (empty for leaves)
    pub fn sub_fields(self) -> FieldSet {
        COMPOSITES
            .iter()
            .find(|(field, _)| *field == self)
            .map(|(_, subs)| subs.iter().copied().collect())
            .unwrap_or(FieldSet::NONE)
    }

    /// Innermost composite that owns this field, if any
    pub fn parent(self) -> Option<Field> {
        // Part is listed after Disk, so the last match is the innermost owner
        COMPOSITES
            .iter()
            .filter(|(_, subs)| subs.contains(&self))
            .map(|(field, _)| *field)
            .last()
    }

    /// The field together with everything it owns
    pub fn subtree(self) -> FieldSet {
        self.sub_fields() | self
    }

    pub fn metadata(self) -> FieldMetadata {
        FieldMetadata::new(self)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a field name is not part of the universe
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown field: {0}")]
pub struct UnknownField(pub String);

impl FromStr for Field {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_");
        Field::ALL
            .iter()
            .copied()
            .find(|field| field.name() == wanted)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

/// Metadata describing a single field, used for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMetadata {
    /// The field itself
    pub field: Field,
    /// Bit index in the notification mask
    pub bit: usize,
    /// Human-readable description
    pub description: String,
    /// Leaf or composite
    pub kind: FieldKind,
    /// Composite owning this field
    pub parent: Option<Field>,
}

impl FieldMetadata {
    pub fn new(field: Field) -> Self {
        Self {
            field,
            bit: field.index(),
            description: field.description().to_string(),
            kind: field.kind(),
            parent: field.parent(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_match_declaration_order() {
        for (i, field) in Field::ALL.iter().enumerate() {
            assert_eq!(field.index(), i);
            assert_eq!(Field::from_index(i), Some(*field));
        }
        assert_eq!(Field::from_index(FIELD_COUNT), None);
    }

    #[test]
    fn test_bits_are_unique() {
        let mut seen = 0u64;
        for field in Field::ALL {
            assert_eq!(field.bit().count_ones(), 1);
            assert_eq!(seen & field.bit(), 0, "{} reuses a bit", field);
            seen |= field.bit();
        }
        assert_eq!(seen, FieldSet::ALL.bits());
    }

    #[test]
    fn test_sub_fields_are_owned_by_parent() {
        for field in Field::ALL {
            if let Some(parent) = field.parent() {
                assert!(parent.is_composite());
                assert!(parent.sub_fields().contains(field));
                // Every ancestor owns the field as well
                let mut ancestor = parent.parent();
                while let Some(a) = ancestor {
                    assert!(a.sub_fields().contains(field));
                    ancestor = a.parent();
                }
            }
        }
    }

    #[test]
    fn test_sub_fields_never_contain_self_or_outsiders() {
        for field in Field::ALL.iter().copied().filter(|f| f.is_composite()) {
            let subs = field.sub_fields();
            assert!(!subs.is_empty());
            assert!(!subs.contains(field));
            for sub in subs.iter() {
                let mut owner = sub.parent();
                while owner.is_some() && owner != Some(field) {
                    owner = owner.and_then(Field::parent);
                }
                assert_eq!(owner, Some(field), "{} is not under {}", sub, field);
            }
        }
    }

    #[test]
    fn test_top_level_composites_are_disjoint() {
        let tops: Vec<Field> = Field::ALL
            .iter()
            .copied()
            .filter(|f| f.is_composite() && f.parent().is_none())
            .collect();
        assert_eq!(tops.len(), 6);
        for (i, a) in tops.iter().enumerate() {
            for b in &tops[i + 1..] {
                assert!(a.subtree().intersection(b.subtree()).is_empty());
            }
        }
    }

    #[test]
    fn test_leaves_have_no_sub_fields() {
        assert!(Field::Memory.sub_fields().is_empty());
        assert_eq!(Field::Memory.kind(), FieldKind::Leaf);
        assert_eq!(Field::Memory.parent(), None);
        assert_eq!(Field::PartUsage.parent(), Some(Field::Part));
        assert_eq!(Field::Part.parent(), Some(Field::Disk));
        assert_eq!(Field::Microphone.parent(), None);
    }

    #[test]
    fn test_wireless_fields_belong_to_network() {
        assert_eq!(Field::NetworkSsid.parent(), Some(Field::Network));
        assert_eq!(Field::NetworkStrength.parent(), Some(Field::Network));
        assert!(Field::Network.sub_fields().contains(Field::NetworkStrength));
        assert_eq!(Field::from_index(57), Some(Field::Microphone));
    }

    #[test]
    fn test_name_round_trip() {
        for field in Field::ALL {
            assert_eq!(field.name().parse::<Field>(), Ok(field));
        }
        assert_eq!("battery-time".parse::<Field>(), Ok(Field::BatteryTime));
        assert!("bogus".parse::<Field>().is_err());
    }

    #[test]
    fn test_metadata_serialization() {
        let json = serde_json::to_string(&Field::DiskSize.metadata()).unwrap();
        assert!(json.contains("\"field\":\"disk_size\""));
        assert!(json.contains("\"parent\":\"disk\""));
        assert!(json.contains("\"kind\":\"leaf\""));
    }
}
