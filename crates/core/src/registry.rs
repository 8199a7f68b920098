//! Token vocabularies for every template scope
//!
//! Each format string is compiled in a [`Scope`]. The top-level status line
//! and every composite's nested template have their own vocabulary, so the
//! same character can mean different fields in different scopes (`n` is the
//! disk name inside a disk template and the network composite at top level).

use sbar_types::Field;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Template scope, one per format string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Status,
    Disk,
    Partition,
    Backlight,
    Battery,
    Network,
    AudioPlayback,
    AudioCapture,
}

const STATUS_TOKENS: &[(char, Field)] = &[
    ('t', Field::Time),
    ('u', Field::Uptime),
    ('d', Field::Disk),
    ('s', Field::Swap),
    ('m', Field::Memory),
    ('c', Field::Cpu),
    ('C', Field::CpuPerCore),
    ('h', Field::HighestTemp),
    ('l', Field::LowestTemp),
    ('1', Field::Load1),
    ('5', Field::Load5),
    ('F', Field::Load15),
    ('B', Field::Backlight),
    ('b', Field::Battery),
    ('n', Field::Network),
    ('p', Field::AudioPlayback),
    ('r', Field::AudioCapture),
    ('U', Field::Username),
    ('k', Field::Kernel),
    ('K', Field::OutdatedKernel),
    ('M', Field::Microphone),
];

const DISK_TOKENS: &[(char, Field)] = &[
    ('n', Field::DiskName),
    ('r', Field::DiskRotational),
    ('o', Field::DiskReadOnly),
    ('R', Field::DiskRemovable),
    ('s', Field::DiskSize),
    ('i', Field::DiskInFlight),
    ('p', Field::Part),
];

const PARTITION_TOKENS: &[(char, Field)] = &[
    ('n', Field::PartName),
    ('o', Field::PartReadOnly),
    ('m', Field::PartMount),
    ('f', Field::PartFilesystem),
    ('s', Field::PartSize),
    ('u', Field::PartUsage),
    ('i', Field::PartInFlight),
];

const BACKLIGHT_TOKENS: &[(char, Field)] = &[
    ('n', Field::BacklightName),
    ('b', Field::BacklightBrightness),
];

const BATTERY_TOKENS: &[(char, Field)] = &[
    ('n', Field::BatteryName),
    ('s', Field::BatteryStatus),
    ('c', Field::BatteryCharge),
    ('C', Field::BatteryCapacity),
    ('i', Field::BatteryCurrent),
    ('p', Field::BatteryPower),
    ('t', Field::BatteryTime),
];

const NETWORK_TOKENS: &[(char, Field)] = &[
    ('n', Field::NetworkName),
    ('s', Field::NetworkStatus),
    ('d', Field::NetworkPacketsDown),
    ('u', Field::NetworkPacketsUp),
    ('D', Field::NetworkBytesDown),
    ('U', Field::NetworkBytesUp),
    ('i', Field::NetworkSsid),
    ('q', Field::NetworkStrength),
];

const AUDIO_PLAYBACK_TOKENS: &[(char, Field)] = &[
    ('n', Field::AudioPlaybackName),
    ('s', Field::AudioPlaybackStatus),
    ('v', Field::AudioPlaybackVolume),
];

const AUDIO_CAPTURE_TOKENS: &[(char, Field)] = &[
    ('n', Field::AudioCaptureName),
    ('s', Field::AudioCaptureStatus),
    ('v', Field::AudioCaptureVolume),
];

impl Scope {
    pub const ALL: [Scope; 8] = [
        Scope::Status,
        Scope::Disk,
        Scope::Partition,
        Scope::Backlight,
        Scope::Battery,
        Scope::Network,
        Scope::AudioPlayback,
        Scope::AudioCapture,
    ];

    /// The (token, field) vocabulary of this scope
    pub fn tokens(self) -> &'static [(char, Field)] {
        match self {
            Scope::Status => STATUS_TOKENS,
            Scope::Disk => DISK_TOKENS,
            Scope::Partition => PARTITION_TOKENS,
            Scope::Backlight => BACKLIGHT_TOKENS,
            Scope::Battery => BATTERY_TOKENS,
            Scope::Network => NETWORK_TOKENS,
            Scope::AudioPlayback => AUDIO_PLAYBACK_TOKENS,
            Scope::AudioCapture => AUDIO_CAPTURE_TOKENS,
        }
    }

    /// Resolve a token character, `None` when the scope has no such token
    pub fn lookup(self, token: char) -> Option<Field> {
        self.tokens()
            .iter()
            .find(|(c, _)| *c == token)
            .map(|(_, field)| *field)
    }

    /// Reverse lookup, used for listings
    pub fn token_for(self, field: Field) -> Option<char> {
        self.tokens()
            .iter()
            .find(|(_, f)| *f == field)
            .map(|(c, _)| *c)
    }

    /// Scope of the nested template a composite field expands into
    pub fn for_composite(field: Field) -> Option<Scope> {
        match field {
            Field::Disk => Some(Scope::Disk),
            Field::Part => Some(Scope::Partition),
            Field::Backlight => Some(Scope::Backlight),
            Field::Battery => Some(Scope::Battery),
            Field::Network => Some(Scope::Network),
            Field::AudioPlayback => Some(Scope::AudioPlayback),
            Field::AudioCapture => Some(Scope::AudioCapture),
            _ => None,
        }
    }

    /// Scope whose vocabulary names `field`: the composite's nested scope
    /// for sub-fields, the status line otherwise
    pub fn containing(field: Field) -> Option<Scope> {
        match field.parent() {
            Some(parent) => Scope::for_composite(parent),
            None => Some(Scope::Status),
        }
    }

    /// Nesting depth; a composite's scope is always deeper than the scope
    /// its token lives in, which bounds template recursion.
    pub fn depth(self) -> usize {
        match self {
            Scope::Status => 0,
            Scope::Partition => 2,
            _ => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Scope::Status => "status",
            Scope::Disk => "disk",
            Scope::Partition => "partition",
            Scope::Backlight => "backlight",
            Scope::Battery => "battery",
            Scope::Network => "network",
            Scope::AudioPlayback => "audio_playback",
            Scope::AudioCapture => "audio_capture",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tokens_unique_within_scope() {
        for scope in Scope::ALL {
            let mut chars = HashSet::new();
            let mut fields = HashSet::new();
            for (c, field) in scope.tokens() {
                assert!(chars.insert(*c), "duplicate token {} in {}", c, scope);
                assert!(fields.insert(*field), "duplicate field {} in {}", field, scope);
                assert_ne!(*c, crate::template::ESCAPE);
            }
        }
    }

    #[test]
    fn test_nested_scope_fields_belong_to_composite() {
        for scope in Scope::ALL {
            for (_, field) in scope.tokens() {
                match scope {
                    Scope::Status => assert_eq!(field.parent(), None),
                    _ => {
                        let owner = field.parent().and_then(Scope::for_composite);
                        assert_eq!(owner, Some(scope), "{} in {}", field, scope);
                    }
                }
            }
        }
    }

    #[test]
    fn test_composites_nest_deeper() {
        for scope in Scope::ALL {
            for (_, field) in scope.tokens() {
                if let Some(nested) = Scope::for_composite(*field) {
                    assert!(nested.depth() > scope.depth());
                }
            }
        }
    }

    #[test]
    fn test_every_field_is_reachable() {
        let reachable: HashSet<Field> = Scope::ALL
            .iter()
            .flat_map(|scope| scope.tokens().iter().map(|(_, f)| *f))
            .collect();
        for field in Field::ALL {
            assert!(reachable.contains(&field), "{} has no token", field);
        }
    }

    #[test]
    fn test_containing_scope() {
        assert_eq!(Scope::containing(Field::Cpu), Some(Scope::Status));
        assert_eq!(Scope::containing(Field::Disk), Some(Scope::Status));
        assert_eq!(Scope::containing(Field::Part), Some(Scope::Disk));
        assert_eq!(Scope::containing(Field::PartName), Some(Scope::Partition));
        assert_eq!(Scope::token_for(Scope::Status, Field::Cpu), Some('c'));
    }

    #[test]
    fn test_scoped_lookup() {
        assert_eq!(Scope::Status.lookup('n'), Some(Field::Network));
        assert_eq!(Scope::Disk.lookup('n'), Some(Field::DiskName));
        assert_eq!(Scope::Status.lookup('z'), None);
        assert_eq!(Scope::Battery.token_for(Field::BatteryTime), Some('t'));
        assert_eq!(Scope::Network.lookup('i'), Some(Field::NetworkSsid));
        assert_eq!(Scope::Network.lookup('q'), Some(Field::NetworkStrength));
        assert_eq!(Scope::Status.lookup('M'), Some(Field::Microphone));
    }
}
