//! Sound cards from `/proc/asound` and their ALSA mixer controls
//!
//! Cards are listed from `/proc/asound/cards`; a card is a playback (capture)
//! entity when its directory holds a `pcm*p` (`pcm*c`) device. Status and
//! volume come from the card's simple mixer element (`Master` for playback,
//! `Capture` for capture).

use alsa::mixer::{Mixer, Selem, SelemChannelId, SelemId};
use anyhow::{anyhow, Context, Result};
use sbar_core::Entity;
use sbar_types::Field;
use std::fmt::Display;
use std::fs;
use std::path::Path;

use crate::format::indicator;
use crate::sysfs::{list_dirs, read_attr};

/// Stream direction of a PCM device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Playback,
    Capture,
}

impl Direction {
    pub fn for_composite(field: Field) -> Option<Direction> {
        match field {
            Field::AudioPlayback => Some(Direction::Playback),
            Field::AudioCapture => Some(Direction::Capture),
            _ => None,
        }
    }

    fn pcm_suffix(self) -> char {
        match self {
            Direction::Playback => 'p',
            Direction::Capture => 'c',
        }
    }

    /// Simple mixer element holding this direction's switch and volume
    fn mixer_element(self) -> &'static str {
        match self {
            Direction::Playback => "Master",
            Direction::Capture => "Capture",
        }
    }
}

/// (index, id, description) of every line like
/// ` 0 [PCH            ]: HDA-Intel - HDA Intel PCH`
fn parse_cards(contents: &str) -> Vec<(u32, String, String)> {
    contents
        .lines()
        .filter_map(|line| {
            let (index, rest) = line.trim_start().split_once('[')?;
            let index = index.trim().parse().ok()?;
            let (id, rest) = rest.split_once(']')?;
            let description = rest
                .split_once(" - ")
                .map(|(_, name)| name.trim())
                .unwrap_or("")
                .to_string();
            Some((index, id.trim().to_string(), description))
        })
        .collect()
}

/// Cards with at least one PCM device in `direction`
pub fn discover_cards(asound_dir: &Path, direction: Direction) -> Result<Vec<Entity>> {
    let cards_path = asound_dir.join("cards");
    let contents = fs::read_to_string(&cards_path)
        .with_context(|| format!("Failed to read {}", cards_path.display()))?;

    let mut cards = Vec::new();
    for (index, id, description) in parse_cards(&contents) {
        let card_dir = asound_dir.join(format!("card{}", index));
        let suffix = direction.pcm_suffix();
        let has_stream = list_dirs(&card_dir, |name, _| {
            name.starts_with("pcm") && name.ends_with(suffix)
        })
        .map(|pcms| !pcms.is_empty())
        .unwrap_or(false);
        if has_stream {
            log::trace!("Sound card {} ({}) has {:?} streams", id, description, direction);
            cards.push(Entity::with_path(id, card_dir));
        }
    }
    Ok(cards)
}

pub fn audio_field(field: Field, card: &Entity) -> Result<String> {
    match field {
        Field::AudioPlaybackName | Field::AudioCaptureName => Ok(card.id.clone()),
        Field::AudioPlaybackStatus => mixer_reading(card, Direction::Playback, switch_state),
        Field::AudioPlaybackVolume => mixer_reading(card, Direction::Playback, volume),
        Field::AudioCaptureStatus => mixer_reading(card, Direction::Capture, switch_state),
        Field::AudioCaptureVolume => mixer_reading(card, Direction::Capture, volume),
        other => Err(anyhow!("{} is not an audio field", other)),
    }
}

/// ALSA device of a card entity, `hw:<index>` from its `cardN` directory
fn card_device(card: &Entity) -> Result<String> {
    let index = card
        .path()
        .and_then(|path| path.file_name())
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_prefix("card"))
        .filter(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| anyhow!("Sound card {} has no card directory", card.id))?;
    Ok(format!("hw:{}", index))
}

/// Open the card's mixer and read its element for `direction`
fn mixer_reading<F>(card: &Entity, direction: Direction, read: F) -> Result<String>
where
    F: FnOnce(&Selem, Direction) -> Result<String>,
{
    let device = card_device(card)?;
    let mixer = Mixer::new(&device, false)
        .with_context(|| format!("Failed to open mixer {}", device))?;
    let element = direction.mixer_element();
    let selem = mixer
        .find_selem(&SelemId::new(element, 0))
        .ok_or_else(|| anyhow!("{} has no {} mixer control", card.id, element))?;
    read(&selem, direction)
}

/// Channels to read: only the first for mono controls
fn channels(selem: &Selem, direction: Direction) -> &'static [SelemChannelId] {
    let mono = match direction {
        Direction::Playback => selem.is_playback_mono(),
        Direction::Capture => selem.is_capture_mono(),
    };
    if mono {
        &[SelemChannelId::FrontLeft]
    } else {
        &[SelemChannelId::FrontLeft, SelemChannelId::FrontRight]
    }
}

fn switch_state(selem: &Selem, direction: Direction) -> Result<String> {
    let has_switch = match direction {
        Direction::Playback => selem.has_playback_switch(),
        Direction::Capture => selem.has_capture_switch(),
    };
    if !has_switch {
        return Err(anyhow!("{} control has no switch", direction.mixer_element()));
    }

    let mut states = Vec::new();
    for &channel in channels(selem, direction) {
        let state = match direction {
            Direction::Playback => selem.get_playback_switch(channel)?,
            Direction::Capture => selem.get_capture_switch(channel)?,
        };
        states.push(indicator(state != 0));
    }
    join_channels(&states)
}

fn volume(selem: &Selem, direction: Direction) -> Result<String> {
    let (has_volume, range) = match direction {
        Direction::Playback => (selem.has_playback_volume(), selem.get_playback_volume_range()),
        Direction::Capture => (selem.has_capture_volume(), selem.get_capture_volume_range()),
    };
    if !has_volume {
        return Err(anyhow!("{} control has no volume", direction.mixer_element()));
    }

    let mut levels = Vec::new();
    for &channel in channels(selem, direction) {
        let value = match direction {
            Direction::Playback => selem.get_playback_volume(channel)?,
            Direction::Capture => selem.get_capture_volume(channel)?,
        };
        levels.push(volume_percent(range, value)?);
    }
    join_channels(&levels)
}

/// Volume as an integer percent of the control's range
fn volume_percent((min, max): (i64, i64), value: i64) -> Result<i64> {
    if max <= min {
        return Err(anyhow!("Empty volume range {}..{}", min, max));
    }
    let ratio = (value - min) as f64 / (max - min) as f64;
    Ok((ratio * 100.0).round() as i64)
}

/// One value when every channel agrees, `(left, right)` otherwise
fn join_channels<T: Display + PartialEq>(values: &[T]) -> Result<String> {
    match values {
        [] => Err(anyhow!("Mixer control has no channels")),
        [first, rest @ ..] if rest.iter().all(|value| value == first) => Ok(first.to_string()),
        _ => Ok(format!(
            "({})",
            values
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        )),
    }
}

/// 🟢 when any capture substream is open, 🔴 when all are closed, ❌ when
/// there is no capture device at all
pub fn microphone_status(asound_dir: &Path) -> Result<String> {
    let is_card = |name: &str, _: &Path| {
        name.strip_prefix("card")
            .is_some_and(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
    };
    let is_capture = |name: &str, _: &Path| name.starts_with("pcm") && name.ends_with('c');

    let mut closed = 0;
    for (_, card) in list_dirs(asound_dir, is_card)? {
        for (_, device) in list_dirs(&card, is_capture)? {
            for (_, substream) in list_dirs(&device, |_, _| true)? {
                if read_attr(&substream.join("status"))? != "closed" {
                    return Ok("🟢".to_string());
                }
                closed += 1;
            }
        }
    }

    let status = if closed == 0 { "❌" } else { "🔴" };
    Ok(status.to_string())
}
