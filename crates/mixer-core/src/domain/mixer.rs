//! Mixer entities: channels, auxes, and per-(aux, channel) parameter values.
//!
//! # Vocabulary
//!
//! A *channel* is a console input, such as a microphone.  An *aux* is a mix
//! bus, typically one performer's in-ear or wedge mix.  Each channel is sent to each aux at some *level*, and, when the aux
//! is stereo, with a *pan*.
//!
//! ```text
//!            aux 1 (stereo)   aux 6 (mono)
//! channel 1  level, pan       level
//! channel 3  level, pan       level
//! ```
//!
//! # JSON field names
//!
//! The browser protocol predates this crate and identifies both channels and
//! auxes by a `channel` field.  The Rust types use `number` internally and
//! rename it on the wire.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Console input channel number.
pub type ChannelNumber = u32;

/// Console aux (mix bus) number.
pub type AuxNumber = u32;

// ── Configuration ─────────────────────────────────────────────────────────────

/// Static description of one aux, as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuxConfig {
    /// The aux's own channel number on the console.
    pub channel: AuxNumber,

    /// Send number used in S-series addresses.
    ///
    /// S-series consoles give an aux a channel number but address the send
    /// to it by a different number.  Unused by other families.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send: Option<u32>,

    /// Whether the aux is a stereo bus (and therefore carries a pan).
    #[serde(default)]
    pub stereo: bool,

    /// Display tint for the UI, formatted `"R, G, B"`.
    #[serde(default)]
    pub colour: String,

    /// Fallback label, used only when loading from the console is skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// The mixer part of the configuration: which auxes and channels to mirror.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MixerConfig {
    /// Auxes available to clients.
    #[serde(default)]
    pub aux: Vec<AuxConfig>,

    /// Channel numbers available to clients.
    #[serde(default)]
    pub channels: Vec<ChannelNumber>,

    /// Channel numbers that are never shown, even if the console reports them.
    #[serde(default)]
    pub ignore_channels: Vec<ChannelNumber>,
}

impl MixerConfig {
    /// Returns the configured channels with ignored and duplicate numbers
    /// removed, preserving configuration order.
    pub fn supported_channels(&self) -> Vec<ChannelNumber> {
        let ignored: BTreeSet<ChannelNumber> = self.ignore_channels.iter().copied().collect();
        let mut seen = BTreeSet::new();
        self.channels
            .iter()
            .copied()
            .filter(|n| !ignored.contains(n) && seen.insert(*n))
            .collect()
    }

    /// Returns the channel numbers of every configured aux.
    pub fn aux_channels(&self) -> Vec<AuxNumber> {
        self.aux.iter().map(|a| a.channel).collect()
    }
}

// ── Live entities ─────────────────────────────────────────────────────────────

/// A console input channel as mirrored by the bridge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Channel {
    /// Console channel number; the channel's identity.
    #[serde(rename = "channel")]
    pub number: ChannelNumber,

    /// Name reported by the console, `None` until loaded.
    pub label: Option<String>,

    /// `true` for channels from the configured supported list, `false` for
    /// channels the console reported on its own.
    #[serde(skip)]
    pub configured: bool,
}

/// A console aux as mirrored by the bridge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aux {
    /// Console aux number; the aux's identity.
    #[serde(rename = "channel")]
    pub number: AuxNumber,

    /// S-series send number, echoed to clients when configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send: Option<u32>,

    /// Name reported by the console, `None` until loaded.
    pub label: Option<String>,

    /// Fixed at configuration time.
    pub stereo: bool,

    /// Fixed at configuration time.
    #[serde(rename = "colour")]
    pub colour_hint: String,
}

impl Aux {
    /// Builds an unloaded aux from its configuration entry.
    ///
    /// The configured label is deliberately not copied: the label must come
    /// from the console for readiness to be reached.
    pub fn from_config(cfg: &AuxConfig) -> Self {
        Self {
            number: cfg.channel,
            send: cfg.send,
            label: None,
            stereo: cfg.stereo,
            colour_hint: cfg.colour.clone(),
        }
    }
}

// ── Parameters ────────────────────────────────────────────────────────────────

/// Identifies one send: the level (and pan) of `channel` into `aux`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParamKey {
    pub aux: AuxNumber,
    pub channel: ChannelNumber,
}

impl ParamKey {
    pub fn new(aux: AuxNumber, channel: ChannelNumber) -> Self {
        Self { aux, channel }
    }
}

/// The current send values for one [`ParamKey`].
///
/// The variant is chosen once from the aux's stereo flag and never changes,
/// so a mono send cannot acquire a pan.  Serialised untagged:
///
/// ```json
/// {"level":0.75}
/// {"level":0.75,"pan":null}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Mono { level: Option<f32> },
    Stereo { level: Option<f32>, pan: Option<f32> },
}

impl ParamValue {
    /// An unloaded value with the shape required by the aux.
    pub fn unloaded(stereo: bool) -> Self {
        if stereo {
            ParamValue::Stereo {
                level: None,
                pan: None,
            }
        } else {
            ParamValue::Mono { level: None }
        }
    }

    pub fn level(&self) -> Option<f32> {
        match *self {
            ParamValue::Mono { level } | ParamValue::Stereo { level, .. } => level,
        }
    }

    /// `None` both for an unloaded stereo pan and for any mono value.
    pub fn pan(&self) -> Option<f32> {
        match *self {
            ParamValue::Mono { .. } => None,
            ParamValue::Stereo { pan, .. } => pan,
        }
    }

    pub fn is_stereo(&self) -> bool {
        matches!(self, ParamValue::Stereo { .. })
    }

    pub fn set_level(&mut self, value: f32) {
        match self {
            ParamValue::Mono { level } | ParamValue::Stereo { level, .. } => *level = Some(value),
        }
    }

    /// Sets the pan; returns `false` (and changes nothing) for a mono value.
    pub fn set_pan(&mut self, value: f32) -> bool {
        match self {
            ParamValue::Mono { .. } => false,
            ParamValue::Stereo { pan, .. } => {
                *pan = Some(value);
                true
            }
        }
    }

    /// Number of scalars this value must hold once loaded (1 or 2).
    pub fn required_scalars(&self) -> usize {
        match self {
            ParamValue::Mono { .. } => 1,
            ParamValue::Stereo { .. } => 2,
        }
    }

    /// Number of scalars currently loaded.
    pub fn loaded_scalars(&self) -> usize {
        match *self {
            ParamValue::Mono { level } => usize::from(level.is_some()),
            ParamValue::Stereo { level, pan } => {
                usize::from(level.is_some()) + usize::from(pan.is_some())
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
