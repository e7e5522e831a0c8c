//! JSON message types for the browser-facing WebSocket protocol.
//!
//! The browser never sees console addresses.  It speaks a small normalized
//! vocabulary that is the same for every console family.
//!
//! # Message flow
//!
//! ```text
//! Browser → Bridge:  JSON text frame  →  ClientMessage
//! Bridge  → Browser: ServerMessage    →  JSON text frame
//! ```
//!
//! # No type discriminant
//!
//! The protocol predates this crate and has no `"type"` field: messages are
//! told apart by which keys they carry.  Serde's `#[serde(untagged)]` tries
//! each variant in declaration order, so more specific shapes come first.
//!
//! ```json
//! {"aux":1,"channel":3,"level":0.75}
//! {"aux":1,"channel":3,"pan":-0.5}
//! {"name":"Kick","channel":1}
//! {"auxname":"DRUMS","channel":1}
//! {"aux?":1}
//! {"aux?":"1"}
//! ```
//!
//! Browsers read the aux number for a query straight from the DOM, so it may
//! arrive as a numeric string.

use std::collections::BTreeMap;

use serde::{de, Deserialize, Deserializer, Serialize};

use crate::domain::mixer::{Aux, AuxNumber, Channel, ChannelNumber, ParamValue};

// ── Normalized updates ────────────────────────────────────────────────────────

/// A console-agnostic change to one mirrored scalar.
///
/// Produced by decoding console traffic and by parsing client frames; both
/// directions use the same JSON shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MixerUpdate {
    /// Send level of `channel` into `aux`, normalized to `0.0..=1.0`.
    Level {
        aux: AuxNumber,
        channel: ChannelNumber,
        level: f32,
    },

    /// Send pan of `channel` into a stereo `aux`, normalized to `-1.0..=1.0`.
    Pan {
        aux: AuxNumber,
        channel: ChannelNumber,
        pan: f32,
    },

    /// Console name of an input channel.
    ChannelName { name: String, channel: ChannelNumber },

    /// Console name of an aux.  The aux number travels in `channel`.
    AuxName {
        auxname: String,
        channel: AuxNumber,
    },
}

impl MixerUpdate {
    /// Short variant name for log messages.
    pub fn kind(&self) -> &'static str {
        match self {
            MixerUpdate::Level { .. } => "level",
            MixerUpdate::Pan { .. } => "pan",
            MixerUpdate::ChannelName { .. } => "name",
            MixerUpdate::AuxName { .. } => "auxname",
        }
    }

    /// `true` for level and pan updates, the only shapes a console can be
    /// told to change.
    pub fn is_send_update(&self) -> bool {
        matches!(self, MixerUpdate::Level { .. } | MixerUpdate::Pan { .. })
    }
}

// ── Browser → Bridge ──────────────────────────────────────────────────────────

/// Everything a browser may send.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ClientMessage {
    /// "Send me the current values for this aux."  Answered only to the
    /// asking connection; never forwarded.
    AuxQuery {
        #[serde(rename = "aux?", deserialize_with = "number_or_numeric_string")]
        aux: AuxNumber,
    },

    /// A change the user made on their screen.
    Update(MixerUpdate),
}

/// Accepts `1` as well as `"1"`.
fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<AuxNumber, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(AuxNumber),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("aux number expected, got {text:?}"))),
    }
}

// ── Bridge → Browser ──────────────────────────────────────────────────────────

/// Channel and aux lists sent once to every new connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigPayload {
    pub channels: Vec<Channel>,
    pub aux: Vec<Aux>,
}

/// Everything the bridge may send to a browser.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ServerMessage {
    /// `{"config": {"channels": [...], "aux": [...]}}`
    Config { config: ConfigPayload },

    /// Answer to [`ClientMessage::AuxQuery`].  Map keys serialise as strings.
    AuxValues {
        #[serde(rename = "aux?")]
        aux: AuxNumber,
        channels: BTreeMap<ChannelNumber, ParamValue>,
    },

    /// A relayed change, from the console or from another browser.
    Update(MixerUpdate),
}

// ── Tests ─────────────────────────────────────────────────────────────────────
