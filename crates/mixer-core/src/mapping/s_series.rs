//! S-series addressing.
//!
//! ```text
//! /channel/{ch}/send/{send}/level   [f32 dB, -60..10]
//! /channel/{ch}/send/{send}/pan     [f32]
//! /channel/{n}/name                 [string]
//! ```
//!
//! An S-series aux has its own channel number, but sends into it are
//! addressed by a separate send number.  The mapper owns that indirection,
//! built from the `send` field of each configured aux.  Channel and aux names
//! share one address; `n` is an aux when it is one of the aux channel numbers.
//!
//! Levels travel in dB and are mapped affinely onto `0..1`:
//! `db = level * 70 - 60`.

use std::collections::BTreeMap;

use crate::domain::mixer::{AuxConfig, AuxNumber};
use crate::mapping::{parse_number, MappingError};
use crate::protocol::messages::MixerUpdate;
use crate::protocol::wire::{WireMessage, WireValue};

/// Span of the console's send level scale in dB.
const LEVEL_RANGE_DB: f32 = 70.0;
/// Bottom of the console's send level scale in dB.
const LEVEL_FLOOR_DB: f32 = -60.0;

/// The single request that makes the console resend its whole state.
pub const RESEND_ADDRESS: &str = "/console/resend";

/// Mapper for S-series consoles.
#[derive(Debug, Clone, PartialEq)]
pub struct SSeriesMapper {
    aux_to_send: BTreeMap<AuxNumber, u32>,
    send_to_aux: BTreeMap<u32, AuxNumber>,
}

impl SSeriesMapper {
    /// Builds the aux ↔ send tables.
    ///
    /// # Errors
    ///
    /// [`MappingError::MissingSend`] if an aux has no send number, and
    /// [`MappingError::DuplicateSend`] if two auxes share one.
    pub fn new(auxes: &[AuxConfig]) -> Result<Self, MappingError> {
        let mut aux_to_send = BTreeMap::new();
        let mut send_to_aux = BTreeMap::new();

        for aux in auxes {
            let send = aux.send.ok_or(MappingError::MissingSend { aux: aux.channel })?;
            if send_to_aux.insert(send, aux.channel).is_some() {
                return Err(MappingError::DuplicateSend { send });
            }
            aux_to_send.insert(aux.channel, send);
        }

        Ok(Self {
            aux_to_send,
            send_to_aux,
        })
    }

    pub fn send_for_aux(&self, aux: AuxNumber) -> Option<u32> {
        self.aux_to_send.get(&aux).copied()
    }

    pub fn aux_for_send(&self, send: u32) -> Option<AuxNumber> {
        self.send_to_aux.get(&send).copied()
    }

    pub fn encode(&self, update: &MixerUpdate) -> Option<WireMessage> {
        match *update {
            MixerUpdate::Level {
                aux,
                channel,
                level,
            } => Some(WireMessage::new(
                format!("/channel/{channel}/send/{}/level", self.send_for_aux(aux)?),
                vec![WireValue::Float(level_to_db(level))],
            )),
            MixerUpdate::Pan { aux, channel, pan } => Some(WireMessage::new(
                format!("/channel/{channel}/send/{}/pan", self.send_for_aux(aux)?),
                vec![WireValue::Float(pan)],
            )),
            MixerUpdate::ChannelName { .. } | MixerUpdate::AuxName { .. } => None,
        }
    }

    pub fn decode(&self, wire: &WireMessage, aux_channels: &[AuxNumber]) -> Option<MixerUpdate> {
        let segments = wire.segments()?;
        match segments.as_slice() {
            ["channel", ch, "send", send, "level"] => Some(MixerUpdate::Level {
                aux: self.aux_for_send(parse_number(send)?)?,
                channel: parse_number(ch)?,
                level: db_to_level(wire.first_f32()?),
            }),
            ["channel", ch, "send", send, "pan"] => Some(MixerUpdate::Pan {
                aux: self.aux_for_send(parse_number(send)?)?,
                channel: parse_number(ch)?,
                pan: wire.first_f32()?,
            }),
            ["channel", n, "name"] => {
                let number = parse_number(n)?;
                let name = wire.first_str()?.to_string();
                if aux_channels.contains(&number) {
                    Some(MixerUpdate::AuxName {
                        auxname: name,
                        channel: number,
                    })
                } else {
                    Some(MixerUpdate::ChannelName {
                        name,
                        channel: number,
                    })
                }
            }
            _ => None,
        }
    }

    /// A single resend request; the console then replays everything.
    pub fn loading_addresses(&self) -> Vec<String> {
        vec![RESEND_ADDRESS.to_string()]
    }
}

fn level_to_db(level: f32) -> f32 {
    level * LEVEL_RANGE_DB + LEVEL_FLOOR_DB
}

fn db_to_level(db: f32) -> f32 {
    (db - LEVEL_FLOOR_DB) / LEVEL_RANGE_DB
}

// ── Tests ─────────────────────────────────────────────────────────────────────
