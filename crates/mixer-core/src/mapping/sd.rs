//! SD-series addressing.
//!
//! ```text
//! /sd/Input_Channels/{ch}/Aux_Send/{aux}/send_level   [f32 0..1]
//! /sd/Input_Channels/{ch}/Aux_Send/{aux}/send_pan     [f32 0..1]
//! /sd/Input_Channels/{ch}/Channel_Input/name          [string]
//! /sd/Aux_Outputs/{aux}/Buss_Trim/name                [string]
//! ```
//!
//! Levels are already normalized.  Pan is sent as `0..1` with the centre at
//! `0.5`; the bridge normalizes it to `-1..1`.

use crate::domain::mixer::{AuxConfig, ChannelNumber};
use crate::mapping::parse_number;
use crate::protocol::messages::MixerUpdate;
use crate::protocol::wire::{query_address, WireMessage, WireValue};

const NS: &str = "sd";

/// Mapper for SD-series consoles.  Stateless.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SdMapper;

impl SdMapper {
    pub fn new() -> Self {
        Self
    }

    pub fn encode(&self, update: &MixerUpdate) -> Option<WireMessage> {
        match *update {
            MixerUpdate::Level {
                aux,
                channel,
                level,
            } => Some(WireMessage::new(
                send_address(channel, aux, "send_level"),
                vec![WireValue::Float(level)],
            )),
            MixerUpdate::Pan { aux, channel, pan } => Some(WireMessage::new(
                send_address(channel, aux, "send_pan"),
                vec![WireValue::Float((pan + 1.0) / 2.0)],
            )),
            MixerUpdate::ChannelName { .. } | MixerUpdate::AuxName { .. } => None,
        }
    }

    pub fn decode(&self, wire: &WireMessage) -> Option<MixerUpdate> {
        let segments = wire.segments()?;
        match segments.as_slice() {
            [NS, "Input_Channels", ch, "Aux_Send", aux, "send_level"] => Some(MixerUpdate::Level {
                aux: parse_number(aux)?,
                channel: parse_number(ch)?,
                level: wire.first_f32()?,
            }),
            [NS, "Input_Channels", ch, "Aux_Send", aux, "send_pan"] => Some(MixerUpdate::Pan {
                aux: parse_number(aux)?,
                channel: parse_number(ch)?,
                pan: wire.first_f32()? * 2.0 - 1.0,
            }),
            [NS, "Input_Channels", ch, "Channel_Input", "name"] => Some(MixerUpdate::ChannelName {
                name: wire.first_str()?.to_string(),
                channel: parse_number(ch)?,
            }),
            [NS, "Aux_Outputs", aux, "Buss_Trim", "name"] => Some(MixerUpdate::AuxName {
                auxname: wire.first_str()?.to_string(),
                channel: parse_number(aux)?,
            }),
            _ => None,
        }
    }

    /// One query per parameter: per aux its name, then each channel's pan
    /// (stereo auxes only) and level; finally every channel name.
    pub fn loading_addresses(&self, auxes: &[AuxConfig], channels: &[ChannelNumber]) -> Vec<String> {
        let mut addresses = Vec::new();

        for aux in auxes {
            addresses.push(query_address(&aux_name_address(aux.channel)));
            for &channel in channels {
                if aux.stereo {
                    addresses.push(query_address(&send_address(channel, aux.channel, "send_pan")));
                }
                addresses.push(query_address(&send_address(
                    channel,
                    aux.channel,
                    "send_level",
                )));
            }
        }

        for &channel in channels {
            addresses.push(query_address(&channel_name_address(channel)));
        }

        addresses
    }
}

fn send_address(channel: ChannelNumber, aux: u32, param: &str) -> String {
    format!("/{NS}/Input_Channels/{channel}/Aux_Send/{aux}/{param}")
}

fn channel_name_address(channel: ChannelNumber) -> String {
    format!("/{NS}/Input_Channels/{channel}/Channel_Input/name")
}

fn aux_name_address(aux: u32) -> String {
    format!("/{NS}/Aux_Outputs/{aux}/Buss_Trim/name")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
