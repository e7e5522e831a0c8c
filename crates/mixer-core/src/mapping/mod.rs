//! Console mapping: translation between wire messages and normalized updates.
//!
//! Each console family addresses the same mixer concepts differently and
//! encodes values on different scales.  [`Mapper`] is a closed set of family
//! variants chosen once at startup from [`ConsoleFamily`]; everything else in
//! the bridge only ever sees [`MixerUpdate`]s.
//!
//! # Contract
//!
//! - [`Mapper::encode`] turns a level or pan update into the console message
//!   that sets it.  Any other update shape has no mapping.
//! - [`Mapper::decode`] recognises the family's level, pan, channel-name, and
//!   aux-name addresses.  Anything else is "no match" and must be discarded
//!   by the caller.
//! - Numeric remapping in `decode` is the exact inverse of `encode`.
//! - [`Mapper::loading_addresses`] lists the read requests that prime the
//!   value store.
//!
//! Adding a console family means adding a variant here and a sibling module.

pub mod s_series;
pub mod sd;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::mixer::{AuxConfig, AuxNumber, ChannelNumber};
use crate::protocol::messages::MixerUpdate;
use crate::protocol::wire::WireMessage;

pub use s_series::SSeriesMapper;
pub use sd::SdMapper;

/// Errors raised while building a [`Mapper`] from configuration.
#[derive(Debug, Error, PartialEq)]
pub enum MappingError {
    /// S-series addressing needs a send number for every aux.
    #[error("aux {aux} has no send number (required for S-series consoles)")]
    MissingSend { aux: AuxNumber },

    /// Two auxes were configured with the same S-series send number.
    #[error("send {send} is configured for more than one aux")]
    DuplicateSend { send: u32 },

    /// The family selector string was not recognised.
    #[error("unknown console family: '{0}'")]
    UnknownFamily(String),
}

/// Console family selector, as written in the configuration file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleFamily {
    /// DiGiCo SD-series style `/sd/...` addressing.
    #[default]
    Sd,
    /// S-series style `/channel/...` addressing with dB levels.
    S,
}

impl fmt::Display for ConsoleFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsoleFamily::Sd => f.write_str("sd"),
            ConsoleFamily::S => f.write_str("s"),
        }
    }
}

impl FromStr for ConsoleFamily {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sd" => Ok(ConsoleFamily::Sd),
            "s" => Ok(ConsoleFamily::S),
            _ => Err(MappingError::UnknownFamily(s.to_string())),
        }
    }
}

/// Family-specific translator between [`WireMessage`] and [`MixerUpdate`].
#[derive(Debug, Clone, PartialEq)]
pub enum Mapper {
    Sd(SdMapper),
    SSeries(SSeriesMapper),
}

impl Mapper {
    /// Builds the mapper for `family` from the configured auxes.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError`] if the family needs per-aux numbering the
    /// configuration does not provide.
    pub fn new(family: ConsoleFamily, auxes: &[AuxConfig]) -> Result<Self, MappingError> {
        match family {
            ConsoleFamily::Sd => Ok(Mapper::Sd(SdMapper::new())),
            ConsoleFamily::S => SSeriesMapper::new(auxes).map(Mapper::SSeries),
        }
    }

    pub fn family(&self) -> ConsoleFamily {
        match self {
            Mapper::Sd(_) => ConsoleFamily::Sd,
            Mapper::SSeries(_) => ConsoleFamily::S,
        }
    }

    /// Converts a level or pan update to the console message that applies it.
    ///
    /// Returns `None` for label updates, which consoles cannot be told about.
    pub fn encode(&self, update: &MixerUpdate) -> Option<WireMessage> {
        match self {
            Mapper::Sd(m) => m.encode(update),
            Mapper::SSeries(m) => m.encode(update),
        }
    }

    /// Converts a console message to a normalized update.
    ///
    /// `aux_channels` lists the configured aux numbers; families that share
    /// one name address between channels and auxes use it to tell them
    /// apart.  Returns `None` for addresses the bridge does not track.
    pub fn decode(&self, wire: &WireMessage, aux_channels: &[AuxNumber]) -> Option<MixerUpdate> {
        match self {
            Mapper::Sd(m) => m.decode(wire),
            Mapper::SSeries(m) => m.decode(wire, aux_channels),
        }
    }

    /// The ordered read requests that prime the value store.
    pub fn loading_addresses(
        &self,
        auxes: &[AuxConfig],
        channels: &[ChannelNumber],
    ) -> Vec<String> {
        match self {
            Mapper::Sd(m) => m.loading_addresses(auxes, channels),
            Mapper::SSeries(m) => m.loading_addresses(),
        }
    }
}

/// Parses a numeric address segment.
pub(crate) fn parse_number(segment: &str) -> Option<u32> {
    segment.parse().ok()
}
