//! # mixer-core
//!
//! Shared library for the OSC web mixer bridge containing the console mapping
//! layer, the canonical value store, and the bootstrap loader state machine.
//!
//! This crate has zero dependencies on sockets, async runtimes, or the OSC
//! packet codec.  Everything here is plain data and pure functions, so the
//! whole core can be unit tested without a console on the network.
//!
//! # Architecture overview
//!
//! A digital mixing console exposes its state over OSC: each aux send level,
//! pan, and label lives at a console-specific address.  The bridge mirrors
//! that state in memory and exposes it to web clients in a console-agnostic
//! JSON form.
//!
//! - **`protocol`** – The two message vocabularies: [`WireMessage`] (what the
//!   console speaks) and [`MixerUpdate`] / [`ClientMessage`] /
//!   [`ServerMessage`] (what web clients speak).
//!
//! - **`mapping`** – The [`Mapper`], a closed set of console-family variants
//!   that translate between the two vocabularies and know which addresses to
//!   query at startup.
//!
//! - **`domain`** – Configuration types, the [`ValueStore`] mirror of console
//!   state, and the [`BootstrapLoader`] that primes it.

pub mod domain;
pub mod mapping;
pub mod protocol;

pub use domain::loader::{BootstrapLoader, LoadProgress, LoadState, LoadStep};
pub use domain::mixer::{
    Aux, AuxConfig, AuxNumber, Channel, ChannelNumber, MixerConfig, ParamKey, ParamValue,
};
pub use domain::store::{StoreSnapshot, ValueStore};
pub use mapping::{ConsoleFamily, Mapper, MappingError};
pub use protocol::messages::{ClientMessage, ConfigPayload, MixerUpdate, ServerMessage};
pub use protocol::wire::{WireMessage, WireValue};
