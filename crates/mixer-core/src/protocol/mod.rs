//! Protocol module containing the console wire message type and the
//! normalized client message types.

pub mod messages;
pub mod wire;

pub use messages::{ClientMessage, ConfigPayload, MixerUpdate, ServerMessage};
pub use wire::{WireMessage, WireValue, QUERY_SUFFIX};
