//! Application layer for mixer-bridge.
//!
//! The application layer decides *what* happens to each console message and
//! each browser message, but delegates *how* bytes move to the infrastructure
//! layer.
//!
//! # Responsibilities
//!
//! - Driving the bootstrap load and tracking readiness
//! - Keeping the value store in step with both sides
//! - Fanning updates out to browsers without blocking on any one of them
//! - Defining the `BridgeError` type for fatal failures
//!
//! # What does NOT belong here?
//!
//! - Opening sockets or listening for connections (that is infrastructure)
//! - Tokio task spawning (that happens in the infrastructure layer)
//! - OSC packet encoding (handled by `rosc` in `console_conn`)

pub mod bridge_service;
pub mod hub;

pub use bridge_service::{BridgeController, BridgeError, BridgeEvent, ConsoleSink};
pub use hub::{BroadcastHub, ClientSink, ConnectionId, DeliveryError};
