//! Domain layer for mixer-bridge.
//!
//! Holds the runtime configuration.  The mixer entities themselves live in
//! `mixer-core`, which this crate shares with any other front end.
//!
//! # What does NOT belong here?
//!
//! - Any `tokio`, `UdpSocket`, or `WebSocket` types
//! - File I/O or environment variable reading

pub mod config;

pub use config::BridgeConfig;
