//! mixer-bridge library crate.
//!
//! This crate bridges a mixing console's OSC control protocol to any number
//! of web browsers, so several performers can adjust their own aux mixes
//! from their phones while everyone stays in sync with the console.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Browsers (JSON over WebSocket)
//!         ↕
//! [mixer-bridge]
//!   ├── domain/           Runtime BridgeConfig
//!   ├── application/      BridgeController + BroadcastHub (no I/O)
//!   └── infrastructure/
//!         ├── ws_server/    WebSocket accept loop (tokio-tungstenite)
//!         ├── console_conn/ UDP socket to the console (rosc codec)
//!         ├── config_file/  TOML configuration file
//!         └── runtime/      The single serialized event loop
//!         ↕
//! Console (OSC over UDP)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and `mixer-core` only; the console and
//!   the browsers are reached through the [`application::ConsoleSink`] and
//!   [`application::ClientSink`] traits.
//! - `infrastructure` depends on all other layers plus `tokio`,
//!   `tokio-tungstenite`, and `rosc`.
//!
//! # One event loop
//!
//! Every mutation of the mirrored console state happens on one Tokio task.
//! The UDP reader and each browser session are separate tasks that only push
//! [`application::BridgeEvent`]s into a channel; the event loop applies them
//! one at a time, so updates from the console and from browsers can never
//! race.

/// Domain layer: runtime configuration (no I/O).
pub mod domain;

/// Application layer: the bridge controller and broadcast hub.
pub mod application;

/// Infrastructure layer: sockets, configuration file, and the event loop.
pub mod infrastructure;
