//! Infrastructure layer for mixer-bridge.
//!
//! The infrastructure layer handles all I/O: the UDP socket to the console,
//! the WebSocket listener for browsers, the configuration file, and the event
//! loop that ties them to the controller.
//!
//! # Responsibilities
//!
//! - Binding the console UDP socket and converting OSC packets
//! - Binding a TCP listener and performing WebSocket handshakes
//! - Spawning the per-session and per-socket Tokio tasks
//! - Reading the TOML configuration file
//! - Handling the graceful shutdown signal
//!
//! # What does NOT belong here?
//!
//! - Deciding what a console or browser message means (that is the
//!   application layer and `mixer-core`)

pub mod config_file;
pub mod console_conn;
pub mod runtime;
pub mod ws_server;

// Re-export the primary entry points so `main.rs` can call them concisely.
pub use config_file::{load_config, ConfigError, FileConfig};
pub use runtime::{run_bridge, run_event_loop};
pub use ws_server::{run_server, serve};
