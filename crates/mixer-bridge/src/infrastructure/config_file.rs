//! TOML configuration file for the bridge.
//!
//! A complete file looks like this; every key except the mixer lists has a
//! default:
//!
//! ```toml
//! [console]
//! family = "sd"            # "sd" or "s"
//! address = "192.168.1.50"
//! send_port = 9001         # port the console listens on
//! receive_port = 8001      # local port the console replies to
//! request_timeout_secs = 10
//!
//! [server]
//! bind_address = "0.0.0.0"
//! port = 8081
//!
//! [mixer]
//! channels = [1, 2, 3, 4]
//! ignore_channels = [48]
//!
//! [[mixer.aux]]
//! channel = 1
//! send = 70                # S-series send number
//! stereo = true
//! colour = "6, 106, 166"
//! label = "Drums"          # shown only when loading is skipped
//! ```
//!
//! Addresses are parsed here so that a typo fails at startup rather than
//! when the first socket is bound.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use mixer_core::{ConsoleFamily, MixerConfig};

use crate::domain::BridgeConfig;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// An address field is not a valid IP address.
    #[error("invalid {field} address: '{value}'")]
    InvalidAddress { field: &'static str, value: String },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct FileConfig {
    #[serde(default)]
    pub console: ConsoleSection,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub mixer: MixerConfig,
}

/// Where the console is and how to talk to it.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ConsoleSection {
    #[serde(default)]
    pub family: ConsoleFamily,

    /// The console's IP address.
    #[serde(default = "default_console_address")]
    pub address: String,

    /// UDP port the console listens on.
    #[serde(default = "default_send_port")]
    pub send_port: u16,

    /// Local UDP port the console sends replies to.
    #[serde(default = "default_receive_port")]
    pub receive_port: u16,

    /// Local address to bind the UDP socket to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Seconds to wait for a loading reply before asking again.  `0` waits
    /// forever.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// The browser-facing WebSocket listener.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ServerSection {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_ws_port")]
    pub port: u16,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_console_address() -> String {
    "127.0.0.1".to_string()
}

fn default_send_port() -> u16 {
    9001
}

fn default_receive_port() -> u16 {
    8001
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_ws_port() -> u16 {
    8081
}

impl Default for ConsoleSection {
    fn default() -> Self {
        Self {
            family: ConsoleFamily::default(),
            address: default_console_address(),
            send_port: default_send_port(),
            receive_port: default_receive_port(),
            bind_address: default_bind_address(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_ws_port(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Reads and parses the configuration file at `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read and
/// [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

/// Parses configuration TOML text.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if the TOML is malformed.
pub fn parse_config(content: &str) -> Result<FileConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

impl FileConfig {
    /// Resolves addresses and builds the runtime [`BridgeConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidAddress`] for an address that is not an
    /// IP literal.
    pub fn into_bridge_config(self) -> Result<BridgeConfig, ConfigError> {
        let console_ip = parse_ip("console", &self.console.address)?;
        let console_bind = parse_ip("console bind", &self.console.bind_address)?;
        let server_bind = parse_ip("server bind", &self.server.bind_address)?;

        Ok(BridgeConfig {
            ws_bind_addr: SocketAddr::new(server_bind, self.server.port),
            console_listen_addr: SocketAddr::new(console_bind, self.console.receive_port),
            console_addr: SocketAddr::new(console_ip, self.console.send_port),
            family: self.console.family,
            mixer: self.mixer,
            request_timeout: timeout_from_secs(self.console.request_timeout_secs),
            skip_loading: false,
        })
    }
}

/// Converts a seconds setting into a reply timeout; `0` disables it.
pub fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn parse_ip(field: &'static str, value: &str) -> Result<IpAddr, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidAddress {
        field,
        value: value.to_string(),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
