//! Bridge configuration types.
//!
//! [`BridgeConfig`] is the single source of truth for all runtime settings.
//! It is built once at startup from the configuration file plus CLI
//! overrides (see `infrastructure::config_file` and `main.rs`), or from
//! defaults in tests.

use std::net::SocketAddr;
use std::time::Duration;

use mixer_core::{ConsoleFamily, MixerConfig};

/// Default time to wait for a console reply before asking again.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// All runtime configuration for the bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// The address and port the WebSocket server binds to.
    ///
    /// The listener only opens once the console state has been loaded.
    pub ws_bind_addr: SocketAddr,

    /// Local UDP address the console sends its replies to.
    pub console_listen_addr: SocketAddr,

    /// The console's OSC address and port.
    pub console_addr: SocketAddr,

    /// Which console family's addressing to speak.
    pub family: ConsoleFamily,

    /// Auxes and channels to mirror.
    pub mixer: MixerConfig,

    /// How long to wait for a reply to a loading request before sending it
    /// again.  `None` waits forever.
    pub request_timeout: Option<Duration>,

    /// Skip loading from the console and serve clients immediately.
    ///
    /// A debugging aid: every value starts unset and auxes show their
    /// configured labels.
    pub skip_loading: bool,
}

impl Default for BridgeConfig {
    /// Returns a `BridgeConfig` suitable for local development.
    ///
    /// | Field               | Default          |
    /// |---------------------|------------------|
    /// | ws_bind_addr        | `0.0.0.0:8081`   |
    /// | console_listen_addr | `0.0.0.0:8001`   |
    /// | console_addr        | `127.0.0.1:9001` |
    /// | family              | `sd`             |
    /// | request_timeout     | 10 seconds       |
    fn default() -> Self {
        Self {
            ws_bind_addr: SocketAddr::from(([0, 0, 0, 0], 8081)),
            console_listen_addr: SocketAddr::from(([0, 0, 0, 0], 8001)),
            console_addr: SocketAddr::from(([127, 0, 0, 1], 9001)),
            family: ConsoleFamily::default(),
            mixer: MixerConfig::default(),
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            skip_loading: false,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
