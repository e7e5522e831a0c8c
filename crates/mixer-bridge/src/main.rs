//! OSC web mixer bridge: entry point.
//!
//! This binary mirrors a mixing console's aux sends in memory and serves them
//! to any number of browsers over WebSocket, so each performer can set their
//! own monitor mix from a phone while the console and every other browser
//! follow along.
//!
//! # Usage
//!
//! ```text
//! mixer-bridge [OPTIONS]
//!
//! Options:
//!   --config <PATH>           TOML configuration file [default: mixer.toml]
//!   --ws-port <PORT>          Override the WebSocket listener port
//!   --skip-loading            Serve immediately without loading from the console
//!   --debug                   Log every console and browser message
//!   --request-timeout <SECS>  Override the loading reply timeout (0 disables)
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                | Description                       |
//! |-------------------------|-----------------------------------|
//! | `MIXER_CONFIG`          | Configuration file path           |
//! | `MIXER_WS_PORT`         | WebSocket listener port           |
//! | `MIXER_REQUEST_TIMEOUT` | Loading reply timeout (secs)      |
//! | `RUST_LOG`              | `tracing` filter, overrides `--debug` |
//!
//! CLI args take precedence over environment variables, which take precedence
//! over the configuration file.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mixer_bridge::domain::BridgeConfig;
use mixer_bridge::infrastructure::config_file::timeout_from_secs;
use mixer_bridge::infrastructure::{load_config, run_bridge};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// OSC web mixer bridge.
///
/// Loads the console's aux mixes and shares them with browsers over WebSocket.
#[derive(Debug, Parser)]
#[command(
    name = "mixer-bridge",
    about = "Console OSC to multi-client WebSocket mixer bridge",
    version
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "mixer.toml", env = "MIXER_CONFIG")]
    config: PathBuf,

    /// TCP port for the WebSocket server, overriding `[server] port`.
    #[arg(long, env = "MIXER_WS_PORT")]
    ws_port: Option<u16>,

    /// Start serving immediately instead of loading values from the console.
    ///
    /// Every level and pan starts unset and auxes show their configured
    /// labels.  Useful when working without a console on the network.
    #[arg(long)]
    skip_loading: bool,

    /// Log every console and browser message (`debug` level).
    #[arg(long)]
    debug: bool,

    /// Seconds to wait for a console reply while loading before asking
    /// again, overriding `[console] request_timeout_secs`.  `0` disables.
    #[arg(long, env = "MIXER_REQUEST_TIMEOUT")]
    request_timeout: Option<u64>,
}

impl Cli {
    /// The default log filter when `RUST_LOG` is unset.
    fn log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }

    /// Applies the command-line overrides on top of a file-derived config.
    fn apply_overrides(&self, mut config: BridgeConfig) -> BridgeConfig {
        if let Some(port) = self.ws_port {
            config.ws_bind_addr.set_port(port);
        }
        if let Some(secs) = self.request_timeout {
            config.request_timeout = timeout_from_secs(secs);
        }
        config.skip_loading |= self.skip_loading;
        config
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// # What happens at startup
///
/// 1. CLI arguments are parsed with `clap`.
/// 2. `tracing_subscriber` is initialised; `RUST_LOG` wins over `--debug`.
/// 3. The configuration file is read and the CLI overrides applied.
/// 4. A Ctrl+C handler is spawned that clears the shared `running` flag.
/// 5. [`run_bridge`] binds the console socket, loads the console state, and
///    opens the WebSocket listener once loading is complete.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ─────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level())),
        )
        .init();

    // ── Configuration ─────────────────────────────────────────────────────────
    let file = load_config(&cli.config)
        .with_context(|| format!("cannot load configuration from {}", cli.config.display()))?;
    let config = cli.apply_overrides(file.into_bridge_config()?);

    info!(
        "mixer bridge starting: console={} ({}), ws={}, {} auxes, {} channels",
        config.console_addr,
        config.family,
        config.ws_bind_addr,
        config.mixer.aux.len(),
        config.mixer.supported_channels().len()
    );

    // ── Graceful shutdown flag ────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    // ── Main loop ─────────────────────────────────────────────────────────────
    run_bridge(config, running).await?;

    info!("mixer bridge stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
