//! The bridge's single event loop.
//!
//! ```text
//!   console reader ─┐
//!   session 1 ──────┼──► mpsc<BridgeEvent> ──► event loop ──► BridgeController
//!   session N ──────┘                            │
//!                                                ├─ reply timer (loading only)
//!                                                └─ shutdown flag (every 200 ms)
//! ```
//!
//! The loop owns the [`BridgeController`] outright, so there is no locking:
//! events are applied strictly one after another.  The WebSocket listener is
//! started the first time the controller reports ready.

use std::future::pending;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
use tracing::{error, info};

use crate::application::{BridgeController, BridgeEvent, ConsoleSink};
use crate::domain::BridgeConfig;
use crate::infrastructure::console_conn::ConsoleConnection;
use crate::infrastructure::ws_server::run_server;

/// Events that may be waiting for the loop before producers back off.
pub const EVENT_QUEUE: usize = 1024;

const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

/// Runs the bridge described by `config` until `running` is cleared or the
/// console transport fails.
///
/// # Errors
///
/// Returns an error if the console socket cannot be bound, the mixer
/// configuration does not suit the console family, or the console transport
/// fails.
pub async fn run_bridge(config: BridgeConfig, running: Arc<AtomicBool>) -> anyhow::Result<()> {
    let console = ConsoleConnection::bind(config.console_listen_addr, config.console_addr)
        .await
        .context("console transport unavailable")?;
    info!(
        "console socket bound on {}, console at {}",
        config.console_listen_addr, config.console_addr
    );

    let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE);
    let (sink, tasks) = console.spawn(events_tx.clone());
    let controller = BridgeController::new(&config, sink)?;

    let ws_addr = config.ws_bind_addr;
    let ws_running = Arc::clone(&running);
    let result = run_event_loop(
        controller,
        events_tx,
        events_rx,
        config.request_timeout,
        running,
        move |events| {
            tokio::spawn(async move {
                if let Err(e) = run_server(ws_addr, events, ws_running).await {
                    error!("WebSocket server stopped: {e:#}");
                }
            });
        },
    )
    .await;

    tasks.abort();
    result
}

/// Drives `controller` from `events_rx` until shutdown.
///
/// `on_ready` is called once, with a sender for browser sessions, when the
/// controller first reports ready.  While a loading request is outstanding
/// and `request_timeout` is set, a reply that does not arrive in time makes
/// the controller ask again.
///
/// # Errors
///
/// Returns the first fatal [`crate::application::BridgeError`].
pub async fn run_event_loop<C, F>(
    mut controller: BridgeController<C>,
    events_tx: mpsc::Sender<BridgeEvent>,
    mut events_rx: mpsc::Receiver<BridgeEvent>,
    request_timeout: Option<Duration>,
    running: Arc<AtomicBool>,
    on_ready: F,
) -> anyhow::Result<()>
where
    C: ConsoleSink,
    F: FnOnce(mpsc::Sender<BridgeEvent>),
{
    controller.start()?;

    let mut on_ready = Some(on_ready);
    let mut reply_timer: Option<(usize, Instant)> = None;
    let mut shutdown_poll = interval(SHUTDOWN_POLL);
    shutdown_poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        if controller.is_ready() {
            if let Some(start_server) = on_ready.take() {
                start_server(events_tx.clone());
            }
        }

        // Restart the timer whenever a new request goes out.
        reply_timer = match (controller.request_generation(), request_timeout) {
            (Some(generation), Some(timeout)) => match reply_timer {
                Some((current, deadline)) if current == generation => Some((current, deadline)),
                _ => Some((generation, Instant::now() + timeout)),
            },
            _ => None,
        };
        let deadline = reply_timer.map(|(_, deadline)| deadline);

        tokio::select! {
            event = events_rx.recv() => match event {
                Some(event) => controller.dispatch(event)?,
                None => break,
            },
            _ = wait_until(deadline) => {
                reply_timer = None;
                controller.on_request_timeout()?;
            }
            _ = shutdown_poll.tick() => {
                if !running.load(Ordering::Relaxed) {
                    info!("shutdown flag set; stopping event loop");
                    break;
                }
            }
        }
    }

    Ok(())
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
