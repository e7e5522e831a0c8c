//! WebSocket server: accept loop and per-session task management.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Accepting incoming TCP connections from browsers.
//! 3. Upgrading each connection to a WebSocket session.
//! 4. Running two concurrent tasks per session:
//!    - **Browser → bridge**: reads JSON text frames, parses them, and pushes
//!      them into the bridge's event channel.
//!    - **Bridge → browser**: drains the session's bounded outbound queue and
//!      writes each frame to the WebSocket.
//! 5. Gracefully shutting down when the `running` flag is cleared.
//!
//! Sessions never touch the value store themselves.  They only produce
//! [`BridgeEvent`]s; the event loop owns all state.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::{debug, error, info, warn};

use mixer_core::ClientMessage;

use crate::application::{BridgeEvent, ClientSink, ConnectionId, DeliveryError};

/// Frames a session may have queued before it is considered too slow.
pub const OUTBOUND_QUEUE: usize = 256;

// ── Outbound queue ────────────────────────────────────────────────────────────

impl ClientSink for mpsc::Sender<String> {
    fn deliver(&mut self, frame: String) -> Result<(), DeliveryError> {
        self.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Runs the WebSocket accept loop until `running` is set to `false`.
///
/// Each accepted connection is handed off to a dedicated Tokio task so that
/// one slow browser never blocks others.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot be bound (e.g., the port is
/// already in use or the process lacks permission to bind).
pub async fn run_server(
    bind_addr: SocketAddr,
    events: mpsc::Sender<BridgeEvent>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind WebSocket listener on {bind_addr}"))?;

    serve(listener, events, running).await
}

/// Accept loop over an already-bound listener.
pub async fn serve(
    listener: TcpListener,
    events: mpsc::Sender<BridgeEvent>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("WebSocket server listening on {addr}");
    }

    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        // A short accept timeout lets the loop notice the shutdown flag.
        match timeout(Duration::from_millis(200), listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                debug!("new browser connection from {peer_addr}");
                let events = events.clone();
                tokio::spawn(async move {
                    handle_browser_session(stream, peer_addr, events).await;
                });
            }
            Ok(Err(e)) => {
                // Transient (e.g. out of file descriptors); keep serving.
                error!("accept error: {e}");
            }
            Err(_) => {}
        }
    }

    Ok(())
}

// ── Per-session handler ───────────────────────────────────────────────────────

async fn handle_browser_session(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    events: mpsc::Sender<BridgeEvent>,
) {
    match run_session(raw_stream, peer_addr, events).await {
        Ok(()) => debug!("session {peer_addr} closed normally"),
        Err(e) => warn!("session {peer_addr} closed with error: {e:#}"),
    }
}

async fn run_session(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    events: mpsc::Sender<BridgeEvent>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(raw_stream)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    let id = ConnectionId::new();
    info!("connection {id}: WebSocket session established with {peer_addr}");

    let (mut ws_tx, mut ws_rx) = ws_stream.split();
    let (frame_tx, mut frame_rx) = mpsc::channel::<String>(OUTBOUND_QUEUE);

    events
        .send(BridgeEvent::ClientConnected {
            id,
            sink: Box::new(frame_tx),
        })
        .await
        .map_err(|_| anyhow::anyhow!("event loop is not running"))?;

    // ── Task A: bridge → browser ──────────────────────────────────────────────
    //
    // Ends when the hub drops this connection's sender or the socket fails.
    let mut writer = tokio::spawn(async move {
        while let Some(frame) = frame_rx.recv().await {
            if ws_tx.send(WsMessage::Text(frame)).await.is_err() {
                debug!("connection {id}: WebSocket send failed (browser disconnected)");
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    // ── Task B: browser → bridge ──────────────────────────────────────────────
    let reader_events = events.clone();
    let mut reader = tokio::spawn(async move {
        loop {
            let ws_msg = match ws_rx.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(WsError::ConnectionClosed | WsError::Protocol(_))) => {
                    debug!("connection {id}: WebSocket closed");
                    break;
                }
                Some(Err(e)) => {
                    warn!("connection {id}: WebSocket error: {e}");
                    break;
                }
                None => break,
            };

            match ws_msg {
                WsMessage::Text(json_str) => {
                    let message: ClientMessage = match serde_json::from_str(&json_str) {
                        Ok(m) => m,
                        Err(e) => {
                            // One bad frame does not end the session.
                            warn!("connection {id}: invalid JSON from browser: {e}");
                            continue;
                        }
                    };
                    if reader_events
                        .send(BridgeEvent::ClientMessage { id, message })
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                WsMessage::Binary(_) => {
                    warn!("connection {id}: unexpected binary WebSocket frame (ignored)");
                }
                WsMessage::Close(_) => {
                    debug!("connection {id}: WebSocket Close frame received");
                    break;
                }
                WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => {}
            }
        }
    });

    // Whichever side finishes first ends the session.
    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    let _ = events.send(BridgeEvent::ClientDisconnected { id }).await;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
