//! UDP connection to the console.
//!
//! The console speaks OSC over UDP: one datagram per packet, no framing
//! beyond what OSC itself provides.  This module converts between `rosc`
//! packets and the codec-free [`WireMessage`] used everywhere else, and runs
//! two tasks on a shared socket:
//!
//! - **Reader**: receives datagrams, decodes them, flattens bundles, and
//!   pushes each message into the bridge's event channel.
//! - **Writer**: drains an unbounded queue of outbound messages fed by
//!   [`UdpConsoleSink`] and sends each as its own datagram.
//!
//! Either task failing is reported as [`BridgeEvent::ConsoleFailed`], which
//! stops the bridge.

use std::net::SocketAddr;
use std::sync::Arc;

use rosc::{OscMessage, OscPacket, OscType};
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};

use mixer_core::{WireMessage, WireValue};

use crate::application::{BridgeError, BridgeEvent, ConsoleSink};

/// Largest datagram accepted from the console.
const MAX_DATAGRAM: usize = 65_536;

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("failed to bind console socket on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("OSC codec error: {0}")]
    Codec(String),
}

// ── Codec ─────────────────────────────────────────────────────────────────────

/// Decodes one datagram into its messages.
///
/// Bundles are flattened in order; their time tags are ignored.
///
/// # Errors
///
/// Returns [`ConsoleError::Codec`] for a datagram that is not valid OSC.
pub fn decode_datagram(bytes: &[u8]) -> Result<Vec<WireMessage>, ConsoleError> {
    let (_, packet) =
        rosc::decoder::decode_udp(bytes).map_err(|e| ConsoleError::Codec(format!("{e:?}")))?;
    let mut messages = Vec::new();
    flatten(packet, &mut messages);
    Ok(messages)
}

/// Encodes one message as an OSC datagram.
///
/// # Errors
///
/// Returns [`ConsoleError::Codec`] if `rosc` rejects the message.
pub fn encode_message(message: &WireMessage) -> Result<Vec<u8>, ConsoleError> {
    let packet = OscPacket::Message(OscMessage {
        addr: message.address.clone(),
        args: message.args.iter().map(to_osc).collect(),
    });
    rosc::encoder::encode(&packet).map_err(|e| ConsoleError::Codec(format!("{e:?}")))
}

fn flatten(packet: OscPacket, out: &mut Vec<WireMessage>) {
    match packet {
        OscPacket::Message(msg) => out.push(WireMessage::new(
            msg.addr,
            msg.args.into_iter().filter_map(from_osc).collect(),
        )),
        OscPacket::Bundle(bundle) => {
            for inner in bundle.content {
                flatten(inner, out);
            }
        }
    }
}

/// Argument types the mappers understand.  Everything else is dropped.
fn from_osc(arg: OscType) -> Option<WireValue> {
    match arg {
        OscType::Float(v) => Some(WireValue::Float(v)),
        OscType::Double(v) => Some(WireValue::Double(v)),
        OscType::Int(v) => Some(WireValue::Int(v)),
        OscType::String(v) => Some(WireValue::Str(v)),
        _ => None,
    }
}

fn to_osc(arg: &WireValue) -> OscType {
    match arg {
        WireValue::Float(v) => OscType::Float(*v),
        WireValue::Double(v) => OscType::Double(*v),
        WireValue::Int(v) => OscType::Int(*v),
        WireValue::Str(v) => OscType::String(v.clone()),
    }
}

// ── Outbound port ─────────────────────────────────────────────────────────────

/// [`ConsoleSink`] that queues messages for the UDP writer task.
#[derive(Debug, Clone)]
pub struct UdpConsoleSink {
    tx: mpsc::UnboundedSender<WireMessage>,
}

impl ConsoleSink for UdpConsoleSink {
    fn send(&mut self, message: WireMessage) -> Result<(), BridgeError> {
        self.tx.send(message).map_err(|_| BridgeError::ConsoleClosed)
    }
}

// ── Connection ────────────────────────────────────────────────────────────────

/// A bound UDP socket paired with the console's address.
pub struct ConsoleConnection {
    socket: Arc<UdpSocket>,
    console_addr: SocketAddr,
}

/// Handles to the running socket tasks.
pub struct ConsoleTasks {
    pub reader: JoinHandle<()>,
    pub writer: JoinHandle<()>,
}

impl ConsoleTasks {
    pub fn abort(&self) {
        self.reader.abort();
        self.writer.abort();
    }
}

impl ConsoleConnection {
    /// Binds the local socket the console replies to.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::Bind`] if the local address is unavailable.
    pub async fn bind(
        listen_addr: SocketAddr,
        console_addr: SocketAddr,
    ) -> Result<Self, ConsoleError> {
        let socket = UdpSocket::bind(listen_addr)
            .await
            .map_err(|source| ConsoleError::Bind {
                addr: listen_addr,
                source,
            })?;
        Ok(Self {
            socket: Arc::new(socket),
            console_addr,
        })
    }

    /// The bound local address (useful when binding to port 0).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Spawns the reader and writer tasks.
    ///
    /// Decoded console messages are pushed into `events`.  The returned sink
    /// feeds the writer.
    pub fn spawn(self, events: mpsc::Sender<BridgeEvent>) -> (UdpConsoleSink, ConsoleTasks) {
        let (tx, rx) = mpsc::unbounded_channel();

        let reader = tokio::spawn(read_loop(Arc::clone(&self.socket), events.clone()));
        let writer = tokio::spawn(write_loop(self.socket, self.console_addr, rx, events));

        (UdpConsoleSink { tx }, ConsoleTasks { reader, writer })
    }
}

async fn read_loop(socket: Arc<UdpSocket>, events: mpsc::Sender<BridgeEvent>) {
    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        let (len, peer) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                error!("console socket receive failed: {e}");
                let _ = events
                    .send(BridgeEvent::ConsoleFailed(format!("receive failed: {e}")))
                    .await;
                return;
            }
        };

        let messages = match decode_datagram(&buf[..len]) {
            Ok(m) => m,
            Err(e) => {
                warn!("undecodable datagram from {peer} ({len} bytes): {e}");
                continue;
            }
        };

        for message in messages {
            trace!("console {peer}: {}", message.address);
            if events.send(BridgeEvent::Console(message)).await.is_err() {
                debug!("event loop gone; console reader stopping");
                return;
            }
        }
    }
}

async fn write_loop(
    socket: Arc<UdpSocket>,
    console_addr: SocketAddr,
    mut rx: mpsc::UnboundedReceiver<WireMessage>,
    events: mpsc::Sender<BridgeEvent>,
) {
    while let Some(message) = rx.recv().await {
        let bytes = match encode_message(&message) {
            Ok(b) => b,
            Err(e) => {
                error!("cannot encode {}: {e}", message.address);
                continue;
            }
        };
        if let Err(e) = socket.send_to(&bytes, console_addr).await {
            error!("console socket send to {console_addr} failed: {e}");
            let _ = events
                .send(BridgeEvent::ConsoleFailed(format!("send failed: {e}")))
                .await;
            return;
        }
    }
    debug!("console writer stopping");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
