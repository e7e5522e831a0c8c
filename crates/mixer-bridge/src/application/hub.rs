//! Connection registry and fan-out.
//!
//! The [`BroadcastHub`] knows every live browser connection and how to hand
//! it a serialized frame.  It never blocks: each connection owns a bounded
//! outbound queue drained by its own writer task, and a connection whose
//! queue is full or closed is dropped from the registry on the spot.  A slow
//! phone therefore cannot hold up the console or the other browsers.

use std::fmt;

use thiserror::Error;
use tracing::{debug, error, warn};
use uuid::Uuid;

use mixer_core::ServerMessage;

// ── Connection identity ───────────────────────────────────────────────────────

/// Opaque identifier assigned to each browser connection when it opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generates a new random (v4) connection identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The first block of the UUID is plenty to tell sessions apart in logs.
        let text = self.0.to_string();
        f.write_str(&text[..8])
    }
}

// ── Delivery seam ─────────────────────────────────────────────────────────────

/// Why a frame could not be queued for a connection.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("outbound queue is full")]
    Full,

    #[error("connection writer has gone away")]
    Closed,
}

/// Non-blocking handle to one connection's outbound queue.
///
/// The production implementation wraps a bounded Tokio channel (see
/// `infrastructure::ws_server`).
pub trait ClientSink: Send {
    /// Queues one JSON text frame without waiting.
    fn deliver(&mut self, frame: String) -> Result<(), DeliveryError>;
}

// ── Hub ───────────────────────────────────────────────────────────────────────

/// Registry of live connections, in connection order.
#[derive(Default)]
pub struct BroadcastHub {
    connections: Vec<(ConnectionId, Box<dyn ClientSink>)>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.iter().any(|(c, _)| *c == id)
    }

    /// Registers a connection.  Re-adding an existing id replaces its sink.
    pub fn add(&mut self, id: ConnectionId, sink: Box<dyn ClientSink>) {
        self.remove(id);
        self.connections.push((id, sink));
    }

    /// Forgets a connection.  Returns `false` when it was not registered.
    pub fn remove(&mut self, id: ConnectionId) -> bool {
        let before = self.connections.len();
        self.connections.retain(|(c, _)| *c != id);
        self.connections.len() != before
    }

    /// Sends a message to a single connection.
    ///
    /// Returns `false` when the connection is unknown or had to be dropped.
    pub fn send_to(&mut self, id: ConnectionId, message: &ServerMessage) -> bool {
        let Some(frame) = serialize(message) else {
            return false;
        };
        let Some(index) = self.connections.iter().position(|(c, _)| *c == id) else {
            debug!("connection {id}: not registered, reply dropped");
            return false;
        };

        match self.connections[index].1.deliver(frame) {
            Ok(()) => true,
            Err(e) => {
                warn!("connection {id}: {e}; dropping connection");
                self.connections.remove(index);
                false
            }
        }
    }

    /// Sends a message to every connection except `except`.
    ///
    /// Connections that cannot accept the frame are removed.  Returns how many
    /// connections the frame was queued for.
    pub fn broadcast(&mut self, message: &ServerMessage, except: Option<ConnectionId>) -> usize {
        let Some(frame) = serialize(message) else {
            return 0;
        };

        let mut delivered = 0;
        self.connections.retain_mut(|(id, sink)| {
            if Some(*id) == except {
                return true;
            }
            match sink.deliver(frame.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(e) => {
                    warn!("connection {id}: {e}; dropping connection");
                    false
                }
            }
        });
        delivered
    }
}

fn serialize(message: &ServerMessage) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(frame) => Some(frame),
        Err(e) => {
            error!("JSON serialization error: {e}");
            None
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use mixer_core::MixerUpdate;

    use super::*;

    /// Records frames; fails every delivery once `fail_with` is set.
    #[derive(Clone, Default)]
    struct RecordingSink {
        frames: Arc<Mutex<Vec<String>>>,
        fail_with: Option<DeliveryError>,
    }

    impl ClientSink for RecordingSink {
        fn deliver(&mut self, frame: String) -> Result<(), DeliveryError> {
            if let Some(e) = self.fail_with {
                return Err(e);
            }
            self.frames.lock().unwrap().push(frame);
            Ok(())
        }
    }

    fn level_update() -> ServerMessage {
        ServerMessage::Update(MixerUpdate::Level {
            aux: 1,
            channel: 3,
            level: 0.5,
        })
    }

    #[test]
    fn test_broadcast_reaches_every_connection() {
        // Arrange
        let mut hub = BroadcastHub::new();
        let a = RecordingSink::default();
        let b = RecordingSink::default();
        hub.add(ConnectionId::new(), Box::new(a.clone()));
        hub.add(ConnectionId::new(), Box::new(b.clone()));

        // Act
        let delivered = hub.broadcast(&level_update(), None);

        // Assert
        assert_eq!(delivered, 2);
        assert_eq!(a.frames.lock().unwrap().len(), 1);
        assert_eq!(b.frames.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_broadcast_skips_the_originator() {
        let mut hub = BroadcastHub::new();
        let origin = ConnectionId::new();
        let a = RecordingSink::default();
        let b = RecordingSink::default();
        hub.add(origin, Box::new(a.clone()));
        hub.add(ConnectionId::new(), Box::new(b.clone()));

        hub.broadcast(&level_update(), Some(origin));

        assert!(a.frames.lock().unwrap().is_empty());
        assert_eq!(
            b.frames.lock().unwrap()[0],
            r#"{"aux":1,"channel":3,"level":0.5}"#
        );
    }

    #[test]
    fn test_broadcast_drops_connection_with_full_queue() {
        // Arrange
        let mut hub = BroadcastHub::new();
        let slow = ConnectionId::new();
        hub.add(
            slow,
            Box::new(RecordingSink {
                fail_with: Some(DeliveryError::Full),
                ..Default::default()
            }),
        );
        let healthy = RecordingSink::default();
        hub.add(ConnectionId::new(), Box::new(healthy.clone()));

        // Act
        let delivered = hub.broadcast(&level_update(), None);

        // Assert: the healthy peer still gets the frame, the slow one is gone
        assert_eq!(delivered, 1);
        assert!(!hub.contains(slow));
        assert_eq!(hub.len(), 1);
        assert_eq!(healthy.frames.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_send_to_drops_closed_connection() {
        let mut hub = BroadcastHub::new();
        let id = ConnectionId::new();
        hub.add(
            id,
            Box::new(RecordingSink {
                fail_with: Some(DeliveryError::Closed),
                ..Default::default()
            }),
        );

        assert!(!hub.send_to(id, &level_update()));
        assert!(hub.is_empty());
    }

    #[test]
    fn test_send_to_unknown_connection_returns_false() {
        let mut hub = BroadcastHub::new();
        assert!(!hub.send_to(ConnectionId::new(), &level_update()));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut hub = BroadcastHub::new();
        let id = ConnectionId::new();
        hub.add(id, Box::new(RecordingSink::default()));

        assert!(hub.remove(id));
        assert!(!hub.remove(id));
        assert!(hub.is_empty());
    }

    #[test]
    fn test_connection_id_display_is_short() {
        let id = ConnectionId::new();
        assert_eq!(id.to_string().len(), 8);
    }
}
