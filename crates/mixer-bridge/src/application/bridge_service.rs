//! The bridge controller: one owner for all mirrored console state.
//!
//! [`BridgeController`] ties together the pieces from `mixer-core`:
//!
//! ```text
//!   console ──WireMessage──► Mapper::decode ──► ValueStore ──► BroadcastHub ──► browsers
//!   browsers ──ClientMessage─► ValueStore ──► Mapper::encode ──► console
//!                                        └──────────────► BroadcastHub (all but sender)
//! ```
//!
//! It performs no I/O of its own.  Outbound console traffic goes through the
//! [`ConsoleSink`] trait, outbound browser frames through the hub's
//! [`ClientSink`]s, and every input arrives as a [`BridgeEvent`].  The
//! infrastructure event loop owns the controller and feeds it events one at
//! a time, which is what keeps the store consistent.
//!
//! # Lifecycle
//!
//! 1. [`BridgeController::start`] runs once the console socket is bound.  It
//!    either begins loading (one outstanding request at a time) or, when
//!    loading is skipped, goes straight to ready with configured aux labels.
//! 2. While loading, each decodable console reply advances the loader.
//! 3. Once ready, the event loop opens the WebSocket listener and console
//!    traffic is fanned out to every browser.

use thiserror::Error;
use tracing::{debug, info, warn};

use mixer_core::{
    AuxNumber, BootstrapLoader, ClientMessage, LoadState, LoadStep, Mapper, MappingError,
    MixerConfig, MixerUpdate, ServerMessage, ValueStore, WireMessage,
};

use crate::application::hub::{BroadcastHub, ClientSink, ConnectionId};
use crate::domain::BridgeConfig;

// ── Error type ────────────────────────────────────────────────────────────────

/// Failures that stop the bridge.
///
/// Malformed or unmapped traffic is never an error; it is logged and
/// dropped.  Only configuration mistakes and a dead console transport end up
/// here.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The aux configuration cannot be mapped onto the chosen console family.
    #[error("invalid mixer configuration: {0}")]
    Mapping(#[from] MappingError),

    /// The console writer is gone, so nothing more can reach the console.
    #[error("console connection closed")]
    ConsoleClosed,

    /// The console socket failed.
    #[error("console transport failed: {0}")]
    ConsoleTransport(String),
}

// ── Ports ─────────────────────────────────────────────────────────────────────

/// Outbound path to the console.
///
/// Implementations must not block; the production one queues the message
/// for the UDP writer task.
#[cfg_attr(test, mockall::automock)]
pub trait ConsoleSink: Send {
    fn send(&mut self, message: WireMessage) -> Result<(), BridgeError>;
}

/// Everything the event loop can hand to the controller.
pub enum BridgeEvent {
    /// A message received from the console.
    Console(WireMessage),

    /// The console socket reader or writer died.
    ConsoleFailed(String),

    /// A browser completed its WebSocket handshake.
    ClientConnected {
        id: ConnectionId,
        sink: Box<dyn ClientSink>,
    },

    /// A browser sent a well-formed JSON message.
    ClientMessage {
        id: ConnectionId,
        message: ClientMessage,
    },

    /// A browser session ended.
    ClientDisconnected { id: ConnectionId },
}

// ── Controller ────────────────────────────────────────────────────────────────

pub struct BridgeController<C: ConsoleSink> {
    mixer: MixerConfig,
    aux_channels: Vec<AuxNumber>,
    skip_loading: bool,
    mapper: Mapper,
    store: ValueStore,
    loader: BootstrapLoader,
    hub: BroadcastHub,
    console: C,
    /// Last progress decile reported to the log.
    reported_decile: usize,
}

impl<C: ConsoleSink> BridgeController<C> {
    /// Builds the controller for `config`, talking to the console via `console`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Mapping`] if the aux list does not suit the
    /// console family (for example, an S-series aux without a send number).
    pub fn new(config: &BridgeConfig, console: C) -> Result<Self, BridgeError> {
        let mixer = config.mixer.clone();
        let mapper = Mapper::new(config.family, &mixer.aux)?;
        let addresses = mapper.loading_addresses(&mixer.aux, &mixer.supported_channels());
        let store = ValueStore::new(&mixer);

        debug!(
            "{} console: {} loading requests, {} scalars to load",
            mapper.family(),
            addresses.len(),
            store.total_scalars()
        );

        Ok(Self {
            aux_channels: mixer.aux_channels(),
            skip_loading: config.skip_loading,
            mixer,
            mapper,
            store,
            loader: BootstrapLoader::new(addresses),
            hub: BroadcastHub::new(),
            console,
            reported_decile: 0,
        })
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn is_ready(&self) -> bool {
        self.loader.is_ready()
    }

    pub fn store(&self) -> &ValueStore {
        &self.store
    }

    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    /// Identifies the request currently awaiting a reply.
    ///
    /// Changes every time a request (or a repeat of one) is sent, so the
    /// event loop can restart its reply timer.  `None` outside loading or
    /// when no request is outstanding.
    pub fn request_generation(&self) -> Option<usize> {
        if self.loader.state() != LoadState::Loading {
            return None;
        }
        self.loader.outstanding()?;
        Some(self.loader.issued())
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Begins loading once the console transport is up.
    pub fn start(&mut self) -> Result<(), BridgeError> {
        if self.skip_loading {
            info!("skipping console load; all values start unset");
        } else {
            info!(
                "loading console state ({} values)",
                self.store.total_scalars()
            );
        }
        let step = self.loader.start(self.skip_loading, self.store.is_ready());
        self.follow(step)
    }

    /// Routes one event to its handler.
    pub fn dispatch(&mut self, event: BridgeEvent) -> Result<(), BridgeError> {
        match event {
            BridgeEvent::Console(wire) => self.on_console_message(&wire),
            BridgeEvent::ConsoleFailed(reason) => Err(BridgeError::ConsoleTransport(reason)),
            BridgeEvent::ClientConnected { id, sink } => {
                self.on_connect(id, sink);
                Ok(())
            }
            BridgeEvent::ClientMessage { id, message } => self.on_client_message(id, message),
            BridgeEvent::ClientDisconnected { id } => {
                self.on_disconnect(id);
                Ok(())
            }
        }
    }

    // ── Console side ──────────────────────────────────────────────────────────

    /// Handles one message from the console.
    ///
    /// Messages the mapper does not recognise are dropped.  While loading,
    /// a recognised message advances the loader; once ready it is fanned out
    /// to every browser whether or not the store kept it.
    pub fn on_console_message(&mut self, wire: &WireMessage) -> Result<(), BridgeError> {
        let Some(update) = self.mapper.decode(wire, &self.aux_channels) else {
            debug!("console → bridge: unmapped {}", wire.address);
            return Ok(());
        };

        debug!("console → bridge: {} {}", update.kind(), wire.address);
        let applied = self.store.apply(&update);

        match self.loader.state() {
            LoadState::Idle => Ok(()),
            LoadState::Loading => {
                let step = self.loader.on_reply(self.store.is_ready());
                self.report_progress();
                self.follow(step)
            }
            LoadState::Ready => {
                if !applied {
                    debug!("console: {} is outside the configured mix", wire.address);
                }
                self.hub.broadcast(&ServerMessage::Update(update), None);
                Ok(())
            }
        }
    }

    /// Sends the outstanding loading request again after its reply timed out.
    pub fn on_request_timeout(&mut self) -> Result<(), BridgeError> {
        match self.loader.on_timeout() {
            Some(address) => {
                warn!("no reply from console for {address}; requesting again");
                self.console.send(WireMessage::request(address))
            }
            None => Ok(()),
        }
    }

    // ── Browser side ──────────────────────────────────────────────────────────

    /// Registers a browser and sends it the channel and aux lists.
    pub fn on_connect(&mut self, id: ConnectionId, sink: Box<dyn ClientSink>) {
        self.hub.add(id, sink);
        let config = self.store.snapshot().config_payload();
        self.hub.send_to(id, &ServerMessage::Config { config });
        info!("connection {id}: opened ({} connected)", self.hub.len());
    }

    /// Handles one parsed message from a browser.
    ///
    /// An aux query is answered to the sender only.  A level or pan change is
    /// stored, sent to the console, and relayed to every other browser.
    /// Anything outside the configured mix, and label changes, are ignored.
    pub fn on_client_message(
        &mut self,
        id: ConnectionId,
        message: ClientMessage,
    ) -> Result<(), BridgeError> {
        match message {
            ClientMessage::AuxQuery { aux } => {
                let channels = self.store.aux_values(aux);
                debug!("connection {id}: aux {aux} query ({} channels)", channels.len());
                self.hub
                    .send_to(id, &ServerMessage::AuxValues { aux, channels });
                Ok(())
            }
            ClientMessage::Update(update) => self.on_client_update(id, update),
        }
    }

    fn on_client_update(
        &mut self,
        id: ConnectionId,
        update: MixerUpdate,
    ) -> Result<(), BridgeError> {
        if !update.is_send_update() {
            debug!("connection {id}: {} change ignored", update.kind());
            return Ok(());
        }
        if !self.store.apply(&update) {
            debug!("connection {id}: {} outside the configured mix", update.kind());
            return Ok(());
        }

        if let Some(wire) = self.mapper.encode(&update) {
            debug!("connection {id} → console: {}", wire.address);
            self.console.send(wire)?;
        }
        self.hub.broadcast(&ServerMessage::Update(update), Some(id));
        Ok(())
    }

    /// Forgets a browser.  Unknown ids are ignored.
    pub fn on_disconnect(&mut self, id: ConnectionId) {
        if self.hub.remove(id) {
            info!("connection {id}: closed ({} connected)", self.hub.len());
        }
    }

    // ── Private helpers ───────────────────────────────────────────────────────

    fn follow(&mut self, step: LoadStep) -> Result<(), BridgeError> {
        match step {
            LoadStep::Request(address) => {
                debug!("bridge → console: {address}");
                self.console.send(WireMessage::request(address))
            }
            LoadStep::Wait => Ok(()),
            LoadStep::Ready => {
                if self.skip_loading {
                    self.store.apply_fallback_labels(&self.mixer);
                }
                info!("console state loaded; ready for connections");
                Ok(())
            }
        }
    }

    fn report_progress(&mut self) {
        let progress = self
            .loader
            .progress(self.store.loaded_scalars(), self.store.total_scalars());
        let decile = progress.percent() / 10;
        if decile > self.reported_decile {
            self.reported_decile = decile;
            info!(
                "loading: {}% ({}/{} values, {} requests for {} addresses)",
                progress.percent(),
                progress.loaded,
                progress.total,
                progress.issued,
                progress.addresses
            );
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
