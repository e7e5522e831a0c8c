//! Bootstrap loader: primes the value store from the console at startup.
//!
//! # Why one request at a time?
//!
//! Consoles silently drop read requests that arrive while they are still
//! answering an earlier one.  Asking for everything at once therefore leaves
//! holes in the mirror that are never filled.  The loader keeps exactly one
//! request outstanding and only issues the next one after a reply has been
//! decoded and applied.
//!
//! ```text
//!   Idle ──start──► Loading ──(store ready)──► Ready
//!     │                │  ▲
//!     │                │  └── reply applied, not ready: request next address
//!     └──skip──────────┴────────────────────────► Ready
//! ```
//!
//! `Ready` is terminal.
//!
//! # Completion without an acknowledgement
//!
//! Consoles never say "that was everything".  Readiness is derived from the
//! store instead (see [`crate::ValueStore::is_ready`]).  Some families are
//! primed by a single "resend everything" request whose replies arrive in no
//! particular order; once the address queue is empty the loader simply waits
//! for the store to fill up.
//!
//! The loader itself does no I/O.  Each transition returns a [`LoadStep`]
//! telling the caller what to send, if anything.

use std::collections::VecDeque;

/// Lifecycle state of the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Ready,
}

/// What the caller must do after a loader transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStep {
    /// Send a read request for this address.
    Request(String),
    /// Nothing to send; keep feeding console messages.
    Wait,
    /// Loading is complete.
    Ready,
}

/// Diagnostic progress counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    /// Read requests sent so far, including re-sends after a timeout.
    pub issued: usize,
    /// Length of the initial address list.
    pub addresses: usize,
    /// Scalars loaded into the store.
    pub loaded: usize,
    /// Scalars required for readiness.
    pub total: usize,
}

impl LoadProgress {
    /// Loaded scalars as a whole percentage of the total.
    pub fn percent(&self) -> usize {
        if self.total == 0 {
            100
        } else {
            self.loaded * 100 / self.total
        }
    }
}

/// Request/response pacing state machine for the startup load.
#[derive(Debug, Clone)]
pub struct BootstrapLoader {
    state: LoadState,
    queue: VecDeque<String>,
    outstanding: Option<String>,
    issued: usize,
    addresses: usize,
}

impl BootstrapLoader {
    /// Creates an idle loader that will request `addresses` in order.
    pub fn new(addresses: Vec<String>) -> Self {
        let addresses_len = addresses.len();
        Self {
            state: LoadState::Idle,
            queue: addresses.into(),
            outstanding: None,
            issued: 0,
            addresses: addresses_len,
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == LoadState::Ready
    }

    /// The request awaiting a reply, if any.
    pub fn outstanding(&self) -> Option<&str> {
        self.outstanding.as_deref()
    }

    /// Requests sent so far, counting repeats.
    pub fn issued(&self) -> usize {
        self.issued
    }

    /// Addresses not yet requested.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// Builds a progress report from the store's counters.
    pub fn progress(&self, loaded: usize, total: usize) -> LoadProgress {
        LoadProgress {
            issued: self.issued,
            addresses: self.addresses,
            loaded,
            total,
        }
    }

    /// Leaves `Idle` once the console transport is up.
    ///
    /// With `skip` set the loader goes straight to `Ready` without asking the
    /// console for anything.  `already_ready` covers a configuration with
    /// nothing to load.  Calling this outside `Idle` changes nothing.
    pub fn start(&mut self, skip: bool, already_ready: bool) -> LoadStep {
        match self.state {
            LoadState::Idle => {}
            LoadState::Loading => return LoadStep::Wait,
            LoadState::Ready => return LoadStep::Ready,
        }

        if skip || already_ready {
            self.finish();
            return LoadStep::Ready;
        }

        self.state = LoadState::Loading;
        self.next_request()
    }

    /// Advances after a console reply was decoded and applied to the store.
    ///
    /// `store_ready` is the store's readiness after the apply.
    pub fn on_reply(&mut self, store_ready: bool) -> LoadStep {
        match self.state {
            LoadState::Idle => LoadStep::Wait,
            LoadState::Ready => LoadStep::Ready,
            LoadState::Loading if store_ready => {
                self.finish();
                LoadStep::Ready
            }
            LoadState::Loading => self.next_request(),
        }
    }

    /// Returns the outstanding address again after its reply timed out.
    ///
    /// `None` when nothing is outstanding (not loading, or the queue is
    /// exhausted and the loader is only waiting).
    pub fn on_timeout(&mut self) -> Option<String> {
        if self.state != LoadState::Loading {
            return None;
        }
        let address = self.outstanding.clone()?;
        self.issued += 1;
        Some(address)
    }

    fn next_request(&mut self) -> LoadStep {
        match self.queue.pop_front() {
            Some(address) => {
                self.issued += 1;
                self.outstanding = Some(address.clone());
                LoadStep::Request(address)
            }
            None => {
                self.outstanding = None;
                LoadStep::Wait
            }
        }
    }

    fn finish(&mut self) {
        self.state = LoadState::Ready;
        self.outstanding = None;
        self.queue.clear();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
