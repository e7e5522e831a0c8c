//! The canonical in-memory mirror of console state.
//!
//! [`ValueStore`] holds every channel label, aux label, and send value the
//! bridge knows about.  It is owned by exactly one task (the bridge's event
//! loop), so its methods take `&mut self` and need no locking.
//!
//! # Merge rules
//!
//! | Update        | Unknown key                                   | Known key     |
//! |---------------|-----------------------------------------------|---------------|
//! | channel name  | inserted at the front (unless ignored)        | label replaced |
//! | aux name      | dropped (aux set is fixed by configuration)   | label replaced |
//! | level         | dropped                                       | level replaced |
//! | pan           | dropped                                       | pan replaced if the aux is stereo, else dropped |
//!
//! Conflicts are resolved by last write wins.
//!
//! # Invariant
//!
//! Send values exist exactly for the configured aux × configured channel
//! product, created up front.  Channels the console reports on its own get
//! a label but never send values.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::domain::mixer::{
    Aux, AuxNumber, Channel, ChannelNumber, MixerConfig, ParamKey, ParamValue,
};
use crate::protocol::messages::{ConfigPayload, MixerUpdate};

/// Immutable copy of the store, used for connection catch-up.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot {
    pub channels: Vec<Channel>,
    pub aux: Vec<Aux>,
    pub values: BTreeMap<ParamKey, ParamValue>,
}

impl StoreSnapshot {
    /// The part of the snapshot sent to a newly connected browser.
    pub fn config_payload(&self) -> ConfigPayload {
        ConfigPayload {
            channels: self.channels.clone(),
            aux: self.aux.clone(),
        }
    }
}

/// Canonical mirror of channel labels, aux labels, and send values.
#[derive(Debug, Clone)]
pub struct ValueStore {
    /// Most recently discovered channels first.
    channels: Vec<Channel>,
    auxes: Vec<Aux>,
    values: BTreeMap<ParamKey, ParamValue>,
    ignored: BTreeSet<ChannelNumber>,
    /// Scalars that must be loaded for readiness; fixed at construction.
    total_scalars: usize,
}

impl ValueStore {
    /// Builds an unloaded store for the configured auxes and channels.
    pub fn new(config: &MixerConfig) -> Self {
        let supported = config.supported_channels();

        let channels: Vec<Channel> = supported
            .iter()
            .map(|&number| Channel {
                number,
                label: None,
                configured: true,
            })
            .collect();

        let mut auxes: Vec<Aux> = Vec::with_capacity(config.aux.len());
        for cfg in &config.aux {
            if auxes.iter().any(|a| a.number == cfg.channel) {
                continue;
            }
            auxes.push(Aux::from_config(cfg));
        }

        let mut values = BTreeMap::new();
        for aux in &auxes {
            for &channel in &supported {
                values.insert(
                    ParamKey::new(aux.number, channel),
                    ParamValue::unloaded(aux.stereo),
                );
            }
        }

        let total_scalars = channels.len()
            + auxes.len()
            + values.values().map(ParamValue::required_scalars).sum::<usize>();

        Self {
            channels,
            auxes,
            values,
            ignored: config.ignore_channels.iter().copied().collect(),
            total_scalars,
        }
    }

    // ── Mutations ─────────────────────────────────────────────────────────────

    /// Applies any normalized update, returning `true` if the store accepted it.
    pub fn apply(&mut self, update: &MixerUpdate) -> bool {
        match update {
            MixerUpdate::Level {
                aux,
                channel,
                level,
            } => self.apply_level(*aux, *channel, *level),
            MixerUpdate::Pan { aux, channel, pan } => self.apply_pan(*aux, *channel, *pan),
            MixerUpdate::ChannelName { name, channel } => self.apply_channel_name(*channel, name),
            MixerUpdate::AuxName { auxname, channel } => self.apply_aux_name(*channel, auxname),
        }
    }

    /// Sets a channel label, adding the channel at the front if it is new.
    ///
    /// Returns `false` only when the channel is in the ignore set.
    pub fn apply_channel_name(&mut self, number: ChannelNumber, name: &str) -> bool {
        if self.ignored.contains(&number) {
            debug!("ignoring name for ignored channel {number}");
            return false;
        }

        if let Some(channel) = self.channels.iter_mut().find(|c| c.number == number) {
            channel.label = Some(name.to_string());
        } else {
            debug!("console reported unconfigured channel {number}; adding it");
            self.channels.insert(
                0,
                Channel {
                    number,
                    label: Some(name.to_string()),
                    configured: false,
                },
            );
        }
        true
    }

    /// Sets an aux label.  Unknown auxes are a no-op.
    pub fn apply_aux_name(&mut self, number: AuxNumber, name: &str) -> bool {
        match self.auxes.iter_mut().find(|a| a.number == number) {
            Some(aux) => {
                aux.label = Some(name.to_string());
                true
            }
            None => false,
        }
    }

    /// Sets a send level.  Unknown (aux, channel) pairs are a no-op.
    pub fn apply_level(&mut self, aux: AuxNumber, channel: ChannelNumber, value: f32) -> bool {
        match self.values.get_mut(&ParamKey::new(aux, channel)) {
            Some(param) => {
                param.set_level(value);
                true
            }
            None => false,
        }
    }

    /// Sets a send pan.  Unknown pairs and mono auxes are a no-op.
    pub fn apply_pan(&mut self, aux: AuxNumber, channel: ChannelNumber, value: f32) -> bool {
        self.values
            .get_mut(&ParamKey::new(aux, channel))
            .is_some_and(|param| param.set_pan(value))
    }

    /// Copies configured fallback labels into any aux that has none.
    ///
    /// Used when loading from the console is skipped.
    pub fn apply_fallback_labels(&mut self, config: &MixerConfig) {
        for cfg in &config.aux {
            if let (Some(label), Some(aux)) = (
                cfg.label.as_ref(),
                self.auxes.iter_mut().find(|a| a.number == cfg.channel),
            ) {
                if aux.label.is_none() {
                    aux.label = Some(label.clone());
                }
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            channels: self.channels.clone(),
            aux: self.auxes.clone(),
            values: self.values.clone(),
        }
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn auxes(&self) -> &[Aux] {
        &self.auxes
    }

    pub fn aux(&self, number: AuxNumber) -> Option<&Aux> {
        self.auxes.iter().find(|a| a.number == number)
    }

    pub fn value(&self, aux: AuxNumber, channel: ChannelNumber) -> Option<&ParamValue> {
        self.values.get(&ParamKey::new(aux, channel))
    }

    /// `true` if `(aux, channel)` is a configured send.
    pub fn has_send(&self, aux: AuxNumber, channel: ChannelNumber) -> bool {
        self.values.contains_key(&ParamKey::new(aux, channel))
    }

    /// Current values of every tracked channel's send into `aux`.
    ///
    /// Empty for an unknown aux.
    pub fn aux_values(&self, aux: AuxNumber) -> BTreeMap<ChannelNumber, ParamValue> {
        self.channels
            .iter()
            .filter_map(|c| {
                self.values
                    .get(&ParamKey::new(aux, c.number))
                    .map(|v| (c.number, *v))
            })
            .collect()
    }

    // ── Readiness ─────────────────────────────────────────────────────────────

    /// Number of scalars that must be loaded before the store is ready.
    pub fn total_scalars(&self) -> usize {
        self.total_scalars
    }

    /// Number of required scalars currently loaded.
    ///
    /// This rescans the whole store on every call instead of keeping a
    /// running counter.  The state is tens of channels by a handful of auxes,
    /// so a scan per loaded message is cheap; revisit if that grows by orders
    /// of magnitude.
    pub fn loaded_scalars(&self) -> usize {
        let channels = self
            .channels
            .iter()
            .filter(|c| c.configured && c.label.is_some())
            .count();
        let auxes = self.auxes.iter().filter(|a| a.label.is_some()).count();
        let values: usize = self.values.values().map(ParamValue::loaded_scalars).sum();
        channels + auxes + values
    }

    /// `true` once every configured label and send scalar has been loaded.
    pub fn is_ready(&self) -> bool {
        self.loaded_scalars() >= self.total_scalars
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
