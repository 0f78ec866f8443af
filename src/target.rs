//! # Target Network Manager
//!
//! Holds θ⁻, a lagged copy of the online parameters. Synchronization swaps
//! in a whole new snapshot behind an `Arc`, so a reader holding the previous
//! snapshot never observes a half-written parameter set.

use std::sync::Arc;

use tracing::debug;

use crate::network::QNetwork;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    /// θ⁻ equals θ as of the last sync and no online update has happened since
    Synced,
    /// θ has been updated after the last sync
    Stale,
}

#[derive(Clone, Debug)]
pub struct TargetNetwork<N> {
    params: Arc<N>,
    state: SyncState,
    last_synced_step: Option<u64>,
    syncs: usize,
}

impl<N: QNetwork> TargetNetwork<N> {
    /// Start as an exact copy of `online`
    pub fn new(online: &N) -> Self {
        TargetNetwork {
            params: Arc::new(online.clone()),
            state: SyncState::Synced,
            last_synced_step: None,
            syncs: 0,
        }
    }

    /// Replace θ⁻ wholesale with a copy of θ
    pub fn sync(&mut self, online: &N, step: u64) {
        let mut snapshot = (*self.params).clone();
        online.copy_parameters_to(&mut snapshot);
        self.params = Arc::new(snapshot);
        self.state = SyncState::Synced;
        self.last_synced_step = Some(step);
        self.syncs += 1;
        debug!(step, syncs = self.syncs, "target network synchronized");
    }

    /// Record that θ moved after the last sync
    pub fn mark_stale(&mut self) {
        self.state = SyncState::Stale;
    }

    pub fn network(&self) -> &N {
        &self.params
    }

    /// Shared handle to the current θ⁻; unaffected by later syncs
    pub fn snapshot(&self) -> Arc<N> {
        Arc::clone(&self.params)
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn last_synced_step(&self) -> Option<u64> {
        self.last_synced_step
    }

    pub fn sync_count(&self) -> usize {
        self.syncs
    }
}
