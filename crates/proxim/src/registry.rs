// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 proxim contributors

//! Discovered-peer registry with TTL expiry.
//!
//! The registry is passive: it never spawns threads or timers. The
//! orchestrator drives the expiry sweep from its own periodic tick and
//! forwards the returned [`PeerEvent`]s to the listener.
//!
//! # Thread Safety
//! All mutations hold the write lock across the full merge, so a concurrent
//! reader never observes a partially-applied update.

use crate::peer::{PeerDescriptor, PeerId, TransportKind};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Registry change produced by a mutating operation.
#[derive(Debug, Clone)]
pub enum PeerEvent {
    /// First sighting of this identity.
    Added(PeerDescriptor),
    /// An existing entry gained data (never lost any).
    Updated(PeerDescriptor),
    /// Entry removed because its last sighting exceeded the TTL, or its
    /// source transport declared all peers lost.
    Expired(PeerDescriptor),
}

/// Holds discovered peers keyed by identity.
pub struct PeerRegistry {
    peers: RwLock<HashMap<PeerId, PeerDescriptor>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self {
            peers: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a new peer or merge a fresh sighting into an existing entry.
    ///
    /// Merge rules: non-empty fields of the sighting win; an existing
    /// hardware address is never overwritten by a sighting lacking one. The
    /// last-seen timestamp is refreshed regardless. Returns `Added` for a
    /// new identity, `Updated` when any field actually changed, `None` for
    /// a pure timestamp refresh.
    pub fn add_or_update(&self, sighting: PeerDescriptor) -> Option<PeerEvent> {
        let mut peers = self.peers.write();

        match peers.get_mut(&sighting.id) {
            None => {
                let descriptor = sighting.clone();
                peers.insert(sighting.id.clone(), sighting);
                Some(PeerEvent::Added(descriptor))
            }
            Some(existing) => {
                let mut changed = false;

                if let Some(name) = sighting.name {
                    if existing.name.as_deref() != Some(name.as_str()) {
                        existing.name = Some(name);
                        changed = true;
                    }
                }
                if let Some(address) = sighting.address {
                    if existing.address != Some(address) {
                        existing.address = Some(address);
                        changed = true;
                    }
                }
                if existing.source != sighting.source {
                    existing.source = sighting.source;
                    changed = true;
                }
                existing.last_seen = sighting.last_seen;

                changed.then(|| PeerEvent::Updated(existing.clone()))
            }
        }
    }

    pub fn get(&self, id: &PeerId) -> Option<PeerDescriptor> {
        self.peers.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }

    /// Cloned view of all entries, for iteration without holding the lock.
    pub fn snapshot(&self) -> Vec<PeerDescriptor> {
        self.peers.read().values().cloned().collect()
    }

    /// Remove every entry whose last sighting is older than `ttl`.
    ///
    /// Emits exactly one `Expired` event per removed entry; entries at or
    /// under the TTL are untouched.
    pub fn remove_expired(&self, now: Instant, ttl: Duration) -> Vec<PeerEvent> {
        let mut peers = self.peers.write();
        let expired: Vec<PeerId> = peers
            .iter()
            .filter(|(_, descriptor)| {
                now.saturating_duration_since(descriptor.last_seen) > ttl
            })
            .map(|(id, _)| id.clone())
            .collect();

        expired
            .into_iter()
            .filter_map(|id| peers.remove(&id))
            .map(PeerEvent::Expired)
            .collect()
    }

    /// Remove every entry whose current source is the given transport.
    ///
    /// Used when a transport declares its whole downstream peer list lost
    /// (local-service watchdog expiry).
    pub fn remove_by_source(&self, source: TransportKind) -> Vec<PeerEvent> {
        let mut peers = self.peers.write();
        let lost: Vec<PeerId> = peers
            .iter()
            .filter(|(_, descriptor)| descriptor.source == source)
            .map(|(id, _)| id.clone())
            .collect();

        lost.into_iter()
            .filter_map(|id| peers.remove(&id))
            .map(PeerEvent::Expired)
            .collect()
    }

    /// Drop all entries without emitting per-entry events. Used on full stop.
    pub fn clear(&self) {
        self.peers.write().clear();
    }
}

impl Default for PeerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
