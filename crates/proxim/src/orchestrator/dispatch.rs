// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 proxim contributors

//! Listener notification delivery queue.
//!
//! Notifications are dispatched on a dedicated single-threaded queue,
//! decoupled from the orchestrator's critical section: a slow listener
//! callback cannot stall transport-event processing, and a listener that
//! calls back into `start`/`stop` cannot deadlock.
//!
//! The one exception is `on_permission_check`, which the orchestrator must
//! call synchronously during startup; it never goes through this queue.

use super::DiscoveryListener;
use crate::peer::{DiscoveryState, HardwareAddress, PeerDescriptor, ResolutionToken};
use crossbeam::channel::{unbounded, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

/// One queued listener callback.
#[derive(Debug, Clone)]
pub enum Notification {
    StateChanged(DiscoveryState),
    PeerDiscovered(PeerDescriptor),
    PeerUpdated(PeerDescriptor),
    PeerLost(PeerDescriptor),
    OwnAddressResolved(HardwareAddress),
    ResolutionRequest(ResolutionToken),
    PeerReadyToProvide(ResolutionToken),
    ProvideAddressResult {
        token: ResolutionToken,
        completed: bool,
    },
    /// Internal sentinel: drain and exit.
    Shutdown,
}

/// Owns the delivery thread for one listener.
pub struct NotificationDispatcher {
    tx: Sender<Notification>,
    handle: Option<JoinHandle<()>>,
}

impl NotificationDispatcher {
    pub fn start(listener: Arc<dyn DiscoveryListener>) -> Self {
        let (tx, rx) = unbounded::<Notification>();

        let handle = std::thread::Builder::new()
            .name("proxim-dispatch".to_string())
            .spawn(move || {
                while let Ok(notification) = rx.recv() {
                    match notification {
                        Notification::StateChanged(state) => listener.on_state_changed(state),
                        Notification::PeerDiscovered(peer) => listener.on_peer_discovered(peer),
                        Notification::PeerUpdated(peer) => listener.on_peer_updated(peer),
                        Notification::PeerLost(peer) => listener.on_peer_lost(peer),
                        Notification::OwnAddressResolved(address) => {
                            listener.on_own_address_resolved(address);
                        }
                        Notification::ResolutionRequest(token) => {
                            listener.on_resolution_request(token);
                        }
                        Notification::PeerReadyToProvide(token) => {
                            listener.on_peer_ready_to_provide(token);
                        }
                        Notification::ProvideAddressResult { token, completed } => {
                            listener.on_provide_address_result(token, completed);
                        }
                        Notification::Shutdown => break,
                    }
                }
            })
            .ok();

        if handle.is_none() {
            log::error!("[dispatch] Failed to spawn notification thread");
        }

        Self { tx, handle }
    }

    /// Queue a notification. Never blocks the caller.
    pub fn post(&self, notification: Notification) {
        let _ = self.tx.send(notification);
    }
}

impl Drop for NotificationDispatcher {
    fn drop(&mut self) {
        let _ = self.tx.send(Notification::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
