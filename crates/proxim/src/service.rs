// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 proxim contributors

//! Local-service transport discoverer.
//!
//! Combines a service advertiser (our identity string under the shared
//! service type), a service watcher (remote devices offering matching
//! services) and a raw device-list watcher. A watchdog guards against the
//! underlying enumeration getting stuck silently: with no device-list
//! activity before the timeout, the orchestrator declares all
//! service-sourced peers lost and restarts this component from scratch.

use crate::events::{DiscoveryEvent, EventSink};
use crate::orchestrator::timer::PeriodicTimer;
use crate::peer::{PeerDescriptor, PeerId, TransportKind};
use crate::transport::ServiceRadio;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Separator between the id and name parts of an advertised identity
/// string. Identities are length-bounded and the separator cannot occur in
/// a valid peer id, so a plain split is unambiguous.
const IDENTITY_SEPARATOR: char = '\n';

/// Encode a peer identity for service advertisement.
pub fn encode_identity(id: &PeerId, name: &str) -> String {
    if name.is_empty() {
        id.to_string()
    } else {
        format!("{}{}{}", id, IDENTITY_SEPARATOR, name)
    }
}

/// Decode a remote identity string into a service-sourced peer descriptor.
pub fn parse_identity(identity: &str) -> Option<PeerDescriptor> {
    let mut parts = identity.splitn(2, IDENTITY_SEPARATOR);
    let id = PeerId::new(parts.next()?)?;
    let descriptor = PeerDescriptor::new(id, TransportKind::LocalService);
    Some(match parts.next() {
        Some(name) => descriptor.with_name(name),
        None => descriptor,
    })
}

/// Drives the local-service transport: advertise + watch + watchdog.
pub struct LocalServiceDiscoverer {
    radio: Arc<dyn ServiceRadio>,
    sink: EventSink,
    service_type: String,
    identity: String,
    started: bool,
    watchdog: Option<PeriodicTimer>,
    watchdog_timeout: Duration,
    watchdog_tick: Duration,
    last_activity: Instant,
}

impl LocalServiceDiscoverer {
    pub fn new(radio: Arc<dyn ServiceRadio>, sink: EventSink, service_type: String) -> Self {
        Self {
            radio,
            sink,
            service_type,
            identity: String::new(),
            started: false,
            watchdog: None,
            watchdog_timeout: Duration::ZERO,
            watchdog_tick: Duration::ZERO,
            last_activity: Instant::now(),
        }
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Start advertiser, watcher and watchdog. Idempotent.
    pub fn start(
        &mut self,
        identity: String,
        watchdog_timeout: Duration,
        watchdog_tick: Duration,
    ) -> bool {
        if self.started {
            return true;
        }

        if !self.radio.start_advertise(&identity, &self.service_type) {
            log::error!("[service] Advertiser failed to start");
            return false;
        }
        if !self.radio.start_watch(&self.service_type) {
            log::error!("[service] Watcher failed to start");
            self.radio.stop_advertise();
            return false;
        }

        self.identity = identity;
        self.watchdog_timeout = watchdog_timeout;
        self.watchdog_tick = watchdog_tick;
        self.last_activity = Instant::now();
        self.watchdog = Some(PeriodicTimer::start(
            "service-watchdog",
            watchdog_tick,
            self.sink.clone(),
            DiscoveryEvent::WatchdogTick,
        ));
        self.started = true;
        log::info!("[service] Started ({})", self.service_type);
        true
    }

    /// Tear down advertiser, watcher and watchdog. Safe from any state.
    pub fn stop(&mut self) {
        if let Some(watchdog) = self.watchdog.take() {
            watchdog.stop();
        }
        if self.started {
            self.radio.stop_advertise();
            self.radio.stop_watch();
            self.started = false;
            log::info!("[service] Stopped");
        }
    }

    /// Record raw device-list activity. Non-empty lists reset the watchdog
    /// deadline; an empty list is just logged (the watchdog decides when
    /// peers are actually gone).
    pub fn note_device_activity(&mut self, device_count: usize) {
        if device_count > 0 {
            self.last_activity = Instant::now();
        } else {
            log::warn!("[service] Device-list change with no devices");
        }
    }

    /// Check the watchdog deadline on a tick. Returns true when the
    /// component should be declared stuck (caller clears service-sourced
    /// peers and calls [`Self::restart`]).
    pub fn watchdog_expired(&self, now: Instant) -> bool {
        self.started
            && now.saturating_duration_since(self.last_activity) > self.watchdog_timeout
    }

    /// Full stop/start cycle with the same identity, after a watchdog trip.
    pub fn restart(&mut self) -> bool {
        let identity = std::mem::take(&mut self.identity);
        let (timeout, tick) = (self.watchdog_timeout, self.watchdog_tick);
        log::warn!("[service] Watchdog expired, restarting from scratch");
        self.stop();
        self.start(identity, timeout, tick)
    }

    /// Pass-through to the transport's discoverability window.
    pub fn make_discoverable(&self, duration: Duration) -> bool {
        self.radio.make_discoverable(duration)
    }
}
