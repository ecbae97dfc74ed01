// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 proxim contributors

//! Tagged discovery events and the inbox sink.
//!
//! Every asynchronous producer (radio callbacks injected by the embedder,
//! the timers, the settings object) posts a [`DiscoveryEvent`] through a
//! cloneable [`EventSink`]. A single pump thread drains the inbox and
//! applies each event under the orchestrator's critical section, so no
//! producer ever mutates shared state directly.

use crate::config::SettingsChange;
use crate::peer::{HardwareAddress, ServiceId, TransportKind};
use crossbeam::channel::{unbounded, Receiver, Sender};

/// One message in the orchestrator inbox.
#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    /// Raw advertisement observed by the beacon scan role.
    BeaconFrame {
        service_id: ServiceId,
        payload: Vec<u8>,
    },
    /// The service watcher resolved a remote service instance.
    ServiceFound { identity: String },
    /// The raw device-list watcher reported a change.
    DeviceListChanged { device_count: usize },
    /// Classic enumeration observed a nearby device.
    DeviceEnumerated { address: HardwareAddress },
    /// Platform radio availability flipped.
    RadioAvailability {
        transport: TransportKind,
        enabled: bool,
    },
    /// The bounded address advertisement ran its course.
    AddressAdvertFinished,
    /// Provider-side enumeration exceeded its bound without a result.
    EnumerationTimeout,
    /// Registry expiry sweep tick.
    SweepTick,
    /// Local-service watchdog tick.
    WatchdogTick,
    /// A settings field was hot-reloaded.
    SettingsChanged(SettingsChange),
    /// Internal sentinel: stop the pump thread.
    Shutdown,
}

/// Cloneable handle for posting events into the orchestrator inbox.
///
/// The embedder wires its radio callbacks to the typed methods; internal
/// timers use it too. Posting never blocks; events to an orchestrator that
/// is being torn down are silently dropped.
#[derive(Clone)]
pub struct EventSink {
    tx: Sender<DiscoveryEvent>,
}

/// Create an inbox channel. The receiver side is consumed by the
/// orchestrator's pump thread.
pub(crate) fn event_channel() -> (EventSink, Receiver<DiscoveryEvent>) {
    let (tx, rx) = unbounded();
    (EventSink { tx }, rx)
}

impl EventSink {
    pub(crate) fn post(&self, event: DiscoveryEvent) {
        // Send fails only when the pump side is gone (orchestrator dropped);
        // late radio callbacks are expected then and must not panic.
        let _ = self.tx.send(event);
    }

    /// Deliver a scan result from the beacon transport.
    pub fn beacon_frame(&self, service_id: ServiceId, payload: Vec<u8>) {
        self.post(DiscoveryEvent::BeaconFrame {
            service_id,
            payload,
        });
    }

    /// Deliver a resolved service instance from the service watcher.
    pub fn service_found(&self, identity: impl Into<String>) {
        self.post(DiscoveryEvent::ServiceFound {
            identity: identity.into(),
        });
    }

    /// Deliver a raw device-list change from the service transport.
    pub fn device_list_changed(&self, device_count: usize) {
        self.post(DiscoveryEvent::DeviceListChanged { device_count });
    }

    /// Deliver one enumerated device from the classic scanner.
    pub fn device_enumerated(&self, address: HardwareAddress) {
        self.post(DiscoveryEvent::DeviceEnumerated { address });
    }

    /// Report a platform radio being toggled on or off.
    pub fn radio_availability(&self, transport: TransportKind, enabled: bool) {
        self.post(DiscoveryEvent::RadioAvailability { transport, enabled });
    }

    pub(crate) fn settings_changed(&self, change: SettingsChange) {
        self.post(DiscoveryEvent::SettingsChanged(change));
    }
}
