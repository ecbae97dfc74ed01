// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 proxim contributors

//! Global configuration: protocol timing constants and runtime settings.
//!
//! This module centralizes the protocol's timing constants and the
//! hot-reloadable [`DiscoverySettings`] object. **Never hardcode the timing
//! values elsewhere!**
//!
//! # Architecture
//!
//! - **Level 1 (Static)**: compile-time constants (timeouts, tick rates)
//! - **Level 2 (Dynamic)**: `DiscoverySettings` for runtime config
//!
//! Settings reads are lock-free (`ArcSwap` snapshot); writes swap a new
//! snapshot and post a [`SettingsChange`] event into the orchestrator's
//! inbox, which reacts with a stop-for-restart cycle where required.

use crate::events::EventSink;
use crate::peer::{DiscoveryMode, HardwareAddress};
use crate::transport::{AdvertiseParams, AdvertisePower, ScanDutyCycle};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

// =======================================================================
// Protocol timing constants
// =======================================================================

/// How long a registry entry survives without a sighting before the sweep
/// removes it.
pub const DEFAULT_PEER_EXPIRATION: Duration = Duration::from_secs(60);

/// Registry sweep tick rate.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Bound on the provider-side advertisement that hands a resolved address
/// back to the requester. The underlying broadcast resource is released
/// automatically when this elapses.
pub const DEFAULT_RESOLVE_ADVERT_DURATION: Duration = Duration::from_secs(10);

/// Bound on the provider-side device enumeration pass.
pub const DEFAULT_PROVIDE_ADDRESS_TIMEOUT: Duration = Duration::from_secs(40);

/// Local-service discovery is declared stuck and restarted when no
/// device-list activity is seen for this long.
pub const DEFAULT_SERVICE_WATCHDOG_TIMEOUT: Duration = Duration::from_secs(60);

/// How often the local-service watchdog deadline is checked.
pub const DEFAULT_SERVICE_WATCHDOG_TICK: Duration = Duration::from_secs(10);

/// How long the requester stays enumerable while waiting for a provider.
pub const DEFAULT_DISCOVERABLE_DURATION: Duration = Duration::from_secs(120);

/// Which settings field changed, carried by the change event.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SettingsChange {
    Mode,
    PeerExpiration,
    AdvertiseParams,
    ScanParams,
    AutomateResolution,
}

/// Immutable settings snapshot. Obtain via [`DiscoverySettings::snapshot`];
/// never cache across events; hot-reload swaps the whole snapshot.
#[derive(Debug, Clone)]
pub struct SettingsSnapshot {
    pub discovery_mode: DiscoveryMode,
    pub peer_expiration: Duration,
    pub sweep_interval: Duration,
    pub advertise: AdvertiseParams,
    pub scan_duty_cycle: ScanDutyCycle,
    pub scan_report_delay: Duration,
    /// When true, assist requests and provider offers are serviced without
    /// surfacing manual callbacks to the listener.
    pub automate_resolution: bool,
    pub provide_address_timeout: Duration,
    pub resolve_advert_duration: Duration,
    pub service_watchdog_timeout: Duration,
    pub service_watchdog_tick: Duration,
    pub discoverable_duration: Duration,
    /// Our own hardware address, once known (resolved or platform-provided).
    pub hardware_address: Option<HardwareAddress>,
}

impl Default for SettingsSnapshot {
    fn default() -> Self {
        Self {
            discovery_mode: DiscoveryMode::NotSet,
            peer_expiration: DEFAULT_PEER_EXPIRATION,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            advertise: AdvertiseParams::default(),
            scan_duty_cycle: ScanDutyCycle::default(),
            scan_report_delay: Duration::ZERO,
            automate_resolution: true,
            provide_address_timeout: DEFAULT_PROVIDE_ADDRESS_TIMEOUT,
            resolve_advert_duration: DEFAULT_RESOLVE_ADVERT_DURATION,
            service_watchdog_timeout: DEFAULT_SERVICE_WATCHDOG_TIMEOUT,
            service_watchdog_tick: DEFAULT_SERVICE_WATCHDOG_TICK,
            discoverable_duration: DEFAULT_DISCOVERABLE_DURATION,
            hardware_address: None,
        }
    }
}

/// Runtime discovery settings with hot-reload.
///
/// Owned by the embedder and shared with one orchestrator. Mutators swap the
/// snapshot first, then post the change event, so a reader woken by the
/// event always observes the new values.
pub struct DiscoverySettings {
    snapshot: ArcSwap<SettingsSnapshot>,
    sink: Mutex<Option<EventSink>>,
}

impl DiscoverySettings {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            snapshot: ArcSwap::from_pointee(SettingsSnapshot::default()),
            sink: Mutex::new(None),
        })
    }

    /// Current snapshot (lock-free).
    pub fn snapshot(&self) -> Arc<SettingsSnapshot> {
        self.snapshot.load_full()
    }

    /// Wire change events into an orchestrator inbox. Called by the
    /// orchestrator constructor; changes made before binding are silent.
    pub(crate) fn bind_sink(&self, sink: EventSink) {
        *self.sink.lock() = Some(sink);
    }

    pub(crate) fn unbind_sink(&self) {
        *self.sink.lock() = None;
    }

    fn update(&self, change: SettingsChange, mutate: impl FnOnce(&mut SettingsSnapshot)) {
        let mut next = SettingsSnapshot::clone(&self.snapshot.load());
        mutate(&mut next);
        self.snapshot.store(Arc::new(next));

        if let Some(sink) = self.sink.lock().as_ref() {
            sink.settings_changed(change);
        }
    }

    pub fn set_discovery_mode(&self, mode: DiscoveryMode) {
        log::info!("[config] Discovery mode set to {:?}", mode);
        self.update(SettingsChange::Mode, |s| s.discovery_mode = mode);
    }

    pub fn set_peer_expiration(&self, ttl: Duration) {
        self.update(SettingsChange::PeerExpiration, |s| s.peer_expiration = ttl);
    }

    pub fn set_advertise_power(&self, power: AdvertisePower) {
        self.update(SettingsChange::AdvertiseParams, |s| {
            s.advertise = AdvertiseParams { power };
        });
    }

    pub fn set_scan_params(&self, duty_cycle: ScanDutyCycle, report_delay: Duration) {
        self.update(SettingsChange::ScanParams, |s| {
            s.scan_duty_cycle = duty_cycle;
            s.scan_report_delay = report_delay;
        });
    }

    pub fn set_automate_resolution(&self, automate: bool) {
        self.update(SettingsChange::AutomateResolution, |s| {
            s.automate_resolution = automate;
        });
    }

    /// Persist our own hardware address. Does not post a change event: the
    /// caller (the resolution flow) drives its own restart.
    pub fn set_hardware_address(&self, address: HardwareAddress) {
        if address.is_unknown() {
            log::warn!("[config] Refusing to persist an unknown hardware address");
            return;
        }
        let mut next = SettingsSnapshot::clone(&self.snapshot.load());
        next.hardware_address = Some(address);
        self.snapshot.store(Arc::new(next));
    }

    /// Test/bench hook: override the protocol timers wholesale.
    pub fn set_timing(
        &self,
        provide_address_timeout: Duration,
        resolve_advert_duration: Duration,
        service_watchdog_timeout: Duration,
        service_watchdog_tick: Duration,
        sweep_interval: Duration,
    ) {
        let mut next = SettingsSnapshot::clone(&self.snapshot.load());
        next.provide_address_timeout = provide_address_timeout;
        next.resolve_advert_duration = resolve_advert_duration;
        next.service_watchdog_timeout = service_watchdog_timeout;
        next.service_watchdog_tick = service_watchdog_tick;
        next.sweep_interval = sweep_interval;
        self.snapshot.store(Arc::new(next));
    }
}
