// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 proxim contributors

//! Discovery orchestration state machine.
//!
//! Owns the per-transport discoverers, the peer registry and the
//! address-resolution coordinator, and presents the single start/stop/state
//! surface to the application.
//!
//! # Architecture
//! - One `parking_lot::Mutex<Core>` is the critical section: public calls
//!   lock it directly, and every asynchronous producer (radio callbacks,
//!   timers, settings changes) posts a [`DiscoveryEvent`] that a single
//!   pump thread applies under the same lock. State transitions are never
//!   concurrent.
//! - Listener notifications leave through a dedicated delivery thread
//!   ([`dispatch::NotificationDispatcher`]), so callbacks can re-enter
//!   `start`/`stop` without deadlocking. The one synchronous listener call
//!   is [`DiscoveryListener::on_permission_check`], which therefore must
//!   not call back into the orchestrator.
//!
//! # Thread Safety
//! - `start`/`stop` are serialized against each other and against event
//!   processing.
//! - A timer expiry racing a `stop()` finds its resources already released
//!   and degrades to a no-op.

pub mod dispatch;
pub(crate) mod timer;

use crate::beacon::{BeaconDiscoverer, BeaconEvent};
use crate::config::{DiscoverySettings, SettingsChange, SettingsSnapshot};
use crate::enumerator::DeviceEnumerator;
use crate::events::{event_channel, DiscoveryEvent, EventSink};
use crate::peer::{
    DiscoveryState, HardwareAddress, PeerDescriptor, PeerId, ResolutionToken, ServiceId,
    TransportKind, NO_PEER_NAME,
};
use crate::registry::{PeerEvent, PeerRegistry};
use crate::resolution::{AddressResolutionCoordinator, ProvideResult};
use crate::service::{self, LocalServiceDiscoverer};
use crate::transport::{Capability, Transports};
use parking_lot::Mutex;
use self::dispatch::{Notification, NotificationDispatcher};
use self::timer::PeriodicTimer;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Callbacks surfaced to the embedding application.
///
/// All methods except [`Self::on_permission_check`] are delivered on a
/// dedicated notification thread and may freely call back into the
/// orchestrator. `on_permission_check` is invoked synchronously during
/// startup and must not re-enter.
pub trait DiscoveryListener: Send + Sync {
    /// Confirm a capability before a transport starts. Return false to
    /// deny; the affected transport then counts as failed for this cycle.
    fn on_permission_check(&self, _capability: Capability) -> bool {
        true
    }

    fn on_state_changed(&self, _state: DiscoveryState) {}

    fn on_peer_discovered(&self, _peer: PeerDescriptor) {}

    /// A known peer gained data (missing fields filled in). Never called
    /// when data would be lost.
    fn on_peer_updated(&self, _peer: PeerDescriptor) {}

    fn on_peer_lost(&self, _peer: PeerDescriptor) {}

    /// Our own hardware address was resolved via the assist protocol.
    fn on_own_address_resolved(&self, _address: HardwareAddress) {}

    /// A nearby device asked for its address and automation is off: the
    /// application decides whether to assist.
    fn on_resolution_request(&self, _token: ResolutionToken) {}

    /// A provider is ready to enumerate us and automation is off: the
    /// application should make the device discoverable.
    fn on_peer_ready_to_provide(&self, _token: ResolutionToken) {}

    /// A provider-side assist operation finished. `completed` is
    /// informational; discovery re-enters `start` either way.
    fn on_provide_address_result(&self, _token: ResolutionToken, _completed: bool) {}
}

/// Mutable orchestrator state; lives behind the critical-section mutex.
struct Core {
    state: DiscoveryState,
    should_be_running: bool,
    my_peer_id: Option<PeerId>,
    my_peer_name: String,
    missing_permission: Option<Capability>,
    beacon_radio_enabled: bool,
    service_radio_enabled: bool,
    beacon: Option<BeaconDiscoverer>,
    service: Option<LocalServiceDiscoverer>,
    enumerator: DeviceEnumerator,
    resolution: AddressResolutionCoordinator,
    sweep: Option<PeriodicTimer>,
    last_discoverable: Option<(Instant, Duration)>,
}

struct Inner {
    core: Mutex<Core>,
    registry: PeerRegistry,
    settings: Arc<DiscoverySettings>,
    transports: Transports,
    listener: Arc<dyn DiscoveryListener>,
    dispatcher: NotificationDispatcher,
    sink: EventSink,
    primary_id: ServiceId,
    service_type: String,
}

/// The top-level discovery state machine.
///
/// Construct one per application with the transports, listener and settings
/// it should own; teardown is tied to its lifetime (threads join on drop).
pub struct DiscoveryOrchestrator {
    inner: Arc<Inner>,
    pump: Option<JoinHandle<()>>,
}

impl DiscoveryOrchestrator {
    /// Build the orchestrator and spawn its event pump and notification
    /// threads. Nothing touches a radio until `start`.
    pub fn new(
        transports: Transports,
        listener: Arc<dyn DiscoveryListener>,
        service_id: ServiceId,
        service_type: impl Into<String>,
        settings: Arc<DiscoverySettings>,
    ) -> Self {
        let (sink, rx) = event_channel();
        settings.bind_sink(sink.clone());

        let inner = Arc::new(Inner {
            core: Mutex::new(Core {
                state: DiscoveryState::NotStarted,
                should_be_running: false,
                my_peer_id: None,
                my_peer_name: NO_PEER_NAME.to_string(),
                missing_permission: None,
                beacon_radio_enabled: true,
                service_radio_enabled: true,
                beacon: None,
                service: None,
                enumerator: DeviceEnumerator::new(Arc::clone(&transports.scanner), sink.clone()),
                resolution: AddressResolutionCoordinator::new(),
                sweep: None,
                last_discoverable: None,
            }),
            registry: PeerRegistry::new(),
            settings,
            transports,
            dispatcher: NotificationDispatcher::start(Arc::clone(&listener)),
            listener,
            sink: sink.clone(),
            primary_id: service_id,
            service_type: service_type.into(),
        });

        let pump_inner = Arc::clone(&inner);
        let pump = std::thread::Builder::new()
            .name("proxim-pump".to_string())
            .spawn(move || {
                while let Ok(event) = rx.recv() {
                    if matches!(event, DiscoveryEvent::Shutdown) {
                        break;
                    }
                    pump_inner.handle_event(event);
                }
            })
            .ok();

        if pump.is_none() {
            log::error!("[orchestrator] Failed to spawn event pump thread");
        }

        Self { inner, pump }
    }

    /// Sink for the embedder to wire transport deliveries into.
    pub fn sink(&self) -> EventSink {
        self.inner.sink.clone()
    }

    /// Primary service identifier (peer presence channel).
    pub fn primary_service_id(&self) -> ServiceId {
        self.inner.primary_id
    }

    /// Secondary service identifier (assist loop-back channel).
    pub fn assist_service_id(&self) -> ServiceId {
        self.inner.primary_id.secondary()
    }

    pub fn settings(&self) -> Arc<DiscoverySettings> {
        Arc::clone(&self.inner.settings)
    }

    pub fn state(&self) -> DiscoveryState {
        self.inner.core.lock().state
    }

    /// True when running regardless of which transports carry the session.
    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    /// Capability most recently denied by the listener, if any.
    pub fn missing_permission(&self) -> Option<Capability> {
        self.inner.core.lock().missing_permission
    }

    /// Snapshot of currently known peers.
    pub fn peers(&self) -> Vec<PeerDescriptor> {
        self.inner.registry.snapshot()
    }

    /// Start discovery with an explicit identity and display name.
    ///
    /// Returns true if started (or already running). Fails fast with state
    /// unchanged when no mode is configured or the identity is invalid.
    pub fn start(&self, peer_id: &str, peer_name: &str) -> bool {
        let Some(id) = PeerId::new(peer_id) else {
            log::error!("[orchestrator] start: Invalid peer identity {:?}", peer_id);
            return false;
        };
        let mut core = self.inner.core.lock();
        self.inner
            .start_locked(&mut core, Some(id), peer_name.to_string())
    }

    /// Start discovery using the known hardware address as the identity.
    /// With the address still unknown, beacon discovery starts in
    /// resolution mode and the identity is assigned once resolved.
    pub fn start_with_name(&self, peer_name: &str) -> bool {
        let mut core = self.inner.core.lock();
        let id = derived_identity(&self.inner.settings.snapshot());
        self.inner
            .start_locked(&mut core, id, peer_name.to_string())
    }

    /// Start discovery with no display name. For applications relying on
    /// beacon discovery only.
    pub fn start_unnamed(&self) -> bool {
        self.start_with_name(NO_PEER_NAME)
    }

    /// Stop discovery: tear down both transports and the enumerator, clear
    /// the registry, cancel all timers. Idempotent.
    pub fn stop(&self) {
        let mut core = self.inner.core.lock();
        self.inner.stop_locked(&mut core);
    }

    /// Re-add a peer known to be alive (e.g. one with an open connection
    /// that expired from the registry), or merge externally obtained data.
    pub fn add_or_update_discovered_peer(&self, descriptor: PeerDescriptor) {
        log::info!("[orchestrator] add_or_update_discovered_peer: {}", descriptor.id);
        // Lock ordering: registry mutations initiated by callers serialize
        // with event processing like any other mutation.
        let _core = self.inner.core.lock();
        self.inner.apply_peer_event(self.inner.registry.add_or_update(descriptor));
    }

    /// Make the device enumerable for the given duration, rate-limited:
    /// calls landing inside the previous grant's window are suppressed.
    pub fn make_discoverable(&self, duration: Duration) -> bool {
        let mut core = self.inner.core.lock();
        let now = Instant::now();
        if let Some((granted_at, granted_for)) = core.last_discoverable {
            if now < granted_at + granted_for {
                log::debug!("[orchestrator] make_discoverable: previous grant still active");
                return false;
            }
        }
        core.last_discoverable = Some((now, duration));
        self.inner.transports.service.make_discoverable(duration)
    }
}

impl Drop for DiscoveryOrchestrator {
    fn drop(&mut self) {
        self.stop();
        self.inner.settings.unbind_sink();
        self.inner.sink.post(DiscoveryEvent::Shutdown);
        if let Some(pump) = self.pump.take() {
            let _ = pump.join();
        }
    }
}

/// Identity derived from the persisted hardware address, if known.
fn derived_identity(snapshot: &SettingsSnapshot) -> Option<PeerId> {
    snapshot
        .hardware_address
        .and_then(|address| PeerId::new(address.to_string()))
}

impl Inner {
    // ========================================================================
    // Lifecycle (under the critical section)
    // ========================================================================

    fn set_state(&self, core: &mut Core, state: DiscoveryState) {
        if core.state != state {
            log::debug!("[orchestrator] State: {:?} -> {:?}", core.state, state);
            core.state = state;
            self.dispatcher.post(Notification::StateChanged(state));
        }
    }

    fn start_locked(&self, core: &mut Core, id: Option<PeerId>, name: String) -> bool {
        let snapshot = self.settings.snapshot();
        let mode = snapshot.discovery_mode;

        if mode == crate::peer::DiscoveryMode::NotSet {
            log::error!("[orchestrator] start: Discovery mode not set, call set_discovery_mode() first");
            return false;
        }

        log::info!(
            "[orchestrator] start: id={:?} name={:?} mode={:?}",
            id.as_ref().map(PeerId::as_str),
            name,
            mode
        );

        core.should_be_running = true;
        core.my_peer_id = id.or_else(|| derived_identity(&snapshot));
        core.my_peer_name = name;

        let mut beacon_started = false;
        let mut service_started = false;

        if mode.uses_beacon() {
            if core.beacon_radio_enabled {
                // Classic enumeration must never overlap the scan role.
                core.enumerator.stop();
                beacon_started = self.start_beacon(core, &snapshot);
            } else {
                log::error!(
                    "[orchestrator] start: Cannot start beacon discovery, radio is disabled"
                );
            }
        }

        if mode.uses_local_service() {
            if core.service_radio_enabled {
                match core.my_peer_id.clone() {
                    Some(peer_id) => {
                        service_started = self.start_service(core, &peer_id, &snapshot);
                    }
                    None => log::error!(
                        "[orchestrator] start: No identity for service advertisement (address unknown)"
                    ),
                }
            } else {
                log::error!(
                    "[orchestrator] start: Cannot start local-service discovery, radio is disabled"
                );
            }
        }

        if beacon_started || service_started {
            if beacon_started && snapshot.hardware_address.is_none() {
                log::info!("[orchestrator] start: Own hardware address is not known");
                let Core {
                    beacon, resolution, ..
                } = &mut *core;
                if let Some(beacon) = beacon.as_mut() {
                    resolution.begin_request(beacon);
                }
                self.set_state(core, DiscoveryState::WaitingForOwnAddress);
            } else if beacon_started && service_started {
                self.set_state(core, DiscoveryState::RunningBoth);
            } else if beacon_started {
                self.set_state(core, DiscoveryState::RunningBeacon);
            } else {
                self.set_state(core, DiscoveryState::RunningLocalService);
            }

            if core.sweep.is_none() {
                core.sweep = Some(PeriodicTimer::start(
                    "sweep",
                    snapshot.sweep_interval,
                    self.sink.clone(),
                    DiscoveryEvent::SweepTick,
                ));
            }

            log::info!("[orchestrator] start: OK ({:?})", core.state);
        }

        core.state.is_running()
    }

    fn start_beacon(&self, core: &mut Core, snapshot: &SettingsSnapshot) -> bool {
        if !self.listener.on_permission_check(Capability::ProximityScan) {
            core.missing_permission = Some(Capability::ProximityScan);
            log::error!("[orchestrator] start: Capability ProximityScan denied");
            return false;
        }
        core.missing_permission = None;

        let name = core.my_peer_name.clone();
        let address = snapshot.hardware_address;
        let beacon = core.beacon.get_or_insert_with(|| {
            BeaconDiscoverer::new(
                Arc::clone(&self.transports.beacon),
                self.sink.clone(),
                self.primary_id,
                name,
                address,
            )
        });
        beacon.start(
            snapshot.advertise,
            snapshot.scan_duty_cycle,
            snapshot.scan_report_delay,
        )
    }

    fn start_service(
        &self,
        core: &mut Core,
        peer_id: &PeerId,
        snapshot: &SettingsSnapshot,
    ) -> bool {
        let identity = service::encode_identity(peer_id, &core.my_peer_name);
        let discoverer = core.service.get_or_insert_with(|| {
            LocalServiceDiscoverer::new(
                Arc::clone(&self.transports.service),
                self.sink.clone(),
                self.service_type.clone(),
            )
        });
        discoverer.start(
            identity,
            snapshot.service_watchdog_timeout,
            snapshot.service_watchdog_tick,
        )
    }

    /// Tear down transports and assist operations but keep the registry and
    /// listener wiring. Does not notify a state change by itself.
    fn stop_for_restart(&self, core: &mut Core) {
        if core.state != DiscoveryState::NotStarted {
            log::debug!("[orchestrator] stop_for_restart");
        }
        let Core {
            beacon,
            resolution,
            enumerator,
            ..
        } = &mut *core;
        resolution.stop_all(beacon.as_mut(), enumerator);
        if let Some(mut beacon) = core.beacon.take() {
            beacon.stop();
        }
        if let Some(mut service) = core.service.take() {
            service.stop();
        }
    }

    fn stop_locked(&self, core: &mut Core) {
        if core.state != DiscoveryState::NotStarted {
            log::info!("[orchestrator] stop: Stopping peer discovery...");
        }
        core.should_be_running = false;
        self.stop_for_restart(core);
        core.enumerator.stop();
        if let Some(sweep) = core.sweep.take() {
            sweep.stop();
        }
        self.registry.clear();
        self.set_state(core, DiscoveryState::NotStarted);
    }

    /// Re-enter `start` if the session is still expected to run, otherwise
    /// settle in `NotStarted`. Used after every assist outcome.
    fn restart_or_idle(&self, core: &mut Core) {
        self.stop_for_restart(core);
        if core.should_be_running {
            let id = core.my_peer_id.clone();
            let name = core.my_peer_name.clone();
            self.start_locked(core, id, name);
        } else {
            self.set_state(core, DiscoveryState::NotStarted);
        }
    }

    // ========================================================================
    // Event pump
    // ========================================================================

    fn handle_event(&self, event: DiscoveryEvent) {
        match event {
            DiscoveryEvent::BeaconFrame {
                service_id,
                payload,
            } => self.on_beacon_frame(service_id, &payload),
            DiscoveryEvent::ServiceFound { identity } => self.on_service_found(&identity),
            DiscoveryEvent::DeviceListChanged { device_count } => {
                let mut core = self.core.lock();
                if let Some(service) = core.service.as_mut() {
                    service.note_device_activity(device_count);
                }
            }
            DiscoveryEvent::DeviceEnumerated { address } => self.on_device_enumerated(address),
            DiscoveryEvent::RadioAvailability { transport, enabled } => {
                self.on_radio_availability(transport, enabled);
            }
            DiscoveryEvent::AddressAdvertFinished => self.on_address_advert_finished(),
            DiscoveryEvent::EnumerationTimeout => self.on_enumeration_timeout(),
            DiscoveryEvent::SweepTick => self.on_sweep_tick(),
            DiscoveryEvent::WatchdogTick => self.on_watchdog_tick(),
            DiscoveryEvent::SettingsChanged(change) => self.on_settings_changed(change),
            DiscoveryEvent::Shutdown => {}
        }
    }

    fn apply_peer_event(&self, event: Option<PeerEvent>) {
        match event {
            Some(PeerEvent::Added(peer)) => {
                self.dispatcher.post(Notification::PeerDiscovered(peer));
            }
            Some(PeerEvent::Updated(peer)) => {
                self.dispatcher.post(Notification::PeerUpdated(peer));
            }
            Some(PeerEvent::Expired(peer)) => {
                self.dispatcher.post(Notification::PeerLost(peer));
            }
            None => {}
        }
    }

    fn on_beacon_frame(&self, service_id: ServiceId, payload: &[u8]) {
        let mut core = self.core.lock();
        let Some(beacon) = core.beacon.as_ref() else {
            return; // late frame after teardown
        };
        match beacon.classify(service_id, payload) {
            Some(BeaconEvent::PeerDiscovered(descriptor)) => {
                self.apply_peer_event(self.registry.add_or_update(descriptor));
            }
            Some(BeaconEvent::ResolveRequest(token)) => {
                if core.resolution.is_outstanding(token) {
                    // Our own request echoed back by the radio.
                    return;
                }
                self.on_provide_address_request(&mut core, token);
            }
            Some(BeaconEvent::ReadyToProvide(token)) => {
                self.on_peer_ready_to_provide(&mut core, token);
            }
            Some(BeaconEvent::AddressDelivery { token, address }) => {
                self.on_address_delivery(&mut core, token, address);
            }
            None => {}
        }
    }

    fn on_service_found(&self, identity: &str) {
        let core = self.core.lock();
        if !core.service.as_ref().map_or(false, |s| s.is_started()) {
            return;
        }
        match service::parse_identity(identity) {
            Some(descriptor) => {
                self.apply_peer_event(self.registry.add_or_update(descriptor));
            }
            None => log::debug!("[orchestrator] Unparseable service identity {:?}", identity),
        }
    }

    // ========================================================================
    // Assist protocol ("Bro Mode")
    // ========================================================================

    fn on_provide_address_request(&self, core: &mut Core, token: ResolutionToken) {
        let snapshot = self.settings.snapshot();
        if !snapshot.automate_resolution {
            log::debug!("[orchestrator] Surfacing resolution request {}", token);
            self.dispatcher.post(Notification::ResolutionRequest(token));
            return;
        }

        if core.resolution.is_providing() {
            // Duplicate or competing request; coordinator logs and ignores.
            let Core {
                beacon,
                enumerator,
                resolution,
                ..
            } = &mut *core;
            if let Some(beacon) = beacon.as_mut() {
                resolution.begin_provide(token, beacon, enumerator, snapshot.provide_address_timeout);
            }
            return;
        }

        let started = {
            let Core {
                beacon,
                enumerator,
                resolution,
                ..
            } = &mut *core;
            match beacon.as_mut() {
                Some(beacon) => resolution.begin_provide(
                    token,
                    beacon,
                    enumerator,
                    snapshot.provide_address_timeout,
                ),
                None => return,
            }
        };
        if started {
            self.set_state(core, DiscoveryState::ProvidingAddressToPeer);
        } else {
            log::error!(
                "[orchestrator] Failed to start the provide-address mode for {}",
                token
            );
        }
    }

    fn on_peer_ready_to_provide(&self, core: &mut Core, token: ResolutionToken) {
        if !core.resolution.is_outstanding(token) {
            log::debug!("[orchestrator] Ready signal for foreign token {}", token);
            return;
        }
        let snapshot = self.settings.snapshot();
        if snapshot.automate_resolution {
            core.resolution.begin_receive(
                token,
                self.transports.service.as_ref(),
                snapshot.discoverable_duration,
            );
        } else {
            self.dispatcher.post(Notification::PeerReadyToProvide(token));
        }
    }

    fn on_address_delivery(&self, core: &mut Core, token: ResolutionToken, address: HardwareAddress) {
        let resolved = {
            let Core {
                beacon, resolution, ..
            } = &mut *core;
            match beacon.as_mut() {
                Some(beacon) => resolution.on_address_delivery(token, address, beacon),
                None => return,
            }
        };
        let Some(address) = resolved else { return };

        self.settings.set_hardware_address(address);
        if core.my_peer_id.is_none() {
            core.my_peer_id = PeerId::new(address.to_string());
        }
        self.dispatcher.post(Notification::OwnAddressResolved(address));
        self.restart_or_idle(core);
    }

    fn on_device_enumerated(&self, address: HardwareAddress) {
        let mut core = self.core.lock();
        log::debug!("[orchestrator] Device enumerated: {}", address);
        let snapshot = self.settings.snapshot();
        let result = {
            let Core {
                beacon,
                enumerator,
                resolution,
                ..
            } = &mut *core;
            let Some(beacon) = beacon.as_mut() else {
                return;
            };
            resolution.on_device_enumerated(
                address,
                beacon,
                enumerator,
                snapshot.resolve_advert_duration,
            )
        };
        if let Some(result) = result {
            self.finish_provide(&mut core, result);
        }
    }

    fn on_address_advert_finished(&self) {
        let mut core = self.core.lock();
        let finished = {
            let Core {
                beacon, resolution, ..
            } = &mut *core;
            beacon
                .as_mut()
                .and_then(|b| b.on_address_advert_finished())
                .and_then(|token| resolution.on_advert_finished(token))
        };
        if let Some(result) = finished {
            self.finish_provide(&mut core, result);
        }
    }

    fn on_enumeration_timeout(&self) {
        let mut core = self.core.lock();
        let result = {
            let Core {
                beacon,
                enumerator,
                resolution,
                ..
            } = &mut *core;
            match beacon.as_mut() {
                Some(beacon) => resolution.on_enumeration_timeout(beacon, enumerator),
                None => None,
            }
        };
        if let Some(result) = result {
            self.finish_provide(&mut core, result);
        }
    }

    fn finish_provide(&self, core: &mut Core, result: ProvideResult) {
        log::info!(
            "[orchestrator] Provide-address operation {} {}",
            result.token,
            if result.completed { "completed" } else { "not completed" }
        );
        self.dispatcher.post(Notification::ProvideAddressResult {
            token: result.token,
            completed: result.completed,
        });
        self.restart_or_idle(core);
    }

    // ========================================================================
    // Availability, sweep, watchdog, settings
    // ========================================================================

    fn on_radio_availability(&self, transport: TransportKind, enabled: bool) {
        let mut core = self.core.lock();
        let mode = self.settings.snapshot().discovery_mode;
        match transport {
            TransportKind::Beacon => core.beacon_radio_enabled = enabled,
            TransportKind::LocalService => core.service_radio_enabled = enabled,
        }
        let affects_session = match transport {
            TransportKind::Beacon => mode.uses_beacon(),
            TransportKind::LocalService => mode.uses_local_service(),
        };
        if !affects_session {
            return;
        }
        log::info!(
            "[orchestrator] Radio availability: {:?} enabled={}",
            transport,
            enabled
        );

        if enabled {
            if core.should_be_running && !core.resolution.is_providing() {
                log::info!("[orchestrator] Radio enabled, restarting discovery...");
                let id = core.my_peer_id.clone();
                let name = core.my_peer_name.clone();
                self.start_locked(&mut core, id, name);
            }
            return;
        }

        if core.state == DiscoveryState::WaitingForServicesEnabled {
            return;
        }

        // Pause the affected transport; peers are kept.
        match transport {
            TransportKind::Beacon => {
                log::warn!("[orchestrator] Beacon radio disabled, pausing beacon discovery...");
                let Core {
                    beacon,
                    resolution,
                    enumerator,
                    ..
                } = &mut *core;
                resolution.stop_all(beacon.as_mut(), enumerator);
                if let Some(mut beacon) = core.beacon.take() {
                    beacon.stop();
                }
                if !mode.uses_local_service() || !core.service_radio_enabled {
                    self.set_state(&mut core, DiscoveryState::WaitingForServicesEnabled);
                } else if core.state.is_running() {
                    self.set_state(&mut core, DiscoveryState::RunningLocalService);
                }
            }
            TransportKind::LocalService => {
                log::warn!(
                    "[orchestrator] Service radio disabled, pausing local-service discovery..."
                );
                if let Some(mut service) = core.service.take() {
                    service.stop();
                }
                if !mode.uses_beacon() || !core.beacon_radio_enabled {
                    self.set_state(&mut core, DiscoveryState::WaitingForServicesEnabled);
                } else if core.state == DiscoveryState::RunningBoth {
                    self.set_state(&mut core, DiscoveryState::RunningBeacon);
                }
            }
        }
    }

    fn on_sweep_tick(&self) {
        let core = self.core.lock();
        if core.state == DiscoveryState::NotStarted {
            return; // tick racing a stop
        }
        let ttl = self.settings.snapshot().peer_expiration;
        for event in self.registry.remove_expired(Instant::now(), ttl) {
            self.apply_peer_event(Some(event));
        }
    }

    fn on_watchdog_tick(&self) {
        let mut core = self.core.lock();
        let Some(service) = core.service.as_mut() else {
            return;
        };
        if !service.watchdog_expired(Instant::now()) {
            return;
        }
        // Stuck enumeration: declare service-sourced peers lost and rebuild
        // the component from scratch.
        for event in self.registry.remove_by_source(TransportKind::LocalService) {
            self.apply_peer_event(Some(event));
        }
        service.restart();
    }

    fn on_settings_changed(&self, change: SettingsChange) {
        let mut core = self.core.lock();
        match change {
            SettingsChange::Mode => {
                if core.state != DiscoveryState::NotStarted {
                    log::info!("[orchestrator] Discovery mode changed, restarting...");
                    self.stop_for_restart(&mut core);
                    let id = core.my_peer_id.clone();
                    let name = core.my_peer_name.clone();
                    self.start_locked(&mut core, id, name);
                }
            }
            SettingsChange::PeerExpiration => {
                // Re-evaluate immediately under the new TTL.
                let ttl = self.settings.snapshot().peer_expiration;
                for event in self.registry.remove_expired(Instant::now(), ttl) {
                    self.apply_peer_event(Some(event));
                }
            }
            SettingsChange::AdvertiseParams | SettingsChange::ScanParams => {
                let snapshot = self.settings.snapshot();
                if let Some(beacon) = core.beacon.as_mut() {
                    beacon.apply_settings(
                        snapshot.advertise,
                        snapshot.scan_duty_cycle,
                        snapshot.scan_report_delay,
                    );
                }
            }
            SettingsChange::AutomateResolution => {
                // Read from the snapshot at the next protocol event.
            }
        }
    }
}
