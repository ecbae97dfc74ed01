// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 proxim contributors

//! End-to-end discovery orchestration tests over mock transports.
//!
//! Covers the state machine transitions, the address-resolution assist
//! protocol in both roles, registry expiry and hot-reload behavior. Mock
//! radios record every command so the tests can assert on what actually
//! hit the (pretend) air.

use proxim::beacon::payload::AdvertisementFrame;
use proxim::{
    AdvertiseParams, BeaconRadio, Capability, DeviceScanner, DiscoveryListener, DiscoveryMode,
    DiscoveryOrchestrator, DiscoverySettings, DiscoveryState, HardwareAddress, PeerDescriptor,
    ResolutionToken, ScanFilter, ServiceId, ServiceRadio, TransportKind, Transports,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// ============================================================================
// Mock transports
// ============================================================================

struct MockBeacon {
    broadcast_ok: AtomicBool,
    scan_ok: AtomicBool,
    broadcasting: AtomicBool,
    scanning: AtomicBool,
    broadcasts: Mutex<Vec<Vec<u8>>>,
}

impl Default for MockBeacon {
    fn default() -> Self {
        Self {
            broadcast_ok: AtomicBool::new(true),
            scan_ok: AtomicBool::new(true),
            broadcasting: AtomicBool::new(false),
            scanning: AtomicBool::new(false),
            broadcasts: Mutex::new(Vec::new()),
        }
    }
}

impl BeaconRadio for MockBeacon {
    fn start_broadcast(&self, payload: &[u8], _params: &AdvertiseParams) -> bool {
        if !self.broadcast_ok.load(Ordering::Relaxed) {
            return false;
        }
        self.broadcasting.store(true, Ordering::Relaxed);
        self.broadcasts.lock().unwrap().push(payload.to_vec());
        true
    }
    fn stop_broadcast(&self) {
        self.broadcasting.store(false, Ordering::Relaxed);
    }
    fn start_scan(&self, _filter: &ScanFilter) -> bool {
        if !self.scan_ok.load(Ordering::Relaxed) {
            return false;
        }
        self.scanning.store(true, Ordering::Relaxed);
        true
    }
    fn stop_scan(&self) {
        self.scanning.store(false, Ordering::Relaxed);
    }
}

impl MockBeacon {
    fn last_broadcast(&self) -> Option<Vec<u8>> {
        self.broadcasts.lock().unwrap().last().cloned()
    }
}

struct MockService {
    advertise_ok: AtomicBool,
    watch_ok: AtomicBool,
    advertising: AtomicBool,
    watching: AtomicBool,
    discoverable_grants: Mutex<Vec<Duration>>,
}

impl Default for MockService {
    fn default() -> Self {
        Self {
            advertise_ok: AtomicBool::new(true),
            watch_ok: AtomicBool::new(true),
            advertising: AtomicBool::new(false),
            watching: AtomicBool::new(false),
            discoverable_grants: Mutex::new(Vec::new()),
        }
    }
}

impl ServiceRadio for MockService {
    fn start_advertise(&self, _identity: &str, _service_type: &str) -> bool {
        if !self.advertise_ok.load(Ordering::Relaxed) {
            return false;
        }
        self.advertising.store(true, Ordering::Relaxed);
        true
    }
    fn stop_advertise(&self) {
        self.advertising.store(false, Ordering::Relaxed);
    }
    fn start_watch(&self, _service_type: &str) -> bool {
        if !self.watch_ok.load(Ordering::Relaxed) {
            return false;
        }
        self.watching.store(true, Ordering::Relaxed);
        true
    }
    fn stop_watch(&self) {
        self.watching.store(false, Ordering::Relaxed);
    }
    fn make_discoverable(&self, duration: Duration) -> bool {
        self.discoverable_grants.lock().unwrap().push(duration);
        true
    }
}

struct MockScanner {
    ok: AtomicBool,
    running: AtomicBool,
}

impl Default for MockScanner {
    fn default() -> Self {
        Self {
            ok: AtomicBool::new(true),
            running: AtomicBool::new(false),
        }
    }
}

impl DeviceScanner for MockScanner {
    fn enumerate_devices(&self) -> bool {
        if !self.ok.load(Ordering::Relaxed) {
            return false;
        }
        self.running.store(true, Ordering::Relaxed);
        true
    }
    fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

// ============================================================================
// Recording listener
// ============================================================================

#[derive(Default)]
struct RecordingListener {
    deny_scan: AtomicBool,
    states: Mutex<Vec<DiscoveryState>>,
    discovered: Mutex<Vec<PeerDescriptor>>,
    updated: Mutex<Vec<PeerDescriptor>>,
    lost: Mutex<Vec<PeerDescriptor>>,
    resolved: Mutex<Vec<HardwareAddress>>,
    requests: Mutex<Vec<ResolutionToken>>,
    ready: Mutex<Vec<ResolutionToken>>,
    results: Mutex<Vec<(ResolutionToken, bool)>>,
}

impl DiscoveryListener for RecordingListener {
    fn on_permission_check(&self, _capability: Capability) -> bool {
        !self.deny_scan.load(Ordering::Relaxed)
    }
    fn on_state_changed(&self, state: DiscoveryState) {
        self.states.lock().unwrap().push(state);
    }
    fn on_peer_discovered(&self, peer: PeerDescriptor) {
        self.discovered.lock().unwrap().push(peer);
    }
    fn on_peer_updated(&self, peer: PeerDescriptor) {
        self.updated.lock().unwrap().push(peer);
    }
    fn on_peer_lost(&self, peer: PeerDescriptor) {
        self.lost.lock().unwrap().push(peer);
    }
    fn on_own_address_resolved(&self, address: HardwareAddress) {
        self.resolved.lock().unwrap().push(address);
    }
    fn on_resolution_request(&self, token: ResolutionToken) {
        self.requests.lock().unwrap().push(token);
    }
    fn on_peer_ready_to_provide(&self, token: ResolutionToken) {
        self.ready.lock().unwrap().push(token);
    }
    fn on_provide_address_result(&self, token: ResolutionToken, completed: bool) {
        self.results.lock().unwrap().push((token, completed));
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    beacon: Arc<MockBeacon>,
    service: Arc<MockService>,
    scanner: Arc<MockScanner>,
    listener: Arc<RecordingListener>,
    settings: Arc<DiscoverySettings>,
    orchestrator: DiscoveryOrchestrator,
}

fn service_id() -> ServiceId {
    ServiceId::from_bytes(*b"proximtestsvc001")
}

fn own_address() -> HardwareAddress {
    HardwareAddress::parse("4C:0F:6E:12:34:56").expect("valid address")
}

fn peer_address() -> HardwareAddress {
    HardwareAddress::parse("70:99:AA:01:02:03").expect("valid address")
}

fn harness(mode: DiscoveryMode, with_address: bool) -> Harness {
    let beacon = Arc::new(MockBeacon::default());
    let service = Arc::new(MockService::default());
    let scanner = Arc::new(MockScanner::default());
    let listener = Arc::new(RecordingListener::default());

    let settings = DiscoverySettings::new();
    settings.set_discovery_mode(mode);
    // Fast protocol timers so assist flows complete inside test budgets.
    settings.set_timing(
        Duration::from_secs(1),    // provide-address (enumeration) bound
        Duration::from_millis(150), // resolved-address advert bound
        Duration::from_secs(60),   // service watchdog timeout
        Duration::from_secs(10),   // service watchdog tick
        Duration::from_millis(50), // registry sweep interval
    );
    if with_address {
        settings.set_hardware_address(own_address());
    }

    let orchestrator = DiscoveryOrchestrator::new(
        Transports {
            beacon: Arc::clone(&beacon) as Arc<dyn BeaconRadio>,
            service: Arc::clone(&service) as Arc<dyn ServiceRadio>,
            scanner: Arc::clone(&scanner) as Arc<dyn DeviceScanner>,
        },
        Arc::clone(&listener) as Arc<dyn DiscoveryListener>,
        service_id(),
        "_proxim._tcp",
        Arc::clone(&settings),
    );

    Harness {
        beacon,
        service,
        scanner,
        listener,
        settings,
        orchestrator,
    }
}

fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if condition() {
            return;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    panic!("timed out waiting for: {}", what);
}

/// Read the requester's outstanding token out of its broadcast request frame.
fn broadcast_token(beacon: &MockBeacon) -> ResolutionToken {
    let payload = beacon.last_broadcast().expect("request frame broadcast");
    AdvertisementFrame::parse(&payload).expect("valid frame").token
}

// ============================================================================
// Startup and state machine
// ============================================================================

#[test]
fn cold_start_both_transports() {
    let h = harness(DiscoveryMode::BeaconAndLocalService, true);
    assert!(h.orchestrator.start("peer-1", "Alice"));
    assert_eq!(h.orchestrator.state(), DiscoveryState::RunningBoth);
    assert!(h.orchestrator.is_running());
    assert!(h.beacon.scanning.load(Ordering::Relaxed));
    assert!(h.beacon.broadcasting.load(Ordering::Relaxed));
    assert!(h.service.advertising.load(Ordering::Relaxed));
    assert!(h.service.watching.load(Ordering::Relaxed));
}

#[test]
fn start_without_mode_is_a_configuration_error() {
    let h = harness(DiscoveryMode::NotSet, true);
    assert!(!h.orchestrator.start("peer-1", "Alice"));
    assert_eq!(h.orchestrator.state(), DiscoveryState::NotStarted);
}

#[test]
fn start_with_invalid_identity_fails_fast() {
    let h = harness(DiscoveryMode::BeaconAndLocalService, true);
    assert!(!h.orchestrator.start("", "Alice"));
    assert_eq!(h.orchestrator.state(), DiscoveryState::NotStarted);
}

#[test]
fn both_transports_failing_means_not_started() {
    let h = harness(DiscoveryMode::BeaconAndLocalService, true);
    h.beacon.scan_ok.store(false, Ordering::Relaxed);
    h.beacon.broadcast_ok.store(false, Ordering::Relaxed);
    h.service.advertise_ok.store(false, Ordering::Relaxed);

    assert!(!h.orchestrator.start("peer-1", "Alice"));
    assert_eq!(h.orchestrator.state(), DiscoveryState::NotStarted);
    assert!(!h.orchestrator.is_running());
}

#[test]
fn one_transport_failing_narrows_the_running_state() {
    let h = harness(DiscoveryMode::BeaconAndLocalService, true);
    h.service.watch_ok.store(false, Ordering::Relaxed);

    assert!(h.orchestrator.start("peer-1", "Alice"));
    assert_eq!(h.orchestrator.state(), DiscoveryState::RunningBeacon);

    // Transport B recovers: availability callback retries the start.
    h.service.watch_ok.store(true, Ordering::Relaxed);
    let sink = h.orchestrator.sink();
    sink.radio_availability(TransportKind::LocalService, true);
    wait_until("running on both transports", || {
        h.orchestrator.state() == DiscoveryState::RunningBoth
    });
}

#[test]
fn stop_then_start_reaches_the_same_state() {
    let h = harness(DiscoveryMode::BeaconAndLocalService, true);
    assert!(h.orchestrator.start("peer-1", "Alice"));
    assert_eq!(h.orchestrator.state(), DiscoveryState::RunningBoth);

    h.orchestrator.stop();
    assert_eq!(h.orchestrator.state(), DiscoveryState::NotStarted);
    assert!(h.orchestrator.peers().is_empty());
    assert!(!h.beacon.scanning.load(Ordering::Relaxed));

    assert!(h.orchestrator.start("peer-1", "Alice"));
    assert_eq!(h.orchestrator.state(), DiscoveryState::RunningBoth);

    // stop() is idempotent.
    h.orchestrator.stop();
    h.orchestrator.stop();
    assert_eq!(h.orchestrator.state(), DiscoveryState::NotStarted);
}

#[test]
fn start_while_running_is_a_noop_success() {
    let h = harness(DiscoveryMode::BeaconAndLocalService, true);
    assert!(h.orchestrator.start("peer-1", "Alice"));
    let broadcasts_before = h.beacon.broadcasts.lock().unwrap().len();
    assert!(h.orchestrator.start("peer-1", "Alice"));
    assert_eq!(h.orchestrator.state(), DiscoveryState::RunningBoth);
    assert_eq!(h.beacon.broadcasts.lock().unwrap().len(), broadcasts_before);
}

#[test]
fn permission_denial_counts_as_transport_failure() {
    let h = harness(DiscoveryMode::BeaconOnly, true);
    h.listener.deny_scan.store(true, Ordering::Relaxed);

    assert!(!h.orchestrator.start("peer-1", "Alice"));
    assert_eq!(h.orchestrator.state(), DiscoveryState::NotStarted);
    assert_eq!(
        h.orchestrator.missing_permission(),
        Some(Capability::ProximityScan)
    );

    h.listener.deny_scan.store(false, Ordering::Relaxed);
    assert!(h.orchestrator.start("peer-1", "Alice"));
    assert_eq!(h.orchestrator.missing_permission(), None);
}

#[test]
fn radio_toggles_narrow_pause_and_recover() {
    let h = harness(DiscoveryMode::BeaconAndLocalService, true);
    assert!(h.orchestrator.start("peer-1", "Alice"));
    let sink = h.orchestrator.sink();

    // Seed a peer; pausing must not clear it.
    let frame = AdvertisementFrame::presence(service_id(), "Bob", peer_address());
    sink.beacon_frame(service_id(), frame.encode());
    wait_until("peer registered", || h.orchestrator.peers().len() == 1);

    sink.radio_availability(TransportKind::Beacon, false);
    wait_until("narrowed to local-service", || {
        h.orchestrator.state() == DiscoveryState::RunningLocalService
    });
    assert_eq!(h.orchestrator.peers().len(), 1);

    sink.radio_availability(TransportKind::LocalService, false);
    wait_until("waiting for services", || {
        h.orchestrator.state() == DiscoveryState::WaitingForServicesEnabled
    });
    assert!(!h.orchestrator.is_running());

    sink.radio_availability(TransportKind::Beacon, true);
    wait_until("beacon-only recovery", || {
        h.orchestrator.state() == DiscoveryState::RunningBeacon
    });

    sink.radio_availability(TransportKind::LocalService, true);
    wait_until("full recovery", || {
        h.orchestrator.state() == DiscoveryState::RunningBoth
    });
}

#[test]
fn mode_change_while_running_restarts_without_clearing_peers() {
    let h = harness(DiscoveryMode::BeaconAndLocalService, true);
    assert!(h.orchestrator.start("peer-1", "Alice"));
    let sink = h.orchestrator.sink();

    let frame = AdvertisementFrame::presence(service_id(), "Bob", peer_address());
    sink.beacon_frame(service_id(), frame.encode());
    wait_until("peer registered", || h.orchestrator.peers().len() == 1);

    h.settings.set_discovery_mode(DiscoveryMode::BeaconOnly);
    wait_until("narrowed by mode change", || {
        h.orchestrator.state() == DiscoveryState::RunningBeacon
    });
    assert!(!h.service.advertising.load(Ordering::Relaxed));
    assert_eq!(h.orchestrator.peers().len(), 1);
}

// ============================================================================
// Peer events
// ============================================================================

#[test]
fn beacon_presence_discovers_then_updates_peers() {
    let h = harness(DiscoveryMode::BeaconOnly, true);
    assert!(h.orchestrator.start("peer-1", "Alice"));
    let sink = h.orchestrator.sink();

    let unnamed = AdvertisementFrame::presence(service_id(), "", peer_address());
    sink.beacon_frame(service_id(), unnamed.encode());
    wait_until("peer discovered", || {
        h.listener.discovered.lock().unwrap().len() == 1
    });

    // Second sighting fills in the name: updated, not re-discovered.
    let named = AdvertisementFrame::presence(service_id(), "Bob", peer_address());
    sink.beacon_frame(service_id(), named.encode());
    wait_until("peer updated", || h.listener.updated.lock().unwrap().len() == 1);
    assert_eq!(h.listener.discovered.lock().unwrap().len(), 1);

    let peers = h.orchestrator.peers();
    assert_eq!(peers.len(), 1);
    assert_eq!(peers[0].name.as_deref(), Some("Bob"));
    assert_eq!(peers[0].address, Some(peer_address()));
}

#[test]
fn service_identities_become_peers() {
    let h = harness(DiscoveryMode::LocalServiceOnly, true);
    assert!(h.orchestrator.start("peer-1", "Alice"));
    let sink = h.orchestrator.sink();

    sink.service_found("70:99:AA:01:02:03\nBob");
    wait_until("service peer discovered", || {
        h.listener.discovered.lock().unwrap().len() == 1
    });
    let peers = h.orchestrator.peers();
    assert_eq!(peers[0].source, TransportKind::LocalService);
    assert_eq!(peers[0].name.as_deref(), Some("Bob"));
}

#[test]
fn sweep_expires_stale_peers() {
    let h = harness(DiscoveryMode::BeaconOnly, true);
    h.settings.set_peer_expiration(Duration::from_millis(100));
    assert!(h.orchestrator.start("peer-1", "Alice"));
    let sink = h.orchestrator.sink();

    let frame = AdvertisementFrame::presence(service_id(), "Bob", peer_address());
    sink.beacon_frame(service_id(), frame.encode());
    wait_until("peer registered", || h.orchestrator.peers().len() == 1);

    wait_until("peer expired", || h.orchestrator.peers().is_empty());
    let lost = h.listener.lost.lock().unwrap();
    assert_eq!(lost.len(), 1);
    assert_eq!(lost[0].address, Some(peer_address()));
}

// ============================================================================
// Address-resolution assist: requester role
// ============================================================================

#[test]
fn requester_resolves_own_address_and_restarts() {
    let h = harness(DiscoveryMode::BeaconOnly, false);
    assert!(h.orchestrator.start_with_name("Requester"));
    assert_eq!(h.orchestrator.state(), DiscoveryState::WaitingForOwnAddress);
    assert!(h.orchestrator.is_running());

    // The request frame is on the air under the secondary id.
    let token = broadcast_token(&h.beacon);
    let assist_id = h.orchestrator.assist_service_id();

    // A provider hands our address back on the loop-back channel.
    let sink = h.orchestrator.sink();
    let delivery = AdvertisementFrame::resolved_address(assist_id, token, own_address());
    sink.beacon_frame(assist_id, delivery.encode());

    wait_until("address resolved", || {
        h.listener.resolved.lock().unwrap().first() == Some(&own_address())
    });
    wait_until("restarted with known address", || {
        h.orchestrator.state() == DiscoveryState::RunningBeacon
    });

    // The loop-back packet never surfaces as a peer.
    assert!(h.listener.discovered.lock().unwrap().is_empty());
    assert!(h.orchestrator.peers().is_empty());
    assert_eq!(h.settings.snapshot().hardware_address, Some(own_address()));
    // Presence broadcast now runs with the resolved address.
    assert!(h.beacon.broadcasting.load(Ordering::Relaxed));
}

#[test]
fn foreign_address_delivery_is_ignored() {
    let h = harness(DiscoveryMode::BeaconOnly, false);
    assert!(h.orchestrator.start_with_name("Requester"));
    let assist_id = h.orchestrator.assist_service_id();
    let sink = h.orchestrator.sink();

    let foreign = ResolutionToken::from_bytes([0xEE; 8]);
    let delivery = AdvertisementFrame::resolved_address(assist_id, foreign, own_address());
    sink.beacon_frame(assist_id, delivery.encode());

    std::thread::sleep(Duration::from_millis(150));
    assert_eq!(h.orchestrator.state(), DiscoveryState::WaitingForOwnAddress);
    assert!(h.listener.resolved.lock().unwrap().is_empty());
    assert!(h.listener.discovered.lock().unwrap().is_empty());
}

#[test]
fn ready_signal_makes_requester_discoverable() {
    let h = harness(DiscoveryMode::BeaconOnly, false);
    assert!(h.orchestrator.start_with_name("Requester"));
    let token = broadcast_token(&h.beacon);
    let assist_id = h.orchestrator.assist_service_id();
    let sink = h.orchestrator.sink();

    let ready = AdvertisementFrame::ready_to_provide(assist_id, token);
    sink.beacon_frame(assist_id, ready.encode());

    wait_until("made discoverable", || {
        !h.service.discoverable_grants.lock().unwrap().is_empty()
    });
    // Automated policy handles it internally, no manual callback.
    assert!(h.listener.ready.lock().unwrap().is_empty());
}

#[test]
fn manual_policy_surfaces_assist_callbacks() {
    let h = harness(DiscoveryMode::BeaconOnly, false);
    h.settings.set_automate_resolution(false);
    assert!(h.orchestrator.start_with_name("Requester"));
    let token = broadcast_token(&h.beacon);
    let assist_id = h.orchestrator.assist_service_id();
    let sink = h.orchestrator.sink();

    let ready = AdvertisementFrame::ready_to_provide(assist_id, token);
    sink.beacon_frame(assist_id, ready.encode());
    wait_until("ready surfaced to listener", || {
        h.listener.ready.lock().unwrap().first() == Some(&token)
    });
    assert!(h.service.discoverable_grants.lock().unwrap().is_empty());
}

// ============================================================================
// Address-resolution assist: provider role
// ============================================================================

#[test]
fn provider_services_a_request_end_to_end() {
    let h = harness(DiscoveryMode::BeaconOnly, true);
    assert!(h.orchestrator.start("peer-1", "Provider"));
    assert_eq!(h.orchestrator.state(), DiscoveryState::RunningBeacon);
    let assist_id = h.orchestrator.assist_service_id();
    let sink = h.orchestrator.sink();

    // A nearby device asks for help.
    let token = ResolutionToken::from_bytes([0xAB; 8]);
    let request = AdvertisementFrame::resolve_request(assist_id, token);
    sink.beacon_frame(assist_id, request.encode());

    wait_until("providing state", || {
        h.orchestrator.state() == DiscoveryState::ProvidingAddressToPeer
    });
    // Beacon scan paused for classic enumeration; enumeration running.
    assert!(!h.beacon.scanning.load(Ordering::Relaxed));
    assert!(h.scanner.running.load(Ordering::Relaxed));

    // Enumeration observes the requester.
    sink.device_enumerated(peer_address());

    // The bounded advert runs its course, the operation completes and
    // discovery restarts.
    wait_until("provide result delivered", || {
        h.listener.results.lock().unwrap().first() == Some(&(token, true))
    });
    wait_until("restarted after assist", || {
        h.orchestrator.state() == DiscoveryState::RunningBeacon
    });
    assert!(h.beacon.scanning.load(Ordering::Relaxed));
    assert!(!h.scanner.running.load(Ordering::Relaxed));

    // The hand-back frame actually hit the air under the assist channel.
    let advertised_address = h
        .beacon
        .broadcasts
        .lock()
        .unwrap()
        .iter()
        .filter_map(|payload| AdvertisementFrame::parse(payload).ok())
        .any(|frame| frame.token == token && frame.address == peer_address());
    assert!(advertised_address, "resolved-address frame not broadcast");
}

#[test]
fn provider_enumeration_timeout_reports_not_completed() {
    let h = harness(DiscoveryMode::BeaconOnly, true);
    h.settings.set_timing(
        Duration::from_millis(100), // enumeration bound, short
        Duration::from_millis(150),
        Duration::from_secs(60),
        Duration::from_secs(10),
        Duration::from_millis(50),
    );
    assert!(h.orchestrator.start("peer-1", "Provider"));
    let assist_id = h.orchestrator.assist_service_id();
    let sink = h.orchestrator.sink();

    let token = ResolutionToken::from_bytes([0xAB; 8]);
    let request = AdvertisementFrame::resolve_request(assist_id, token);
    sink.beacon_frame(assist_id, request.encode());
    wait_until("providing state", || {
        h.orchestrator.state() == DiscoveryState::ProvidingAddressToPeer
    });

    // Nobody shows up: the bound fires, the failure is informational and
    // discovery still restarts.
    wait_until("failed result delivered", || {
        h.listener.results.lock().unwrap().first() == Some(&(token, false))
    });
    wait_until("restarted after failed assist", || {
        h.orchestrator.state() == DiscoveryState::RunningBeacon
    });
}

#[test]
fn provider_ignores_competing_request() {
    let h = harness(DiscoveryMode::BeaconOnly, true);
    assert!(h.orchestrator.start("peer-1", "Provider"));
    let assist_id = h.orchestrator.assist_service_id();
    let sink = h.orchestrator.sink();

    let first = ResolutionToken::from_bytes([0xAB; 8]);
    sink.beacon_frame(
        assist_id,
        AdvertisementFrame::resolve_request(assist_id, first).encode(),
    );
    wait_until("providing state", || {
        h.orchestrator.state() == DiscoveryState::ProvidingAddressToPeer
    });

    // A second device asks while the first operation is live: ignored.
    let second = ResolutionToken::from_bytes([0xCD; 8]);
    sink.beacon_frame(
        assist_id,
        AdvertisementFrame::resolve_request(assist_id, second).encode(),
    );
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(
        h.orchestrator.state(),
        DiscoveryState::ProvidingAddressToPeer
    );

    // Only the first operation ever completes.
    sink.device_enumerated(peer_address());
    wait_until("first operation completes", || {
        h.listener.results.lock().unwrap().first() == Some(&(first, true))
    });
    assert_eq!(h.listener.results.lock().unwrap().len(), 1);
}

#[test]
fn manual_policy_surfaces_provide_requests() {
    let h = harness(DiscoveryMode::BeaconOnly, true);
    h.settings.set_automate_resolution(false);
    assert!(h.orchestrator.start("peer-1", "Provider"));
    let assist_id = h.orchestrator.assist_service_id();
    let sink = h.orchestrator.sink();

    let token = ResolutionToken::from_bytes([0xAB; 8]);
    sink.beacon_frame(
        assist_id,
        AdvertisementFrame::resolve_request(assist_id, token).encode(),
    );
    wait_until("request surfaced", || {
        h.listener.requests.lock().unwrap().first() == Some(&token)
    });
    assert_eq!(h.orchestrator.state(), DiscoveryState::RunningBeacon);
    assert!(!h.scanner.running.load(Ordering::Relaxed));
}

// ============================================================================
// Misc surface
// ============================================================================

#[test]
fn make_discoverable_is_rate_limited() {
    let h = harness(DiscoveryMode::BeaconAndLocalService, true);
    assert!(h.orchestrator.make_discoverable(Duration::from_millis(200)));
    assert!(!h.orchestrator.make_discoverable(Duration::from_millis(200)));
    std::thread::sleep(Duration::from_millis(250));
    assert!(h.orchestrator.make_discoverable(Duration::from_millis(200)));
    assert_eq!(h.service.discoverable_grants.lock().unwrap().len(), 2);
}

#[test]
fn externally_added_peers_flow_through_the_registry() {
    let h = harness(DiscoveryMode::BeaconOnly, true);
    assert!(h.orchestrator.start("peer-1", "Alice"));

    let id = proxim::PeerId::new("manual-peer").expect("valid id");
    let descriptor =
        PeerDescriptor::new(id, TransportKind::LocalService).with_address(peer_address());
    h.orchestrator.add_or_update_discovered_peer(descriptor);

    wait_until("manual peer surfaced", || {
        h.listener.discovered.lock().unwrap().len() == 1
    });
    assert_eq!(h.orchestrator.peers().len(), 1);
}
