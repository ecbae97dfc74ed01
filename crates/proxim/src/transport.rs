// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 proxim contributors

//! Transport capability provider traits.
//!
//! The two short-range transports are external collaborators: the embedder
//! supplies implementations that program the platform radios, and injects
//! their asynchronous deliveries (scan results, device lists, availability
//! flips) back through an [`crate::events::EventSink`]. Nothing in this
//! crate touches a radio directly.
//!
//! All command methods are fire-and-forget with respect to radio I/O: a
//! `true` return means the operation was accepted end-to-end, not that a
//! packet hit the air.

use crate::peer::ServiceId;
use std::time::Duration;

/// Capability the embedder may need to confirm with the user before a
/// transport can start.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Capability {
    /// Permission to scan for nearby short-range advertisements.
    ProximityScan,
}

/// Power/latency hint for the broadcast role.
///
/// Mirrors the knobs platform advertisers expose; providers map them onto
/// whatever their radio supports.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum AdvertisePower {
    Low,
    #[default]
    Balanced,
    High,
}

/// Duty-cycle hint for the scan role.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ScanDutyCycle {
    LowPower,
    #[default]
    Balanced,
    LowLatency,
}

/// Parameters applied when (re)starting the broadcast role.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct AdvertiseParams {
    pub power: AdvertisePower,
}

/// Filter and parameters applied when (re)starting the scan role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFilter {
    /// Service identifiers of interest (primary and secondary).
    pub service_ids: Vec<ServiceId>,
    pub duty_cycle: ScanDutyCycle,
    /// Batching delay the radio may apply before reporting results.
    pub report_delay: Duration,
}

/// Broadcast/scan advertisement capability (transport A).
///
/// One advertisement slot: a successful `start_broadcast` replaces nothing;
/// callers stop the previous payload first. Scan deliveries arrive through
/// [`crate::events::EventSink::beacon_frame`].
pub trait BeaconRadio: Send + Sync {
    /// Begin broadcasting the given advertisement payload.
    fn start_broadcast(&self, payload: &[u8], params: &AdvertiseParams) -> bool;

    /// Stop the current broadcast, if any. Safe to call when idle.
    fn stop_broadcast(&self);

    /// Begin passively scanning for advertisements matching the filter.
    fn start_scan(&self, filter: &ScanFilter) -> bool;

    /// Stop scanning, if active. Safe to call when idle.
    fn stop_scan(&self);
}

/// Named-service advertise/watch capability (transport B).
///
/// Watch deliveries arrive through
/// [`crate::events::EventSink::service_found`] and
/// [`crate::events::EventSink::device_list_changed`].
pub trait ServiceRadio: Send + Sync {
    /// Announce our identity string under the shared service type.
    fn start_advertise(&self, identity: &str, service_type: &str) -> bool;

    fn stop_advertise(&self);

    /// Begin enumerating remote devices offering the service type.
    fn start_watch(&self, service_type: &str) -> bool;

    fn stop_watch(&self);

    /// Make this device visible to a peer's classic device enumeration for
    /// the given duration. Used by the assist protocol's receive phase.
    fn make_discoverable(&self, duration: Duration) -> bool;
}

/// Classic device enumeration capability.
///
/// Used only during address-resolution assist, to physically observe a
/// nearby device's hardware address. Deliveries arrive through
/// [`crate::events::EventSink::device_enumerated`].
pub trait DeviceScanner: Send + Sync {
    /// Begin one enumeration pass over nearby discoverable devices.
    fn enumerate_devices(&self) -> bool;

    /// Abort the enumeration pass. Safe to call when idle.
    fn stop(&self);
}

/// The full set of capability providers an orchestrator is constructed with.
#[derive(Clone)]
pub struct Transports {
    pub beacon: std::sync::Arc<dyn BeaconRadio>,
    pub service: std::sync::Arc<dyn ServiceRadio>,
    pub scanner: std::sync::Arc<dyn DeviceScanner>,
}
