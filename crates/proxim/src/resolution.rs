// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 proxim contributors

//! Address-resolution assist ("Bro Mode") coordination.
//!
//! Two roles over the beacon secondary channel:
//!
//! - **Requester**: does not know its own hardware address. Broadcasts a
//!   resolve-request frame carrying a rendezvous token, waits for a
//!   provider's ready signal, makes itself enumerable, and finally hears
//!   its own address back on the secondary channel.
//! - **Provider**: sees a request, pauses beacon scanning, signals ready,
//!   enumerates nearby discoverable devices, and advertises the observed
//!   address under the requester's token for a bounded window.
//!
//! Invariants: at most one outstanding requester token, at most one assist
//! operation serviced at a time. Mismatched or duplicate tokens are logged
//! and ignored; protocol anomalies never escalate.

use crate::beacon::BeaconDiscoverer;
use crate::enumerator::DeviceEnumerator;
use crate::peer::{HardwareAddress, ResolutionToken};
use crate::transport::ServiceRadio;
use std::time::Duration;

/// Terminal outcome of one provider-side assist operation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ProvideResult {
    pub token: ResolutionToken,
    /// Informational only: the orchestrator re-enters `start` regardless.
    pub completed: bool,
}

/// Sequences requester and provider assist operations.
pub struct AddressResolutionCoordinator {
    outstanding: Option<ResolutionToken>,
    providing: Option<ResolutionToken>,
    receiving: bool,
}

impl AddressResolutionCoordinator {
    pub fn new() -> Self {
        Self {
            outstanding: None,
            providing: None,
            receiving: false,
        }
    }

    /// Token of our own unresolved request, if any.
    pub fn outstanding(&self) -> Option<ResolutionToken> {
        self.outstanding
    }

    pub fn is_outstanding(&self, token: ResolutionToken) -> bool {
        self.outstanding == Some(token)
    }

    pub fn is_providing(&self) -> bool {
        self.providing.is_some()
    }

    pub fn is_receiving(&self) -> bool {
        self.receiving
    }

    // ========================================================================
    // Requester role
    // ========================================================================

    /// Begin (or resume) broadcasting our resolution request.
    ///
    /// The token survives re-`start` cycles: it is only consumed by a
    /// successful resolution or a full stop.
    pub fn begin_request(&mut self, beacon: &mut BeaconDiscoverer) -> ResolutionToken {
        let token = *self.outstanding.get_or_insert_with(|| {
            let token = ResolutionToken::generate();
            log::info!("[bro] Own address unknown, requesting assistance ({})", token);
            token
        });
        if !beacon.start_resolve_request_broadcast(token) {
            log::error!("[bro] Failed to start resolve-request broadcast for {}", token);
        }
        token
    }

    /// A provider signalled readiness for our token: make this device
    /// enumerable so the provider can observe our hardware address.
    pub fn begin_receive(
        &mut self,
        token: ResolutionToken,
        service_radio: &dyn ServiceRadio,
        discoverable_for: Duration,
    ) -> bool {
        if !self.is_outstanding(token) {
            log::debug!("[bro] Ready signal for foreign token {}, ignoring", token);
            return false;
        }
        if self.receiving {
            return true;
        }
        if !service_radio.make_discoverable(discoverable_for) {
            log::error!("[bro] Failed to make device discoverable");
            return false;
        }
        self.receiving = true;
        log::info!("[bro] Provider ready, now discoverable for {:?}", discoverable_for);
        true
    }

    /// An address arrived on the secondary channel. Consumes the request if
    /// the token is ours and the address is usable.
    pub fn on_address_delivery(
        &mut self,
        token: ResolutionToken,
        address: HardwareAddress,
        beacon: &mut BeaconDiscoverer,
    ) -> Option<HardwareAddress> {
        if !self.is_outstanding(token) {
            log::debug!("[bro] Address delivery for foreign token {}, ignoring", token);
            return None;
        }
        if address.is_unknown() {
            log::warn!("[bro] Address delivery for {} carries no address", token);
            return None;
        }
        log::info!("[bro] Own address resolved: {}", address);
        self.outstanding = None;
        self.receiving = false;
        beacon.stop_assist();
        Some(address)
    }

    // ========================================================================
    // Provider role
    // ========================================================================

    /// Begin servicing a peer's resolution request.
    ///
    /// Pauses beacon scanning first (classic enumeration and beacon scan
    /// must never run concurrently), then starts the bounded enumeration
    /// and the ready signal. A request with a different token while one is
    /// being serviced is ignored.
    pub fn begin_provide(
        &mut self,
        token: ResolutionToken,
        beacon: &mut BeaconDiscoverer,
        enumerator: &mut DeviceEnumerator,
        enumeration_timeout: Duration,
    ) -> bool {
        if let Some(current) = self.providing {
            if current != token {
                log::debug!(
                    "[bro] Received request {} but already servicing {}",
                    token,
                    current
                );
            }
            return false;
        }

        beacon.stop_scan();

        if !enumerator.start(enumeration_timeout) {
            log::error!("[bro] Failed to start device enumeration for {}", token);
            return false;
        }
        if !beacon.start_ready_broadcast(token) {
            log::error!("[bro] Failed to signal ready for {}", token);
            enumerator.stop();
            return false;
        }

        self.providing = Some(token);
        log::info!("[bro] Providing address to peer ({})", token);
        true
    }

    /// Enumeration observed a nearby device: hand its address back.
    ///
    /// Returns `Some(result)` only when the hand-back could not start (the
    /// operation terminates immediately, not completed); otherwise the
    /// bounded advertisement is now running and the operation finishes via
    /// [`Self::on_advert_finished`].
    pub fn on_device_enumerated(
        &mut self,
        address: HardwareAddress,
        beacon: &mut BeaconDiscoverer,
        enumerator: &mut DeviceEnumerator,
        advert_duration: Duration,
    ) -> Option<ProvideResult> {
        let token = match self.providing {
            Some(token) => token,
            None => {
                log::debug!("[bro] Stray enumerated device {}, no assist running", address);
                return None;
            }
        };

        enumerator.stop();

        if beacon.start_advertising_address_of_device(address, token, advert_duration) {
            None
        } else {
            self.providing = None;
            Some(ProvideResult {
                token,
                completed: false,
            })
        }
    }

    /// The bounded address advertisement ran its course: assist complete.
    pub fn on_advert_finished(&mut self, token: ResolutionToken) -> Option<ProvideResult> {
        if self.providing != Some(token) {
            return None;
        }
        self.providing = None;
        Some(ProvideResult {
            token,
            completed: true,
        })
    }

    /// Enumeration hit its bound without a device: assist failed.
    pub fn on_enumeration_timeout(
        &mut self,
        beacon: &mut BeaconDiscoverer,
        enumerator: &mut DeviceEnumerator,
    ) -> Option<ProvideResult> {
        let token = self.providing.take()?;
        log::warn!("[bro] Enumeration timed out while servicing {}", token);
        enumerator.stop();
        beacon.stop_assist();
        Some(ProvideResult {
            token,
            completed: false,
        })
    }

    /// Abort every assist operation, both roles. Used by stop-for-restart.
    pub fn stop_all(&mut self, beacon: Option<&mut BeaconDiscoverer>, enumerator: &mut DeviceEnumerator) {
        if self.outstanding.is_some() || self.providing.is_some() || self.receiving {
            log::debug!("[bro] Cancelling assist operations");
        }
        self.outstanding = None;
        self.providing = None;
        self.receiving = false;
        enumerator.stop();
        if let Some(beacon) = beacon {
            beacon.stop_assist();
        }
    }
}

impl Default for AddressResolutionCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
