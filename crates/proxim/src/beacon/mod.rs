// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 proxim contributors

//! Beacon transport discoverer: broadcast and scan roles.
//!
//! The broadcast role announces our presence under the primary service
//! identifier (only once our own hardware address is known; an
//! advertisement without an address identifies nobody). The scan role
//! observes both the primary identifier and the secondary one derived from
//! it; secondary frames belong to the address-resolution assist protocol
//! and never surface as peer presence.
//!
//! Failure semantics: a capability that refuses to start is reported
//! upward; there is no internal retry. Retry policy belongs to the
//! orchestrator.

pub mod payload;

use crate::events::{DiscoveryEvent, EventSink};
use crate::orchestrator::timer::OneShotTimer;
use crate::peer::{
    HardwareAddress, PeerDescriptor, PeerId, ResolutionToken, ServiceId, TransportKind,
};
use crate::transport::{AdvertiseParams, BeaconRadio, ScanDutyCycle, ScanFilter};
use payload::{AdvertisementFrame, FrameKind};
use std::sync::Arc;
use std::time::Duration;

/// Typed outcome of classifying one scanned advertisement.
#[derive(Debug, Clone)]
pub enum BeaconEvent {
    /// Primary-channel presence frame.
    PeerDiscovered(PeerDescriptor),
    /// A nearby device is asking for its own hardware address.
    ResolveRequest(ResolutionToken),
    /// A provider is ready to enumerate the requester.
    ReadyToProvide(ResolutionToken),
    /// Loop-back address delivery; ours only if the token matches our
    /// outstanding request.
    AddressDelivery {
        token: ResolutionToken,
        address: HardwareAddress,
    },
}

/// Which assist advertisement currently occupies the broadcast slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum AssistKind {
    Request,
    Ready,
    Address,
}

struct AssistAdvert {
    kind: AssistKind,
    token: ResolutionToken,
    /// Bounds the address advertisement; request/ready adverts are
    /// unbounded and stopped explicitly.
    timer: Option<OneShotTimer>,
}

/// Drives the beacon transport's broadcast and scan roles.
pub struct BeaconDiscoverer {
    radio: Arc<dyn BeaconRadio>,
    primary: ServiceId,
    secondary: ServiceId,
    sink: EventSink,
    my_name: String,
    own_address: Option<HardwareAddress>,
    advertise: AdvertiseParams,
    scan_duty_cycle: ScanDutyCycle,
    scan_report_delay: Duration,
    presence_active: bool,
    scan_active: bool,
    assist: Option<AssistAdvert>,
}

impl BeaconDiscoverer {
    pub fn new(
        radio: Arc<dyn BeaconRadio>,
        sink: EventSink,
        primary: ServiceId,
        my_name: String,
        own_address: Option<HardwareAddress>,
    ) -> Self {
        Self {
            radio,
            primary,
            secondary: primary.secondary(),
            sink,
            my_name,
            own_address,
            advertise: AdvertiseParams::default(),
            scan_duty_cycle: ScanDutyCycle::default(),
            scan_report_delay: Duration::ZERO,
            presence_active: false,
            scan_active: false,
            assist: None,
        }
    }

    pub fn primary_id(&self) -> ServiceId {
        self.primary
    }

    pub fn secondary_id(&self) -> ServiceId {
        self.secondary
    }

    pub fn is_scanning(&self) -> bool {
        self.scan_active
    }

    /// Update our own address once known. Takes effect on the next
    /// (re)start of the broadcast role.
    pub fn set_own_address(&mut self, address: HardwareAddress) {
        if address.is_unknown() {
            log::error!("[beacon] Ignoring unknown address for advertiser");
            return;
        }
        self.own_address = Some(address);
    }

    /// Start both roles. The broadcast role only runs when our address is
    /// known; scan-only startup still counts as started (the resolution
    /// flow depends on it).
    pub fn start(
        &mut self,
        advertise: AdvertiseParams,
        scan_duty_cycle: ScanDutyCycle,
        scan_report_delay: Duration,
    ) -> bool {
        self.advertise = advertise;
        self.scan_duty_cycle = scan_duty_cycle;
        self.scan_report_delay = scan_report_delay;

        let broadcast_ok = match self.own_address {
            Some(address) if !self.presence_active && self.assist.is_none() => {
                let frame = AdvertisementFrame::presence(self.primary, &self.my_name, address);
                self.presence_active = self.radio.start_broadcast(&frame.encode(), &self.advertise);
                if !self.presence_active {
                    log::error!("[beacon] Broadcast role failed to start");
                }
                self.presence_active
            }
            Some(_) => true, // already broadcasting, or slot held by an assist advert
            None => {
                log::info!("[beacon] Own address unknown, starting scan-only");
                true
            }
        };

        let scan_ok = self.start_scan();

        broadcast_ok && scan_ok
    }

    /// Start (or restart) the scan role alone.
    pub fn start_scan(&mut self) -> bool {
        if self.scan_active {
            return true;
        }
        let filter = ScanFilter {
            service_ids: vec![self.primary, self.secondary],
            duty_cycle: self.scan_duty_cycle,
            report_delay: self.scan_report_delay,
        };
        self.scan_active = self.radio.start_scan(&filter);
        if !self.scan_active {
            log::error!("[beacon] Scan role failed to start");
        }
        self.scan_active
    }

    /// Stop the scan role only. Used before classic device enumeration:
    /// running both against one radio corrupts driver state on reference
    /// hardware.
    pub fn stop_scan(&mut self) {
        if self.scan_active {
            self.radio.stop_scan();
            self.scan_active = false;
        }
    }

    /// Tear down both roles and any assist advertisement.
    pub fn stop(&mut self) {
        self.stop_assist();
        if self.presence_active {
            self.radio.stop_broadcast();
            self.presence_active = false;
        }
        self.stop_scan();
    }

    /// Re-apply advertise/scan parameters to live roles.
    pub fn apply_settings(
        &mut self,
        advertise: AdvertiseParams,
        scan_duty_cycle: ScanDutyCycle,
        scan_report_delay: Duration,
    ) {
        self.advertise = advertise;
        self.scan_duty_cycle = scan_duty_cycle;
        self.scan_report_delay = scan_report_delay;

        if self.presence_active {
            if let Some(address) = self.own_address {
                self.radio.stop_broadcast();
                let frame = AdvertisementFrame::presence(self.primary, &self.my_name, address);
                self.presence_active = self.radio.start_broadcast(&frame.encode(), &self.advertise);
            }
        }
        if self.scan_active {
            self.radio.stop_scan();
            self.scan_active = false;
            self.start_scan();
        }
    }

    // ========================================================================
    // Assist advertisements (secondary channel)
    // ========================================================================

    /// Broadcast a resolution request: "I do not know my own address."
    /// Unbounded; stopped when the resolution completes or discovery stops.
    pub fn start_resolve_request_broadcast(&mut self, token: ResolutionToken) -> bool {
        if let Some(assist) = &self.assist {
            // Re-start with the same outstanding token is a no-op.
            return assist.kind == AssistKind::Request && assist.token == token;
        }
        let frame = AdvertisementFrame::resolve_request(self.secondary, token);
        self.occupy_slot(AssistKind::Request, token, &frame, None)
    }

    /// Broadcast a provider-ready signal for the given request token.
    pub fn start_ready_broadcast(&mut self, token: ResolutionToken) -> bool {
        if let Some(assist) = &self.assist {
            if !(assist.kind == AssistKind::Ready && assist.token == token) {
                log::warn!(
                    "[beacon] Broadcast slot busy ({:?}), cannot signal ready for {}",
                    assist.kind,
                    token
                );
                return false;
            }
            return true;
        }
        let frame = AdvertisementFrame::ready_to_provide(self.secondary, token);
        self.occupy_slot(AssistKind::Ready, token, &frame, None)
    }

    /// Advertise a discovered device's hardware address back to it for a
    /// bounded duration, then release the broadcast resource automatically.
    ///
    /// Fails if an address advertisement for a different token is already
    /// outstanding: an in-flight hand-back is never silently replaced. A
    /// ready advert for the same token is replaced (same assist operation).
    pub fn start_advertising_address_of_device(
        &mut self,
        address: HardwareAddress,
        token: ResolutionToken,
        duration: Duration,
    ) -> bool {
        if let Some(assist) = &self.assist {
            if assist.kind == AssistKind::Address {
                log::warn!(
                    "[beacon] Already advertising an address for {}, refusing {}",
                    assist.token,
                    token
                );
                return false;
            }
            if assist.token != token {
                log::warn!(
                    "[beacon] Broadcast slot busy for token {}, refusing {}",
                    assist.token,
                    token
                );
                return false;
            }
            // Ready advert for the same token: hand the slot over.
            self.stop_assist();
        }

        let frame = AdvertisementFrame::resolved_address(self.secondary, token, address);
        let timer = OneShotTimer::schedule(
            "addr-advert",
            duration,
            self.sink.clone(),
            DiscoveryEvent::AddressAdvertFinished,
        );
        let started = self.occupy_slot(AssistKind::Address, token, &frame, Some(timer));
        if started {
            log::info!(
                "[beacon] Advertising address {} for token {} ({:?} bound)",
                address,
                token,
                duration
            );
        }
        started
    }

    /// Handle the bounded address advertisement running its course.
    /// Idempotent: a timeout firing after `stop()` finds nothing to release.
    pub fn on_address_advert_finished(&mut self) -> Option<ResolutionToken> {
        match &self.assist {
            Some(assist) if assist.kind == AssistKind::Address => {
                let token = assist.token;
                self.stop_assist();
                log::info!("[beacon] Stopped advertising resolved address for {}", token);
                Some(token)
            }
            _ => None,
        }
    }

    /// Stop whatever assist advertisement occupies the slot.
    pub fn stop_assist(&mut self) {
        if let Some(assist) = self.assist.take() {
            if let Some(timer) = assist.timer {
                timer.cancel();
            }
            self.radio.stop_broadcast();
        }
    }

    fn occupy_slot(
        &mut self,
        kind: AssistKind,
        token: ResolutionToken,
        frame: &AdvertisementFrame,
        timer: Option<OneShotTimer>,
    ) -> bool {
        // One advertisement at a time: the assist frame takes the slot from
        // the presence frame. No restore path needed: every assist outcome
        // funnels through a re-start that rebuilds the presence advert.
        if self.presence_active {
            self.radio.stop_broadcast();
            self.presence_active = false;
        }

        if self.radio.start_broadcast(&frame.encode(), &self.advertise) {
            self.assist = Some(AssistAdvert { kind, token, timer });
            true
        } else {
            log::error!("[beacon] Failed to start {:?} advertisement", kind);
            false
        }
    }

    // ========================================================================
    // Scan classification
    // ========================================================================

    /// Classify one scanned advertisement into a typed event.
    ///
    /// Returns `None` for frames that are malformed, foreign, or
    /// inconsistent (embedded id disagreeing with the delivery channel,
    /// assist kinds on the primary channel). The secondary channel is a
    /// private loop-back channel: nothing on it ever becomes a peer event.
    pub fn classify(&self, service_id: ServiceId, payload: &[u8]) -> Option<BeaconEvent> {
        let frame = match AdvertisementFrame::parse(payload) {
            Ok(frame) => frame,
            Err(err) => {
                log::debug!("[beacon] Dropping unparseable advertisement: {}", err);
                return None;
            }
        };

        if frame.service_id != service_id {
            log::debug!(
                "[beacon] Dropping advertisement with mismatched channel ({} != {})",
                frame.service_id,
                service_id
            );
            return None;
        }

        if service_id == self.primary {
            if frame.kind != FrameKind::Presence {
                log::debug!("[beacon] Dropping assist frame on the primary channel");
                return None;
            }
            if frame.address.is_unknown() {
                log::debug!("[beacon] Dropping presence frame without an address");
                return None;
            }
            let id = PeerId::new(frame.address.to_string())?;
            let descriptor = PeerDescriptor::new(id, TransportKind::Beacon)
                .with_name(frame.name)
                .with_address(frame.address);
            return Some(BeaconEvent::PeerDiscovered(descriptor));
        }

        if service_id == self.secondary {
            return match frame.kind {
                FrameKind::ResolveRequest => Some(BeaconEvent::ResolveRequest(frame.token)),
                FrameKind::ReadyToProvide => Some(BeaconEvent::ReadyToProvide(frame.token)),
                FrameKind::ResolvedAddress => Some(BeaconEvent::AddressDelivery {
                    token: frame.token,
                    address: frame.address,
                }),
                FrameKind::Presence => {
                    log::debug!("[beacon] Dropping presence frame on the assist channel");
                    None
                }
            };
        }

        log::debug!("[beacon] Dropping advertisement for foreign service {}", service_id);
        None
    }
}
