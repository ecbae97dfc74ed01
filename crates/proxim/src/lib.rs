// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 proxim contributors

//! # proxim - Proximity peer discovery with address-resolution assist
//!
//! A pure Rust library for discovering nearby devices over two independent
//! short-range wireless transports, built for peer-to-peer mesh
//! applications where no infrastructure network is available. Includes the
//! address-resolution assist protocol ("Bro Mode"): a device that does not
//! know its own hardware network identifier learns it with the help of a
//! nearby peer.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use proxim::{
//!     DiscoveryListener, DiscoveryMode, DiscoveryOrchestrator, DiscoverySettings,
//!     PeerDescriptor, ServiceId, Transports,
//! };
//! use std::sync::Arc;
//!
//! struct App;
//! impl DiscoveryListener for App {
//!     fn on_peer_discovered(&self, peer: PeerDescriptor) {
//!         println!("found {}", peer.id);
//!     }
//! }
//!
//! # fn radios() -> Transports { unimplemented!() }
//! let settings = DiscoverySettings::new();
//! settings.set_discovery_mode(DiscoveryMode::BeaconAndLocalService);
//!
//! let orchestrator = DiscoveryOrchestrator::new(
//!     radios(), // platform-specific capability providers
//!     Arc::new(App),
//!     ServiceId::from_bytes(*b"exampleservice01"),
//!     "_example._tcp",
//!     settings,
//! );
//! orchestrator.start("my-peer-id", "My Device");
//! ```
//!
//! The embedder wires its radio callbacks into the orchestrator through
//! [`EventSink`] (obtained from [`DiscoveryOrchestrator::sink`]), and
//! implements the three capability traits in [`transport`] on top of the
//! platform radios.
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------------+
//! |                          Application                               |
//! |        DiscoveryListener callbacks | start/stop/settings           |
//! +--------------------------------------------------------------------+
//! |                      DiscoveryOrchestrator                         |
//! |   state machine | event pump (serialized) | notification queue     |
//! +--------------------------------------------------------------------+
//! |  BeaconDiscoverer | LocalServiceDiscoverer | DeviceEnumerator      |
//! |  PeerRegistry (TTL expiry) | AddressResolutionCoordinator          |
//! +--------------------------------------------------------------------+
//! |              Capability providers (embedder-supplied)              |
//! |     BeaconRadio      |      ServiceRadio      |   DeviceScanner    |
//! +--------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`DiscoveryOrchestrator`] | Top-level state machine, owns everything below |
//! | [`DiscoveryListener`] | Callbacks surfaced to the application |
//! | [`DiscoverySettings`] | Hot-reloadable configuration (mode, TTL, policies) |
//! | [`PeerRegistry`] | Discovered peers with TTL expiry |
//! | [`PeerDescriptor`] | One discovered peer (identity, name, address) |
//! | [`EventSink`] | Inbox for transport deliveries and radio availability |
//!
//! ## Concurrency model
//!
//! One mutex is the critical section for all state transitions; radio
//! callbacks and timers post tagged events that a single pump thread
//! applies under it. Listener notifications are delivered on a dedicated
//! thread so a slow callback never stalls event processing.

/// Beacon transport: broadcast/scan roles and the advertisement codec.
pub mod beacon;
/// Timing constants and runtime settings with hot-reload.
pub mod config;
/// Classic device enumeration wrapper (assist protocol only).
pub mod enumerator;
/// Error taxonomy.
pub mod error;
/// Tagged discovery events and the inbox sink.
pub mod events;
/// Top-level state machine, event pump and listener dispatch.
pub mod orchestrator;
/// Peer identity and descriptor types.
pub mod peer;
/// Discovered-peer registry with TTL expiry.
pub mod registry;
/// Address-resolution assist ("Bro Mode") coordination.
pub mod resolution;
/// Local-service transport discoverer.
pub mod service;
/// Capability provider traits implemented by the embedder.
pub mod transport;

pub use config::{DiscoverySettings, SettingsSnapshot};
pub use error::{Error, Result};
pub use events::EventSink;
pub use orchestrator::{DiscoveryListener, DiscoveryOrchestrator};
pub use peer::{
    DiscoveryMode, DiscoveryState, HardwareAddress, PeerDescriptor, PeerId, ResolutionToken,
    ServiceId, TransportKind,
};
pub use registry::{PeerEvent, PeerRegistry};
pub use transport::{
    AdvertiseParams, AdvertisePower, BeaconRadio, Capability, DeviceScanner, ScanDutyCycle,
    ScanFilter, ServiceRadio, Transports,
};
