// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 proxim contributors

//! Peer identity and descriptor types shared across the crate.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Maximum accepted byte length of a peer identity string.
pub const MAX_PEER_ID_LEN: usize = 64;

/// Marker used when discovery is started without a display name.
pub const NO_PEER_NAME: &str = "";

/// Opaque peer identity.
///
/// Unique within a [`crate::registry::PeerRegistry`]. Devices that know
/// their hardware address conventionally use its string form as the
/// identity, but any non-empty string up to [`MAX_PEER_ID_LEN`] bytes is
/// accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerId(String);

impl PeerId {
    /// Create a peer identity, validating length bounds.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.is_empty() || id.len() > MAX_PEER_ID_LEN {
            return None;
        }
        Some(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 6-byte short-range hardware identifier.
///
/// An all-zero value means "unknown": platforms that hide the local adapter
/// address report a zeroed placeholder, which is what the address-resolution
/// assist protocol exists to fill in.
///
/// # Display Format
/// Colon-separated hex: "4C:0F:6E:12:34:56"
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct HardwareAddress([u8; 6]);

impl HardwareAddress {
    pub fn from_octets(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// All-zero placeholder for "address not known".
    pub fn unknown() -> Self {
        Self([0; 6])
    }

    pub fn is_unknown(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Parse the colon-separated hex form. Returns `None` on any deviation
    /// from exactly six two-digit hex groups.
    pub fn parse(s: &str) -> Option<Self> {
        let mut octets = [0u8; 6];
        let mut count = 0;
        for part in s.split(':') {
            if count == 6 || part.len() != 2 {
                return None;
            }
            octets[count] = u8::from_str_radix(part, 16).ok()?;
            count += 1;
        }
        if count != 6 {
            return None;
        }
        Some(Self(octets))
    }
}

impl fmt::Display for HardwareAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, byte) in self.0.iter().enumerate() {
            if idx > 0 {
                write!(f, ":")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for HardwareAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HardwareAddress({})", self)
    }
}

/// 16-byte service identifier tagging beacon advertisements.
///
/// Plays the role a service UUID plays on real radios: the primary value is
/// shared by every device running the same application, and a *secondary*
/// value derived from it tags address-resolution assist frames so they are
/// never mistaken for peer presence.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct ServiceId([u8; 16]);

impl ServiceId {
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> [u8; 16] {
        self.0
    }

    /// Derive the secondary (assist) identifier by rotating the last byte
    /// left by one bit.
    ///
    /// This is a fixed, documented obfuscation so the two channels cannot
    /// collide for a given primary id; it is not a cryptographic separation
    /// and offers no impersonation resistance.
    #[must_use]
    pub fn secondary(&self) -> Self {
        let mut bytes = self.0;
        bytes[15] = bytes[15].rotate_left(1);
        Self(bytes)
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, byte) in self.0.iter().enumerate() {
            if idx > 0 && idx % 4 == 0 {
                write!(f, "-")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceId({})", self)
    }
}

/// Which transport produced a discovery observation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Beacon,
    LocalService,
}

/// Which transports a discovery session drives.
///
/// Immutable for the duration of a session; changing it through
/// [`crate::config::DiscoverySettings`] triggers a stop/restart cycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum DiscoveryMode {
    #[default]
    NotSet,
    BeaconOnly,
    LocalServiceOnly,
    BeaconAndLocalService,
}

impl DiscoveryMode {
    pub fn uses_beacon(&self) -> bool {
        matches!(self, Self::BeaconOnly | Self::BeaconAndLocalService)
    }

    pub fn uses_local_service(&self) -> bool {
        matches!(self, Self::LocalServiceOnly | Self::BeaconAndLocalService)
    }
}

/// Orchestrator state. Exactly one value at any time; transitions are
/// serialized under the orchestrator's critical section.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DiscoveryState {
    NotStarted,
    /// The configured transports are all disabled at the platform level;
    /// discovery resumes automatically when one is re-enabled.
    WaitingForServicesEnabled,
    /// Beacon discovery is up but our own hardware address is unknown and a
    /// resolution request is being broadcast.
    WaitingForOwnAddress,
    /// Acting as the provider in an address-resolution assist operation.
    ProvidingAddressToPeer,
    RunningBeacon,
    RunningLocalService,
    RunningBoth,
}

impl DiscoveryState {
    /// True in every state except `NotStarted` and
    /// `WaitingForServicesEnabled`.
    pub fn is_running(&self) -> bool {
        !matches!(self, Self::NotStarted | Self::WaitingForServicesEnabled)
    }
}

/// A discovered peer as held by the registry.
///
/// `id` is unique within the registry. `address` may be absent until the
/// peer (or an assist operation) makes it known; once set it is never
/// cleared by a later sighting lacking one.
#[derive(Debug, Clone)]
pub struct PeerDescriptor {
    pub id: PeerId,
    pub name: Option<String>,
    pub address: Option<HardwareAddress>,
    pub source: TransportKind,
    pub last_seen: Instant,
}

impl PeerDescriptor {
    pub fn new(id: PeerId, source: TransportKind) -> Self {
        Self {
            id,
            name: None,
            address: None,
            source,
            last_seen: Instant::now(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.is_empty() {
            self.name = Some(name);
        }
        self
    }

    #[must_use]
    pub fn with_address(mut self, address: HardwareAddress) -> Self {
        if !address.is_unknown() {
            self.address = Some(address);
        }
        self
    }
}

/// Rendezvous token for one address-resolution assist operation.
///
/// Random, peer-visible, and short-lived: created when a device starts
/// beacon discovery without knowing its own address, consumed when the
/// resolution completes or discovery stops. At most one is outstanding per
/// device.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct ResolutionToken([u8; 8]);

static TOKEN_COUNTER: AtomicU64 = AtomicU64::new(0);

impl ResolutionToken {
    /// Generate a fresh token from a timestamp/pid/counter mix.
    ///
    /// Uniqueness only needs to hold among the handful of devices in radio
    /// range during one rendezvous window, so a splitmix-style scramble of
    /// local entropy is sufficient.
    pub fn generate() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .unwrap_or_else(|_| std::time::Duration::from_secs(0))
            .subsec_nanos();
        let counter = TOKEN_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut seed = u64::from(std::process::id())
            .wrapping_shl(32)
            .wrapping_add(u64::from(nanos))
            .wrapping_add(counter.wrapping_mul(0x9E37_79B9_7F4A_7C15));
        // splitmix64 finalizer
        seed = (seed ^ (seed >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        seed = (seed ^ (seed >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        seed ^= seed >> 31;
        Self(seed.to_be_bytes())
    }

    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> [u8; 8] {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }
}

impl fmt::Display for ResolutionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ResolutionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResolutionToken({})", self)
    }
}
