// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 proxim contributors

//! Advertisement payload encoding.
//!
//! The byte layout is fixed for interoperability between devices running
//! this protocol. Change it and mixed fleets stop seeing each other.
//!
//! Format (35 + n bytes total):
//! - Manufacturer tag: 2 bytes (0x0F17, little-endian)
//! - Format version: 1 byte (0x01)
//! - Service identifier: 16 bytes (primary or secondary)
//! - Hardware address: 6 bytes (all zeros = unknown)
//! - Frame kind: 1 byte (0 presence, 1 resolve-request, 2 ready-to-provide,
//!   3 resolved-address)
//! - Resolution token: 8 bytes (all zeros on presence frames)
//! - Name length n: 1 byte (0..=32)
//! - Name: n bytes UTF-8
//!
//! Presence frames ride the primary service identifier; the three assist
//! kinds ride the secondary one and never carry a name.

use crate::error::{Error, Result};
use crate::peer::{HardwareAddress, ResolutionToken, ServiceId};

/// Manufacturer-style tag marking proxim advertisements.
pub const MANUFACTURER_TAG: u16 = 0x0F17;

/// Advertisement format version understood by this implementation.
pub const FORMAT_VERSION: u8 = 0x01;

/// Maximum advertised display-name length in bytes.
pub const MAX_NAME_LEN: usize = 32;

/// Fixed portion of the frame preceding the variable-length name.
pub const HEADER_LEN: usize = 35;

const OFF_VERSION: usize = 2;
const OFF_SERVICE_ID: usize = 3;
const OFF_ADDRESS: usize = 19;
const OFF_KIND: usize = 25;
const OFF_TOKEN: usize = 26;
const OFF_NAME_LEN: usize = 34;

/// What a frame says, discriminating presence from the assist protocol.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameKind {
    /// Normal peer presence.
    Presence,
    /// "I do not know my own hardware address, please help me find it."
    ResolveRequest,
    /// Provider signal: "make yourself enumerable, I am ready to look."
    ReadyToProvide,
    /// Loop-back delivery: "this address belongs to you."
    ResolvedAddress,
}

impl FrameKind {
    fn to_byte(self) -> u8 {
        match self {
            FrameKind::Presence => 0,
            FrameKind::ResolveRequest => 1,
            FrameKind::ReadyToProvide => 2,
            FrameKind::ResolvedAddress => 3,
        }
    }

    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(FrameKind::Presence),
            1 => Some(FrameKind::ResolveRequest),
            2 => Some(FrameKind::ReadyToProvide),
            3 => Some(FrameKind::ResolvedAddress),
            _ => None,
        }
    }
}

/// Decoded advertisement frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisementFrame {
    pub service_id: ServiceId,
    pub kind: FrameKind,
    pub address: HardwareAddress,
    pub token: ResolutionToken,
    pub name: String,
}

impl AdvertisementFrame {
    /// Normal presence frame under the primary identifier.
    pub fn presence(service_id: ServiceId, name: &str, address: HardwareAddress) -> Self {
        Self {
            service_id,
            kind: FrameKind::Presence,
            address,
            token: ResolutionToken::from_bytes([0; 8]),
            name: truncate_name(name),
        }
    }

    /// Requester frame under the secondary identifier.
    pub fn resolve_request(secondary_id: ServiceId, token: ResolutionToken) -> Self {
        Self {
            service_id: secondary_id,
            kind: FrameKind::ResolveRequest,
            address: HardwareAddress::unknown(),
            token,
            name: String::new(),
        }
    }

    /// Provider ready signal under the secondary identifier.
    pub fn ready_to_provide(secondary_id: ServiceId, token: ResolutionToken) -> Self {
        Self {
            service_id: secondary_id,
            kind: FrameKind::ReadyToProvide,
            address: HardwareAddress::unknown(),
            token,
            name: String::new(),
        }
    }

    /// Loop-back address delivery under the secondary identifier.
    pub fn resolved_address(
        secondary_id: ServiceId,
        token: ResolutionToken,
        address: HardwareAddress,
    ) -> Self {
        Self {
            service_id: secondary_id,
            kind: FrameKind::ResolvedAddress,
            address,
            token,
            name: String::new(),
        }
    }

    /// Encode into the fixed wire layout.
    pub fn encode(&self) -> Vec<u8> {
        let name = self.name.as_bytes();
        let mut buf = vec![0u8; HEADER_LEN + name.len()];

        buf[0..2].copy_from_slice(&MANUFACTURER_TAG.to_le_bytes());
        buf[OFF_VERSION] = FORMAT_VERSION;
        buf[OFF_SERVICE_ID..OFF_SERVICE_ID + 16].copy_from_slice(&self.service_id.as_bytes());
        buf[OFF_ADDRESS..OFF_ADDRESS + 6].copy_from_slice(&self.address.octets());
        buf[OFF_KIND] = self.kind.to_byte();
        buf[OFF_TOKEN..OFF_TOKEN + 8].copy_from_slice(&self.token.as_bytes());
        buf[OFF_NAME_LEN] = name.len() as u8;
        buf[HEADER_LEN..].copy_from_slice(name);

        buf
    }

    /// Decode from the fixed wire layout.
    ///
    /// Rejects short buffers, foreign manufacturer tags, unknown versions,
    /// unknown frame kinds and malformed names. Trailing bytes beyond the
    /// declared name are tolerated (radios pad advertisement slots).
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() < HEADER_LEN {
            return Err(Error::PayloadTruncated(payload.len()));
        }

        let tag = u16::from_le_bytes([payload[0], payload[1]]);
        if tag != MANUFACTURER_TAG {
            return Err(Error::PayloadTag(tag));
        }
        if payload[OFF_VERSION] != FORMAT_VERSION {
            return Err(Error::PayloadVersion(payload[OFF_VERSION]));
        }

        let mut service_id = [0u8; 16];
        service_id.copy_from_slice(&payload[OFF_SERVICE_ID..OFF_SERVICE_ID + 16]);

        let mut address = [0u8; 6];
        address.copy_from_slice(&payload[OFF_ADDRESS..OFF_ADDRESS + 6]);

        let kind = FrameKind::from_byte(payload[OFF_KIND])
            .ok_or(Error::PayloadKind(payload[OFF_KIND]))?;

        let mut token = [0u8; 8];
        token.copy_from_slice(&payload[OFF_TOKEN..OFF_TOKEN + 8]);

        let name_len = payload[OFF_NAME_LEN] as usize;
        if name_len > MAX_NAME_LEN || payload.len() < HEADER_LEN + name_len {
            return Err(Error::PayloadName);
        }
        let name = std::str::from_utf8(&payload[HEADER_LEN..HEADER_LEN + name_len])
            .map_err(|_| Error::PayloadName)?
            .to_string();

        Ok(Self {
            service_id: ServiceId::from_bytes(service_id),
            kind,
            address: HardwareAddress::from_octets(address),
            token: ResolutionToken::from_bytes(token),
            name,
        })
    }
}

fn truncate_name(name: &str) -> String {
    if name.len() <= MAX_NAME_LEN {
        return name.to_string();
    }
    // Back off to a char boundary so the truncated name stays valid UTF-8.
    let mut end = MAX_NAME_LEN;
    while end > 0 && !name.is_char_boundary(end) {
        end -= 1;
    }
    name[..end].to_string()
}
