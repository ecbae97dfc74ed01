// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 proxim contributors

//! Errors returned by proxim operations.

use crate::transport::Capability;

/// Errors returned by proxim operations.
///
/// Configuration errors fail fast with state unchanged. Transport errors are
/// non-fatal: the affected transport is treated as not started for the
/// current cycle and retried when availability is restored. There is no
/// unrecoverable variant: the worst outcome is `NotStarted`, from which
/// `start()` can always be retried.
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// No discovery mode configured (call `DiscoverySettings::set_discovery_mode`).
    ModeNotSet,
    /// Peer identity string is empty or exceeds the maximum length.
    InvalidIdentity(String),

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// The platform radio backing this transport is disabled.
    TransportUnavailable(&'static str),
    /// The transport capability refused to start.
    StartFailed(&'static str),
    /// An assist advertisement for a different target is already outstanding.
    AdvertisementBusy,
    /// The embedder denied a required capability.
    PermissionDenied(Capability),

    // ========================================================================
    // Payload Errors
    // ========================================================================
    /// Advertisement frame shorter than the fixed header.
    PayloadTruncated(usize),
    /// Advertisement frame does not carry the proxim manufacturer tag.
    PayloadTag(u16),
    /// Advertisement frame version is not understood.
    PayloadVersion(u8),
    /// Advertisement frame kind is not understood.
    PayloadKind(u8),
    /// Advertised display name is oversize or not valid UTF-8.
    PayloadName,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // Configuration
            Error::ModeNotSet => write!(f, "Discovery mode not set"),
            Error::InvalidIdentity(id) => write!(f, "Invalid peer identity: {:?}", id),
            // Transport
            Error::TransportUnavailable(which) => {
                write!(f, "Transport unavailable: {}", which)
            }
            Error::StartFailed(which) => write!(f, "Transport failed to start: {}", which),
            Error::AdvertisementBusy => {
                write!(f, "Assist advertisement already outstanding")
            }
            Error::PermissionDenied(capability) => {
                write!(f, "Permission denied: {:?}", capability)
            }
            // Payload
            Error::PayloadTruncated(len) => {
                write!(f, "Advertisement truncated: {} bytes", len)
            }
            Error::PayloadTag(tag) => write!(f, "Unknown manufacturer tag: {:#06x}", tag),
            Error::PayloadVersion(version) => {
                write!(f, "Unsupported advertisement version: {}", version)
            }
            Error::PayloadKind(kind) => {
                write!(f, "Unknown advertisement frame kind: {}", kind)
            }
            Error::PayloadName => write!(f, "Malformed advertised name"),
        }
    }
}

impl std::error::Error for Error {}

/// Convenient alias for API results using the public `Error` type.
pub type Result<T> = core::result::Result<T, Error>;
