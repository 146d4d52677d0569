//! Platform identities and their data-channel capability tables
//!
//! The sendable capability of the local engine and the implicit reassembly
//! capability of a remote peer are static facts about each implementation,
//! keyed by identity and version. Remote identity is inferred, best-effort,
//! from a vendor marker in the session-description origin line and is never
//! treated as authoritative.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::session::capability::MaxMessageSize;

/// Default maximum message size assumed for a peer that does not advertise
/// one (RFC 8841 convention).
pub const DEFAULT_MAX_MESSAGE_SIZE: u64 = 65536;

/// Send limit of Gecko builds that predate fragmented-send support, when the
/// remote end is not known to reassemble.
pub const GECKO_LEGACY_SEND_LIMIT: u64 = 16384;

/// Bound Gecko uses once both ends handle message interleaving. Close enough
/// to 2^31 to be effectively unlimited, but still a bounded value.
pub const GECKO_LARGE_MESSAGE_LIMIT: u64 = 2_147_483_637;

/// Username marker Gecko embeds in the origin line of its descriptions
const GECKO_ORIGIN_MARKER: &str = "THIS_IS_SDPARTA-";

/// Known engine families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformId {
    Chromium,
    Gecko,
    WebKit,
    Unknown,
}

impl Default for PlatformId {
    fn default() -> Self {
        Self::Unknown
    }
}

impl std::fmt::Display for PlatformId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformId::Chromium => write!(f, "chromium"),
            PlatformId::Gecko => write!(f, "gecko"),
            PlatformId::WebKit => write!(f, "webkit"),
            PlatformId::Unknown => write!(f, "unknown"),
        }
    }
}

/// Local platform identity and major version
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformInfo {
    pub id: PlatformId,
    pub version: u32,
}

impl PlatformInfo {
    pub fn new(id: PlatformId, version: u32) -> Self {
        Self { id, version }
    }
}

/// Largest single payload the local platform can emit on a data channel.
///
/// Static fact about the local SCTP stack; Gecko's limit additionally depends
/// on whether the remote end is known to reassemble large messages.
pub fn sendable_capability(local: PlatformInfo, remote_gecko: Option<u32>) -> MaxMessageSize {
    match local.id {
        PlatformId::Gecko => match local.version {
            0..=56 => {
                if remote_gecko.is_some() {
                    MaxMessageSize::Bounded(GECKO_LARGE_MESSAGE_LIMIT)
                } else {
                    MaxMessageSize::Bounded(GECKO_LEGACY_SEND_LIMIT)
                }
            }
            // off-by-one in the 57 stack
            57 => MaxMessageSize::Bounded(DEFAULT_MAX_MESSAGE_SIZE - 1),
            58 | 59 => MaxMessageSize::Bounded(DEFAULT_MAX_MESSAGE_SIZE),
            _ => MaxMessageSize::Bounded(GECKO_LARGE_MESSAGE_LIMIT),
        },
        // Conservative bound for everything else, including unrecognized engines
        _ => MaxMessageSize::Bounded(DEFAULT_MAX_MESSAGE_SIZE),
    }
}

/// Capability assumed for a remote peer that advertises no explicit maximum.
pub fn remote_default_capability(local: PlatformInfo, remote_gecko: Option<u32>) -> MaxMessageSize {
    if local.id == PlatformId::Gecko && remote_gecko.is_some() {
        MaxMessageSize::Bounded(GECKO_LARGE_MESSAGE_LIMIT)
    } else {
        MaxMessageSize::Bounded(DEFAULT_MAX_MESSAGE_SIZE)
    }
}

/// Extract the Gecko major version from an origin-line username, if the
/// vendor marker is present.
///
/// Relayed or proxied descriptions may carry a misleading origin line, so
/// callers must treat the result as a hint only.
pub fn gecko_version_from_origin(username: &str) -> Option<u32> {
    let start = username.find(GECKO_ORIGIN_MARKER)? + GECKO_ORIGIN_MARKER.len();
    let rest = &username[start..];
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    match digits.parse() {
        Ok(version) => Some(version),
        Err(_) => {
            debug!("unparseable vendor marker in origin username: {}", username);
            None
        }
    }
}
