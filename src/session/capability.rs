//! Data-channel maximum-message-size negotiation
//!
//! Runs on every remote-description assignment. The derived value combines
//! what the local platform can emit with what the remote peer declared (or
//! is assumed) to reassemble; either side may be unbounded.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::platform::{self, PlatformInfo};
use crate::sdp;

/// Marker in the `m=` proto field identifying a data association section
const SCTP_PROTO_TAG: &str = "SCTP";

/// Largest single payload a data channel can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaxMessageSize {
    Bounded(u64),
    Unbounded,
}

impl MaxMessageSize {
    /// A message must fit within what the sender can emit and what the
    /// receiver can reassemble: unbounded yields to the bounded side, two
    /// bounds combine to the smaller one.
    pub fn combine(self, other: MaxMessageSize) -> MaxMessageSize {
        match (self, other) {
            (MaxMessageSize::Unbounded, MaxMessageSize::Unbounded) => MaxMessageSize::Unbounded,
            (MaxMessageSize::Unbounded, bounded) | (bounded, MaxMessageSize::Unbounded) => bounded,
            (MaxMessageSize::Bounded(a), MaxMessageSize::Bounded(b)) => {
                MaxMessageSize::Bounded(a.min(b))
            }
        }
    }

    pub fn as_bounded(self) -> Option<u64> {
        match self {
            MaxMessageSize::Bounded(limit) => Some(limit),
            MaxMessageSize::Unbounded => None,
        }
    }
}

impl std::fmt::Display for MaxMessageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaxMessageSize::Bounded(limit) => write!(f, "{}", limit),
            MaxMessageSize::Unbounded => write!(f, "unbounded"),
        }
    }
}

/// Derive the session capability from a freshly received remote description.
///
/// Returns `None` when the description negotiates no data association.
pub fn negotiate(local: PlatformInfo, remote_sdp: &str) -> Option<MaxMessageSize> {
    let section = sctp_section(remote_sdp)?;

    let remote_gecko =
        sdp::origin_username(remote_sdp).and_then(platform::gecko_version_from_origin);
    let local_send = platform::sendable_capability(local, remote_gecko);
    let remote = remote_capability(section, local, remote_gecko);

    let combined = local_send.combine(remote);
    debug!(
        local = %local_send,
        remote = %remote,
        derived = %combined,
        "derived data-channel message size limit"
    );
    Some(combined)
}

fn sctp_section(sdp_text: &str) -> Option<&str> {
    sdp::media_sections(sdp_text).into_iter().find(|section| {
        sdp::media_kind(section) == Some("application")
            && sdp::media_proto(section).is_some_and(|proto| proto.contains(SCTP_PROTO_TAG))
    })
}

/// Explicit advertisement wins; zero means the peer accepts any size.
/// Without an advertisement, fall back to the platform default table.
fn remote_capability(
    section: &str,
    local: PlatformInfo,
    remote_gecko: Option<u32>,
) -> MaxMessageSize {
    match sdp::attribute_value(section, "max-message-size").and_then(|v| v.parse::<u64>().ok()) {
        Some(0) => MaxMessageSize::Unbounded,
        Some(limit) => MaxMessageSize::Bounded(limit),
        None => platform::remote_default_capability(local, remote_gecko),
    }
}
