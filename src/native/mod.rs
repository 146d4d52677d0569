//! Native platform boundary
//!
//! The engine never talks to the underlying platform directly; everything
//! goes through [`NativeSession`]. Implementations wrap whatever peer
//! connection object the platform provides. Which per-stream primitives an
//! implementation actually supports is described by [`NativePrimitives`],
//! resolved once at session construction instead of probed per call.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::media::{MediaTrack, StreamId, TrackId};
use crate::platform::{PlatformId, PlatformInfo};

#[cfg(test)]
pub mod mock;

/// Kind of a session description
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Pranswer,
    Answer,
    Rollback,
    /// No kind set. Assigning an unspecified description means "renegotiate
    /// with previous parameters"; reading one means nothing was negotiated
    /// yet.
    #[default]
    Unspecified,
}

impl std::fmt::Display for SdpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SdpKind::Offer => write!(f, "offer"),
            SdpKind::Pranswer => write!(f, "pranswer"),
            SdpKind::Answer => write!(f, "answer"),
            SdpKind::Rollback => write!(f, "rollback"),
            SdpKind::Unspecified => write!(f, ""),
        }
    }
}

/// `{type, sdp}` description object exchanged with the native engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }

    pub fn is_unspecified(&self) -> bool {
        self.kind == SdpKind::Unspecified
    }
}

/// Options forwarded untouched to native offer creation
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferOptions {
    pub ice_restart: bool,
}

/// Options forwarded untouched to native answer creation
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AnswerOptions {}

/// Handle the native engine returns for one attached track
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NativeSenderId(String);

impl NativeSenderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NativeSenderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A synthesized internal stream handed whole to the native engine
#[derive(Debug, Clone)]
pub struct InternalStreamSpec {
    pub id: StreamId,
    pub tracks: Vec<MediaTrack>,
}

/// Which per-stream primitives the native engine provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NativePrimitives {
    /// Whole-stream attach/detach only; membership changes re-issue the
    /// stream with its updated track set
    StreamLevel,
    /// A single track can be appended to or removed from an
    /// already-negotiated stream without re-issuing it
    TrackAppend,
}

impl NativePrimitives {
    /// Resolve the primitive set for a platform. Unrecognized engines get
    /// the whole-stream fallback.
    pub fn for_platform(platform: PlatformInfo) -> Self {
        match platform.id {
            PlatformId::Chromium | PlatformId::Gecko => NativePrimitives::TrackAppend,
            PlatformId::WebKit | PlatformId::Unknown => NativePrimitives::StreamLevel,
        }
    }
}

/// One native negotiation context.
///
/// The stream/track primitives are synchronous calls into the platform; the
/// description operations are deferred. Errors cross this boundary
/// untranslated, wrapped in [`crate::CompatError::Native`] by the
/// implementation.
#[async_trait]
pub trait NativeSession: Send + Sync {
    /// Attach a whole internal stream. Returns one native sender per track,
    /// in track order.
    fn add_stream(&self, stream: InternalStreamSpec) -> Result<Vec<(TrackId, NativeSenderId)>>;

    /// Append one track to an already-negotiated internal stream
    /// (TrackAppend platforms only)
    fn add_track_to_stream(
        &self,
        track: &MediaTrack,
        stream_id: &StreamId,
    ) -> Result<NativeSenderId>;

    /// Remove one track from an internal stream (TrackAppend platforms only)
    fn remove_track_from_stream(
        &self,
        sender: &NativeSenderId,
        stream_id: &StreamId,
    ) -> Result<()>;

    /// Detach a whole internal stream
    fn remove_stream(&self, stream_id: &StreamId) -> Result<()>;

    async fn create_offer(&self, options: OfferOptions) -> Result<SessionDescription>;

    async fn create_answer(&self, options: AnswerOptions) -> Result<SessionDescription>;

    async fn set_local_description(&self, description: SessionDescription) -> Result<()>;

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()>;

    /// Current local description as the native engine holds it, with
    /// internal identifiers
    fn local_description(&self) -> Option<SessionDescription>;

    /// Hand a payload to the native data-channel transport
    fn send_data(&self, channel: &str, payload: Bytes) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_wire_shape() {
        let desc = SessionDescription::offer("v=0\r\n");
        let json = serde_json::to_value(&desc).unwrap();
        assert_eq!(json["type"], "offer");
        assert_eq!(json["sdp"], "v=0\r\n");

        let back: SessionDescription = serde_json::from_value(json).unwrap();
        assert_eq!(back, desc);
    }

    #[test]
    fn test_default_description_is_unspecified() {
        let desc = SessionDescription::default();
        assert!(desc.is_unspecified());
        assert!(desc.sdp.is_empty());
    }

    #[test]
    fn test_primitives_lookup() {
        let chromium = PlatformInfo::new(PlatformId::Chromium, 90);
        assert_eq!(
            NativePrimitives::for_platform(chromium),
            NativePrimitives::TrackAppend
        );
        assert_eq!(
            NativePrimitives::for_platform(PlatformInfo::default()),
            NativePrimitives::StreamLevel
        );
    }
}
