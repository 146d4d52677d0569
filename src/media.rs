//! Caller-side media identities: tracks, streams and their identifiers

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a fresh random identifier
            pub fn random() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

id_type!(
    /// Identifier of a media track
    TrackId
);
id_type!(
    /// Identifier of a media stream (external or synthesized internal)
    StreamId
);
id_type!(
    /// Identifier of a sender handle
    SenderId
);
id_type!(
    /// Identifier of a negotiation session
    SessionId
);

/// Kind of media a track carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Video => write!(f, "video"),
        }
    }
}

/// A single media track as seen by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaTrack {
    id: TrackId,
    kind: TrackKind,
}

impl MediaTrack {
    /// Create a track with a fresh random identifier
    pub fn new(kind: TrackKind) -> Self {
        Self {
            id: TrackId::random(),
            kind,
        }
    }

    /// Create a track with a known identifier
    pub fn with_id(id: impl Into<TrackId>, kind: TrackKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    pub fn id(&self) -> &TrackId {
        &self.id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }
}

/// An external media stream: a stable identity plus a mutable set of member
/// tracks. Membership changes outside the engine (e.g. on a capture source),
/// so the track list is shared and interior-mutable.
#[derive(Debug, Clone)]
pub struct MediaStream {
    id: StreamId,
    tracks: Arc<RwLock<Vec<MediaTrack>>>,
}

impl MediaStream {
    /// Create an empty stream with a fresh random identifier
    pub fn new() -> Self {
        Self::with_id(StreamId::random())
    }

    /// Create an empty stream with a known identifier
    pub fn with_id(id: impl Into<StreamId>) -> Self {
        Self {
            id: id.into(),
            tracks: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn id(&self) -> &StreamId {
        &self.id
    }

    /// Add a member track. Duplicate ids are ignored.
    pub fn add_track(&self, track: MediaTrack) {
        let mut tracks = self.tracks.write();
        if !tracks.iter().any(|t| t.id() == track.id()) {
            tracks.push(track);
        }
    }

    /// Remove a member track, returning whether it was present.
    pub fn remove_track(&self, id: &TrackId) -> bool {
        let mut tracks = self.tracks.write();
        let before = tracks.len();
        tracks.retain(|t| t.id() != id);
        tracks.len() != before
    }

    /// Whether the track is currently a member of this stream
    pub fn contains(&self, id: &TrackId) -> bool {
        self.tracks.read().iter().any(|t| t.id() == id)
    }

    /// Snapshot of the current member tracks
    pub fn tracks(&self) -> Vec<MediaTrack> {
        self.tracks.read().clone()
    }
}

impl Default for MediaStream {
    fn default() -> Self {
        Self::new()
    }
}
