//! rtc-compat - WebRTC session compatibility layer
//!
//! This crate reconciles the legacy whole-stream and the modern per-track
//! media attachment models on top of a native engine that only implements
//! one of them, keeps the session-description text each side sees consistent
//! with the identities it knows, and derives the data-channel maximum
//! message size from exchanged descriptions.

pub mod error;
pub mod media;
pub mod native;
pub mod platform;
pub mod sdp;
pub mod session;

pub use error::{CompatError, Result};
pub use media::{MediaStream, MediaTrack, SenderId, SessionId, StreamId, TrackId, TrackKind};
pub use native::{
    AnswerOptions, NativePrimitives, NativeSenderId, NativeSession, OfferOptions, SdpKind,
    SessionDescription,
};
pub use platform::{PlatformId, PlatformInfo};
pub use session::{LocalStream, MaxMessageSize, Sender, Session, SessionConfig};
