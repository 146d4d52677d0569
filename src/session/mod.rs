//! Negotiation session compatibility layer
//!
//! One [`Session`] wraps one native negotiation context and gives callers
//! both the per-track and the whole-stream attachment model, whichever the
//! native engine is missing. Outgoing descriptions show the caller its own
//! stream identities; the native engine only ever sees the synthesized
//! internal ones. Remote-description assignment additionally derives the
//! data-channel message size limit the send guard enforces.

pub mod capability;
pub mod identity;
mod streams;

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::error::{CompatError, Result};
use crate::media::{MediaTrack, SenderId, SessionId, StreamId};
use crate::native::{
    AnswerOptions, NativePrimitives, NativeSenderId, NativeSession, OfferOptions,
    SessionDescription,
};
use crate::platform::PlatformInfo;
use crate::sdp::rewrite;

pub use capability::MaxMessageSize;
pub use identity::{IdentityEntry, IdentityMap, SenderRemoval};
pub use streams::LocalStream;

/// Session configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Local platform identity and version
    pub platform: PlatformInfo,
    /// Override for the native primitive set; resolved from the platform
    /// when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primitives: Option<NativePrimitives>,
}

/// Handle representing one track's attachment to a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    id: SenderId,
    session: SessionId,
    track: MediaTrack,
    stream: StreamId,
}

impl Sender {
    pub fn id(&self) -> &SenderId {
        &self.id
    }

    pub fn track(&self) -> &MediaTrack {
        &self.track
    }

    pub fn stream_id(&self) -> &StreamId {
        &self.stream
    }
}

/// Engine-side record backing a [`Sender`] handle
#[derive(Debug, Clone)]
struct SenderRecord {
    track: MediaTrack,
    stream: StreamId,
    native: NativeSenderId,
}

#[derive(Default)]
struct SessionState {
    identity: IdentityMap,
    senders: HashMap<SenderId, SenderRecord>,
    max_message_size: Option<MaxMessageSize>,
    closed: bool,
}

/// One negotiation context between the local and a remote peer
pub struct Session {
    id: SessionId,
    native: Arc<dyn NativeSession>,
    primitives: NativePrimitives,
    platform: PlatformInfo,
    state: RwLock<SessionState>,
    negotiation_tx: broadcast::Sender<()>,
}

impl Session {
    /// Create a session over a native negotiation context. The native
    /// primitive set is resolved here, once, from the platform lookup.
    pub fn new(native: Arc<dyn NativeSession>, config: SessionConfig) -> Self {
        let primitives = config
            .primitives
            .unwrap_or_else(|| NativePrimitives::for_platform(config.platform));
        let (negotiation_tx, _) = broadcast::channel(16);
        let id = SessionId::random();

        info!(
            session = %id,
            platform = %config.platform.id,
            ?primitives,
            "session created"
        );

        Self {
            id,
            native,
            primitives,
            platform: config.platform,
            state: RwLock::new(SessionState::default()),
            negotiation_tx,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn platform(&self) -> PlatformInfo {
        self.platform
    }

    pub fn primitives(&self) -> NativePrimitives {
        self.primitives
    }

    /// Subscribe to the renegotiation-needed signal. The engine emits one
    /// tick per membership-changing attach/detach; subscribers observe it at
    /// their next poll, never inside the mutating call.
    pub fn negotiation_needed(&self) -> broadcast::Receiver<()> {
        self.negotiation_tx.subscribe()
    }

    fn schedule_negotiation_needed(&self) {
        // no subscribers is fine
        let _ = self.negotiation_tx.send(());
    }

    fn ensure_open(&self, state: &SessionState) -> Result<()> {
        if state.closed {
            return Err(CompatError::InvalidArgument("session is closed".into()));
        }
        Ok(())
    }

    /// Create an offer and return it with external identifiers
    pub async fn create_offer(&self, options: OfferOptions) -> Result<SessionDescription> {
        self.ensure_open(&self.state.read())?;
        let description = self.native.create_offer(options).await?;
        Ok(self.externalize(description))
    }

    /// Create an answer and return it with external identifiers
    pub async fn create_answer(&self, options: AnswerOptions) -> Result<SessionDescription> {
        self.ensure_open(&self.state.read())?;
        let description = self.native.create_answer(options).await?;
        Ok(self.externalize(description))
    }

    /// Assign the local description. An unspecified kind means "renegotiate
    /// with previous parameters" and passes through untouched; anything else
    /// is rewritten so the native engine sees its own internal identifiers.
    pub async fn set_local_description(&self, description: SessionDescription) -> Result<()> {
        self.ensure_open(&self.state.read())?;
        if description.is_unspecified() {
            return self.native.set_local_description(description).await;
        }
        let description = self.internalize(description);
        self.native.set_local_description(description).await
    }

    /// Assign the remote description. Derives and publishes the
    /// max-message-size capability before delegating, so the value is
    /// already readable when the native operation completes.
    pub async fn set_remote_description(&self, description: SessionDescription) -> Result<()> {
        self.ensure_open(&self.state.read())?;
        let derived = capability::negotiate(self.platform, &description.sdp);
        self.state.write().max_message_size = derived;
        self.native.set_remote_description(description).await
    }

    /// Externally-rewritten view of the current local description, computed
    /// on every read: the identity map can change between reads. Before any
    /// description is set this returns an unspecified, empty description.
    pub fn local_description(&self) -> SessionDescription {
        let current = match self.native.local_description() {
            Some(description) => description,
            None => return SessionDescription::default(),
        };
        if current.is_unspecified() {
            return current;
        }
        self.externalize(current)
    }

    /// Negotiated data-channel message size limit; `None` until a remote
    /// description negotiating a data association has been assigned.
    pub fn max_message_size(&self) -> Option<MaxMessageSize> {
        self.state.read().max_message_size
    }

    /// Send a payload on a data channel, enforcing the negotiated message
    /// size limit without contacting the native transport when it fails.
    pub fn send(&self, channel: &str, payload: Bytes) -> Result<()> {
        self.ensure_open(&self.state.read())?;
        if let Some(MaxMessageSize::Bounded(limit)) = self.max_message_size() {
            if payload.len() as u64 > limit {
                return Err(CompatError::MessageTooLarge {
                    size: payload.len(),
                    limit,
                });
            }
        }
        self.native.send_data(channel, payload)
    }

    /// Callback-style offer creation for legacy callers; thin adapter over
    /// the deferred form. Requires a running runtime.
    pub fn create_offer_with_callbacks<S, F>(
        self: Arc<Self>,
        options: OfferOptions,
        on_success: S,
        on_failure: F,
    ) where
        S: FnOnce(SessionDescription) + Send + 'static,
        F: FnOnce(CompatError) + Send + 'static,
    {
        tokio::spawn(async move {
            match self.create_offer(options).await {
                Ok(description) => on_success(description),
                Err(err) => on_failure(err),
            }
        });
    }

    /// Callback-style answer creation for legacy callers
    pub fn create_answer_with_callbacks<S, F>(
        self: Arc<Self>,
        options: AnswerOptions,
        on_success: S,
        on_failure: F,
    ) where
        S: FnOnce(SessionDescription) + Send + 'static,
        F: FnOnce(CompatError) + Send + 'static,
    {
        tokio::spawn(async move {
            match self.create_answer(options).await {
                Ok(description) => on_success(description),
                Err(err) => on_failure(err),
            }
        });
    }

    /// Close the session and release all owned state
    pub async fn close(&self) -> Result<()> {
        {
            let mut state = self.state.write();
            if state.closed {
                return Ok(());
            }
            state.closed = true;
            state.identity.clear();
            state.senders.clear();
            state.max_message_size = None;
        }
        info!(session = %self.id, "session closed");
        self.native.close().await
    }

    fn externalize(&self, mut description: SessionDescription) -> SessionDescription {
        let ids = self.state.read().identity.internal_to_external();
        description.sdp = rewrite::substitute_stream_ids(&description.sdp, &ids);
        description
    }

    fn internalize(&self, mut description: SessionDescription) -> SessionDescription {
        let ids = self.state.read().identity.external_to_internal();
        if !ids.is_empty() {
            debug!(session = %self.id, entries = ids.len(), "rewriting description toward native engine");
        }
        description.sdp = rewrite::substitute_stream_ids(&description.sdp, &ids);
        description
    }
}
