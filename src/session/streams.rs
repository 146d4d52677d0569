//! Stream/track compatibility engine
//!
//! Callers attach individual tracks or whole streams; the native engine is
//! driven through whichever primitive set it actually has. The identity map
//! is mutated only after the modeled native call has been dispatched
//! successfully, so a failed native operation leaves the map at the last
//! applied state.

use tracing::debug;

use super::{Sender, SenderRecord, Session, SessionState};
use crate::error::{CompatError, Result};
use crate::media::{MediaStream, MediaTrack, SenderId, StreamId, TrackId};
use crate::native::{InternalStreamSpec, NativePrimitives, NativeSenderId};

/// External view of one attached stream: the caller's identity and the
/// member tracks currently backed by senders
#[derive(Debug, Clone)]
pub struct LocalStream {
    pub id: StreamId,
    pub tracks: Vec<MediaTrack>,
}

impl Session {
    /// Attach one track under the given external stream. Creates the
    /// internal stream lazily on the first attachment for that identity.
    pub fn add_track(&self, track: &MediaTrack, stream: &MediaStream) -> Result<Sender> {
        let mut state = self.state.write();
        self.ensure_open(&state)?;

        if state
            .senders
            .values()
            .any(|record| record.track.id() == track.id())
        {
            return Err(CompatError::AlreadyAttached {
                track: track.id().clone(),
            });
        }
        if !stream.contains(track.id()) {
            return Err(CompatError::InvalidArgument(format!(
                "track {} is not a member of stream {}",
                track.id(),
                stream.id()
            )));
        }

        let sender_id = SenderId::random();
        let native_id = match state.identity.internal_for(stream.id()).cloned() {
            None => {
                let internal = StreamId::random();
                let mut results = self.native.add_stream(InternalStreamSpec {
                    id: internal.clone(),
                    tracks: vec![track.clone()],
                })?;
                let native_id = results
                    .pop()
                    .map(|(_, id)| id)
                    .ok_or_else(|| {
                        CompatError::Native("native engine returned no sender".into())
                    })?;
                state
                    .identity
                    .bind(stream.id().clone(), internal, sender_id.clone())?;
                native_id
            }
            Some(internal) => {
                let native_id = self.append_track(&mut state, track, stream.id(), &internal)?;
                state.identity.add_sender(stream.id(), sender_id.clone());
                native_id
            }
        };

        let sender = Sender {
            id: sender_id.clone(),
            session: self.id.clone(),
            track: track.clone(),
            stream: stream.id().clone(),
        };
        state.senders.insert(
            sender_id,
            SenderRecord {
                track: track.clone(),
                stream: stream.id().clone(),
                native: native_id,
            },
        );
        drop(state);

        debug!(session = %self.id, track = %track.id(), stream = %stream.id(), "track attached");
        self.schedule_negotiation_needed();
        Ok(sender)
    }

    /// Attach every current member track of the stream. Fails without any
    /// attachment when one of them already has a sender.
    pub fn add_stream(&self, stream: &MediaStream) -> Result<Vec<Sender>> {
        let tracks = stream.tracks();
        {
            let state = self.state.read();
            self.ensure_open(&state)?;
            for track in &tracks {
                if state
                    .senders
                    .values()
                    .any(|record| record.track.id() == track.id())
                {
                    return Err(CompatError::AlreadyAttached {
                        track: track.id().clone(),
                    });
                }
            }
        }

        let mut senders = Vec::with_capacity(tracks.len());
        for track in &tracks {
            senders.push(self.add_track(track, stream)?);
        }
        Ok(senders)
    }

    /// Detach one sender. A sender that was already detached is a no-op;
    /// a sender from another session is an error.
    pub fn remove_track(&self, sender: &Sender) -> Result<()> {
        let mut state = self.state.write();
        self.ensure_open(&state)?;

        if sender.session != self.id {
            return Err(CompatError::NotOwned {
                sender: sender.id.clone(),
            });
        }
        let record = match state.senders.get(&sender.id) {
            Some(record) => record.clone(),
            None => {
                debug!(session = %self.id, sender = %sender.id, "sender already detached");
                return Ok(());
            }
        };

        let internal = match state.identity.internal_for(&record.stream).cloned() {
            Some(internal) => internal,
            None => {
                return Err(CompatError::Native(format!(
                    "no identity entry for stream {}",
                    record.stream
                )))
            }
        };
        let remaining = state
            .identity
            .entry(&record.stream)
            .map(|entry| entry.senders.len())
            .unwrap_or(0);

        if remaining <= 1 {
            // last sender: the backing internal stream goes away with it
            self.native.remove_stream(&internal)?;
        } else {
            self.drop_track(&mut state, &record, &internal, &sender.id)?;
        }

        state.identity.remove_sender(&record.stream, &sender.id);
        state.senders.remove(&sender.id);
        drop(state);

        debug!(session = %self.id, sender = %sender.id, "sender detached");
        self.schedule_negotiation_needed();
        Ok(())
    }

    /// Detach every sender associated with the stream's identity entry.
    /// Unknown streams are tolerated the same way re-detached senders are.
    pub fn remove_stream(&self, stream: &MediaStream) -> Result<()> {
        let mut state = self.state.write();
        self.ensure_open(&state)?;

        let internal = match state.identity.internal_for(stream.id()).cloned() {
            Some(internal) => internal,
            None => {
                debug!(session = %self.id, stream = %stream.id(), "stream not attached; nothing to remove");
                return Ok(());
            }
        };

        self.native.remove_stream(&internal)?;
        state.identity.release(stream.id());
        state
            .senders
            .retain(|_, record| &record.stream != stream.id());
        drop(state);

        debug!(session = %self.id, stream = %stream.id(), "stream detached");
        self.schedule_negotiation_needed();
        Ok(())
    }

    /// The attached streams as the caller knows them: external identities
    /// with their member tracks.
    pub fn local_streams(&self) -> Vec<LocalStream> {
        let state = self.state.read();
        state
            .identity
            .iter()
            .map(|(external, entry)| {
                let tracks = entry
                    .senders
                    .iter()
                    .filter_map(|sender_id| state.senders.get(sender_id))
                    .map(|record| record.track.clone())
                    .collect();
                LocalStream {
                    id: external.clone(),
                    tracks,
                }
            })
            .collect()
    }

    /// Append a track to an existing internal stream using whichever
    /// primitive the native engine has.
    fn append_track(
        &self,
        state: &mut SessionState,
        track: &MediaTrack,
        external: &StreamId,
        internal: &StreamId,
    ) -> Result<NativeSenderId> {
        match self.primitives {
            NativePrimitives::TrackAppend => self.native.add_track_to_stream(track, internal),
            NativePrimitives::StreamLevel => {
                let mut tracks: Vec<MediaTrack> = state
                    .senders
                    .values()
                    .filter(|record| &record.stream == external)
                    .map(|record| record.track.clone())
                    .collect();
                tracks.push(track.clone());

                let results = self.reissue_stream(state, external, internal, tracks)?;
                results
                    .into_iter()
                    .find(|(track_id, _)| track_id == track.id())
                    .map(|(_, native_id)| native_id)
                    .ok_or_else(|| {
                        CompatError::Native("native engine returned no sender for appended track".into())
                    })
            }
        }
    }

    /// Remove one track from an internal stream that keeps other senders
    fn drop_track(
        &self,
        state: &mut SessionState,
        record: &SenderRecord,
        internal: &StreamId,
        sender_id: &SenderId,
    ) -> Result<()> {
        match self.primitives {
            NativePrimitives::TrackAppend => self
                .native
                .remove_track_from_stream(&record.native, internal),
            NativePrimitives::StreamLevel => {
                let tracks: Vec<MediaTrack> = state
                    .senders
                    .iter()
                    .filter(|(id, r)| r.stream == record.stream && id != &sender_id)
                    .map(|(_, r)| r.track.clone())
                    .collect();
                self.reissue_stream(state, &record.stream, internal, tracks)
                    .map(|_| ())
            }
        }
    }

    /// Whole-stream fallback: re-issue the internal stream with its updated
    /// membership and refresh the native sender handles of the surviving
    /// records.
    fn reissue_stream(
        &self,
        state: &mut SessionState,
        external: &StreamId,
        internal: &StreamId,
        tracks: Vec<MediaTrack>,
    ) -> Result<Vec<(TrackId, NativeSenderId)>> {
        self.native.remove_stream(internal)?;
        let results = self.native.add_stream(InternalStreamSpec {
            id: internal.clone(),
            tracks,
        })?;

        for (track_id, native_id) in &results {
            for record in state.senders.values_mut() {
                if &record.stream == external && record.track.id() == track_id {
                    record.native = native_id.clone();
                }
            }
        }
        Ok(results)
    }
}
