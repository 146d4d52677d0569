//! Scripted in-memory native engine for tests
//!
//! Tracks the internal streams it was handed, produces canned descriptions
//! that carry their identifiers, records every primitive call, and fails on
//! demand so dispatch-ordering behavior can be exercised.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use super::{
    AnswerOptions, InternalStreamSpec, NativeSenderId, NativeSession, OfferOptions,
    SessionDescription,
};
use crate::error::{CompatError, Result};
use crate::media::{MediaTrack, StreamId, TrackId};

#[derive(Default)]
struct MockState {
    streams: Vec<(StreamId, Vec<MediaTrack>)>,
    senders: HashMap<NativeSenderId, (StreamId, TrackId)>,
    local: Option<SessionDescription>,
    remote: Option<SessionDescription>,
    calls: Vec<String>,
    sent: Vec<(String, Bytes)>,
    fail_next: bool,
    next_sender: u32,
    closed: bool,
}

/// In-memory [`NativeSession`] double
#[derive(Default)]
pub struct MockNativeSession {
    state: Mutex<MockState>,
}

impl MockNativeSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next stream/track primitive fail
    pub fn fail_next_primitive(&self) {
        self.state.lock().fail_next = true;
    }

    /// Every primitive call recorded so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    /// Payloads handed to the data-channel transport
    pub fn sent(&self) -> Vec<(String, Bytes)> {
        self.state.lock().sent.clone()
    }

    pub fn stream_count(&self) -> usize {
        self.state.lock().streams.len()
    }

    /// Internal stream identities currently attached, in attach order
    pub fn stream_ids(&self) -> Vec<StreamId> {
        self.state
            .lock()
            .streams
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn stream_tracks(&self, id: &StreamId) -> Option<Vec<TrackId>> {
        let state = self.state.lock();
        state
            .streams
            .iter()
            .find(|(sid, _)| sid == id)
            .map(|(_, tracks)| tracks.iter().map(|t| t.id().clone()).collect())
    }

    pub fn remote_description(&self) -> Option<SessionDescription> {
        self.state.lock().remote.clone()
    }

    pub fn stored_local_description(&self) -> Option<SessionDescription> {
        self.state.lock().local.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    fn check_failure(state: &mut MockState) -> Result<()> {
        if state.fail_next {
            state.fail_next = false;
            return Err(CompatError::Native("injected primitive failure".into()));
        }
        Ok(())
    }

    fn next_sender_id(state: &mut MockState) -> NativeSenderId {
        state.next_sender += 1;
        NativeSenderId::new(format!("ns-{}", state.next_sender))
    }

    /// Build a description from the current internal streams, identifiers
    /// included, the way a real engine would emit them.
    fn build_sdp(state: &MockState) -> String {
        let mut sdp = String::from(
            "v=0\r\n\
             o=- 4611731400430051336 2 IN IP4 127.0.0.1\r\n\
             s=-\r\n\
             t=0 0\r\n",
        );

        let stream_ids: Vec<&str> = state.streams.iter().map(|(id, _)| id.as_str()).collect();
        sdp.push_str(&format!("a=msid-semantic: WMS {}\r\n", stream_ids.join(" ")));

        let mut mid = 0;
        for (stream_id, tracks) in &state.streams {
            for track in tracks {
                let (kind, payload) = match track.kind() {
                    crate::media::TrackKind::Audio => ("audio", 111),
                    crate::media::TrackKind::Video => ("video", 96),
                };
                sdp.push_str(&format!("m={} 9 UDP/TLS/RTP/SAVPF {}\r\n", kind, payload));
                sdp.push_str("c=IN IP4 0.0.0.0\r\n");
                sdp.push_str(&format!("a=mid:{}\r\n", mid));
                sdp.push_str("a=fingerprint:sha-256 19:E2:1C:3B:4B:9F:81:E6:B8:5C:F4:A5:A8:D8:73:04\r\n");
                sdp.push_str("a=sendrecv\r\n");
                sdp.push_str(&format!("a=msid:{} {}\r\n", stream_id, track.id()));
                sdp.push_str(&format!(
                    "a=ssrc:{} msid:{} {}\r\n",
                    1001 + mid,
                    stream_id,
                    track.id()
                ));
                mid += 1;
            }
        }
        sdp
    }
}

#[async_trait]
impl NativeSession for MockNativeSession {
    fn add_stream(&self, stream: InternalStreamSpec) -> Result<Vec<(TrackId, NativeSenderId)>> {
        let mut state = self.state.lock();
        state.calls.push(format!("add_stream:{}", stream.id));
        Self::check_failure(&mut state)?;

        let mut senders = Vec::with_capacity(stream.tracks.len());
        for track in &stream.tracks {
            let sender = Self::next_sender_id(&mut state);
            state
                .senders
                .insert(sender.clone(), (stream.id.clone(), track.id().clone()));
            senders.push((track.id().clone(), sender));
        }
        state.streams.push((stream.id, stream.tracks));
        Ok(senders)
    }

    fn add_track_to_stream(
        &self,
        track: &MediaTrack,
        stream_id: &StreamId,
    ) -> Result<NativeSenderId> {
        let mut state = self.state.lock();
        state
            .calls
            .push(format!("add_track:{}:{}", track.id(), stream_id));
        Self::check_failure(&mut state)?;

        let pos = state
            .streams
            .iter()
            .position(|(sid, _)| sid == stream_id)
            .ok_or_else(|| CompatError::Native(format!("unknown stream {}", stream_id)))?;
        state.streams[pos].1.push(track.clone());

        let sender = Self::next_sender_id(&mut state);
        state
            .senders
            .insert(sender.clone(), (stream_id.clone(), track.id().clone()));
        Ok(sender)
    }

    fn remove_track_from_stream(
        &self,
        sender: &NativeSenderId,
        stream_id: &StreamId,
    ) -> Result<()> {
        let mut state = self.state.lock();
        state
            .calls
            .push(format!("remove_track:{}:{}", sender, stream_id));
        Self::check_failure(&mut state)?;

        let (_, track_id) = state
            .senders
            .remove(sender)
            .ok_or_else(|| CompatError::Native(format!("unknown sender {}", sender)))?;
        if let Some((_, tracks)) = state.streams.iter_mut().find(|(sid, _)| sid == stream_id) {
            tracks.retain(|t| t.id() != &track_id);
        }
        Ok(())
    }

    fn remove_stream(&self, stream_id: &StreamId) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(format!("remove_stream:{}", stream_id));
        Self::check_failure(&mut state)?;

        state.streams.retain(|(sid, _)| sid != stream_id);
        state.senders.retain(|_, (sid, _)| sid != stream_id);
        Ok(())
    }

    async fn create_offer(&self, _options: OfferOptions) -> Result<SessionDescription> {
        let state = self.state.lock();
        Ok(SessionDescription::offer(Self::build_sdp(&state)))
    }

    async fn create_answer(&self, _options: AnswerOptions) -> Result<SessionDescription> {
        let state = self.state.lock();
        Ok(SessionDescription::answer(Self::build_sdp(&state)))
    }

    async fn set_local_description(&self, description: SessionDescription) -> Result<()> {
        self.state.lock().local = Some(description);
        Ok(())
    }

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()> {
        self.state.lock().remote = Some(description);
        Ok(())
    }

    fn local_description(&self) -> Option<SessionDescription> {
        self.state.lock().local.clone()
    }

    fn send_data(&self, channel: &str, payload: Bytes) -> Result<()> {
        self.state.lock().sent.push((channel.to_string(), payload));
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.state.lock().closed = true;
        Ok(())
    }
}
