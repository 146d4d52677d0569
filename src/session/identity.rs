//! Bidirectional external/internal stream identity map
//!
//! Both directions are mutated only through paired operations, so they
//! cannot drift apart: binding inserts into both, releasing removes from
//! both, and removing the last sender of an entry releases the entry in the
//! same call. An entry with an empty sender set is unrepresentable.

use std::collections::HashMap;

use crate::error::{CompatError, Result};
use crate::media::{SenderId, StreamId};

/// One attachment entry: the synthesized internal identity plus the senders
/// currently associated with the external stream, in attach order.
#[derive(Debug, Clone)]
pub struct IdentityEntry {
    pub internal: StreamId,
    pub senders: Vec<SenderId>,
}

/// Outcome of removing a sender from an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SenderRemoval {
    /// The sender was not associated with the stream
    NotFound,
    /// The sender was removed; other senders remain
    Removed,
    /// The last sender was removed and the entry released; carries the
    /// internal identity the entry was bound to
    Released(StreamId),
}

/// Bijective map between external and internal stream identities
#[derive(Debug, Default)]
pub struct IdentityMap {
    by_external: HashMap<StreamId, IdentityEntry>,
    by_internal: HashMap<StreamId, StreamId>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an external identity to a fresh internal one, with its first
    /// sender. Rejects a duplicate on either side.
    pub fn bind(
        &mut self,
        external: StreamId,
        internal: StreamId,
        first_sender: SenderId,
    ) -> Result<()> {
        if self.by_external.contains_key(&external) || self.by_internal.contains_key(&internal) {
            return Err(CompatError::InvalidArgument(format!(
                "stream identity {} is already bound",
                external
            )));
        }
        self.by_internal.insert(internal.clone(), external.clone());
        self.by_external.insert(
            external,
            IdentityEntry {
                internal,
                senders: vec![first_sender],
            },
        );
        Ok(())
    }

    /// Remove an entry entirely, returning the internal identity it was
    /// bound to.
    pub fn release(&mut self, external: &StreamId) -> Option<StreamId> {
        let entry = self.by_external.remove(external)?;
        self.by_internal.remove(&entry.internal);
        Some(entry.internal)
    }

    pub fn entry(&self, external: &StreamId) -> Option<&IdentityEntry> {
        self.by_external.get(external)
    }

    pub fn internal_for(&self, external: &StreamId) -> Option<&StreamId> {
        self.by_external.get(external).map(|e| &e.internal)
    }

    pub fn external_for(&self, internal: &StreamId) -> Option<&StreamId> {
        self.by_internal.get(internal)
    }

    /// Associate one more sender with an existing entry. Returns false when
    /// no entry exists for the stream.
    pub fn add_sender(&mut self, external: &StreamId, sender: SenderId) -> bool {
        match self.by_external.get_mut(external) {
            Some(entry) => {
                entry.senders.push(sender);
                true
            }
            None => false,
        }
    }

    /// Remove a sender; releases the whole entry when it was the last one.
    pub fn remove_sender(&mut self, external: &StreamId, sender: &SenderId) -> SenderRemoval {
        let last = match self.by_external.get_mut(external) {
            Some(entry) => {
                let pos = match entry.senders.iter().position(|s| s == sender) {
                    Some(pos) => pos,
                    None => return SenderRemoval::NotFound,
                };
                entry.senders.remove(pos);
                entry.senders.is_empty()
            }
            None => return SenderRemoval::NotFound,
        };

        if last {
            match self.release(external) {
                Some(internal) => SenderRemoval::Released(internal),
                None => SenderRemoval::NotFound,
            }
        } else {
            SenderRemoval::Removed
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StreamId, &IdentityEntry)> {
        self.by_external.iter()
    }

    pub fn len(&self) -> usize {
        self.by_external.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_external.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_external.clear();
        self.by_internal.clear();
    }

    /// Substitution table for rewriting native text toward the caller
    pub fn internal_to_external(&self) -> HashMap<String, String> {
        self.by_internal
            .iter()
            .map(|(internal, external)| (internal.to_string(), external.to_string()))
            .collect()
    }

    /// Substitution table for rewriting caller text toward the native engine
    pub fn external_to_internal(&self) -> HashMap<String, String> {
        self.by_external
            .iter()
            .map(|(external, entry)| (external.to_string(), entry.internal.to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (StreamId, StreamId, SenderId) {
        (StreamId::random(), StreamId::random(), SenderId::random())
    }

    #[test]
    fn test_bind_creates_both_directions() {
        let (external, internal, sender) = ids();
        let mut map = IdentityMap::new();
        map.bind(external.clone(), internal.clone(), sender).unwrap();

        assert_eq!(map.internal_for(&external), Some(&internal));
        assert_eq!(map.external_for(&internal), Some(&external));
        assert_eq!(map.entry(&external).unwrap().senders.len(), 1);
    }

    #[test]
    fn test_duplicate_bind_rejected() {
        let (external, internal, sender) = ids();
        let mut map = IdentityMap::new();
        map.bind(external.clone(), internal.clone(), sender.clone())
            .unwrap();

        assert!(map
            .bind(external.clone(), StreamId::random(), sender.clone())
            .is_err());
        assert!(map.bind(StreamId::random(), internal, sender).is_err());
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_release_drops_both_directions() {
        let (external, internal, sender) = ids();
        let mut map = IdentityMap::new();
        map.bind(external.clone(), internal.clone(), sender).unwrap();

        assert_eq!(map.release(&external), Some(internal.clone()));
        assert!(map.internal_for(&external).is_none());
        assert!(map.external_for(&internal).is_none());
        assert!(map.is_empty());
    }

    #[test]
    fn test_remove_last_sender_releases_entry() {
        let (external, internal, sender) = ids();
        let mut map = IdentityMap::new();
        map.bind(external.clone(), internal.clone(), sender.clone())
            .unwrap();

        let second = SenderId::random();
        assert!(map.add_sender(&external, second.clone()));

        assert_eq!(map.remove_sender(&external, &sender), SenderRemoval::Removed);
        assert_eq!(map.entry(&external).unwrap().senders.len(), 1);

        assert_eq!(
            map.remove_sender(&external, &second),
            SenderRemoval::Released(internal)
        );
        assert!(map.is_empty());
    }

    #[test]
    fn test_remove_unknown_sender() {
        let (external, internal, sender) = ids();
        let mut map = IdentityMap::new();
        map.bind(external.clone(), internal, sender).unwrap();

        assert_eq!(
            map.remove_sender(&external, &SenderId::random()),
            SenderRemoval::NotFound
        );
        assert_eq!(
            map.remove_sender(&StreamId::random(), &SenderId::random()),
            SenderRemoval::NotFound
        );
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_substitution_tables_mirror_each_other() {
        let (external, internal, sender) = ids();
        let mut map = IdentityMap::new();
        map.bind(external.clone(), internal.clone(), sender).unwrap();

        let fwd = map.internal_to_external();
        let rev = map.external_to_internal();
        assert_eq!(fwd.get(internal.as_str()), Some(&external.to_string()));
        assert_eq!(rev.get(external.as_str()), Some(&internal.to_string()));
        assert_eq!(fwd.len(), rev.len());
    }
}
