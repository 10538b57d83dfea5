//! Durable checkpoint storage.
//!
//! The engine promotes transition drafts into a [`CheckpointStore`]
//! when the registering state instance transitions away; the `restore`
//! hook resolves stored checkpoints back into transitions. The store
//! itself is pluggable; [`MemoryCheckpointStore`] is the bundled
//! implementation.

use gridiron_core::transition::{Checkpoint, RestoreRequest, Transition};

/// Storage for durably recorded transitions.
pub trait CheckpointStore {
    /// Record a promoted checkpoint.
    fn record(&mut self, checkpoint: Checkpoint);

    /// Resolve a request to a recorded transition.
    ///
    /// A keyed request matches the most recent checkpoint with that
    /// key; an unkeyed request matches the most recent checkpoint
    /// overall. A consuming request removes the matched entry.
    fn resolve(&mut self, request: &RestoreRequest) -> Option<Transition>;

    /// All recorded checkpoints, oldest first.
    fn list(&self) -> &[Checkpoint];
}

/// In-memory checkpoint store with a bounded retention window.
///
/// When the cap is exceeded, the oldest checkpoint is evicted.
pub struct MemoryCheckpointStore {
    entries: Vec<Checkpoint>,
    capacity: usize,
}

impl MemoryCheckpointStore {
    /// Create a store retaining at most `capacity` checkpoints.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "checkpoint capacity must be at least 1");
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    /// Number of retained checkpoints.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn record(&mut self, checkpoint: Checkpoint) {
        self.entries.push(checkpoint);
        if self.entries.len() > self.capacity {
            self.entries.remove(0);
        }
    }

    fn resolve(&mut self, request: &RestoreRequest) -> Option<Transition> {
        let index = match &request.key {
            Some(key) => self
                .entries
                .iter()
                .rposition(|c| c.key.as_deref() == Some(key.as_str())),
            None => self.entries.len().checked_sub(1),
        }?;
        let transition = if request.consume {
            self.entries.remove(index).transition
        } else {
            self.entries[index].transition.clone()
        };
        Some(transition)
    }

    fn list(&self) -> &[Checkpoint] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridiron_core::id::TickId;
    use gridiron_core::transition::Transition;

    fn checkpoint(key: Option<&str>, to: &str, tick: u64) -> Checkpoint {
        Checkpoint {
            key: key.map(String::from),
            transition: Transition::to(to),
            state: "origin".to_string(),
            tick: TickId(tick),
        }
    }

    #[test]
    fn unkeyed_resolve_returns_most_recent() {
        let mut store = MemoryCheckpointStore::new(8);
        store.record(checkpoint(None, "first", 1));
        store.record(checkpoint(None, "second", 2));

        let t = store.resolve(&RestoreRequest::default()).unwrap();
        assert_eq!(t.to, "second");
        // Non-consuming: still present.
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn keyed_resolve_matches_latest_with_key() {
        let mut store = MemoryCheckpointStore::new(8);
        store.record(checkpoint(Some("pre-snap"), "snap-a", 1));
        store.record(checkpoint(None, "other", 2));
        store.record(checkpoint(Some("pre-snap"), "snap-b", 3));

        let req = RestoreRequest {
            key: Some("pre-snap".to_string()),
            consume: false,
        };
        assert_eq!(store.resolve(&req).unwrap().to, "snap-b");
    }

    #[test]
    fn consume_removes_resolved_entry() {
        let mut store = MemoryCheckpointStore::new(8);
        store.record(checkpoint(Some("k"), "a", 1));
        store.record(checkpoint(None, "b", 2));

        let req = RestoreRequest {
            key: Some("k".to_string()),
            consume: true,
        };
        assert_eq!(store.resolve(&req).unwrap().to, "a");
        assert_eq!(store.len(), 1);
        assert!(store.resolve(&req).is_none());
    }

    #[test]
    fn missing_key_resolves_to_none() {
        let mut store = MemoryCheckpointStore::new(8);
        store.record(checkpoint(None, "a", 1));
        let req = RestoreRequest {
            key: Some("absent".to_string()),
            consume: false,
        };
        assert!(store.resolve(&req).is_none());
    }

    #[test]
    fn empty_store_resolves_to_none() {
        let mut store = MemoryCheckpointStore::new(8);
        assert!(store.resolve(&RestoreRequest::default()).is_none());
    }

    #[test]
    fn capacity_evicts_oldest() {
        let mut store = MemoryCheckpointStore::new(2);
        store.record(checkpoint(None, "a", 1));
        store.record(checkpoint(None, "b", 2));
        store.record(checkpoint(None, "c", 3));

        assert_eq!(store.len(), 2);
        assert_eq!(store.list()[0].transition.to, "b");
        assert_eq!(store.list()[1].transition.to, "c");
    }
}
