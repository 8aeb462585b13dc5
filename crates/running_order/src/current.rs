use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use uuid::Uuid;

/// Which performance is on stage, per event.
///
/// In-memory only. Callers mutate it while holding the event's lock.
#[derive(Clone, Default)]
pub struct CurrentPerformanceStore {
    pointers: Arc<RwLock<HashMap<Uuid, Uuid>>>,
}

impl CurrentPerformanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, event_id: Uuid) -> Option<Uuid> {
        self.pointers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&event_id)
            .copied()
    }

    /// Returns true when the pointer moved.
    pub fn set(&self, event_id: Uuid, performance_id: Uuid) -> bool {
        let previous = self
            .pointers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(event_id, performance_id);
        previous != Some(performance_id)
    }

    /// Returns the performance the pointer held, if any.
    pub fn clear(&self, event_id: Uuid) -> Option<Uuid> {
        self.pointers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&event_id)
    }

    /// Clears only if the pointer is at `performance_id`.
    pub fn clear_if(&self, event_id: Uuid, performance_id: Uuid) -> bool {
        let mut pointers = self
            .pointers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if pointers.get(&event_id) == Some(&performance_id) {
            pointers.remove(&event_id);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let store = CurrentPerformanceStore::new();
        let event_id = Uuid::new_v4();
        let performance_id = Uuid::new_v4();

        assert!(store.get(event_id).is_none());
        assert!(store.set(event_id, performance_id));
        assert!(!store.set(event_id, performance_id));
        assert_eq!(store.get(event_id), Some(performance_id));
    }

    #[test]
    fn test_clear_if_only_matches_pointer() {
        let store = CurrentPerformanceStore::new();
        let event_id = Uuid::new_v4();
        let on_stage = Uuid::new_v4();
        store.set(event_id, on_stage);

        assert!(!store.clear_if(event_id, Uuid::new_v4()));
        assert!(store.clear_if(event_id, on_stage));
        assert!(store.get(event_id).is_none());
    }

    #[test]
    fn test_events_are_independent() {
        let store = CurrentPerformanceStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        store.set(a, Uuid::new_v4());
        store.set(b, Uuid::new_v4());

        store.clear(a);
        assert!(store.get(a).is_none());
        assert!(store.get(b).is_some());
    }
}
