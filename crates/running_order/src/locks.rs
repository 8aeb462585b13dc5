use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

type LockMap = Arc<Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>>;

/// One async mutex per competition event.
///
/// Every mutation of an event holds its guard from before the transaction
/// begins until after the resulting envelopes are published, so the bus
/// sees commits of one event in commit order. Different events never
/// contend. An entry lives only while some caller holds or awaits it.
#[derive(Clone, Default)]
pub struct EventLocks {
    locks: LockMap,
}

/// Exclusive access to one event. Dropping the last interested guard
/// removes the event's entry.
pub struct EventGuard {
    event_id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
    lock: Arc<AsyncMutex<()>>,
    locks: LockMap,
}

impl Drop for EventGuard {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // The map and this guard are the only owners: nobody is waiting.
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.event_id);
        }
    }
}

impl EventLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, event_id: Uuid) -> EventGuard {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            Arc::clone(locks.entry(event_id).or_default())
        };
        let guard = Arc::clone(&lock).lock_owned().await;
        EventGuard {
            event_id,
            guard: Some(guard),
            lock,
            locks: Arc::clone(&self.locks),
        }
    }

    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
