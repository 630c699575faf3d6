//! Per-entity async locks
//!
//! Operations touching a book's copy counter or a reader's open reservations
//! hold the locks of exactly those ids, so unrelated books and readers never
//! wait on each other.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Slots above this count trigger a sweep of released entries
const PRUNE_THRESHOLD: usize = 1024;

#[derive(Clone, Default)]
pub struct EntityLocks {
    slots: Arc<parking_lot::Mutex<HashMap<Uuid, Weak<Mutex<()>>>>>,
}

/// Held for the duration of one coordinated operation
#[must_use]
pub struct EntityGuard {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl EntityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock every id, in sorted order so two callers can never deadlock
    pub async fn lock(&self, ids: &[Uuid]) -> EntityGuard {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mutexes: Vec<Arc<Mutex<()>>> = {
            let mut slots = self.slots.lock();
            if slots.len() > PRUNE_THRESHOLD {
                slots.retain(|_, slot| slot.strong_count() > 0);
            }
            ids.iter()
                .map(|id| match slots.get(id).and_then(Weak::upgrade) {
                    Some(mutex) => mutex,
                    None => {
                        let mutex = Arc::new(Mutex::new(()));
                        slots.insert(*id, Arc::downgrade(&mutex));
                        mutex
                    }
                })
                .collect()
        };

        let mut guards = Vec::with_capacity(mutexes.len());
        for mutex in mutexes {
            guards.push(mutex.lock_owned().await);
        }
        EntityGuard { _guards: guards }
    }
}
