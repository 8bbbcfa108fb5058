//! Async locks keyed by value.
//!
//! Operations on the same key run one at a time, in the order they asked for
//! the lock; operations on different keys never wait on each other. Entries
//! are dropped as soon as nobody holds or waits for them.

#[cfg(test)]
#[path = "lib_tests.rs"]
mod lib_tests;

use core::fmt;
use core::hash::Hash;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slots<K> = Mutex<HashMap<K, Arc<AsyncMutex<()>>>>;

pub struct KeyedLocks<K> {
    slots: Arc<Slots<K>>,
}

impl<K> Clone for KeyedLocks<K> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
        }
    }
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            slots: Arc::default(),
        }
    }
}

impl<K> fmt::Debug for KeyedLocks<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedLocks")
            .field("held", &self.slots.lock().len())
            .finish()
    }
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until `key` is free and returns a guard that holds it.
    ///
    /// The guard is `'static`, so it can move into a spawned task. Dropping
    /// the future before it resolves gives up the place in line.
    pub async fn lock(&self, key: &K) -> KeyGuard<K> {
        let release = Release {
            slots: Arc::clone(&self.slots),
            key: key.clone(),
        };

        let slot = {
            let mut slots = self.slots.lock();
            Arc::clone(slots.entry(key.clone()).or_default())
        };

        let guard = slot.lock_owned().await;

        KeyGuard {
            _guard: guard,
            release,
        }
    }

    /// Whether some operation holds or waits for `key`.
    #[must_use]
    pub fn is_busy(&self, key: &K) -> bool {
        self.slots.lock().contains_key(key)
    }

    #[must_use]
    pub fn busy_count(&self) -> usize {
        self.slots.lock().len()
    }
}

/// Removes the entry for `key` once nobody holds or waits for it.
///
/// Runs for granted guards and for waiters dropped before they were granted.
struct Release<K>
where
    K: Eq + Hash,
{
    slots: Arc<Slots<K>>,
    key: K,
}

impl<K> Drop for Release<K>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        let mut slots = self.slots.lock();

        // Waiters clone the slot under this same map lock, so a count of one
        // means nobody else can still reach it.
        if slots
            .get(&self.key)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            let _removed = slots.remove(&self.key);
        }
    }
}

pub struct KeyGuard<K>
where
    K: Eq + Hash,
{
    // Dropped before `release`, so the slot is unlocked when it is checked.
    _guard: OwnedMutexGuard<()>,
    release: Release<K>,
}

impl<K> KeyGuard<K>
where
    K: Eq + Hash,
{
    pub const fn key(&self) -> &K {
        &self.release.key
    }
}

impl<K> fmt::Debug for KeyGuard<K>
where
    K: Eq + Hash + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyGuard").field("key", self.key()).finish()
    }
}
