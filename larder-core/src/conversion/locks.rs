//! Per-key async locks whose entries live only while someone holds or awaits them.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::ConversionKey;

#[derive(Debug, Default)]
pub(crate) struct KeyLocks {
    locks: DashMap<ConversionKey, Arc<Mutex<()>>>,
}

impl KeyLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn lock(&self, key: &ConversionKey) -> KeyGuard<'_> {
        let mut held = KeyGuard {
            locks: &self.locks,
            key: key.clone(),
            guard: None,
        };
        let lock = self.locks.entry(key.clone()).or_default().clone();
        held.guard = Some(lock.lock_owned().await);
        held
    }

    /// Number of keys currently locked or awaited.
    pub(crate) fn len(&self) -> usize {
        self.locks.len()
    }
}

/// Releases the key on drop and forgets it once no other task references it.
#[derive(Debug)]
pub struct KeyGuard<'a> {
    locks: &'a DashMap<ConversionKey, Arc<Mutex<()>>>,
    key: ConversionKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // Only the map's reference left: nobody is queued on this key.
        self.locks.remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}
