//! Per-entity write serialization.
//!
//! The source design let a user action (say, tapping "resend") interleave
//! with an inbound callback mutating the same contact.  [`EntityLocks`] keys
//! an async mutex per entity id; every orchestrator operation and inbound
//! handler acquires the id's lock for its full duration, so operations on
//! the same record run one at a time while unrelated ids proceed in
//! parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// A map of per-id async mutexes, clonable and shared between orchestrators
/// that touch the same entity class.
#[derive(Clone, Default)]
pub struct EntityLocks {
    inner: Arc<Mutex<HashMap<[u8; 32], Arc<AsyncMutex<()>>>>>,
}

impl EntityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for one entity id, creating it on first use.
    ///
    /// The guard is owned, so it can be held across awaits.
    pub async fn acquire(&self, id: [u8; 32]) -> OwnedMutexGuard<()> {
        let entity = {
            // The registry mutex only guards map bookkeeping; recover the map
            // if a panic elsewhere poisoned it.
            let mut map = match self.inner.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            map.entry(id).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
        };

        entity.lock_owned().await
    }

    /// Number of ids currently tracked (test hook).
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        match self.inner.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}
