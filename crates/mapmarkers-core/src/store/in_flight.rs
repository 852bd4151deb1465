use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::models::MarkerId;

type Slot = Arc<AsyncMutex<()>>;

/// Per-marker mutual exclusion for remote mutations.
///
/// Holders of a guard for the same id run one after another, in the order
/// they asked. Slots are dropped from the map once nobody holds or waits on them.
#[derive(Default)]
pub(crate) struct InFlight {
    slots: Mutex<HashMap<MarkerId, Slot>>,
}

impl InFlight {
    pub(crate) async fn acquire(&self, id: &MarkerId) -> InFlightGuard<'_> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(id.clone()).or_default())
        };
        let guard = Arc::clone(&slot).lock_owned().await;

        InFlightGuard {
            tracker: self,
            id: id.clone(),
            slot,
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    pub(crate) fn tracked(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

pub(crate) struct InFlightGuard<'a> {
    tracker: &'a InFlight,
    id: MarkerId,
    slot: Slot,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        // Release before pruning so the count below only sees the map and waiters
        self.guard.take();

        let mut slots = self.tracker.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let idle = slots
            .get(&self.id)
            .is_some_and(|s| Arc::ptr_eq(s, &self.slot) && Arc::strong_count(s) == 2);
        if idle {
            slots.remove(&self.id);
        }
    }
}
