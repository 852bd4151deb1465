use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, info, trace, warn};

use crate::api::MarkerActions;
use crate::models::{Marker, MarkerData, MarkerId, MissingField};

use super::in_flight::InFlight;
use super::StoreError;

/// Consider the cache stale after 1 hour unless configured otherwise.
const DEFAULT_STALE_AFTER_MINUTES: i64 = 60;

#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    /// `add` rejects markers without a full address.
    pub require_full_address: bool,
    pub stale_after_minutes: i64,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            require_full_address: true,
            stale_after_minutes: DEFAULT_STALE_AFTER_MINUTES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListScope {
    Public,
    Admin,
}

impl ListScope {
    fn name(&self) -> &'static str {
        match self {
            ListScope::Public => "public",
            ListScope::Admin => "admin",
        }
    }
}

#[derive(Default)]
struct CacheState {
    markers: IndexMap<MarkerId, Marker>,
    last_synced: Option<DateTime<Utc>>,
}

/// Session cache of markers backed by a remote `MarkerActions` implementation.
pub struct MarkerStore<A> {
    actions: A,
    options: StoreOptions,
    state: RwLock<CacheState>,
    in_flight: InFlight,
    load_lock: AsyncMutex<()>,
}

impl<A: MarkerActions> MarkerStore<A> {
    pub fn new(actions: A) -> Self {
        Self::with_options(actions, StoreOptions::default())
    }

    pub fn with_options(actions: A, options: StoreOptions) -> Self {
        Self {
            actions,
            options,
            state: RwLock::new(CacheState::default()),
            in_flight: InFlight::default(),
            load_lock: AsyncMutex::new(()),
        }
    }

    pub fn actions(&self) -> &A {
        &self.actions
    }

    pub fn options(&self) -> StoreOptions {
        self.options
    }

    // Guards are never held across an await, so a poisoned lock only means a
    // panic elsewhere; the map itself is still consistent.
    fn read_state(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ===== Mutations =====

    /// Create a marker remotely and cache what the service returned.
    pub async fn add(&self, data: MarkerData) -> Result<Marker, StoreError> {
        let new_marker = data
            .into_new_marker(self.options.require_full_address)
            .map_err(|field| {
                warn!(field = %field, "Add aborted, required field missing");
                field
            })?;

        let created = self.actions.create(&new_marker).await.map_err(|e| {
            error!(title = %new_marker.title, error = %e, "Failed to create marker");
            e
        })?;

        let mut state = self.write_state();
        if state.markers.insert(created.id.clone(), created.clone()).is_some() {
            warn!(id = %created.id, "Created marker replaced a cached entry with the same id");
        }
        debug!(id = %created.id, count = state.markers.len(), "Marker added");
        Ok(created)
    }

    /// Update a cached marker remotely and replace it in place.
    ///
    /// Only markers already in the store can be edited; anything else is
    /// rejected with `StoreError::NotFound` without contacting the service.
    pub async fn edit(&self, data: MarkerData) -> Result<Marker, StoreError> {
        let update = data.into_update().map_err(|field| {
            warn!(field = %field, "Edit aborted, required field missing");
            field
        })?;

        let _guard = self.in_flight.acquire(&update.id).await;

        if !self.contains(update.id.as_str()) {
            warn!(id = %update.id, "Edit aborted, marker not in store");
            return Err(StoreError::NotFound(update.id));
        }

        let updated = self.actions.update(&update).await.map_err(|e| {
            error!(id = %update.id, error = %e, "Failed to update marker");
            e
        })?;

        let mut state = self.write_state();
        let Some(mut index) = state.markers.get_index_of(&update.id) else {
            // A load replaced the collection while the update was in flight
            warn!(id = %update.id, "Updated marker no longer cached, dropping response");
            return Err(StoreError::NotFound(update.id));
        };

        if updated.id == update.id {
            state.markers[index] = updated.clone();
        } else {
            warn!(
                requested = %update.id,
                returned = %updated.id,
                "Service returned a different id, replacing the edited entry"
            );
            state.markers.shift_remove_index(index);
            if let Some((other, _, _)) = state.markers.shift_remove_full(&updated.id) {
                if other < index {
                    index -= 1;
                }
            }
            state.markers.shift_insert(index, updated.id.clone(), updated.clone());
        }
        debug!(id = %updated.id, "Marker updated");
        Ok(updated)
    }

    /// Delete a marker remotely, then drop it from the cache.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        if id.trim().is_empty() {
            warn!("Delete aborted, marker id missing");
            return Err(MissingField::Id.into());
        }
        let id = MarkerId::from(id);
        let _guard = self.in_flight.acquire(&id).await;

        self.actions.delete(&id).await.map_err(|e| {
            error!(id = %id, error = %e, "Failed to delete marker");
            e
        })?;

        let mut state = self.write_state();
        if state.markers.shift_remove(&id).is_some() {
            debug!(id = %id, count = state.markers.len(), "Marker deleted");
        } else {
            debug!(id = %id, "Deleted marker was not cached");
        }
        Ok(())
    }

    // ===== Loading =====

    /// Replace the cache with the public marker list.
    pub async fn load(&self) -> Result<Vec<Marker>, StoreError> {
        self.load_scope(ListScope::Public).await
    }

    /// Replace the cache with every marker, including disabled ones.
    pub async fn load_admin(&self) -> Result<Vec<Marker>, StoreError> {
        self.load_scope(ListScope::Admin).await
    }

    async fn load_scope(&self, scope: ListScope) -> Result<Vec<Marker>, StoreError> {
        // Loads apply in the order they were issued
        let _load = self.load_lock.lock().await;

        let result = match scope {
            ListScope::Public => self.actions.list().await,
            ListScope::Admin => self.actions.admin_list().await,
        };
        let markers = result.map_err(|e| {
            error!(scope = scope.name(), error = %e, "Failed to load markers");
            e
        })?;

        let mut state = self.write_state();
        state.markers = markers.into_iter().map(|m| (m.id.clone(), m)).collect();
        state.last_synced = Some(Utc::now());
        info!(scope = scope.name(), count = state.markers.len(), "Markers loaded");
        Ok(state.markers.values().cloned().collect())
    }

    // ===== Queries =====

    pub fn get(&self, id: &str) -> Option<Marker> {
        let state = self.read_state();
        trace!(id, cached = state.markers.len(), "Marker lookup");
        state.markers.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read_state().markers.contains_key(id)
    }

    /// Cached markers in stored order.
    pub fn list(&self) -> Vec<Marker> {
        self.read_state().markers.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read_state().markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_state().markers.is_empty()
    }

    /// Forget everything, e.g. when the session ends.
    pub fn clear(&self) {
        let mut state = self.write_state();
        state.markers.clear();
        state.last_synced = None;
        debug!("Marker store cleared");
    }

    // ===== Sync age =====

    pub fn last_synced(&self) -> Option<DateTime<Utc>> {
        self.read_state().last_synced
    }

    pub fn sync_age_minutes(&self) -> Option<i64> {
        self.last_synced()
            .map(|synced| (Utc::now() - synced).num_minutes())
    }

    pub fn sync_age_display(&self) -> String {
        match self.sync_age_minutes() {
            Some(minutes) => age_display(minutes),
            None => "never".to_string(),
        }
    }

    /// Never loaded, or loaded longer ago than the configured window.
    pub fn is_stale(&self) -> bool {
        self.sync_age_minutes()
            .map_or(true, |minutes| minutes > self.options.stale_after_minutes)
    }
}

fn age_display(minutes: i64) -> String {
    if minutes < 1 {
        // Also covers clock skew
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 1440 {
        let hours = minutes / 60;
        // Round up: 1h 30m+ becomes 2h
        if minutes % 60 >= 30 {
            format!("{}h ago", hours + 1)
        } else {
            format!("{}h ago", hours)
        }
    } else {
        let days = minutes / 1440;
        if (minutes % 1440) / 60 >= 12 {
            format!("{}d ago", days + 1)
        } else {
            format!("{}d ago", days)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
