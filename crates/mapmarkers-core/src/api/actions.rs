use async_trait::async_trait;

use crate::models::{Marker, MarkerId, MarkerUpdate, NewMarker};

use super::ApiError;

/// The remote actions the marker store is built on.
///
/// Each call either returns what the service persisted or the error the
/// service (or the transport) reported.
#[async_trait]
pub trait MarkerActions: Send + Sync {
    /// Create a marker. The service assigns the id.
    async fn create(&self, marker: &NewMarker) -> Result<Marker, ApiError>;

    /// Overwrite the marker with `update.id`.
    async fn update(&self, update: &MarkerUpdate) -> Result<Marker, ApiError>;

    async fn delete(&self, id: &MarkerId) -> Result<(), ApiError>;

    /// Publicly visible markers.
    async fn list(&self) -> Result<Vec<Marker>, ApiError>;

    /// Every marker regardless of its `enabled` flag. Requires admin rights.
    async fn admin_list(&self) -> Result<Vec<Marker>, ApiError>;
}
