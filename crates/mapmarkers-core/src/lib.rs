//! Core library for mapmarkers.
//!
//! Provides the marker models, the `MarkerActions` boundary to the remote
//! marker service together with its HTTP implementation, and `MarkerStore`,
//! the in-memory cache kept consistent with the service's responses.

pub mod api;
pub mod config;
pub mod models;
pub mod store;

pub use api::{ApiClient, ApiError, MarkerActions};
pub use config::Config;
pub use models::{Marker, MarkerData, MarkerId, MarkerUpdate, MissingField, NewMarker, Position};
pub use store::{MarkerStore, StoreError, StoreOptions};
