//! Data models for map markers.
//!
//! - `Marker`, `MarkerId`, `Position`: a persisted map pin as returned by the service
//! - `MarkerData`: the loosely filled payload callers hand to the store
//! - `NewMarker`, `MarkerUpdate`: validated create/update requests

pub mod marker;
pub mod request;

pub use marker::{Marker, MarkerId, Position};
pub use request::{MarkerData, MarkerUpdate, MissingField, NewMarker};
