//! REST API module for the map marker service.
//!
//! `MarkerActions` is the boundary the store talks through: five remote
//! actions, each returning either the persisted marker(s) or an error.
//! `ApiClient` implements it over HTTP.

pub mod actions;
pub mod client;
pub mod error;

pub use actions::MarkerActions;
pub use client::ApiClient;
pub use error::ApiError;
