//! In-memory marker store.
//!
//! `MarkerStore` caches the marker list of one session and keeps it in step
//! with the remote service: every mutation goes to the service first and
//! the cache only ever reflects what the service returned.
//!
//! Construct one store per session and share it by reference (or `Arc`).

mod error;
mod in_flight;
pub mod manager;

pub use error::StoreError;
pub use manager::{MarkerStore, StoreOptions};
