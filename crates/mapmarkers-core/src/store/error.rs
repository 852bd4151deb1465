use thiserror::Error;

use crate::api::ApiError;
use crate::models::{MarkerId, MissingField};

#[derive(Error, Debug)]
pub enum StoreError {
    /// Rejected before any remote call was made.
    #[error("Missing required field: {0}")]
    MissingField(#[from] MissingField),

    #[error("Marker not found in store: {0}")]
    NotFound(MarkerId),

    #[error(transparent)]
    Api(#[from] ApiError),
}
