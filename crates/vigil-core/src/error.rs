//! Error types for the VIGIL system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VigilError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Store operation failed: {0}")]
    Store(String),

    #[error("Threat intelligence oracle failed: {0}")]
    Oracle(String),

    #[error("Posture source failed: {0}")]
    Posture(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type VigilResult<T> = Result<T, VigilError>;
