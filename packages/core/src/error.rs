//! Error taxonomy for the ingestion core.
//!
//! Callers (the API layer) map these variants to transport outcomes
//! without string-matching: `NotFound` → 404, `InvalidInput` → 400,
//! `Storage` → 500. Per-observer delivery failures never appear here —
//! the connection registry handles them internally by unregistering the
//! failed observer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl CoreError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}
