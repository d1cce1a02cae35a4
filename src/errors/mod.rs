//! Unified error taxonomy for the extraction and import pipeline.

use crate::store::StoreError;

/// Application error type covering every failure path a caller can observe.
///
/// Malformed patterns and quota errors during lookups are recovered locally
/// and never appear here; see `parsers::pattern::validate_or_default` and
/// `services::import`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Check if this error represents a provider quota/rate-limit rejection.
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::Store(StoreError::ResourceExhausted(_)))
    }

    /// Check if this error represents invalid caller input.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
