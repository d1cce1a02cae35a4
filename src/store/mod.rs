//! Abstract document-store contract.
//!
//! The import committer depends only on this trait, not on any provider
//! SDK. Backends map these calls onto their own batch and transaction
//! primitives; `memory::MemoryStore` is the in-process reference backend.

pub mod memory;

use serde_json::Value;

/// A stored document: caller-supplied id plus a JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

/// Equality filter on a top-level document field.
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_string(),
            value: value.into(),
        }
    }
}

/// A single write in a batch. Batches commit atomically.
#[derive(Debug, Clone)]
pub struct WriteOp {
    pub collection: String,
    pub id: String,
    pub data: Value,
}

/// Storage failure, split so callers can distinguish provider throttling
/// from structural problems.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// Per-window request quota or rate limit exceeded.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("document not found: {0}")]
    NotFound(String),

    #[error("malformed record: {0}")]
    Malformed(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Check if this failure is a quota/rate-limit rejection.
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::ResourceExhausted(_))
    }
}

/// Minimal document-store contract.
#[allow(async_fn_in_trait)]
pub trait DocumentStore: Send + Sync {
    /// Fetch up to `limit` documents matching all filters.
    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        limit: usize,
    ) -> Result<Vec<Document>, StoreError>;

    /// Commit a batch of writes as one atomic unit.
    async fn batch_write(&self, ops: Vec<WriteOp>) -> Result<(), StoreError>;

    /// Fetch a single document by id.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Read-modify-write a single document atomically. The closure receives
    /// the current body (`None` when absent) and returns the new body.
    async fn run_atomic_update<F>(
        &self,
        collection: &str,
        id: &str,
        apply: F,
    ) -> Result<(), StoreError>
    where
        F: FnOnce(Option<Value>) -> Value + Send;
}
