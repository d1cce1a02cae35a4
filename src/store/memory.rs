//! In-memory `DocumentStore` backend.
//!
//! Reference implementation used by the test suite and by embedding callers
//! that want the pipeline without a hosted backend. Supports fault injection
//! so quota and structural failure paths can be exercised deterministically.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use serde_json::Value;

use super::{Document, DocumentStore, Filter, StoreError, WriteOp};

#[derive(Debug, Default)]
struct Inner {
    collections: HashMap<String, BTreeMap<String, Value>>,
    /// Successful `batch_write` calls so far.
    batch_commits: usize,
    /// Fail `batch_write` calls after this many have succeeded.
    batch_failure: Option<(usize, StoreError)>,
    query_failure: Option<StoreError>,
    update_failure: Option<StoreError>,
}

/// Thread-safe in-memory document store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `batch_write` after the first `succeed` calls fail with `err`.
    pub fn fail_batches_after(&self, succeed: usize, err: StoreError) {
        self.inner.lock().unwrap().batch_failure = Some((succeed, err));
    }

    /// Make every `query` fail with `err` until cleared.
    pub fn fail_queries_with(&self, err: StoreError) {
        self.inner.lock().unwrap().query_failure = Some(err);
    }

    pub fn clear_query_failure(&self) {
        self.inner.lock().unwrap().query_failure = None;
    }

    /// Make every `run_atomic_update` fail with `err`.
    pub fn fail_updates_with(&self, err: StoreError) {
        self.inner.lock().unwrap().update_failure = Some(err);
    }

    /// Number of batches committed successfully.
    pub fn batch_commits(&self) -> usize {
        self.inner.lock().unwrap().batch_commits
    }

    /// Number of documents currently stored in a collection.
    pub fn count(&self, collection: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .collections
            .get(collection)
            .map_or(0, BTreeMap::len)
    }
}

fn matches(data: &Value, filters: &[Filter]) -> bool {
    filters
        .iter()
        .all(|filter| data.get(&filter.field) == Some(&filter.value))
}

impl DocumentStore for MemoryStore {
    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        limit: usize,
    ) -> Result<Vec<Document>, StoreError> {
        let inner = self.inner.lock().unwrap();
        if let Some(err) = &inner.query_failure {
            return Err(err.clone());
        }
        let Some(docs) = inner.collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .iter()
            .filter(|(_, data)| matches(data, filters))
            .take(limit)
            .map(|(id, data)| Document {
                id: id.clone(),
                data: data.clone(),
            })
            .collect())
    }

    async fn batch_write(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some((succeed, err)) = &inner.batch_failure {
            if inner.batch_commits >= *succeed {
                return Err(err.clone());
            }
        }
        // Atomic: nothing lands unless the whole batch is applied.
        for op in ops {
            inner
                .collections
                .entry(op.collection)
                .or_default()
                .insert(op.id, op.data);
        }
        inner.batch_commits += 1;
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|data| Document {
                id: id.to_string(),
                data: data.clone(),
            }))
    }

    async fn run_atomic_update<F>(
        &self,
        collection: &str,
        id: &str,
        apply: F,
    ) -> Result<(), StoreError>
    where
        F: FnOnce(Option<Value>) -> Value + Send,
    {
        let mut inner = self.inner.lock().unwrap();
        if let Some(err) = &inner.update_failure {
            return Err(err.clone());
        }
        let docs = inner.collections.entry(collection.to_string()).or_default();
        let current = docs.get(id).cloned();
        docs.insert(id.to_string(), apply(current));
        Ok(())
    }
}
