//! Import committer: deduplicates accepted candidates against the target
//! scope, writes them in size-bounded, rate-limited batches, and updates
//! profile aggregate counters.
//!
//! Batches commit strictly in sequence; the growing inter-batch delay is a
//! cooperative suspension point keeping the run under the provider's
//! per-window request quota.

use std::collections::HashSet;

use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::candidate::CandidateCode;
use crate::models::options::CodeFormat;
use crate::models::voucher::{
    ImportScope, ProfileCounters, VoucherRecord, PROFILES_COLLECTION, VOUCHERS_COLLECTION,
};
use crate::store::{Document, DocumentStore, Filter, StoreError, WriteOp};
use crate::AppState;

/// Import completion status.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    /// Every new candidate was written.
    Completed,
    /// The run halted early but at least one batch is durable.
    Partial,
}

/// Error during one stage of an import run.
#[derive(Debug, Clone, Serialize)]
pub struct ImportError {
    pub stage: String,
    pub message: String,
}

/// Per-batch progress notification for UI surfaces.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BatchProgress {
    pub batch: usize,
    pub batches_total: usize,
    pub written_so_far: usize,
}

/// Summary of an import run. `written` counts records actually persisted,
/// distinct from `submitted`, so callers can surface
/// "N submitted, M new, N−M already existed".
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub import_id: Uuid,
    pub submitted: usize,
    /// Candidates dropped by minimum-length validation.
    pub rejected: usize,
    /// Candidates remaining after local dedup.
    pub unique: usize,
    /// Candidates skipped because their identity key already existed.
    pub duplicates: usize,
    pub written: usize,
    pub batches: usize,
    pub status: ImportStatus,
    pub errors: Vec<ImportError>,
}

/// Commit selected candidates into the target scope.
pub async fn commit<S: DocumentStore>(
    state: &AppState,
    store: &S,
    scope: &ImportScope,
    format: CodeFormat,
    candidates: &[CandidateCode],
) -> Result<ImportReport, AppError> {
    commit_with_progress(state, store, scope, format, candidates, |_| {}).await
}

/// Commit with a per-batch progress callback.
pub async fn commit_with_progress<S, F>(
    state: &AppState,
    store: &S,
    scope: &ImportScope,
    format: CodeFormat,
    candidates: &[CandidateCode],
    mut on_progress: F,
) -> Result<ImportReport, AppError>
where
    S: DocumentStore,
    F: FnMut(BatchProgress),
{
    scope.validated()?;
    if candidates.is_empty() {
        return Err(AppError::Validation(
            "No candidates selected for import".to_string(),
        ));
    }

    let submitted = candidates.len();
    let valid: Vec<&CandidateCode> = candidates.iter().filter(|c| c.is_valid()).collect();
    let rejected = submitted - valid.len();
    if rejected > 0 {
        tracing::warn!(rejected, "Dropped candidates below minimum length");
    }
    if valid.is_empty() {
        return Err(AppError::Validation(
            "All candidates failed minimum-length validation".to_string(),
        ));
    }

    // Local dedup by identity key, insertion order preserved.
    let mut seen = HashSet::new();
    let deduped: Vec<&CandidateCode> = valid
        .into_iter()
        .filter(|c| seen.insert(c.identity_key()))
        .collect();
    let unique = deduped.len();

    let existing = lookup_existing(state, store, scope).await;
    let to_write: Vec<&CandidateCode> = deduped
        .into_iter()
        .filter(|c| !existing.contains(&c.identity_key()))
        .collect();
    let duplicates = unique - to_write.len();

    let mut errors: Vec<ImportError> = Vec::new();
    let mut written = 0usize;
    let mut batches = 0usize;
    let mut status = ImportStatus::Completed;
    let batches_total = to_write.len().div_ceil(state.config.batch_size.max(1));

    for (index, chunk) in to_write.chunks(state.config.batch_size.max(1)).enumerate() {
        if index > 0 {
            tokio::time::sleep(state.config.batch_delay(batches)).await;
        }

        let ops = chunk
            .iter()
            .map(|candidate| {
                let record = VoucherRecord::from_candidate(scope, format, candidate);
                Ok(WriteOp {
                    collection: VOUCHERS_COLLECTION.to_string(),
                    id: record.id.to_string(),
                    data: serde_json::to_value(&record)
                        .map_err(|e| AppError::Internal(format!("Record encoding failed: {e}")))?,
                })
            })
            .collect::<Result<Vec<WriteOp>, AppError>>()?;

        match store.batch_write(ops).await {
            Ok(()) => {
                written += chunk.len();
                batches += 1;
                state
                    .existing_codes
                    .extend(scope, chunk.iter().map(|c| c.identity_key()));
                on_progress(BatchProgress {
                    batch: batches,
                    batches_total,
                    written_so_far: written,
                });
                tracing::debug!(batch = batches, batches_total, written, "Voucher batch committed");
            }
            Err(err) if err.is_quota() => {
                if written == 0 {
                    return Err(err.into());
                }
                tracing::warn!(error = %err, written, "Quota exceeded mid-import, keeping committed batches");
                errors.push(ImportError {
                    stage: "batch_write".to_string(),
                    message: err.to_string(),
                });
                status = ImportStatus::Partial;
                break;
            }
            Err(err) => {
                if written == 0 {
                    return Err(err.into());
                }
                tracing::error!(error = %err, written, "Storage error mid-import, halting remaining batches");
                errors.push(ImportError {
                    stage: "batch_write".to_string(),
                    message: err.to_string(),
                });
                status = ImportStatus::Partial;
                break;
            }
        }
    }

    // Best-effort: the primary records are already durable.
    if written > 0 {
        if let Err(err) = update_profile_counters(store, scope, written as i64).await {
            tracing::warn!(error = %err, "Profile counter update failed after import");
            errors.push(ImportError {
                stage: "counters".to_string(),
                message: err.to_string(),
            });
        }
    }

    let report = ImportReport {
        import_id: Uuid::new_v4(),
        submitted,
        rejected,
        unique,
        duplicates,
        written,
        batches,
        status,
        errors,
    };
    tracing::info!(
        router_id = %scope.router_id,
        profile_id = %scope.profile_id,
        submitted,
        written,
        duplicates,
        ?status,
        "Import finished"
    );
    Ok(report)
}

/// Identity keys already stored in the target scope.
///
/// Serves from the scope cache inside the freshness window. On a quota
/// rejection falls back to the last cached set, or the empty set, so the
/// import proceeds optimistically instead of blocking.
async fn lookup_existing<S: DocumentStore>(
    state: &AppState,
    store: &S,
    scope: &ImportScope,
) -> HashSet<String> {
    if let Some(keys) = state.existing_codes.fresh(scope) {
        return keys;
    }
    let filters = [
        Filter::eq("routerId", scope.router_id.clone()),
        Filter::eq("profileId", scope.profile_id.clone()),
    ];
    match store
        .query(VOUCHERS_COLLECTION, &filters, state.config.existing_fetch_limit)
        .await
    {
        Ok(docs) => {
            let keys: HashSet<String> = docs.iter().filter_map(record_identity_key).collect();
            state.existing_codes.put(scope, keys.clone());
            keys
        }
        Err(err) if err.is_quota() => {
            tracing::warn!(error = %err, "Existing-code lookup rate limited, using last cached set");
            state.existing_codes.any(scope).unwrap_or_default()
        }
        Err(err) => {
            tracing::warn!(error = %err, "Existing-code lookup failed, proceeding with empty set");
            HashSet::new()
        }
    }
}

fn record_identity_key(doc: &Document) -> Option<String> {
    let record: VoucherRecord = serde_json::from_value(doc.data.clone()).ok()?;
    Some(record.identity_key())
}

async fn update_profile_counters<S: DocumentStore>(
    store: &S,
    scope: &ImportScope,
    written: i64,
) -> Result<(), StoreError> {
    store
        .run_atomic_update(PROFILES_COLLECTION, &scope.profile_id, move |current| {
            ProfileCounters::increment(current, written)
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::store::memory::MemoryStore;

    fn state() -> AppState {
        AppState::new(AppConfig::default())
    }

    fn scope() -> ImportScope {
        ImportScope::new("r1", "p1")
    }

    fn vouchers(count: usize) -> Vec<CandidateCode> {
        (0..count)
            .map(|i| CandidateCode::voucher(&format!("jh{i:04}")))
            .collect()
    }

    #[tokio::test]
    async fn rejects_empty_candidate_list() {
        let state = state();
        let store = MemoryStore::new();
        let err = commit(&state, &store, &scope(), CodeFormat::Voucher, &[])
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn rejects_unresolved_scope() {
        let state = state();
        let store = MemoryStore::new();
        let candidates = vouchers(1);
        let err = commit(
            &state,
            &store,
            &ImportScope::new("", "p1"),
            CodeFormat::Voucher,
            &candidates,
        )
        .await
        .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn local_dedup_collapses_identity_keys() {
        let state = state();
        let store = MemoryStore::new();
        let candidates = vec![
            CandidateCode::user_pass("abc", "bcd"),
            CandidateCode::user_pass("abc", "bcd"),
            CandidateCode::user_pass("cde", "def"),
        ];
        let report = commit(&state, &store, &scope(), CodeFormat::UserPass, &candidates)
            .await
            .unwrap();
        assert_eq!(report.submitted, 3);
        assert_eq!(report.unique, 2);
        assert_eq!(report.written, 2);
        assert_eq!(report.status, ImportStatus::Completed);
        assert_eq!(store.count(VOUCHERS_COLLECTION), 2);
    }

    #[tokio::test]
    async fn short_candidates_are_rejected_not_written() {
        let state = state();
        let store = MemoryStore::new();
        let candidates = vec![
            CandidateCode::voucher("ab"),
            CandidateCode::voucher("abcd"),
        ];
        let report = commit(&state, &store, &scope(), CodeFormat::Voucher, &candidates)
            .await
            .unwrap();
        assert_eq!(report.rejected, 1);
        assert_eq!(report.written, 1);
    }

    #[tokio::test]
    async fn reimport_writes_nothing_new() {
        let state = state();
        let store = MemoryStore::new();
        let candidates = vouchers(5);

        let first = commit(&state, &store, &scope(), CodeFormat::Voucher, &candidates)
            .await
            .unwrap();
        assert_eq!(first.written, 5);

        // Same state: served by the fresh cache.
        let second = commit(&state, &store, &scope(), CodeFormat::Voucher, &candidates)
            .await
            .unwrap();
        assert_eq!(second.written, 0);
        assert_eq!(second.duplicates, 5);
        assert_eq!(second.batches, 0);

        // Cold state: served by the store query.
        let cold = state_with(AppConfig::default());
        let third = commit(&cold, &store, &scope(), CodeFormat::Voucher, &candidates)
            .await
            .unwrap();
        assert_eq!(third.written, 0);
        assert_eq!(third.duplicates, 5);
        assert_eq!(store.count(VOUCHERS_COLLECTION), 5);
    }

    fn state_with(config: AppConfig) -> AppState {
        AppState::new(config)
    }

    #[tokio::test(start_paused = true)]
    async fn batches_are_sized_to_provider_ceiling() {
        let state = state();
        let store = MemoryStore::new();
        let candidates = vouchers(1200);
        let mut progress: Vec<BatchProgress> = Vec::new();

        let report = commit_with_progress(
            &state,
            &store,
            &scope(),
            CodeFormat::Voucher,
            &candidates,
            |p| progress.push(p),
        )
        .await
        .unwrap();

        assert_eq!(report.written, 1200);
        assert_eq!(report.batches, 3);
        assert_eq!(store.batch_commits(), 3);
        assert_eq!(store.count(VOUCHERS_COLLECTION), 1200);

        assert_eq!(progress.len(), 3);
        assert_eq!(progress[0].batches_total, 3);
        assert_eq!(progress[2].written_so_far, 1200);
    }

    #[tokio::test]
    async fn quota_before_any_batch_is_a_hard_error() {
        let state = state();
        let store = MemoryStore::new();
        store.fail_batches_after(0, StoreError::ResourceExhausted("write quota".into()));
        let candidates = vouchers(5);
        let err = commit(&state, &store, &scope(), CodeFormat::Voucher, &candidates)
            .await
            .unwrap_err();
        assert!(err.is_quota());
    }

    #[tokio::test(start_paused = true)]
    async fn quota_mid_import_reports_partial_success() {
        let state = state();
        let store = MemoryStore::new();
        store.fail_batches_after(1, StoreError::ResourceExhausted("write quota".into()));
        let candidates = vouchers(1200);

        let report = commit(&state, &store, &scope(), CodeFormat::Voucher, &candidates)
            .await
            .unwrap();
        assert_eq!(report.status, ImportStatus::Partial);
        assert_eq!(report.written, 500);
        assert_eq!(report.batches, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].stage, "batch_write");
        assert_eq!(store.count(VOUCHERS_COLLECTION), 500);
    }

    #[tokio::test(start_paused = true)]
    async fn structural_error_mid_import_halts_with_partial_counts() {
        let state = state();
        let store = MemoryStore::new();
        store.fail_batches_after(1, StoreError::PermissionDenied("vouchers".into()));
        let candidates = vouchers(700);

        let report = commit(&state, &store, &scope(), CodeFormat::Voucher, &candidates)
            .await
            .unwrap();
        assert_eq!(report.status, ImportStatus::Partial);
        assert_eq!(report.written, 500);
        assert_eq!(store.count(VOUCHERS_COLLECTION), 500);
    }

    #[tokio::test]
    async fn lookup_quota_falls_back_to_stale_cached_set() {
        let mut config = AppConfig::default();
        config.existing_cache_ttl = std::time::Duration::ZERO;
        let state = state_with(config);
        let store = MemoryStore::new();

        // A stale snapshot exists for the scope; fresh lookups are throttled.
        state
            .existing_codes
            .extend(&scope(), ["jh0000".to_string()]);
        store.fail_queries_with(StoreError::ResourceExhausted("read quota".into()));

        let candidates = vouchers(3);
        let report = commit(&state, &store, &scope(), CodeFormat::Voucher, &candidates)
            .await
            .unwrap();
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.written, 2);
    }

    #[tokio::test]
    async fn lookup_failure_proceeds_with_empty_set() {
        let state = state();
        let store = MemoryStore::new();
        store.fail_queries_with(StoreError::Unavailable("backend down".into()));
        let candidates = vouchers(3);
        let report = commit(&state, &store, &scope(), CodeFormat::Voucher, &candidates)
            .await
            .unwrap();
        assert_eq!(report.written, 3);
    }

    #[tokio::test]
    async fn profile_counters_track_written_records() {
        let state = state();
        let store = MemoryStore::new();
        let candidates = vouchers(4);
        commit(&state, &store, &scope(), CodeFormat::Voucher, &candidates)
            .await
            .unwrap();

        let profile = store.get(PROFILES_COLLECTION, "p1").await.unwrap().unwrap();
        assert_eq!(profile.data["totalCodes"], 4);
        assert_eq!(profile.data["availableCodes"], 4);
    }

    #[tokio::test]
    async fn counter_failure_is_soft() {
        let state = state();
        let store = MemoryStore::new();
        store.fail_updates_with(StoreError::ResourceExhausted("quota".into()));
        let candidates = vouchers(2);
        let report = commit(&state, &store, &scope(), CodeFormat::Voucher, &candidates)
            .await
            .unwrap();
        assert_eq!(report.status, ImportStatus::Completed);
        assert_eq!(report.written, 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].stage, "counters");
    }

    #[test]
    fn import_report_serialization() {
        let report = ImportReport {
            import_id: Uuid::nil(),
            submitted: 10,
            rejected: 1,
            unique: 8,
            duplicates: 3,
            written: 5,
            batches: 1,
            status: ImportStatus::Partial,
            errors: vec![ImportError {
                stage: "batch_write".to_string(),
                message: "resource exhausted".to_string(),
            }],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["submitted"], 10);
        assert_eq!(json["written"], 5);
        assert_eq!(json["status"], "partial");
        assert_eq!(json["errors"][0]["stage"], "batch_write");
    }
}
