//! Persisted voucher records, profile counters, and the import scope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::candidate::CandidateCode;
use crate::models::options::CodeFormat;
use crate::services::fingerprint;

/// Collection holding voucher documents.
pub const VOUCHERS_COLLECTION: &str = "vouchers";
/// Collection holding profile documents with aggregate counters.
pub const PROFILES_COLLECTION: &str = "profiles";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VoucherStatus {
    Available,
    Used,
}

/// The (routerId, profileId) pair bounding dedup and counter operations.
/// Opaque to this core; resolved elsewhere from session state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct ImportScope {
    pub router_id: String,
    pub profile_id: String,
}

impl ImportScope {
    pub fn new(router_id: &str, profile_id: &str) -> Self {
        Self {
            router_id: router_id.to_string(),
            profile_id: profile_id.to_string(),
        }
    }

    /// Reject an unresolved scope before any storage work begins.
    pub fn validated(&self) -> Result<(), AppError> {
        if self.router_id.trim().is_empty() {
            return Err(AppError::Validation("No router selected".to_string()));
        }
        if self.profile_id.trim().is_empty() {
            return Err(AppError::Validation("No profile selected".to_string()));
        }
        Ok(())
    }
}

/// A voucher document as persisted in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherRecord {
    pub id: Uuid,
    pub router_id: String,
    pub profile_id: String,
    pub username: String,
    pub password: String,
    pub format: CodeFormat,
    pub status: VoucherStatus,
    /// Scope-qualified SHA-256 over the identity key, kept for audit.
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
}

impl VoucherRecord {
    /// Build a new record for an accepted candidate.
    pub fn from_candidate(
        scope: &ImportScope,
        format: CodeFormat,
        candidate: &CandidateCode,
    ) -> Self {
        let fingerprint = fingerprint::compute_voucher(
            &scope.router_id,
            &scope.profile_id,
            &candidate.identity_key(),
        );
        Self {
            id: Uuid::new_v4(),
            router_id: scope.router_id.clone(),
            profile_id: scope.profile_id.clone(),
            username: candidate.username().to_string(),
            password: candidate.password().to_string(),
            format,
            status: VoucherStatus::Available,
            fingerprint,
            created_at: Utc::now(),
        }
    }

    /// Deduplication key reconstructed from the persisted fields.
    pub fn identity_key(&self) -> String {
        match self.format {
            CodeFormat::Voucher => self.username.clone(),
            CodeFormat::UserPass => format!("{}:{}", self.username, self.password),
        }
    }
}

/// Aggregate counters on a profile document. Unknown fields on the profile
/// are preserved across updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileCounters {
    pub total_codes: i64,
    pub available_codes: i64,
}

impl ProfileCounters {
    /// Apply a counter increment to a profile document body, creating the
    /// document when absent and preserving unrelated fields.
    pub fn increment(current: Option<Value>, written: i64) -> Value {
        let mut doc = match current {
            Some(value) if value.is_object() => value,
            _ => json!({}),
        };
        let counters: ProfileCounters =
            serde_json::from_value(doc.clone()).unwrap_or_default();
        doc["totalCodes"] = json!(counters.total_codes + written);
        doc["availableCodes"] = json!(counters.available_codes + written);
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_validation_rejects_empty_ids() {
        assert!(ImportScope::new("", "p1").validated().is_err());
        assert!(ImportScope::new("r1", " ").validated().is_err());
        assert!(ImportScope::new("r1", "p1").validated().is_ok());
    }

    #[test]
    fn record_from_voucher_candidate_mirrors_value() {
        let scope = ImportScope::new("r1", "p1");
        let candidate = CandidateCode::voucher("AB1234");
        let record = VoucherRecord::from_candidate(&scope, CodeFormat::Voucher, &candidate);
        assert_eq!(record.username, "AB1234");
        assert_eq!(record.password, "AB1234");
        assert_eq!(record.status, VoucherStatus::Available);
        assert_eq!(record.identity_key(), "AB1234");
        assert_eq!(record.fingerprint.len(), 64);
    }

    #[test]
    fn record_from_pair_candidate_keeps_both_fields() {
        let scope = ImportScope::new("r1", "p1");
        let candidate = CandidateCode::user_pass("jh23", "pass1");
        let record = VoucherRecord::from_candidate(&scope, CodeFormat::UserPass, &candidate);
        assert_eq!(record.username, "jh23");
        assert_eq!(record.password, "pass1");
        assert_eq!(record.identity_key(), "jh23:pass1");
    }

    #[test]
    fn record_serializes_camel_case() {
        let scope = ImportScope::new("r1", "p1");
        let candidate = CandidateCode::voucher("AB1234");
        let record = VoucherRecord::from_candidate(&scope, CodeFormat::Voucher, &candidate);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["routerId"], "r1");
        assert_eq!(json["profileId"], "p1");
        assert_eq!(json["createdAt"].is_string(), true);
        assert_eq!(json["format"], "voucher");
    }

    #[test]
    fn counters_increment_from_absent_document() {
        let doc = ProfileCounters::increment(None, 7);
        assert_eq!(doc["totalCodes"], 7);
        assert_eq!(doc["availableCodes"], 7);
    }

    #[test]
    fn counters_increment_preserves_other_fields() {
        let current = json!({"name": "Daily 5k", "totalCodes": 10, "availableCodes": 4});
        let doc = ProfileCounters::increment(Some(current), 5);
        assert_eq!(doc["totalCodes"], 15);
        assert_eq!(doc["availableCodes"], 9);
        assert_eq!(doc["name"], "Daily 5k");
    }

    #[test]
    fn counters_increment_recovers_from_malformed_document() {
        let doc = ProfileCounters::increment(Some(json!("not an object")), 3);
        assert_eq!(doc["totalCodes"], 3);
        assert_eq!(doc["availableCodes"], 3);
    }
}
