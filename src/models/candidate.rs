//! Candidate codes produced by extraction.
//!
//! The shape is decided once at extraction time and carried unchanged
//! through review and commit.

use serde::{Deserialize, Serialize};

/// Minimum characters per credential field for a candidate to be importable.
pub const MIN_FIELD_LEN: usize = 3;

/// A single extracted access credential.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateCode {
    /// A single-value access code.
    Voucher(String),
    /// A username/password pair.
    UserPass { username: String, password: String },
}

impl CandidateCode {
    pub fn voucher(value: &str) -> Self {
        Self::Voucher(value.to_string())
    }

    pub fn user_pass(username: &str, password: &str) -> Self {
        Self::UserPass {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    /// Deduplication key: the value itself, or `username:password`.
    pub fn identity_key(&self) -> String {
        match self {
            Self::Voucher(value) => value.clone(),
            Self::UserPass { username, password } => format!("{username}:{password}"),
        }
    }

    /// Login name persisted for this candidate.
    pub fn username(&self) -> &str {
        match self {
            Self::Voucher(value) => value,
            Self::UserPass { username, .. } => username,
        }
    }

    /// Password persisted for this candidate. Equals the code value for
    /// voucher format.
    pub fn password(&self) -> &str {
        match self {
            Self::Voucher(value) => value,
            Self::UserPass { password, .. } => password,
        }
    }

    /// Minimum-length validation: every field at least `MIN_FIELD_LEN` chars.
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Voucher(value) => value.chars().count() >= MIN_FIELD_LEN,
            Self::UserPass { username, password } => {
                username.chars().count() >= MIN_FIELD_LEN
                    && password.chars().count() >= MIN_FIELD_LEN
            }
        }
    }

    /// Case-insensitive free-text match across all fields. An empty query
    /// matches everything.
    pub fn matches_filter(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        match self {
            Self::Voucher(value) => value.to_lowercase().contains(&query),
            Self::UserPass { username, password } => {
                username.to_lowercase().contains(&query)
                    || password.to_lowercase().contains(&query)
            }
        }
    }
}
