//! Extraction run configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::AppError;

/// Which voucher-export layout convention the run targets.
///
/// Mikhmon exports are pattern-matched explicitly; Userman exports are
/// inferred statistically.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    Mikhmon,
    Userman,
}

impl std::fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mikhmon => write!(f, "mikhmon"),
            Self::Userman => write!(f, "userman"),
        }
    }
}

/// Shape of the extracted credentials.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CodeFormat {
    #[serde(rename = "voucher")]
    Voucher,
    #[serde(rename = "user-pass")]
    UserPass,
}

impl std::fmt::Display for CodeFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Voucher => write!(f, "voucher"),
            Self::UserPass => write!(f, "user-pass"),
        }
    }
}

/// Configuration for one extraction run. Any optional field left unset
/// triggers auto-detection in the extractor.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExtractionOptions {
    pub mode: ExtractionMode,
    pub format: CodeFormat,

    /// Explicit pattern; takes precedence over examples.
    #[validate(length(min = 1, max = 256))]
    pub pattern: Option<String>,

    /// Example code (or example username for user-pass format) the pattern
    /// engine infers a pattern from.
    #[validate(length(min = 3, max = 64))]
    pub example: Option<String>,

    /// Example password paired with `example` for user-pass format.
    #[validate(length(min = 3, max = 64))]
    pub password_example: Option<String>,

    /// Fixed code prefix; unset means statistical detection (userman mode).
    #[validate(length(min = 1, max = 8))]
    pub prefix: Option<String>,

    /// Fixed code length; unset means statistical detection (userman mode).
    #[validate(range(min = 3, max = 64))]
    pub code_length: Option<u32>,

    /// Password equals username.
    #[serde(default)]
    pub same_password: bool,
}

impl ExtractionOptions {
    pub fn new(mode: ExtractionMode, format: CodeFormat) -> Self {
        Self {
            mode,
            format,
            pattern: None,
            example: None,
            password_example: None,
            prefix: None,
            code_length: None,
            same_password: false,
        }
    }

    /// Reject malformed options before any extraction work begins.
    pub fn validated(&self) -> Result<(), AppError> {
        self.validate()
            .map_err(|e| AppError::Validation(format!("Invalid extraction options: {e}")))
    }
}
