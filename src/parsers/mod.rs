//! Voucher-sheet extractors normalizing router-management exports into
//! candidate codes.
//!
//! Each extraction mode implements the `Extractor` trait, producing a
//! deduplicated `ExtractionResult` from normalized text.

pub mod mikhmon;
pub mod normalize;
pub mod pattern;
pub mod userman;

use serde::Serialize;

use crate::errors::AppError;
use crate::models::candidate::CandidateCode;
use crate::models::options::{ExtractionMode, ExtractionOptions};

/// A positioned text fragment from one page of a document's text layer.
#[derive(Debug, Clone, PartialEq)]
pub struct PageFragment {
    pub text: String,
    pub x: f32,
    pub y: f32,
}

impl PageFragment {
    pub fn new(text: &str, x: f32, y: f32) -> Self {
        Self {
            text: text.to_string(),
            x,
            y,
        }
    }
}

/// One page of fragments, in arbitrary page-internal order.
pub type Page = Vec<PageFragment>;

/// How far the extractor had to loosen the pattern to find matches.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EscalationLevel {
    Strict,
    Loose,
    VeryLoose,
    Exhausted,
}

/// One attempted escalation level and how many candidates it produced.
#[derive(Debug, Clone, Serialize)]
pub struct EscalationAttempt {
    pub level: EscalationLevel,
    pub matches: usize,
}

/// Deduplicated candidates plus the escalation history that produced them.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    pub mode: ExtractionMode,
    pub candidates: Vec<CandidateCode>,
    /// Level that produced the candidates, or `Exhausted` when none did.
    pub level: EscalationLevel,
    pub attempts: Vec<EscalationAttempt>,
}

impl ExtractionResult {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Trait for pluggable extraction modes.
pub trait Extractor: Send + Sync {
    /// Extract candidate codes from normalized text.
    fn extract(
        &self,
        text: &str,
        options: &ExtractionOptions,
    ) -> Result<ExtractionResult, anyhow::Error>;

    /// The extraction mode this extractor handles.
    fn mode(&self) -> ExtractionMode;
}

/// Select the extractor for a mode.
pub fn for_mode(mode: ExtractionMode) -> Box<dyn Extractor> {
    match mode {
        ExtractionMode::Mikhmon => Box::new(mikhmon::MikhmonExtractor::new()),
        ExtractionMode::Userman => Box::new(userman::UsermanExtractor::new()),
    }
}

/// Validate options, then run the matching extractor.
pub fn extract(text: &str, options: &ExtractionOptions) -> Result<ExtractionResult, AppError> {
    options.validated()?;
    for_mode(options.mode)
        .extract(text, options)
        .map_err(|e| AppError::Internal(format!("Extraction failed: {e}")))
}
