//! Review/selection stage: human-in-the-loop correction of extracted
//! candidates before commit.
//!
//! State is entirely in-memory and keyed by row index. Indices are stable
//! for the session lifetime; removing a row tombstones it instead of
//! shifting its neighbors. This stage never talks to storage.

use uuid::Uuid;

use crate::errors::AppError;
use crate::models::candidate::CandidateCode;
use crate::models::options::{ExtractionMode, ExtractionOptions};
use crate::parsers::{self, ExtractionResult};

/// One candidate row with its inclusion state.
#[derive(Debug, Clone)]
pub struct ReviewRow {
    pub candidate: CandidateCode,
    pub included: bool,
    pub removed: bool,
}

/// An open review session over one extraction run.
#[derive(Debug)]
pub struct ReviewSession {
    pub id: Uuid,
    source_text: String,
    options: ExtractionOptions,
    original: ExtractionResult,
    extraction: ExtractionResult,
    rows: Vec<ReviewRow>,
}

fn rows_from(result: &ExtractionResult) -> Vec<ReviewRow> {
    result
        .candidates
        .iter()
        .map(|candidate| ReviewRow {
            candidate: candidate.clone(),
            included: true,
            removed: false,
        })
        .collect()
}

impl ReviewSession {
    /// Run extraction and open a session over the result. All candidates
    /// start included.
    pub fn open(text: &str, options: ExtractionOptions) -> Result<Self, AppError> {
        let result = parsers::extract(text, &options)?;
        let rows = rows_from(&result);
        Ok(Self {
            id: Uuid::new_v4(),
            source_text: text.to_string(),
            options,
            original: result.clone(),
            extraction: result,
            rows,
        })
    }

    pub fn rows(&self) -> &[ReviewRow] {
        &self.rows
    }

    /// The extraction currently backing the rows.
    pub fn extraction(&self) -> &ExtractionResult {
        &self.extraction
    }

    pub fn select_all(&mut self) {
        for row in &mut self.rows {
            if !row.removed {
                row.included = true;
            }
        }
    }

    pub fn select_none(&mut self) {
        for row in &mut self.rows {
            row.included = false;
        }
    }

    /// Toggle one row's inclusion. Returns the new state.
    pub fn toggle(&mut self, index: usize) -> Result<bool, AppError> {
        let row = self.live_row_mut(index)?;
        row.included = !row.included;
        Ok(row.included)
    }

    /// Tombstone one row. Other rows keep their indices.
    pub fn remove(&mut self, index: usize) -> Result<(), AppError> {
        let row = self.live_row_mut(index)?;
        row.removed = true;
        row.included = false;
        Ok(())
    }

    /// Indices of live rows matching a case-insensitive free-text query.
    pub fn filter(&self, query: &str) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| !row.removed && row.candidate.matches_filter(query))
            .map(|(index, _)| index)
            .collect()
    }

    /// Tombstone every row whose candidate fails minimum-length validation.
    /// Returns the number of rows removed.
    pub fn remove_invalid(&mut self) -> usize {
        let mut removed = 0;
        for row in &mut self.rows {
            if !row.removed && !row.candidate.is_valid() {
                row.removed = true;
                row.included = false;
                removed += 1;
            }
        }
        removed
    }

    /// Re-extract from the session text against a newly supplied pattern.
    /// Switches to explicit-pattern matching; the original extraction stays
    /// available through `restore_original`.
    pub fn reapply_pattern(&mut self, pattern: &str) -> Result<(), AppError> {
        let mut options = self.options.clone();
        options.mode = ExtractionMode::Mikhmon;
        options.pattern = Some(pattern.to_string());
        let result = parsers::extract(&self.source_text, &options)?;
        self.rows = rows_from(&result);
        self.extraction = result;
        Ok(())
    }

    /// Restore the originally extracted candidate set, all rows included.
    pub fn restore_original(&mut self) {
        self.rows = rows_from(&self.original);
        self.extraction = self.original.clone();
    }

    /// Candidates currently selected for import.
    pub fn selected(&self) -> Vec<CandidateCode> {
        self.rows
            .iter()
            .filter(|row| !row.removed && row.included)
            .map(|row| row.candidate.clone())
            .collect()
    }

    fn live_row_mut(&mut self, index: usize) -> Result<&mut ReviewRow, AppError> {
        match self.rows.get_mut(index) {
            Some(row) if !row.removed => Ok(row),
            _ => Err(AppError::NotFound(format!("No candidate at row {index}"))),
        }
    }
}
