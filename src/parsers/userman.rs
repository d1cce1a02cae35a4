//! Userman-mode candidate filter.
//!
//! Handles exports with no usable explicit pattern: infers code length and
//! prefix statistically from the token population and classifies tokens
//! with a blacklist plus structural rules.

use std::collections::{HashMap, HashSet};

use super::{EscalationLevel, ExtractionResult, Extractor};
use crate::models::candidate::CandidateCode;
use crate::models::options::{CodeFormat, ExtractionMode, ExtractionOptions};

/// Domain noise that disqualifies a token regardless of shape. Matched as a
/// case-insensitive substring. Bare "user"/"pass" are not listed; tokens
/// like `pass1` must survive as real passwords.
const BLACKLIST: &[&str] = &[
    "wifi",
    "voucher",
    "hotspot",
    "internet",
    "zone",
    "free",
    "gratis",
    "price",
    "harga",
    "rp.",
    "idr",
    "username",
    "password",
    "login",
    "admin",
    "profile",
    "profil",
    "validity",
    "berlaku",
    "expired",
    "mbps",
    "kbps",
    "kode",
    "telkomsel",
    "indosat",
    "smartfren",
];

/// Shortest token considered a code.
const MIN_TOKEN_LEN: usize = 4;
/// Absolute evidence floor for locking in a detected length or prefix.
const EVIDENCE_FLOOR: usize = 5;
/// Proportional evidence floor relative to the surviving population.
const EVIDENCE_RATIO: f64 = 0.3;

/// Userman extractor instance.
#[derive(Default)]
pub struct UsermanExtractor;

impl UsermanExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for UsermanExtractor {
    fn extract(
        &self,
        text: &str,
        options: &ExtractionOptions,
    ) -> Result<ExtractionResult, anyhow::Error> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let fixed_prefix = options.prefix.as_deref().unwrap_or("");
        let survivors: Vec<&str> = tokens
            .iter()
            .copied()
            .filter(|token| is_valid_code(token, fixed_prefix))
            .collect();

        let code_length = options
            .code_length
            .map(|n| n as usize)
            .or_else(|| detect_code_length(&survivors));
        let prefix = if fixed_prefix.is_empty() {
            detect_prefix(&survivors).unwrap_or_default()
        } else {
            fixed_prefix.to_string()
        };
        tracing::debug!(
            tokens = tokens.len(),
            survivors = survivors.len(),
            ?code_length,
            %prefix,
            "Userman structure detection finished"
        );

        let accept = |token: &str| {
            is_valid_code(token, &prefix)
                && code_length.map_or(true, |len| token.chars().count() == len)
        };

        let candidates = match options.format {
            CodeFormat::Voucher => voucher_candidates(&tokens, &accept),
            CodeFormat::UserPass => pair_candidates(&tokens, &accept, options.same_password),
        };
        let level = if candidates.is_empty() {
            EscalationLevel::Exhausted
        } else {
            EscalationLevel::Strict
        };
        Ok(ExtractionResult {
            mode: self.mode(),
            candidates,
            level,
            attempts: Vec::new(),
        })
    }

    fn mode(&self) -> ExtractionMode {
        ExtractionMode::Userman
    }
}

/// Classify one token as a plausible code.
pub fn is_valid_code(token: &str, prefix: &str) -> bool {
    if token.chars().count() < MIN_TOKEN_LEN {
        return false;
    }
    let lower = token.to_lowercase();
    if BLACKLIST.iter().any(|word| lower.contains(word)) {
        return false;
    }
    // Pure digits are prices, dates, or quantities.
    if token.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    if !token.chars().any(|c| c.is_alphabetic()) {
        return false;
    }
    if !prefix.is_empty() && !lower.starts_with(&prefix.to_lowercase()) {
        return false;
    }
    true
}

fn meets_threshold(frequency: usize, population: usize) -> bool {
    frequency as f64 > (EVIDENCE_FLOOR as f64).max(EVIDENCE_RATIO * population as f64)
}

/// Dominant token length, locked in only when its frequency clears the
/// evidentiary floor. Ties break toward the shorter length.
fn detect_code_length(survivors: &[&str]) -> Option<usize> {
    let mut histogram: HashMap<usize, usize> = HashMap::new();
    for token in survivors {
        *histogram.entry(token.chars().count()).or_default() += 1;
    }
    let mut entries: Vec<(usize, usize)> = histogram.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    let (length, frequency) = *entries.first()?;
    meets_threshold(frequency, survivors.len()).then_some(length)
}

/// Dominant two-character alphabetic prefix under the same evidentiary
/// floor, considering only tokens longer than 3 characters.
fn detect_prefix(survivors: &[&str]) -> Option<String> {
    let mut histogram: HashMap<String, usize> = HashMap::new();
    for token in survivors {
        if token.chars().count() <= 3 {
            continue;
        }
        let mut chars = token.chars();
        let (Some(first), Some(second)) = (chars.next(), chars.next()) else {
            continue;
        };
        if first.is_alphabetic() && second.is_alphabetic() {
            *histogram.entry(format!("{first}{second}")).or_default() += 1;
        }
    }
    let mut entries: Vec<(String, usize)> = histogram.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    let (prefix, frequency) = entries.into_iter().next()?;
    meets_threshold(frequency, survivors.len()).then_some(prefix)
}

fn voucher_candidates<F: Fn(&str) -> bool>(tokens: &[&str], accept: &F) -> Vec<CandidateCode> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for token in tokens {
        if accept(token) && seen.insert(token.to_string()) {
            out.push(CandidateCode::voucher(token));
        }
    }
    out
}

/// Scan the raw token stream for username/password pairs. A token passing
/// the full filter opens a pair; the immediately following token is the
/// password and must pass the base predicate only, since passwords need not
/// share the username shape. Both tokens are consumed on a match.
fn pair_candidates<F: Fn(&str) -> bool>(
    tokens: &[&str],
    accept_username: &F,
    same_password: bool,
) -> Vec<CandidateCode> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i];
        if !accept_username(token) {
            i += 1;
            continue;
        }
        if same_password {
            // Sheets that print each code twice: collapse the duplicate.
            let step = if tokens.get(i + 1) == Some(&token) { 2 } else { 1 };
            let candidate = CandidateCode::user_pass(token, token);
            if seen.insert(candidate.identity_key()) {
                out.push(candidate);
            }
            i += step;
            continue;
        }
        match tokens.get(i + 1) {
            Some(&next) if is_valid_code(next, "") => {
                let candidate = CandidateCode::user_pass(token, next);
                if seen.insert(candidate.identity_key()) {
                    out.push(candidate);
                }
                i += 2;
            }
            _ => i += 1,
        }
    }
    out
}
