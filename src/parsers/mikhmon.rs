//! Mikhmon-mode extractor: explicit pattern matching with progressive
//! loosening.
//!
//! The strict pattern (supplied, inferred from an example, or the default)
//! runs first; when it matches nothing the generic alphanumeric pattern is
//! tried, then the loosest word-class pattern. Levels are independent; the
//! first one producing matches wins.

use std::collections::HashSet;

use regex::Regex;

use super::pattern;
use super::{EscalationAttempt, EscalationLevel, ExtractionResult, Extractor};
use crate::models::candidate::CandidateCode;
use crate::models::options::{CodeFormat, ExtractionMode, ExtractionOptions};

/// Mikhmon extractor instance.
#[derive(Default)]
pub struct MikhmonExtractor;

impl MikhmonExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for MikhmonExtractor {
    fn extract(
        &self,
        text: &str,
        options: &ExtractionOptions,
    ) -> Result<ExtractionResult, anyhow::Error> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let base = resolve_pattern(options);
        let strict = pattern::validate_or_default(&base, options.format);

        let mut ladder = vec![(EscalationLevel::Strict, strict)];
        ladder.extend(pattern::fallback_ladder(options.format));

        let mut attempts = Vec::new();
        for (level, re) in ladder {
            let candidates = match options.format {
                CodeFormat::Voucher => match_vouchers(&tokens, &re),
                CodeFormat::UserPass => match_pairs(&tokens, &re),
            };
            attempts.push(EscalationAttempt {
                level,
                matches: candidates.len(),
            });
            if !candidates.is_empty() {
                if level != EscalationLevel::Strict {
                    tracing::debug!(?level, matches = candidates.len(), "Pattern escalated");
                }
                return Ok(ExtractionResult {
                    mode: self.mode(),
                    candidates,
                    level,
                    attempts,
                });
            }
        }

        Ok(ExtractionResult {
            mode: self.mode(),
            candidates: Vec::new(),
            level: EscalationLevel::Exhausted,
            attempts,
        })
    }

    fn mode(&self) -> ExtractionMode {
        ExtractionMode::Mikhmon
    }
}

/// Resolve the strict pattern: explicit pattern first, then inference from
/// examples, then the built-in default.
fn resolve_pattern(options: &ExtractionOptions) -> String {
    if let Some(explicit) = &options.pattern {
        return explicit.clone();
    }
    match options.format {
        CodeFormat::Voucher => options
            .example
            .as_deref()
            .map(pattern::infer_from_example)
            .unwrap_or_else(|| pattern::default_pattern(options.format)),
        CodeFormat::UserPass => match (&options.example, &options.password_example) {
            (Some(user), Some(pass)) => pattern::infer_pair(user, pass),
            (Some(user), None) if options.same_password => pattern::infer_pair(user, user),
            (Some(user), None) => pattern::infer_from_example(user),
            _ => pattern::default_pattern(options.format),
        },
    }
}

fn match_vouchers(tokens: &[&str], re: &Regex) -> Vec<CandidateCode> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for token in tokens {
        if re.is_match(token) && seen.insert(token.to_string()) {
            out.push(CandidateCode::voucher(token));
        }
    }
    out
}

/// Match adjacent token pairs against a two-group pattern. Both captures
/// must clear minimum-length validation; a matching pair consumes both
/// tokens so a password is never reused as the next username.
fn match_pairs(tokens: &[&str], re: &Regex) -> Vec<CandidateCode> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut i = 0;
    while i + 1 < tokens.len() {
        let joined = format!("{} {}", tokens[i], tokens[i + 1]);
        let matched = re.captures(&joined).and_then(|caps| {
            let username = caps.get(1)?.as_str();
            let password = caps.get(2)?.as_str();
            let candidate = CandidateCode::user_pass(username, password);
            candidate.is_valid().then_some(candidate)
        });
        match matched {
            Some(candidate) => {
                if seen.insert(candidate.identity_key()) {
                    out.push(candidate);
                }
                i += 2;
            }
            None => i += 1,
        }
    }
    out
}
