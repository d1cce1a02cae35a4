//! Pattern engine: infers character-class patterns from user examples,
//! explains them for display, and guarantees extractors a compilable
//! matcher by substituting a documented default on failure.

use regex::Regex;

use super::EscalationLevel;
use crate::models::options::CodeFormat;

/// Class used by the built-in default and the first escalation level.
const LOOSE_BODY: &str = "[A-Za-z0-9]{4,}";
/// Loosest class: alphanumeric plus underscore.
const VERY_LOOSE_VOUCHER_BODY: &str = r"\w{4,}";
const VERY_LOOSE_PAIR_BODY: &str = r"\w{3,}";

/// Map one example string to an anchored character-class pattern.
///
/// Uppercase letters, lowercase letters, and digits map to their class;
/// anything else becomes an escaped literal. Runs of one class are
/// compressed with `{n}` quantifiers. Total function; never fails.
pub fn infer_from_example(example: &str) -> String {
    format!("^{}$", class_body(example))
}

/// Combined username/password pattern from two examples, joined by a
/// whitespace separator, each side a capture group.
pub fn infer_pair(user_example: &str, pass_example: &str) -> String {
    format!(
        r"^({})\s+({})$",
        class_body(user_example),
        class_body(pass_example)
    )
}

fn class_body(example: &str) -> String {
    let mut body = String::new();
    let mut run: Option<(String, usize)> = None;
    for ch in example.chars() {
        let token = if ch.is_ascii_uppercase() {
            "[A-Z]".to_string()
        } else if ch.is_ascii_lowercase() {
            "[a-z]".to_string()
        } else if ch.is_ascii_digit() {
            "[0-9]".to_string()
        } else {
            regex::escape(&ch.to_string())
        };
        match &mut run {
            Some((current, count)) if *current == token => *count += 1,
            _ => {
                flush_run(&mut body, run.take());
                run = Some((token, 1));
            }
        }
    }
    flush_run(&mut body, run.take());
    body
}

fn flush_run(body: &mut String, run: Option<(String, usize)>) {
    if let Some((token, count)) = run {
        body.push_str(&token);
        if count > 1 {
            body.push_str(&format!("{{{count}}}"));
        }
    }
}

/// Substitute pattern tokens with human-readable phrases for UI display.
/// Purely textual; performs no semantic validation.
pub fn explain(pattern: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut chars = pattern.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '^' => parts.push("start of code".to_string()),
            '$' => parts.push("end of code".to_string()),
            '(' | ')' => {}
            '[' => {
                let mut class = String::from("[");
                for c in chars.by_ref() {
                    class.push(c);
                    if c == ']' {
                        break;
                    }
                }
                parts.push(match class.as_str() {
                    "[A-Z]" => "an uppercase letter".to_string(),
                    "[a-z]" => "a lowercase letter".to_string(),
                    "[0-9]" => "a digit".to_string(),
                    "[A-Za-z0-9]" => "a letter or digit".to_string(),
                    other => format!("one of {other}"),
                });
            }
            '{' => {
                let mut quantifier = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    quantifier.push(c);
                }
                let phrase = if let Some(min) = quantifier.strip_suffix(',') {
                    format!("repeated {min} or more times")
                } else if let Some((min, max)) = quantifier.split_once(',') {
                    format!("repeated {min} to {max} times")
                } else {
                    format!("repeated {quantifier} times")
                };
                match parts.last_mut() {
                    Some(last) => {
                        last.push(' ');
                        last.push_str(&phrase);
                    }
                    None => parts.push(phrase),
                }
            }
            '\\' => match chars.next() {
                Some('s') => {
                    if chars.peek() == Some(&'+') {
                        chars.next();
                    }
                    parts.push("whitespace".to_string());
                }
                Some('w') => parts.push("a letter, digit or underscore".to_string()),
                Some(c) => parts.push(format!("the character '{c}'")),
                None => {}
            },
            '+' => {
                if let Some(last) = parts.last_mut() {
                    last.push_str(" one or more times");
                }
            }
            other => parts.push(format!("the character '{other}'")),
        }
    }
    parts.join(", ")
}

/// The built-in default pattern for a format.
pub fn default_pattern(format: CodeFormat) -> String {
    match format {
        CodeFormat::Voucher => format!("^({LOOSE_BODY})$"),
        CodeFormat::UserPass => format!(r"^({LOOSE_BODY})\s+({LOOSE_BODY})$"),
    }
}

/// Compile a candidate pattern for a format, substituting the built-in
/// default when compilation fails. Guarantees extractors always receive a
/// usable matcher.
pub fn validate_or_default(pattern: &str, format: CodeFormat) -> Regex {
    let candidate = match format {
        CodeFormat::Voucher => anchored(pattern),
        CodeFormat::UserPass => pair_form(pattern),
    };
    match Regex::new(&candidate) {
        Ok(re) => re,
        Err(err) => {
            tracing::warn!(pattern = %pattern, error = %err, "Pattern failed to compile, using default");
            compile_builtin(&default_pattern(format))
        }
    }
}

/// First escalation fallback: generic alphanumeric class.
pub fn loose(format: CodeFormat) -> Regex {
    compile_builtin(&default_pattern(format))
}

/// Final escalation fallback: alphanumeric plus underscore.
pub fn very_loose(format: CodeFormat) -> Regex {
    let pattern = match format {
        CodeFormat::Voucher => format!("^({VERY_LOOSE_VOUCHER_BODY})$"),
        CodeFormat::UserPass => {
            format!(r"^({VERY_LOOSE_PAIR_BODY})\s+({VERY_LOOSE_PAIR_BODY})$")
        }
    };
    compile_builtin(&pattern)
}

/// Escalation ladder below the strict level, in priority order.
pub fn fallback_ladder(format: CodeFormat) -> Vec<(EscalationLevel, Regex)> {
    vec![
        (EscalationLevel::Loose, loose(format)),
        (EscalationLevel::VeryLoose, very_loose(format)),
    ]
}

fn compile_builtin(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in pattern compiles")
}

fn anchored(pattern: &str) -> String {
    format!("^({})$", strip_anchors(pattern))
}

/// Two-group pair form. A pattern that already carries a whitespace
/// separator and two groups is used as supplied; otherwise the single-code
/// body is doubled.
fn pair_form(pattern: &str) -> String {
    let body = strip_anchors(pattern);
    if body.contains(r"\s") && count_groups(&body) >= 2 {
        format!("^{body}$")
    } else {
        format!(r"^({body})\s+({body})$")
    }
}

fn strip_anchors(pattern: &str) -> String {
    let mut body = pattern.trim();
    body = body.strip_prefix('^').unwrap_or(body);
    if body.ends_with('$') && !body.ends_with(r"\$") {
        body = &body[..body.len() - 1];
    }
    body.to_string()
}

fn count_groups(pattern: &str) -> usize {
    let chars: Vec<char> = pattern.chars().collect();
    let mut count = 0;
    for (i, &ch) in chars.iter().enumerate() {
        if ch != '(' {
            continue;
        }
        let escaped = i > 0 && chars[i - 1] == '\\';
        let non_capturing = chars.get(i + 1) == Some(&'?');
        if !escaped && !non_capturing {
            count += 1;
        }
    }
    count
}
