//! Safety gate between LLM-generated query text and live execution.
//!
//! Two stages, run in order: normalize (strip formatting noise so it never
//! causes a false rejection), then validate (SELECT-only opening keyword,
//! whole-word denylist of mutating and administrative statements). No
//! repair is attempted; any ambiguity rejects.
//!
//! Pure string predicates with no execution-engine dependency.

use once_cell::sync::Lazy;
use regex::Regex;

static SELECT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*select\b").unwrap());

static DENYLIST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(insert|update|delete|drop|alter|truncate|create|grant|revoke|pragma|attach|detach)\b",
    )
    .unwrap()
});

/// Strip surrounding whitespace and markdown code fences from raw LLM
/// output. Idempotent.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("```") || trimmed.ends_with("```") {
        trimmed
            .lines()
            .filter(|line| !line.trim().starts_with("```"))
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    } else {
        trimmed.to_string()
    }
}

/// Verdict on a normalized candidate query. The query must open with
/// SELECT and must not contain any denylisted keyword as a whole word,
/// case-insensitively, anywhere in the text.
pub fn validate(sql: &str) -> bool {
    if !SELECT_RE.is_match(sql) {
        return false;
    }
    !DENYLIST_RE.is_match(sql)
}

/// The first denylisted keyword found in the text, uppercased, for error
/// reporting.
pub fn first_denied_keyword(sql: &str) -> Option<String> {
    DENYLIST_RE.find(sql).map(|m| m.as_str().to_uppercase())
}
