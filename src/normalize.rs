use std::sync::LazyLock;

use regex::Regex;

const HYBRID_PREFIX: &str = "× ";

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static BRACKETED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^()]*\)").unwrap());

pub fn normalize_submission(value: &str) -> String {
    let collapsed = collapse_whitespace(value);
    capitalize_uppercase_taxon(&collapsed)
}

pub fn collapse_whitespace(value: &str) -> String {
    WHITESPACE.replace_all(value.trim(), " ").into_owned()
}

/// `ASPIDOSPERMA ALBUM` becomes `Aspidosperma album`. Strings with more than
/// one space are left alone because the authors cannot be recased reliably.
pub fn capitalize_uppercase_taxon(value: &str) -> String {
    if !is_uppercase(value) {
        return value.to_string();
    }
    let (prefix, rest) = match value.strip_prefix(HYBRID_PREFIX) {
        Some(rest) => (HYBRID_PREFIX, rest),
        None => ("", value),
    };
    if rest.matches(' ').count() > 1 {
        return value.to_string();
    }
    let lower = rest.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => format!("{prefix}{}{}", first.to_uppercase(), chars.as_str()),
        None => value.to_string(),
    }
}

pub fn strip_bracketed(value: &str) -> String {
    collapse_whitespace(&BRACKETED.replace_all(value, " "))
}

fn is_uppercase(value: &str) -> bool {
    let mut has_cased = false;
    for ch in value.chars() {
        if ch.is_lowercase() {
            return false;
        }
        if ch.is_uppercase() {
            has_cased = true;
        }
    }
    has_cased
}
