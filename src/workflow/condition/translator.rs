// SPDX-License-Identifier: MIT

//! Rewrites author-written conditions into the evaluator's operator syntax
//!
//! Conditions are authored Python-style (`doc.status == "Open" and not
//! doc.is_return`). Translation is purely textual: keywords are replaced
//! everywhere, then the first string comparison and the first numeric
//! comparison are tightened to `===`. Later comparisons of the same shape keep
//! their loose `==`, which the evaluator still understands.

use once_cell::sync::Lazy;
use regex::Regex;

/// Keyword substitutions, applied in this order
static KEYWORDS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"\band\b", "&&"),
        (r"\bor\b", "||"),
        (r"\bTrue\b", "true"),
        (r"\bFalse\b", "false"),
        (r"\bNone\b", "null"),
        (r"\bnot\b", "!"),
    ]
    .into_iter()
    .filter_map(|(pattern, replacement)| Regex::new(pattern).ok().map(|re| (re, replacement)))
    .collect()
});

static STRING_COMPARISON: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#"(\w+)\s*==\s*"([^"]*)""#).ok());

static NUMBER_COMPARISON: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(\w+)\s*==\s*(\d+)").ok());

/// Translate a condition; empty input yields the empty string
pub fn translate(condition: &str) -> String {
    if condition.is_empty() {
        return String::new();
    }

    let mut out = condition.to_string();
    for (re, replacement) in KEYWORDS.iter() {
        out = re.replace_all(&out, *replacement).into_owned();
    }
    if let Some(re) = STRING_COMPARISON.as_ref() {
        out = re.replace(&out, r#"${1} === "${2}""#).into_owned();
    }
    if let Some(re) = NUMBER_COMPARISON.as_ref() {
        out = re.replace(&out, "${1} === ${2}").into_owned();
    }
    out
}
