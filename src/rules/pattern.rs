// Rule pattern mini-language
//
// `/expr/` and `/expr/i` compile to regular expressions, anything else is
// plain text. A regex that fails to compile never matches; the rule still
// loads so one typo does not discard the whole file.

use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
#[serde(from = "String")]
pub enum Pattern {
    Regex(Regex),
    Text(String),
    Invalid,
}

impl Pattern {
    pub fn parse(source: &str) -> Self {
        let (expr, case_insensitive) = match split_delimited(source) {
            Some(parts) => parts,
            None => return Pattern::Text(source.to_string()),
        };
        match RegexBuilder::new(expr)
            .case_insensitive(case_insensitive)
            .build()
        {
            Ok(re) => Pattern::Regex(re),
            Err(e) => {
                warn!(pattern = source, error = %e, "Rule pattern does not compile; it will never match");
                Pattern::Invalid
            }
        }
    }

    /// Name matching: regex search, or exact equality for plain text
    pub fn matches_name(&self, name: &str) -> bool {
        match self {
            Pattern::Regex(re) => re.is_match(name),
            Pattern::Text(text) => text == name,
            Pattern::Invalid => false,
        }
    }

    /// Free-text matching: regex search, or case-insensitive substring
    pub fn matches_text(&self, haystack: &str) -> bool {
        match self {
            Pattern::Regex(re) => re.is_match(haystack),
            Pattern::Text(text) => haystack.to_lowercase().contains(&text.to_lowercase()),
            Pattern::Invalid => false,
        }
    }
}

impl From<String> for Pattern {
    fn from(source: String) -> Self {
        Pattern::parse(&source)
    }
}

/// `/expr/i` -> (expr, true), `/expr/` -> (expr, false), else `None`
fn split_delimited(source: &str) -> Option<(&str, bool)> {
    let body = source.strip_prefix('/')?;
    if let Some(expr) = body.strip_suffix("/i").or_else(|| body.strip_suffix("/I")) {
        return Some((expr, true));
    }
    body.strip_suffix('/').map(|expr| (expr, false))
}
