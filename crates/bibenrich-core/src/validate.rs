use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{DataKind, ValidationFlags};

/// Two capitalized words anywhere in the text, e.g. "Alice ... Smith".
static NAME_PAIR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z][a-z]+.*[A-Z][a-z]+").unwrap());

/// Words that suggest the text is written in a research register.
const RESEARCH_KEYWORDS: [&str; 4] = ["study", "research", "analysis", "method"];

/// Check extracted `data` for plausibility against the paper's title.
///
/// `source_reliable` is never set here.
pub fn validate(data: &str, paper_title: &str, kind: DataKind) -> ValidationFlags {
    let mut flags = ValidationFlags::default();
    if data.is_empty() {
        return flags;
    }

    flags.format_valid = match kind {
        DataKind::Authors => NAME_PAIR_RE.is_match(data) || data.contains("et al"),
        DataKind::Abstract => {
            let lower = data.to_lowercase();
            data.chars().count() > 50 && RESEARCH_KEYWORDS.iter().any(|k| lower.contains(k))
        }
    };

    flags.content_relevant = shares_word(data, paper_title);
    flags
}

/// True if the lower-cased whitespace tokens of `a` and `b` intersect.
fn shares_word(a: &str, b: &str) -> bool {
    let a_lower = a.to_lowercase();
    let b_lower = b.to_lowercase();
    let words: HashSet<&str> = b_lower.split_whitespace().collect();
    a_lower.split_whitespace().any(|w| words.contains(w))
}
