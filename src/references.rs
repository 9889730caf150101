//! Issue reference extraction from free-form chat text.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// `#` followed by three or more digits. The `#` must not directly follow a
/// word character and the digits must end at a word boundary, so `abc#123`
/// and `#1234abc` are not references.
static ISSUE_REFERENCE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\B#(\d{3,})\b").expect("hardcoded issue reference regex"));

/// Find issue/PR numbers referenced in `text`.
///
/// Numbers are returned once each, in order of first appearance. Shorter
/// numbers (`#12`) are treated as unrelated and skipped.
pub fn extract_issue_references(text: &str) -> Vec<u64> {
    let mut seen = HashSet::new();
    ISSUE_REFERENCE_REGEX
        .captures_iter(text)
        .filter_map(|captures| captures.get(1)?.as_str().parse::<u64>().ok())
        .filter(|number| *number > 0 && seen.insert(*number))
        .collect()
}
