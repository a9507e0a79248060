use std::sync::OnceLock;

use regex::Regex;

/// An issue as it exists on the target tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteIssue {
    pub number: u64,
    pub title: String,
    pub url: Option<String>,
}

impl RemoteIssue {
    pub fn tracker_key(&self) -> Option<String> {
        tracker_key(&self.title)
    }
}

fn key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\[([A-Z][A-Z0-9_]+-\d+)\]").expect("tracker key pattern is valid")
    })
}

/// Recover the tracker key from a title such as `[KA-123] Broken link`.
///
/// Only the first bracketed key counts. Titles without one return `None`.
pub fn tracker_key(title: &str) -> Option<String> {
    key_pattern()
        .captures(title)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
