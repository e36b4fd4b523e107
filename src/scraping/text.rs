//! Cleanup heuristics for text read out of the profile DOM.
//!
//! The site renders most labels twice (once visible, once for screen readers),
//! so text read from a block often repeats itself.

use std::collections::HashSet;

/// Separator between company name and employment type ("Acme · Full-time").
pub const SEPARATOR: char = '·';

/// Collapses "Engineer Engineer" style strings made of two identical word
/// sequences into a single copy. Anything else is returned unchanged.
pub fn dedupe_halves(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let half = words.len() / 2;
    if half > 0 && words.len() % 2 == 0 && words[..half] == words[half..] {
        words[..half].join(" ")
    } else {
        text.to_string()
    }
}

/// Keeps the first occurrence of every whitespace-delimited word, in order.
/// Newlines count as whitespace.
pub fn dedupe_words(text: &str) -> String {
    let mut seen = HashSet::new();
    text.split_whitespace()
        .filter(|word| seen.insert(*word))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text before the first [`SEPARATOR`], trimmed.
pub fn before_separator(text: &str) -> String {
    collapse_whitespace(text.split(SEPARATOR).next().unwrap_or_default())
}

/// Joins lines with single spaces and trims.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn title(text: &str) -> String {
    collapse_whitespace(&dedupe_halves(text))
}

pub fn duration(text: &str) -> String {
    dedupe_words(&before_separator(text))
}

/// Drops a leading "Skills:" label from a result-card summary.
pub fn strip_skills_label(text: &str) -> String {
    let trimmed = text.trim();
    let stripped = trimmed.strip_prefix("Skills:").unwrap_or(trimmed);
    collapse_whitespace(stripped)
}
