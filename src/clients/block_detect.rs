//! Recognises anti-bot pages served in place of search results.

use serde::de::DeserializeOwned;
use std::fmt;

const BLOCK_PHRASES: &[&str] = &[
    "prove your humanity",
    "captcha",
    "robot",
    "automated",
    "blocked",
    "rate limit",
    "too many requests",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    Phrase(&'static str),
    Html,
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Phrase(phrase) => write!(f, "response mentions \"{phrase}\""),
            Self::Html => write!(f, "HTML returned instead of JSON"),
        }
    }
}

#[derive(Debug)]
pub enum BodyClass<T> {
    Parsed(T),
    Blocked(BlockReason),
    Malformed(serde_json::Error),
}

#[must_use]
pub fn looks_like_html(body: &str) -> bool {
    let head: String = body.trim_start().chars().take(512).collect();
    let head = head.to_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html") || head.contains("<html")
}

/// Checks a raw body for block-page markers, ignoring case.
#[must_use]
pub fn block_reason(body: &str) -> Option<BlockReason> {
    let lower = body.to_lowercase();
    BLOCK_PHRASES
        .iter()
        .copied()
        .find(|phrase| lower.contains(phrase))
        .map(BlockReason::Phrase)
        .or_else(|| looks_like_html(body).then_some(BlockReason::Html))
}

/// Decodes `body` as `T`. A body that does not decode is a block page when it
/// carries a block marker or is HTML, and malformed otherwise.
///
/// Decoding runs before the phrase scan, so a well-formed listing is never a
/// block page even when a post title says "blocked" or "too many requests".
/// Scanning the raw body first would reject such listings.
pub fn classify_body<T: DeserializeOwned>(body: &str) -> BodyClass<T> {
    match serde_json::from_str(body) {
        Ok(parsed) => BodyClass::Parsed(parsed),
        Err(e) => block_reason(body).map_or(BodyClass::Malformed(e), BodyClass::Blocked),
    }
}
