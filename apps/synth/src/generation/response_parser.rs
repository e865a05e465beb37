//! Response parser: turns raw model text into a `{title, body_text}` pair.
//!
//! Models often wrap the object in a fence or a chatty first/last line.
//! Order of attempts:
//! 1. the trimmed text as-is (already clean JSON is never stripped)
//! 2. the raw text after `strip_noise_lines` drops the first and last line
//! 3. the same strip on the trimmed text (trailing newline after a fence)
//! 4. the fixed fallback pair, marked not well-formed
//!
//! A parse failure is logged and recovered here; it never reaches the run loop.

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const FALLBACK_TITLE: &str = "Default Title";
pub const FALLBACK_BODY: &str = "Default Story";

/// The shape the model is asked to return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryPayload {
    pub title: String,
    pub body_text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedStory {
    pub title: String,
    pub body_text: String,
    /// False when the fallback pair was substituted.
    pub well_formed: bool,
}

impl ParsedStory {
    pub fn fallback() -> Self {
        Self {
            title: FALLBACK_TITLE.to_string(),
            body_text: FALLBACK_BODY.to_string(),
            well_formed: false,
        }
    }
}

impl From<StoryPayload> for ParsedStory {
    fn from(payload: StoryPayload) -> Self {
        Self {
            title: payload.title,
            body_text: payload.body_text,
            well_formed: true,
        }
    }
}

/// Drops the first and last line unconditionally.
/// Text with fewer than three lines normalizes to the empty string.
pub fn strip_noise_lines(raw: &str) -> String {
    let lines: Vec<&str> = raw.split('\n').collect();
    if lines.len() < 3 {
        return String::new();
    }
    lines[1..lines.len() - 1].join("\n")
}

/// Parses a raw model response, never failing.
pub fn parse_story_response(raw: &str) -> ParsedStory {
    let trimmed = raw.trim();

    if let Ok(payload) = serde_json::from_str::<StoryPayload>(trimmed) {
        return payload.into();
    }

    // Blank noise lines must still count as lines, so strip before trimming.
    if let Ok(payload) = serde_json::from_str::<StoryPayload>(&strip_noise_lines(raw)) {
        return payload.into();
    }

    match serde_json::from_str::<StoryPayload>(&strip_noise_lines(trimmed)) {
        Ok(payload) => payload.into(),
        Err(e) => {
            warn!(
                "Model response is not a story object ({e}); using fallback. Head: {:?}",
                trimmed.chars().take(80).collect::<String>()
            );
            ParsedStory::fallback()
        }
    }
}
