//! Chunk identifier grammar
//!
//! Identifiers look like `category:topic` or `category:topic-subtopic`: lowercase ASCII
//! letters and digits in hyphen-joined segments, exactly one colon, and a category that
//! starts with a letter.

use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z][a-z0-9]*(?:-[a-z0-9]+)*:[a-z0-9]+(?:-[a-z0-9]+)*$")
        .expect("identifier grammar is a valid regex")
});

pub fn is_valid_identifier(id: &str) -> bool {
    IDENTIFIER.is_match(id)
}

/// The part before the colon, for any id containing one
pub fn category(id: &str) -> Option<&str> {
    id.split_once(':').map(|(category, _)| category)
}
