//! Display-name extraction from a generated persona introduction.

use std::sync::OnceLock;

use regex::Regex;

/// Returned when nothing in the introduction looks like a name.
pub const UNKNOWN_NAME: &str = "The persona";

/// Patterns tried in order against the whole introduction.
const NAME_PATTERNS: [&str; 4] = [
    r"This is ([A-Z][a-z]+)",
    r"Meet ([A-Z][a-z]+)",
    r"^([A-Z][a-z]+),",
    r"named ([A-Z][a-z]+)",
];

fn name_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        NAME_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("name patterns are valid"))
            .collect()
    })
}

/// Derive a display name from a narrator-style introduction.
///
/// Total: always returns a non-empty string, [`UNKNOWN_NAME`] when no
/// pattern or capitalised word in the first sentence qualifies.
pub fn extract_name(description: &str) -> String {
    for pattern in name_patterns() {
        if let Some(found) = pattern.captures(description).and_then(|c| c.get(1)) {
            return found.as_str().to_string();
        }
    }

    first_capitalized_word(description)
        .unwrap_or(UNKNOWN_NAME)
        .to_string()
}

/// First word of the first sentence that starts uppercase, is purely
/// alphabetic and longer than two characters.
fn first_capitalized_word(description: &str) -> Option<&str> {
    let first_sentence = description.split('.').next().unwrap_or_default();

    first_sentence
        .split_whitespace()
        .map(|word| word.trim_matches(|c| matches!(c, '[' | ']' | '(' | ')' | ',')))
        .find(|word| {
            let mut chars = word.chars();
            chars.next().is_some_and(char::is_uppercase)
                && word.chars().count() > 2
                && word.chars().all(char::is_alphabetic)
        })
}
