//! Reference-section removal.
//!
//! Summaries get worse when the model spends its context window on a
//! bibliography. We cut the text at the first occurrence of a back-matter
//! heading keyword. The match is a plain case-insensitive substring search:
//! it is not anchored to line starts, so a sentence such as "see the notes
//! below" also truncates. That over-truncation is accepted.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_BACK_MATTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)references|bibliography|acknowledgments|acknowledgements|notes").unwrap()
});

/// Return the text preceding the first back-matter keyword, or the whole
/// text when none occurs.
pub fn strip_references(text: &str) -> &str {
    match RE_BACK_MATTER.find(text) {
        Some(m) => &text[..m.start()],
        None => text,
    }
}
