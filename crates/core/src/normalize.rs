//! Accent- and case-insensitive text normalization.
//!
//! All keyword, pattern, and header matching in the pipeline goes through
//! these helpers so that `Désignation`, `DESIGNATION`, and `designation`
//! compare equal.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lowercase a string and strip diacritics (NFKD + drop combining marks).
pub fn fold(s: &str) -> String {
    s.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Normalize a header label or keyword: fold, keep only alphanumerics and
/// spaces, collapse runs of whitespace.
pub fn normalize_label(s: &str) -> String {
    let folded = fold(s);
    let mut out = String::with_capacity(folded.len());
    let mut last_was_space = true;
    for c in folded.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_was_space = false;
        } else if !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}
