use unicode_normalization::UnicodeNormalization;

/// Characters that render as blank but are not `char::is_whitespace`.
const BLANK_LIKE: [char; 5] = ['\u{3000}', '\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}'];

/// Normalize text for keyword matching.
///
/// NFKC folds full-width and compatibility forms, then the result is
/// lowercased, blank-like characters become spaces, whitespace runs collapse
/// to a single space and the ends are trimmed.
pub fn normalize_text(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }

    let folded: String = s.nfkc().collect::<String>().to_lowercase();

    let mut out = String::with_capacity(folded.len());
    let mut pending_space = false;
    for ch in folded.chars() {
        if ch.is_whitespace() || BLANK_LIKE.contains(&ch) {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(ch);
    }
    out
}

/// Drop the single spaces left by `normalize_text`.
pub fn strip_spaces(normalized: &str) -> String {
    normalized.chars().filter(|c| *c != ' ').collect()
}
