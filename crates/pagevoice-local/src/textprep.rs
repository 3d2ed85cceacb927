//! Minimal, deterministic text normalization helpers.
//!
//! Display text keeps its case and punctuation (`clean`); matching keys are lower-cased
//! (`search_key`); summarizer tokens treat anything non-alphanumeric as a separator
//! (`tokens`).

/// Collapse every whitespace run to a single space and trim.
pub fn clean(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn has_any_text(s: &str) -> bool {
    s.chars().any(|c| !c.is_whitespace())
}

/// Lower-cased, whitespace-normalized key used for substring matching.
pub fn search_key(s: &str) -> String {
    clean(&s.to_lowercase())
}

/// Lower-case and split on anything that is not alphanumeric.
pub fn tokens(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    for ch in s.chars() {
        if ch.is_alphanumeric() {
            for lc in ch.to_lowercase() {
                cur.push(lc);
            }
        } else if !cur.is_empty() {
            out.push(std::mem::take(&mut cur));
        }
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}

pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// First `max_chars` characters of `s`, and whether anything was cut.
pub fn truncate_chars(s: &str, max_chars: usize) -> (String, bool) {
    if max_chars == 0 {
        return (String::new(), !s.is_empty());
    }
    let mut out = String::new();
    for (n, ch) in s.chars().enumerate() {
        if n >= max_chars {
            return (out, true);
        }
        out.push(ch);
    }
    (out, false)
}

/// Bounded display text: clipped to `max_chars` with a trailing ellipsis.
pub fn preview(s: &str, max_chars: usize) -> String {
    let t = s.trim();
    let (mut out, clipped) = truncate_chars(t, max_chars);
    if clipped {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_collapses_all_whitespace_kinds() {
        assert_eq!(clean("  a\t\tb\n\nc  "), "a b c");
        assert_eq!(clean("   "), "");
        assert!(!has_any_text(" \n\t"));
    }

    #[test]
    fn search_key_lowercases_and_keeps_punctuation() {
        assert_eq!(search_key("  Hello,\n WORLD! "), "hello, world!");
    }

    #[test]
    fn tokens_split_on_punctuation_like_real_text() {
        assert_eq!(tokens("Rust's borrow-checker (v1.2)"), ["rust", "s", "borrow", "checker", "v1", "2"]);
        assert!(tokens("... !!!").is_empty());
    }

    #[test]
    fn truncate_and_preview_count_chars_not_bytes() {
        assert_eq!(truncate_chars("héllo", 2), ("hé".to_string(), true));
        assert_eq!(truncate_chars("hi", 5), ("hi".to_string(), false));
        assert_eq!(preview("  abcdef ", 3), "abc…");
        assert_eq!(preview("abc", 3), "abc");
    }
}
