//! Frequency-based extractive summarization.
//!
//! No model, no network: sentences are scored by how often their content words occur in
//! the whole text, and the best ones are returned in their original order.

use crate::textprep;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

pub const DEFAULT_MAX_SENTENCES: usize = 3;
pub const DEFAULT_HEADING_WORDS: usize = 6;
/// Cleaned text shorter than this is its own summary.
pub const SHORT_TEXT_CHARS: usize = 120;

static SENTENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^.!?]+[.!?]*").expect("sentence pattern"));

const STOPWORDS: &[&str] = &[
    "the", "is", "in", "at", "of", "on", "and", "a", "an", "to", "for", "with", "that", "this",
    "it", "as", "by", "from", "or", "be", "are", "was", "were", "has", "have", "had", "but",
    "not", "can", "could", "should", "would", "will", "may", "might", "do", "does", "did",
    "about", "into", "over", "after", "before", "between", "during", "than", "then", "so",
    "such", "its", "their", "they", "them", "he", "she", "his", "her", "you", "your", "we",
    "our", "us", "these", "those", "which", "who", "whom", "what", "when", "where", "why",
    "how",
];

/// Terminal-punctuation sentences, cleaned. A trailing fragment without punctuation is kept.
pub fn split_sentences(text: &str) -> Vec<String> {
    let out = SENTENCE
        .find_iter(text)
        .map(|m| textprep::clean(m.as_str()))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();
    if out.is_empty() && textprep::has_any_text(text) {
        return vec![textprep::clean(text)];
    }
    out
}

fn word_frequencies(text: &str) -> HashMap<String, usize> {
    let mut freq = HashMap::new();
    for t in textprep::tokens(text) {
        if t.chars().count() <= 2 || STOPWORDS.contains(&t.as_str()) {
            continue;
        }
        *freq.entry(t).or_insert(0) += 1;
    }
    freq
}

pub fn summarize(text: &str, max_sentences: usize) -> String {
    let cleaned = textprep::clean(text);
    if cleaned.is_empty() || textprep::char_len(&cleaned) < SHORT_TEXT_CHARS {
        return cleaned;
    }
    let sentences = split_sentences(&cleaned);
    if sentences.len() <= max_sentences {
        return cleaned;
    }

    let freq = word_frequencies(&cleaned);
    let mut scored = sentences
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let score = textprep::tokens(s)
                .iter()
                .map(|t| freq.get(t).copied().unwrap_or(0))
                .sum::<usize>();
            (i, score)
        })
        .collect::<Vec<_>>();

    // Stable: equal scores keep source order.
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    let mut top = scored
        .into_iter()
        .take(max_sentences)
        .map(|(i, _)| i)
        .collect::<Vec<_>>();
    top.sort_unstable();

    textprep::clean(
        &top.iter()
            .map(|&i| sentences[i].as_str())
            .collect::<Vec<_>>()
            .join(" "),
    )
}

/// First `max_words` words of the normalized text.
pub fn synthesize_heading(text: &str, max_words: usize) -> String {
    textprep::clean(text)
        .split(' ')
        .filter(|w| !w.is_empty())
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}
