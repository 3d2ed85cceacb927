//! Free-text query matching over sections, with price / rating intents.

use crate::textprep;
use pagevoice_core::Section;
use serde::{Deserialize, Serialize};

/// Best score below this is "no match".
pub const ACCEPT_THRESHOLD: f64 = 25.0;
/// Fuzzy matching only looks at this many leading characters of the search text.
pub const FUZZY_PREFIX_CHARS: usize = 80;

const PHRASE_BONUS: f64 = 40.0;
const TOKEN_BONUS: f64 = 10.0;
const FUZZY_BONUS: f64 = 6.0;
const LENGTH_BONUS_CAP: f64 = 20.0;
const LENGTH_BONUS_DIVISOR: f64 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Cheapest,
    HighestRated,
}

impl Intent {
    pub fn detect(query: &str) -> Option<Self> {
        let q = query.to_lowercase();
        if q.contains("cheapest") || q.contains("lowest price") {
            Some(Self::Cheapest)
        } else if ["highest rated", "best rated", "best reviewed"]
            .iter()
            .any(|p| q.contains(p))
        {
            Some(Self::HighestRated)
        } else {
            None
        }
    }

    /// Spoken before the selected section.
    pub fn intro(self) -> &'static str {
        match self {
            Self::Cheapest => "Here is the cheapest option.",
            Self::HighestRated => "Here is the highest rated option.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchKind {
    Intent { intent: Intent },
    Text { score: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryMatch {
    /// Index into the section list.
    pub index: usize,
    #[serde(flatten)]
    pub kind: MatchKind,
}

impl QueryMatch {
    pub fn intro(&self) -> Option<&'static str> {
        match self.kind {
            MatchKind::Intent { intent } => Some(intent.intro()),
            MatchKind::Text { .. } => None,
        }
    }
}

/// Unit-cost edit distance over chars, case-insensitive. Either side empty counts as far.
pub fn levenshtein(a: &str, b: &str) -> usize {
    if a.is_empty() || b.is_empty() {
        return 99;
    }
    let a = a.to_lowercase().chars().collect::<Vec<_>>();
    let b = b.to_lowercase().chars().collect::<Vec<_>>();
    let mut prev = (0..=b.len()).collect::<Vec<_>>();
    let mut cur = vec![0; b.len() + 1];
    for i in 1..=a.len() {
        cur[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            cur[j] = (prev[j] + 1).min(cur[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

fn search_text(section: &Section) -> String {
    if section.search_text.is_empty() {
        section.body_text.to_lowercase()
    } else {
        section.search_text.to_lowercase()
    }
}

pub fn score_section(section: &Section, query: &str) -> f64 {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return 0.0;
    }
    let text = search_text(section);
    if text.is_empty() {
        return 0.0;
    }

    let mut score = 0.0;
    if text.contains(&q) {
        score += PHRASE_BONUS;
    }
    let (prefix, _) = textprep::truncate_chars(&text, FUZZY_PREFIX_CHARS);
    for w in q.split_whitespace().filter(|w| w.chars().count() > 2) {
        if text.contains(w) {
            score += TOKEN_BONUS;
        }
        if levenshtein(w, &prefix) <= 1 {
            score += FUZZY_BONUS;
        }
    }
    score + (textprep::char_len(&text) as f64 / LENGTH_BONUS_DIVISOR).min(LENGTH_BONUS_CAP)
}

/// Highest-scoring section at or above the threshold. Ties keep the earliest.
pub fn find_best_section(sections: &[Section], query: &str) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    let mut best_score = 0.0;
    for (i, s) in sections.iter().enumerate() {
        let sc = score_section(s, query);
        if sc > best_score {
            best_score = sc;
            best = Some((i, sc));
        }
    }
    best.filter(|&(_, sc)| sc >= ACCEPT_THRESHOLD)
}

/// Minimum defined price; sections without one are ignored.
pub fn cheapest(sections: &[Section]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, s) in sections.iter().enumerate() {
        if let Some(p) = s.price.filter(|p| p.is_finite()) {
            if best.map_or(true, |(_, bp)| p < bp) {
                best = Some((i, p));
            }
        }
    }
    best.map(|(i, _)| i)
}

/// Maximum defined rating.
pub fn highest_rated(sections: &[Section]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, s) in sections.iter().enumerate() {
        if let Some(r) = s.rating.filter(|r| r.is_finite()) {
            if best.map_or(true, |(_, br)| r > br) {
                best = Some((i, r));
            }
        }
    }
    best.map(|(i, _)| i)
}

/// Intents first; an intent with no eligible section falls through to text scoring.
pub fn match_query(sections: &[Section], query: &str) -> Option<QueryMatch> {
    if let Some(intent) = Intent::detect(query) {
        let hit = match intent {
            Intent::Cheapest => cheapest(sections),
            Intent::HighestRated => highest_rated(sections),
        };
        if let Some(index) = hit {
            return Some(QueryMatch {
                index,
                kind: MatchKind::Intent { intent },
            });
        }
    }
    find_best_section(sections, query).map(|(index, score)| QueryMatch {
        index,
        kind: MatchKind::Text { score },
    })
}
