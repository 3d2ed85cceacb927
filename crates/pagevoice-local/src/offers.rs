//! Price and rating fields for product-listing pages.

use regex::Regex;
use std::sync::LazyLock;

static PRICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[$€£]\s?([0-9]{1,3}(?:,[0-9]{3})+|[0-9]+)(?:\.([0-9]{1,2}))?\b")
        .expect("price pattern")
});

static RATING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([0-9](?:\.[0-9]+)?)\s*(?:out\s+of\s+5\b|/\s*5\b|stars?\b)")
        .expect("rating pattern")
});

/// First currency amount in `text`.
pub fn extract_price(text: &str) -> Option<f64> {
    let caps = PRICE.captures(text)?;
    let whole = caps.get(1)?.as_str().replace(',', "");
    let mut n = whole.parse::<f64>().ok()?;
    if let Some(cents) = caps.get(2) {
        let c = cents.as_str();
        let v = c.parse::<f64>().ok()?;
        n += if c.len() == 1 { v / 10.0 } else { v / 100.0 };
    }
    Some(n)
}

/// First rating on a five-point scale in `text`; values outside `[0, 5]` are skipped.
pub fn extract_rating(text: &str) -> Option<f64> {
    RATING
        .captures_iter(text)
        .filter_map(|c| c.get(1)?.as_str().parse::<f64>().ok())
        .find(|v| (0.0..=5.0).contains(v))
}
