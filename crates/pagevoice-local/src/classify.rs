//! Content / advertising / donation classification over rendered-element signals.
//!
//! The verdict rules are an ordered table: the first rule that fires wins, and a block no
//! rule claims is content. Ambiguity never hides text.

use crate::textprep;
use pagevoice_core::{BlockClass, Document, NodeId};
use regex::Regex;
use std::sync::LazyLock;

/// Structural markers of page chrome. A block inside any of these is never content.
pub const LAYOUT_REGION_SELECTORS: &[&str] = &[
    "header",
    "nav",
    "footer",
    "aside",
    "[role='navigation']",
    "[role='banner']",
    "[role='search']",
    ".sidebar",
    ".menu",
    ".footer",
    ".cookie",
    ".cookies",
    "#cookie-banner",
    "#cookie-consent",
];

static LAYOUT_CLASS_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(nav|menu|sidebar|footer|header|toolbar|panel|cookie|gdpr|banner|subscribe|signup|login|toc)",
    )
    .expect("layout pattern")
});

static AD_CLASS_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(ad|ads|advert|advertisement|sponsored-result|sponsor(ed)?|promo|promoted|banner|deal|marketing)\b",
    )
    .expect("ad class pattern")
});

static DONATION_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(donate|donation|support our work|support us|fundraiser|fundraising|give now|please give|help us keep|help us continue|nonprofit|non-profit)\b",
    )
    .expect("donation pattern")
});

static SPONSORED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)sponsored").expect("sponsored pattern"));

static PROMO_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(buy now|shop now|order now|limited time|limited offer|deal of the day|% off|percent off|add to cart|subscribe|sign up|best price|lowest price|hot deal|special offer)\b",
    )
    .expect("promo pattern")
});

const OVERLAY_MIN_Z_INDEX: i64 = 1000;
const OVERLAY_MIN_AREA_RATIO: f64 = 0.3;
const OVERLAY_MIN_TEXT_CHARS: usize = 20;
const OVERLAY_CANDIDATES: &str = "div, section, article, aside";

/// Signals one block is judged on. Text and class/id are lower-cased; the markup is
/// reduced to the two patterns the rules look for.
#[derive(Debug, Clone, Default)]
pub struct BlockSignals {
    pub text: String,
    pub class_id: String,
    pub markup_donation: bool,
    pub markup_sponsored: bool,
}

impl BlockSignals {
    pub fn new(text: &str, class_id: &str, markup: &str) -> Self {
        Self {
            text: text.to_lowercase(),
            class_id: class_id.to_lowercase(),
            markup_donation: DONATION_TEXT.is_match(markup),
            markup_sponsored: SPONSORED.is_match(markup),
        }
    }

    pub fn from_element(doc: &dyn Document, node: NodeId, cleaned_text: &str) -> Self {
        Self {
            text: cleaned_text.to_lowercase(),
            class_id: class_and_id(doc, node),
            markup_donation: doc.markup_matches(node, &DONATION_TEXT),
            markup_sponsored: doc.markup_matches(node, &SPONSORED),
        }
    }
}

pub struct ClassRule {
    pub name: &'static str,
    pub verdict: BlockClass,
    test: fn(&BlockSignals) -> bool,
}

impl ClassRule {
    pub fn fires(&self, s: &BlockSignals) -> bool {
        (self.test)(s)
    }
}

fn mentions_donation(s: &BlockSignals) -> bool {
    s.markup_donation || DONATION_TEXT.is_match(&s.text)
}

fn says_sponsored(s: &BlockSignals) -> bool {
    s.markup_sponsored || s.text.contains("sponsored")
}

fn ad_class_id(s: &BlockSignals) -> bool {
    AD_CLASS_ID.is_match(&s.class_id)
}

fn promo_phrase(s: &BlockSignals) -> bool {
    PROMO_TEXT.is_match(&s.text)
}

/// Evaluated top to bottom. Donation phrasing outranks every advertising signal.
pub static RULES: [ClassRule; 4] = [
    ClassRule {
        name: "donation_phrase",
        verdict: BlockClass::Donation,
        test: mentions_donation,
    },
    ClassRule {
        name: "sponsored_literal",
        verdict: BlockClass::Ad,
        test: says_sponsored,
    },
    ClassRule {
        name: "ad_class_id",
        verdict: BlockClass::Ad,
        test: ad_class_id,
    },
    ClassRule {
        name: "promo_phrase",
        verdict: BlockClass::Ad,
        test: promo_phrase,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub class: BlockClass,
    /// Name of the rule that decided, `None` for the content default.
    pub rule: Option<&'static str>,
}

pub fn classify_signals(s: &BlockSignals) -> Classification {
    RULES
        .iter()
        .find(|r| r.fires(s))
        .map(|r| Classification {
            class: r.verdict,
            rule: Some(r.name),
        })
        .unwrap_or(Classification {
            class: BlockClass::Content,
            rule: None,
        })
}

pub fn classify(doc: &dyn Document, node: NodeId, cleaned_text: &str) -> Classification {
    classify_signals(&BlockSignals::from_element(doc, node, cleaned_text))
}

/// `class` and `id` attributes joined, lower-cased.
pub fn class_and_id(doc: &dyn Document, node: NodeId) -> String {
    let mut out = String::new();
    if let Some(c) = doc.attr(node, "class") {
        out.push_str(&c);
        out.push(' ');
    }
    if let Some(i) = doc.attr(node, "id") {
        out.push_str(&i);
    }
    out.to_lowercase()
}

pub fn in_layout_region(doc: &dyn Document, node: NodeId) -> bool {
    LAYOUT_REGION_SELECTORS
        .iter()
        .any(|sel| doc.closest(node, sel).is_some())
}

pub fn has_layout_class_id(doc: &dyn Document, node: NodeId) -> bool {
    LAYOUT_CLASS_ID.is_match(&class_and_id(doc, node))
}

pub fn is_donation_text(text: &str) -> bool {
    DONATION_TEXT.is_match(text)
}

/// Fixed/absolute element with area that sits on a high stack order or covers a large
/// share of the viewport.
pub fn is_overlay(doc: &dyn Document, node: NodeId) -> bool {
    let rect = doc.bounding_box(node);
    if rect.width <= 0.0 || rect.height <= 0.0 {
        return false;
    }
    let style = doc.computed_style(node);
    if !style.position.is_out_of_flow() {
        return false;
    }
    let vp_area = doc.viewport().area();
    let ratio = if vp_area > 0.0 {
        rect.area() / vp_area
    } else {
        0.0
    };
    style.z_index.is_some_and(|z| z >= OVERLAY_MIN_Z_INDEX) || ratio > OVERLAY_MIN_AREA_RATIO
}

pub fn is_donation_overlay(doc: &dyn Document, node: NodeId, cleaned_text: &str) -> bool {
    if textprep::char_len(cleaned_text) < OVERLAY_MIN_TEXT_CHARS {
        return false;
    }
    is_overlay(doc, node) && is_donation_text(cleaned_text)
}

/// Hide donation overlays (and their overlay parents). Returns how many elements were hidden.
///
/// Runs before block collection; hiding is never undone.
pub fn remove_donation_overlays(doc: &mut dyn Document) -> usize {
    let mut hidden = 0usize;
    for node in doc.select(OVERLAY_CANDIDATES) {
        if !doc.is_visible(node) {
            continue;
        }
        let text = textprep::clean(&doc.text(node));
        if !is_donation_overlay(&*doc, node, &text) {
            continue;
        }
        tracing::info!(
            %node,
            text = %textprep::preview(&text, 80),
            "hiding donation overlay"
        );
        doc.hide(node);
        hidden += 1;
        if let Some(parent) = doc.parent(node) {
            if is_overlay(&*doc, parent) {
                doc.hide(parent);
                hidden += 1;
            }
        }
    }
    hidden
}
