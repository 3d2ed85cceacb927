//! Page scan: overlay suppression, block collection, classification, section building.

use crate::{classify, offers, textprep};
use pagevoice_core::{BlockClass, Document, NodeId, Priority, Section};
use serde::{Deserialize, Serialize};

pub const BLOCK_SELECTOR: &str = "p, div, article, section, main";
pub const HEADING_SELECTOR: &str = "h1, h2, h3";
/// Shorter blocks are never classified.
pub const MIN_BLOCK_CHARS: usize = 80;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Populate `price` / `rating` on each section.
    #[serde(default)]
    pub extract_offers: bool,
}

/// Why candidate blocks were dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropCounts {
    pub invisible: usize,
    pub short: usize,
    pub layout: usize,
    pub ad: usize,
    pub donation: usize,
}

/// A visible content block and its cleaned text. Only lives until sections are built.
#[derive(Debug, Clone)]
pub struct ContentBlock {
    pub node: NodeId,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub overlays_hidden: usize,
    pub candidates: usize,
    pub dropped: DropCounts,
    pub sections: Vec<Section>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl ScanReport {
    pub fn no_sections(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Visible, long-enough, non-layout blocks that classify as content, in document order.
pub fn collect_blocks(doc: &dyn Document, dropped: &mut DropCounts) -> (usize, Vec<ContentBlock>) {
    let candidates = doc.select(BLOCK_SELECTOR);
    let total = candidates.len();
    let mut out = Vec::new();
    for node in candidates {
        if !doc.is_visible(node) {
            dropped.invisible += 1;
            continue;
        }
        let text = textprep::clean(&doc.text(node));
        if textprep::char_len(&text) < MIN_BLOCK_CHARS {
            dropped.short += 1;
            continue;
        }
        if classify::in_layout_region(doc, node) || classify::has_layout_class_id(doc, node) {
            dropped.layout += 1;
            continue;
        }
        let verdict = classify::classify(doc, node, &text);
        match verdict.class {
            BlockClass::Content => out.push(ContentBlock { node, text }),
            BlockClass::Ad => {
                tracing::debug!(%node, rule = ?verdict.rule, "dropping ad block");
                dropped.ad += 1;
            }
            BlockClass::Donation => {
                tracing::debug!(%node, rule = ?verdict.rule, "dropping donation block");
                dropped.donation += 1;
            }
        }
    }
    (total, out)
}

/// One section per block. The heading is the first non-empty `h1`..`h3` inside the block,
/// else `Paragraph N` (1-based block position).
pub fn build_sections(doc: &dyn Document, blocks: &[ContentBlock]) -> Vec<Section> {
    blocks
        .iter()
        .enumerate()
        .map(|(idx, block)| {
            let heading_text = doc
                .query_all(block.node, HEADING_SELECTOR)
                .into_iter()
                .next()
                .map(|h| textprep::clean(&doc.text(h)))
                .filter(|h| !h.is_empty())
                .unwrap_or_else(|| format!("Paragraph {}", idx + 1));
            Section {
                index: idx,
                heading_text,
                body_text: block.text.clone(),
                summary_text: None,
                search_text: textprep::search_key(&block.text),
                owned_nodes: vec![block.node],
                priority: Priority::default(),
                price: None,
                rating: None,
            }
        })
        .collect()
}

pub fn scan(doc: &mut dyn Document, opts: &ScanOptions) -> ScanReport {
    let overlays_hidden = classify::remove_donation_overlays(doc);

    let mut dropped = DropCounts::default();
    let (candidates, blocks) = collect_blocks(&*doc, &mut dropped);
    let mut sections = build_sections(&*doc, &blocks);

    if opts.extract_offers {
        for s in &mut sections {
            s.price = offers::extract_price(&s.body_text);
            s.rating = offers::extract_rating(&s.body_text);
        }
    }

    let diagnostic = if sections.is_empty() {
        tracing::warn!(candidates, ?dropped, "no content sections detected");
        Some("no content sections detected".to_string())
    } else {
        None
    };
    tracing::info!(
        candidates,
        sections = sections.len(),
        overlays_hidden,
        "scan complete"
    );

    ScanReport {
        overlays_hidden,
        candidates,
        dropped,
        sections,
        diagnostic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::StaticDocument;
    use pagevoice_core::Viewport;

    const FILLER: &str = "The river authority published its annual survey of water quality across the basin this week.";

    fn run(html: &str, opts: &ScanOptions) -> (StaticDocument, ScanReport) {
        let mut d = StaticDocument::parse(html, Viewport::default());
        let r = scan(&mut d, opts);
        (d, r)
    }

    #[test]
    fn sections_follow_document_order_with_headings() {
        let html = format!(
            r#"<html><body>
              <article id="a"><h2>  Water   quality </h2><span>{FILLER}</span></article>
              <article id="b"><span>{FILLER} Second.</span></article>
            </body></html>"#
        );
        let (d, r) = run(&html, &ScanOptions::default());
        assert_eq!(r.sections.len(), 2);
        assert_eq!(r.sections[0].heading_text, "Water quality");
        assert_eq!(r.sections[1].heading_text, "Paragraph 2");
        assert_eq!(r.sections[0].owned_nodes, vec![d.select("#a")[0]]);
        assert_eq!(r.sections[1].index, 1);
        assert_eq!(r.sections[0].search_text, r.sections[0].body_text.to_lowercase());
        assert!(!r.no_sections());
    }

    #[test]
    fn layout_ads_and_short_blocks_are_dropped() {
        let html = format!(
            r#"<html><body>
              <nav><p>{FILLER}</p></nav>
              <div class="sidebar-widget"><span>{FILLER}</span></div>
              <div class="ad-slot"><span>{FILLER}</span></div>
              <article><span>{FILLER} Please donate to the fundraiser.</span></article>
              <article><span>Too short.</span></article>
              <article style="display:none"><span>{FILLER}</span></article>
              <main><span>{FILLER}</span></main>
            </body></html>"#
        );
        let (_, r) = run(&html, &ScanOptions::default());
        assert_eq!(r.sections.len(), 1);
        assert_eq!(r.dropped.layout, 2);
        assert_eq!(r.dropped.ad, 1);
        assert_eq!(r.dropped.donation, 1);
        assert!(r.dropped.short >= 1);
        assert!(r.dropped.invisible >= 1);
    }

    #[test]
    fn no_content_yields_diagnostic_not_error() {
        let (_, r) = run("<html><body><p>hi</p></body></html>", &ScanOptions::default());
        assert!(r.no_sections());
        assert!(r.diagnostic.is_some());
    }

    #[test]
    fn offers_are_opt_in() {
        let html = format!(
            r#"<html><body><article><span>{FILLER} Price $1,250.00, rated 4.5 out of 5.</span></article></body></html>"#
        );
        let (_, plain) = run(&html, &ScanOptions::default());
        assert_eq!(plain.sections[0].price, None);
        let (_, rich) = run(&html, &ScanOptions { extract_offers: true });
        assert_eq!(rich.sections[0].price, Some(1250.0));
        assert_eq!(rich.sections[0].rating, Some(4.5));
    }
}
