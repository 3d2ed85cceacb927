//! `Document` over a static HTML snapshot.
//!
//! There is no real layout engine here. Style comes from inline `style` attributes and
//! geometry is estimated: explicit `width`/`height`/`left`/`top` win, otherwise width is
//! inherited from the parent (the viewport at the root) and height grows with text length.
//! That is enough for the overlay and visibility heuristics to behave on saved pages and
//! test fixtures.
//!
//! Nothing here recurses over the tree. Geometry is placed in one pass at parse time,
//! text is joined children-first from a work stack, and selector and markup hits are
//! flag vectors, so arbitrarily deep pages cost the same as wide ones.

use html_scraper::{ElementRef, Html, Selector};
use pagevoice_core::{BoundingBox, ComputedStyle, Document, NodeId, Position, Viewport};
use regex::Regex;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Cursor;
use std::rc::Rc;

const GLYPH_WIDTH_PX: f64 = 8.0;
const LINE_HEIGHT_PX: f64 = 20.0;

const NON_RENDERED_TAGS: &[&str] = &[
    "head", "script", "style", "noscript", "template", "title", "meta", "link",
];

const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "button", "code", "em", "i", "img", "input", "label", "mark", "q",
    "s", "select", "small", "span", "strong", "sub", "sup", "textarea", "u",
];

#[derive(Debug, Clone, Copy, PartialEq)]
enum Length {
    Px(f64),
    Percent(f64),
    Vw(f64),
    Vh(f64),
}

impl Length {
    fn parse(v: &str) -> Option<Self> {
        let v = v.trim();
        let num = |s: &str| s.trim().parse::<f64>().ok();
        if let Some(n) = v.strip_suffix("px") {
            return num(n).map(Self::Px);
        }
        if let Some(n) = v.strip_suffix('%') {
            return num(n).map(Self::Percent);
        }
        if let Some(n) = v.strip_suffix("vw") {
            return num(n).map(Self::Vw);
        }
        if let Some(n) = v.strip_suffix("vh") {
            return num(n).map(Self::Vh);
        }
        num(v).map(Self::Px)
    }

    fn resolve(self, basis: f64, vp: Viewport) -> f64 {
        match self {
            Self::Px(v) => v,
            Self::Percent(p) => basis * p / 100.0,
            Self::Vw(v) => vp.width * v / 100.0,
            Self::Vh(v) => vp.height * v / 100.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct InlineStyle {
    display: Option<String>,
    visibility: Option<String>,
    opacity: Option<f64>,
    position: Option<Position>,
    z_index: Option<i64>,
    width: Option<Length>,
    height: Option<Length>,
    left: Option<Length>,
    top: Option<Length>,
}

impl InlineStyle {
    fn parse(s: &str) -> Self {
        let mut out = Self::default();
        for decl in s.split(';') {
            let Some((k, v)) = decl.split_once(':') else {
                continue;
            };
            let k = k.trim().to_ascii_lowercase();
            let v = v.trim().to_ascii_lowercase();
            let v = v.trim_end_matches("!important").trim();
            match k.as_str() {
                "display" => out.display = Some(v.to_string()),
                "visibility" => out.visibility = Some(v.to_string()),
                "opacity" => out.opacity = v.parse::<f64>().ok(),
                "position" => out.position = Some(Position::parse(v)),
                "z-index" => out.z_index = v.parse::<i64>().ok(),
                "width" => out.width = Length::parse(v),
                "height" => out.height = Length::parse(v),
                "left" => out.left = Length::parse(v),
                "top" => out.top = Length::parse(v),
                _ => {}
            }
        }
        out
    }
}

#[derive(Debug, Clone)]
enum Child {
    Element(usize),
    Text(String),
}

#[derive(Debug, Clone)]
struct ElementData {
    tag: String,
    attrs: Vec<(String, String)>,
    parent: Option<usize>,
    children: Vec<Child>,
    /// One past the last descendant; descendants occupy `index + 1..end`.
    end: usize,
    style: InlineStyle,
    tree_id: ego_tree::NodeId,
}

impl ElementData {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn display(&self) -> &str {
        if let Some(d) = self.style.display.as_deref() {
            return d;
        }
        if NON_RENDERED_TAGS.contains(&self.tag.as_str()) {
            "none"
        } else if INLINE_TAGS.contains(&self.tag.as_str()) {
            "inline"
        } else {
            "block"
        }
    }

    /// Removed from rendering regardless of ancestors.
    fn suppressed(&self) -> bool {
        self.attr("hidden").is_some() || self.display() == "none"
    }

    fn start_tag(&self) -> String {
        let mut out = format!("<{}", self.tag);
        for (k, v) in &self.attrs {
            out.push_str(&format!(" {k}=\"{v}\""));
        }
        out.push('>');
        out
    }
}

/// Static layout, fixed once the viewport is known.
#[derive(Debug, Clone, Copy, Default)]
struct Placement {
    x: f64,
    y: f64,
    width: f64,
    /// Self or an ancestor is `display:none`, `hidden` or fully transparent.
    suppressed: bool,
    /// Nearest element (self included) that sets `visibility`.
    visibility_from: Option<usize>,
}

/// Per-selector hits in document order.
struct SelectorHits {
    flags: Vec<bool>,
    /// Nearest matching ancestor-or-self.
    nearest: Vec<Option<usize>>,
    /// First match at or after each index; `len` when there is none.
    next: Vec<usize>,
}

impl SelectorHits {
    fn build(flags: Vec<bool>, elements: &[ElementData]) -> Self {
        let n = flags.len();
        let mut nearest = vec![None; n];
        for i in 0..n {
            nearest[i] = if flags[i] {
                Some(i)
            } else {
                elements[i].parent.and_then(|p| nearest[p])
            };
        }
        let mut next = vec![n; n + 1];
        for i in (0..n).rev() {
            next[i] = if flags[i] { i } else { next[i + 1] };
        }
        Self {
            flags,
            nearest,
            next,
        }
    }
}

/// Parsed HTML page implementing the rendered-element capability.
pub struct StaticDocument {
    html: Html,
    source: String,
    elements: Vec<ElementData>,
    placement: Vec<Placement>,
    /// Hidden by `hide`, directly or through an ancestor.
    hidden: Vec<bool>,
    viewport: Viewport,
    selector_cache: RefCell<HashMap<String, Rc<SelectorHits>>>,
    markup_cache: RefCell<HashMap<String, Rc<Vec<bool>>>>,
    text_cache: RefCell<Vec<Option<Rc<str>>>>,
}

impl StaticDocument {
    pub fn parse(source: &str, viewport: Viewport) -> Self {
        let html = Html::parse_document(source);

        let mut index = HashMap::new();
        for (i, el) in html
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .enumerate()
        {
            index.insert(el.id(), i);
        }

        let mut elements = Vec::with_capacity(index.len());
        for el in html.root_element().descendants().filter_map(ElementRef::wrap) {
            let parent = el
                .parent()
                .and_then(ElementRef::wrap)
                .and_then(|p| index.get(&p.id()).copied());
            let mut children = Vec::new();
            for child in el.children() {
                if let Some(c) = ElementRef::wrap(child) {
                    if let Some(&ci) = index.get(&c.id()) {
                        children.push(Child::Element(ci));
                    }
                } else if let Some(t) = child.value().as_text() {
                    children.push(Child::Text(String::from(&**t)));
                }
            }
            let value = el.value();
            let attrs = value
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<Vec<_>>();
            let style = value.attr("style").map(InlineStyle::parse).unwrap_or_default();
            elements.push(ElementData {
                tag: value.name().to_ascii_lowercase(),
                attrs,
                parent,
                children,
                end: 0,
                style,
                tree_id: el.id(),
            });
        }

        // Preorder: every parent precedes its children.
        let n = elements.len();
        for i in (0..n).rev() {
            let end = elements[i]
                .children
                .iter()
                .filter_map(|c| match c {
                    Child::Element(ci) => Some(elements[*ci].end),
                    Child::Text(_) => None,
                })
                .max()
                .unwrap_or(i + 1);
            elements[i].end = end;
        }
        let placement = place(&elements, viewport);

        Self {
            html,
            source: source.to_string(),
            elements,
            placement,
            hidden: vec![false; n],
            viewport,
            selector_cache: RefCell::new(HashMap::new()),
            markup_cache: RefCell::new(HashMap::new()),
            text_cache: RefCell::new(vec![None; n]),
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Whole-page plain text, used when no sections could be built.
    pub fn page_text(&self, width: usize) -> String {
        html2text::from_read(Cursor::new(self.source.as_bytes()), width.max(20))
            .unwrap_or_else(|_| self.text(NodeId(0)))
    }

    fn get(&self, node: NodeId) -> Option<&ElementData> {
        self.elements.get(node.0)
    }

    fn renders(&self, i: usize) -> bool {
        !self.hidden[i] && !self.elements[i].suppressed()
    }

    fn matching(&self, selector: &str) -> Rc<SelectorHits> {
        if let Some(hit) = self.selector_cache.borrow().get(selector) {
            return Rc::clone(hit);
        }
        let flags = match Selector::parse(selector) {
            Ok(sel) => self
                .html
                .root_element()
                .descendants()
                .filter_map(ElementRef::wrap)
                .map(|el| sel.matches(&el))
                .collect::<Vec<_>>(),
            Err(_) => {
                tracing::debug!(selector, "invalid selector matches nothing");
                vec![false; self.elements.len()]
            }
        };
        let hits = Rc::new(SelectorHits::build(flags, &self.elements));
        self.selector_cache
            .borrow_mut()
            .insert(selector.to_string(), Rc::clone(&hits));
        hits
    }

    /// Per element: does `pattern` match its start tag, a direct text run, or any
    /// descendant's. Built children-first in one reverse pass.
    fn markup_flags(&self, pattern: &Regex) -> Rc<Vec<bool>> {
        if let Some(hit) = self.markup_cache.borrow().get(pattern.as_str()) {
            return Rc::clone(hit);
        }
        let mut flags = vec![false; self.elements.len()];
        for i in (0..self.elements.len()).rev() {
            let el = &self.elements[i];
            flags[i] = pattern.is_match(&el.start_tag())
                || el.children.iter().any(|c| match c {
                    Child::Element(ci) => flags[*ci],
                    Child::Text(t) => pattern.is_match(t),
                });
        }
        let flags = Rc::new(flags);
        self.markup_cache
            .borrow_mut()
            .insert(pattern.as_str().to_string(), Rc::clone(&flags));
        flags
    }

    /// Rendered text of `root`, memoized per element until the next `hide`.
    fn text_of(&self, root: usize) -> Rc<str> {
        if let Some(t) = &self.text_cache.borrow()[root] {
            return Rc::clone(t);
        }
        let mut stack = vec![(root, false)];
        while let Some((i, children_done)) = stack.pop() {
            if self.text_cache.borrow()[i].is_some() {
                continue;
            }
            if !children_done {
                stack.push((i, true));
                let cache = self.text_cache.borrow();
                for child in &self.elements[i].children {
                    if let Child::Element(c) = child {
                        if self.renders(*c) && cache[*c].is_none() {
                            stack.push((*c, false));
                        }
                    }
                }
                continue;
            }
            let out = self.join_children(i);
            self.text_cache.borrow_mut()[i] = Some(Rc::from(out));
        }
        self.text_cache.borrow()[root]
            .clone()
            .unwrap_or_else(|| Rc::from(""))
    }

    /// Concatenates the text runs and (already cached) rendered child elements of `i`,
    /// with a space on either side of block children.
    fn join_children(&self, i: usize) -> String {
        let cache = self.text_cache.borrow();
        let mut out = String::new();
        let mut gap = false;
        for child in &self.elements[i].children {
            let (piece, block): (&str, bool) = match child {
                Child::Text(t) => (t.as_str(), false),
                Child::Element(c) => {
                    if !self.renders(*c) {
                        continue;
                    }
                    let piece = cache[*c].as_deref().unwrap_or("");
                    (piece, self.elements[*c].display() != "inline")
                }
            };
            let needs_space = (gap || block)
                && !out.is_empty()
                && !out.ends_with(char::is_whitespace)
                && !piece.starts_with(char::is_whitespace);
            if needs_space {
                out.push(' ');
            }
            out.push_str(piece);
            gap = block;
        }
        out
    }

    fn content_height(&self, i: usize) -> f64 {
        let chars = self
            .text_of(i)
            .split_whitespace()
            .map(|w| w.chars().count() + 1)
            .sum::<usize>();
        if chars == 0 {
            return 0.0;
        }
        let width = self.placement[i].width.max(1.0);
        let lines = ((chars as f64 * GLYPH_WIDTH_PX) / width).ceil().max(1.0);
        lines * LINE_HEIGHT_PX
    }

    /// Explicit heights resolve against the parent's height; climb until an element
    /// without one (content height) or an out-of-flow one (viewport), then resolve inward.
    fn height_of(&self, i: usize) -> f64 {
        let vp = self.viewport;
        let mut chain = Vec::new();
        let mut cur = i;
        let base = loop {
            let el = &self.elements[cur];
            let Some(len) = el.style.height else {
                break self.content_height(cur);
            };
            chain.push(len);
            let out_of_flow = el.style.position.is_some_and(Position::is_out_of_flow);
            match el.parent {
                Some(p) if !out_of_flow => cur = p,
                _ => break vp.height,
            }
        };
        chain.iter().rev().fold(base, |basis, len| len.resolve(basis, vp))
    }
}

/// Widths inherit from the parent unless the element is fixed; offsets inherit unless
/// set. One pass in document order, so parents are always placed first.
fn place(elements: &[ElementData], vp: Viewport) -> Vec<Placement> {
    let mut out: Vec<Placement> = Vec::with_capacity(elements.len());
    for (i, el) in elements.iter().enumerate() {
        let parent = el.parent.map(|p| out[p]);
        let fixed = el.style.position == Some(Position::Fixed);
        let basis = match parent {
            Some(p) if !fixed => p.width,
            _ => vp.width,
        };
        let width = el.style.width.map_or(basis, |len| len.resolve(basis, vp));
        let x = el
            .style
            .left
            .map(|len| len.resolve(vp.width, vp))
            .or(parent.map(|p| p.x))
            .unwrap_or(0.0);
        let y = el
            .style
            .top
            .map(|len| len.resolve(vp.height, vp))
            .or(parent.map(|p| p.y))
            .unwrap_or(0.0);
        let suppressed = el.suppressed()
            || el.style.opacity == Some(0.0)
            || parent.is_some_and(|p| p.suppressed);
        let visibility_from = if el.style.visibility.is_some() {
            Some(i)
        } else {
            parent.and_then(|p| p.visibility_from)
        };
        out.push(Placement {
            x,
            y,
            width,
            suppressed,
            visibility_from,
        });
    }
    out
}

impl Document for StaticDocument {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn select(&self, selector: &str) -> Vec<NodeId> {
        self.matching(selector)
            .flags
            .iter()
            .enumerate()
            .filter(|(_, m)| **m)
            .map(|(i, _)| NodeId(i))
            .collect()
    }

    fn query_all(&self, scope: NodeId, selector: &str) -> Vec<NodeId> {
        let Some(el) = self.get(scope) else {
            return Vec::new();
        };
        let hits = self.matching(selector);
        let mut out = Vec::new();
        let mut j = hits.next[scope.0 + 1];
        while j < el.end {
            out.push(NodeId(j));
            j = hits.next[j + 1];
        }
        out
    }

    fn matches(&self, node: NodeId, selector: &str) -> bool {
        self.matching(selector)
            .flags
            .get(node.0)
            .copied()
            .unwrap_or(false)
    }

    fn closest(&self, node: NodeId, selector: &str) -> Option<NodeId> {
        self.get(node)?;
        self.matching(selector).nearest[node.0].map(NodeId)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.get(node)?.parent.map(NodeId)
    }

    fn tag_name(&self, node: NodeId) -> String {
        self.get(node).map(|e| e.tag.clone()).unwrap_or_default()
    }

    fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.get(node)?.attr(name).map(str::to_string)
    }

    fn is_visible(&self, node: NodeId) -> bool {
        if self.get(node).is_none() {
            return false;
        }
        if self.hidden[node.0] || self.placement[node.0].suppressed {
            return false;
        }
        let style = self.computed_style(node);
        if style.visibility == "hidden" || style.visibility == "collapse" {
            return false;
        }
        let rect = self.bounding_box(node);
        rect.width >= 2.0 && rect.height >= 2.0
    }

    fn bounding_box(&self, node: NodeId) -> BoundingBox {
        let Some(p) = self.placement.get(node.0) else {
            return BoundingBox::default();
        };
        BoundingBox {
            x: p.x,
            y: p.y,
            width: p.width,
            height: self.height_of(node.0),
        }
    }

    fn computed_style(&self, node: NodeId) -> ComputedStyle {
        let Some(el) = self.get(node) else {
            return ComputedStyle::default();
        };
        let visibility = self.placement[node.0]
            .visibility_from
            .and_then(|i| self.elements[i].style.visibility.clone())
            .unwrap_or_else(|| "visible".to_string());
        ComputedStyle {
            position: el.style.position.unwrap_or_default(),
            z_index: el.style.z_index,
            display: el.display().to_string(),
            visibility,
            opacity: el.style.opacity.unwrap_or(1.0),
        }
    }

    fn text(&self, node: NodeId) -> String {
        if self.get(node).is_none() {
            return String::new();
        }
        self.text_of(node.0).to_string()
    }

    fn markup(&self, node: NodeId) -> String {
        self.get(node)
            .and_then(|el| self.html.tree.get(el.tree_id))
            .and_then(ElementRef::wrap)
            .map(|el| el.html())
            .unwrap_or_default()
    }

    fn markup_matches(&self, node: NodeId, pattern: &Regex) -> bool {
        self.markup_flags(pattern)
            .get(node.0)
            .copied()
            .unwrap_or(false)
    }

    fn hide(&mut self, node: NodeId) {
        let Some(end) = self.get(node).map(|e| e.end) else {
            return;
        };
        for h in &mut self.hidden[node.0..end] {
            *h = true;
        }
        self.text_cache.get_mut().iter_mut().for_each(|t| *t = None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::textprep;

    fn doc(html: &str) -> StaticDocument {
        StaticDocument::parse(
            html,
            Viewport {
                width: 1000.0,
                height: 1000.0,
            },
        )
    }

    fn only(d: &StaticDocument, sel: &str) -> NodeId {
        let hits = d.select(sel);
        assert_eq!(hits.len(), 1, "expected one match for {sel}: {hits:?}");
        hits[0]
    }

    #[test]
    fn text_skips_scripts_and_hidden_subtrees() {
        let d = doc(r#"<html><body><div id="a">Hello<script>var x=1;</script>
            <p>world</p><span hidden>secret</span><em style="display:none">gone</em></div></body></html>"#);
        let a = only(&d, "#a");
        assert_eq!(textprep::clean(&d.text(a)), "Hello world");
    }

    #[test]
    fn inline_elements_do_not_split_words() {
        let d = doc(r#"<html><body><p id="p">un<b>believ</b>able</p></body></html>"#);
        assert_eq!(textprep::clean(&d.text(only(&d, "#p"))), "unbelievable");
    }

    #[test]
    fn visibility_follows_ancestors_and_style() {
        let d = doc(r#"<html><body>
            <div style="display:none"><p id="a">inside a hidden parent</p></div>
            <div style="visibility:hidden"><p id="b">invisible but laid out</p></div>
            <p id="c" style="opacity:0">transparent text</p>
            <p id="d">plain visible text</p>
            <p id="e"></p>
        </body></html>"#);
        assert!(!d.is_visible(only(&d, "#a")));
        assert!(!d.is_visible(only(&d, "#b")));
        assert!(!d.is_visible(only(&d, "#c")));
        assert!(d.is_visible(only(&d, "#d")));
        assert!(!d.is_visible(only(&d, "#e")), "empty element has no height");
    }

    #[test]
    fn hide_is_inherited_by_descendants() {
        let mut d = doc(r#"<html><body><div id="o"><p id="i">some words here</p></div></body></html>"#);
        let o = only(&d, "#o");
        let i = only(&d, "#i");
        assert!(d.is_visible(i));
        d.hide(o);
        assert!(!d.is_visible(o));
        assert!(!d.is_visible(i));
    }

    #[test]
    fn geometry_resolves_inline_lengths_against_viewport() {
        let d = doc(r#"<html><body>
            <div id="f" style="position:fixed; z-index:2000; width:40vw; height:50%; left:10px; top:5px">x</div>
            <div id="w" style="width:50%"><p id="n">nested</p></div>
        </body></html>"#);
        let f = only(&d, "#f");
        let rect = d.bounding_box(f);
        assert_eq!(rect.width, 400.0);
        assert_eq!(rect.height, 500.0);
        assert_eq!((rect.x, rect.y), (10.0, 5.0));
        let style = d.computed_style(f);
        assert_eq!(style.position, Position::Fixed);
        assert_eq!(style.z_index, Some(2000));
        assert_eq!(d.bounding_box(only(&d, "#n")).width, 500.0);
    }

    #[test]
    fn selectors_support_closest_query_all_and_matches() {
        let d = doc(r#"<html><body><nav><ul><li id="x">Home</li></ul></nav>
            <article id="art"><h2>Title</h2><p>a</p><p>b</p></article></body></html>"#);
        let x = only(&d, "#x");
        let art = only(&d, "#art");
        assert_eq!(d.tag_name(d.closest(x, "nav").unwrap()), "nav");
        assert!(d.closest(art, "nav").is_none());
        assert_eq!(d.query_all(art, "p").len(), 2);
        assert_eq!(d.query_all(art, "h1,h2,h3").len(), 1);
        assert!(d.matches(art, "article"));
        assert!(d.select("p[").is_empty(), "invalid selector matches nothing");
        assert!(d.markup(art).starts_with("<article"));
    }

    #[test]
    fn page_text_renders_whole_document() {
        let d = doc("<html><body><h1>Heading</h1><p>Body copy.</p></body></html>");
        let t = d.page_text(80);
        assert!(t.contains("Heading"));
        assert!(t.contains("Body copy."));
    }

    const LEAF: &str = "The harbour board confirmed that the northern pier will reopen to ferries \
        after a winter of repairs to its timber decking.";

    fn nested(depth: usize) -> String {
        format!(
            "<html><body>{}<p id=\"leaf\">{LEAF}</p>{}</body></html>",
            "<div>".repeat(depth),
            "</div>".repeat(depth)
        )
    }

    #[test]
    fn deep_nesting_scans_without_recursion() {
        let mut d = StaticDocument::parse(&nested(20_000), Viewport::default());
        assert_eq!(d.select("div").len(), 20_000);
        let leaf = only(&d, "#leaf");
        assert!(d.is_visible(leaf));
        assert_eq!(d.bounding_box(leaf).width, 1280.0);
        let outer = d.select("div")[0];
        assert_eq!(d.text(outer), LEAF, "no separator pile-up across nested blocks");
        assert_eq!(d.closest(leaf, "body").map(|b| d.tag_name(b)).as_deref(), Some("body"));
        assert_eq!(d.query_all(outer, "p"), vec![leaf]);

        let r = crate::scan::scan(&mut d, &crate::scan::ScanOptions::default());
        assert_eq!(r.candidates, 20_001);
        assert_eq!(r.sections.len(), 20_001);
        assert!(r.sections.iter().all(|s| s.body_text == LEAF));
        assert_eq!(r.sections.last().and_then(|s| s.first_node()), Some(leaf));
    }

    #[test]
    fn deep_explicit_heights_resolve_outside_in() {
        let html = format!(
            r#"<html><body><div style="height:800px">{}<p id="leaf" style="height:50%">x</p>{}</div></body></html>"#,
            r#"<div style="height:100%">"#.repeat(5_000),
            "</div>".repeat(5_000)
        );
        let d = doc(&html);
        assert_eq!(d.bounding_box(only(&d, "#leaf")).height, 400.0);
    }

    #[test]
    fn markup_of_last_element_on_a_large_page() {
        let blocks = (0..2_000)
            .map(|i| format!(r#"<div><p id="b{i}">Block {i} of the archive.</p></div>"#))
            .collect::<String>();
        let html = format!(
            r#"<html><body><main>{blocks}<p title="Please donate">Tail.</p></main></body></html>"#
        );
        let d = doc(&html);
        let tail = only(&d, "p[title]");
        assert_eq!(tail.0, d.len() - 1);
        assert_eq!(
            d.markup(tail),
            r#"<p title="Please donate">Tail.</p>"#
        );
        assert!(d.markup(only(&d, "#b1999")).contains("Block 1999"));

        let donate = Regex::new(r"(?i)\bdonate\b").unwrap();
        assert!(d.markup_matches(tail, &donate));
        assert!(d.markup_matches(only(&d, "main"), &donate), "found through descendants");
        assert!(!d.markup_matches(only(&d, "#b0"), &donate));
    }

    #[test]
    fn empty_and_bare_pages_scan_to_a_diagnostic() {
        for html in ["", "<html><body></body></html>", "<html><body>   </body></html>"] {
            let mut d = doc(html);
            let r = crate::scan::scan(&mut d, &crate::scan::ScanOptions::default());
            assert!(r.no_sections(), "html={html:?}");
            assert!(r.diagnostic.is_some());
            assert!(d.text(NodeId(0)).trim().is_empty());
        }
    }

    #[test]
    fn hide_invalidates_cached_text() {
        let mut d = doc(r#"<html><body><div id="o">kept <p id="x">dropped</p></div></body></html>"#);
        let o = only(&d, "#o");
        assert_eq!(textprep::clean(&d.text(o)), "kept dropped");
        d.hide(only(&d, "#x"));
        assert_eq!(textprep::clean(&d.text(o)), "kept");
    }
}
