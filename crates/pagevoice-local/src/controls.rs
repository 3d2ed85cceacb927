//! Interactive controls (buttons, links, inputs): their spoken label.

use crate::textprep;
use pagevoice_core::{Document, NodeId};

pub const INTERACTIVE_SELECTOR: &str = "button, [role='button'], a[href], input, select, textarea, [role='link'], [role='menuitem']";

/// `node` is a control or sits inside one.
pub fn is_interactive(doc: &dyn Document, node: NodeId) -> bool {
    doc.closest(node, INTERACTIVE_SELECTOR).is_some()
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// aria-label, then the aria-labelledby target's text, then alt, title, and finally the
/// element's own text. Empty when nothing applies.
pub fn accessible_label(doc: &dyn Document, node: NodeId) -> String {
    if let Some(l) = non_blank(doc.attr(node, "aria-label")) {
        return l;
    }
    if let Some(id) = non_blank(doc.attr(node, "aria-labelledby")) {
        let target = doc
            .select("[id]")
            .into_iter()
            .find(|&n| doc.attr(n, "id").as_deref() == Some(id.as_str()));
        if let Some(t) = target {
            let text = textprep::clean(&doc.text(t));
            if !text.is_empty() {
                return text;
            }
        }
    }
    if let Some(l) = non_blank(doc.attr(node, "alt")) {
        return l;
    }
    if let Some(l) = non_blank(doc.attr(node, "title")) {
        return l;
    }
    textprep::clean(&doc.text(node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::StaticDocument;
    use pagevoice_core::Viewport;

    fn doc() -> StaticDocument {
        StaticDocument::parse(
            r#"<html><body>
              <span id="cart-label">  Shopping   cart </span>
              <button id="b1" aria-label="  Close dialog ">X</button>
              <button id="b2" aria-labelledby="cart-label">icon</button>
              <a id="a1" href="/home" title="Home page"><img id="logo" alt="Site logo"></a>
              <a id="a2" href="/more">Read   more</a>
              <button id="b3" aria-label="   " aria-labelledby="missing" title="Fallback title">?</button>
              <a id="plain">not a link</a>
              <div role="menuitem"><span id="inner">Settings</span></div>
            </body></html>"#,
            Viewport::default(),
        )
    }

    #[test]
    fn label_precedence() {
        let d = doc();
        let id = |s: &str| d.select(s)[0];
        assert_eq!(accessible_label(&d, id("#b1")), "Close dialog");
        assert_eq!(accessible_label(&d, id("#b2")), "Shopping cart");
        assert_eq!(accessible_label(&d, id("#a1")), "Home page");
        assert_eq!(accessible_label(&d, id("#logo")), "Site logo");
        assert_eq!(accessible_label(&d, id("#a2")), "Read more");
        assert_eq!(accessible_label(&d, id("#b3")), "Fallback title");
    }

    #[test]
    fn interactive_includes_ancestors() {
        let d = doc();
        let id = |s: &str| d.select(s)[0];
        assert!(is_interactive(&d, id("#b1")));
        assert!(is_interactive(&d, id("#logo")));
        assert!(is_interactive(&d, id("#inner")));
        assert!(!is_interactive(&d, id("#plain")));
        assert!(!is_interactive(&d, id("#cart-label")));
    }
}
