//! HTML sanitization.
//!
//! Untrusted pages are reduced to a small set of tags and attributes that
//! e-readers render reliably. The [`TagPolicy`] decides what survives and the
//! [`Sanitizer`] rewrites the tree to match it.
//!
//! ```
//! use pagefold::clean::{sanitize_document, DEFAULT_POLICY};
//!
//! let html = "<body><div onclick='x()'>Hi</div><script>evil</script></body>";
//! let clean = sanitize_document(html, &DEFAULT_POLICY);
//! assert_eq!(clean, "<html><head></head><body><div>Hi</div></body></html>");
//! ```

mod policy;
mod sanitize;

pub use policy::{DEFAULT_POLICY, TagPolicy};
pub use sanitize::{SanitizeStats, Sanitizer, content_root, remove_orphan_images};

use tracing::debug;

use crate::dom::{ArenaDom, ArenaNodeId, inner_xhtml, parse_document, to_xhtml};
use crate::util::normalize_punctuation;

/// A sanitized page and the node holding its content.
pub struct CleanPage {
    pub dom: ArenaDom,
    pub root: ArenaNodeId,
}

/// Parse a page, normalize its punctuation, pick its content root and
/// sanitize below it.
///
/// When anything was unwrapped the content is parsed once more, so the
/// returned tree is one the HTML parser would build from its own output.
pub fn clean_html(html: &str, policy: &TagPolicy) -> CleanPage {
    let sanitizer = Sanitizer::new(policy);
    let mut dom = parse_document(&normalize_punctuation(html));
    let (mut root, stats) = sanitizer.clean(&mut dom);
    if stats.unwrapped > 0 {
        dom = parse_document(&format!("<body>{}</body>", inner_xhtml(&dom, root)));
        root = dom.find_by_tag("body").unwrap_or_else(|| dom.document());
        sanitizer.sanitize(&mut dom, root);
    }
    debug!(
        unwrapped = stats.unwrapped,
        attrs_removed = stats.attrs_removed,
        images_removed = stats.images_removed,
        "sanitized page"
    );
    CleanPage { dom, root }
}

/// Sanitize a whole document and serialize it back to XHTML.
///
/// Unwrapping can leave nestings the parser never produces, such as a
/// `<div>` inside a `<p>` once the `<button>` between them is gone. Such
/// output is parsed and sanitized a second time so that sanitizing the
/// result again changes nothing.
pub fn sanitize_document(html: &str, policy: &TagPolicy) -> String {
    let sanitizer = Sanitizer::new(policy);
    let mut dom = parse_document(html);
    let document = dom.document();
    let stats = sanitizer.sanitize(&mut dom, document);
    if stats.unwrapped == 0 {
        return to_xhtml(&dom, document);
    }

    let mut dom = parse_document(&to_xhtml(&dom, document));
    let document = dom.document();
    sanitizer.sanitize(&mut dom, document);
    to_xhtml(&dom, document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::inner_xhtml;

    #[test]
    fn test_clean_html_normalizes_quotes() {
        let page = clean_html("<p>\u{201C}Don\u{2019}t\u{201D}</p>", &DEFAULT_POLICY);
        assert_eq!(inner_xhtml(&page.dom, page.root), "<p>\"Don't\"</p>");
    }

    #[test]
    fn test_block_freed_from_button_settles() {
        let once = sanitize_document("<p>a<button><div>x</div></button>b</p>", &DEFAULT_POLICY);
        assert_eq!(
            once,
            "<html><head></head><body><p>a</p><div>x</div>b<p></p></body></html>"
        );
        assert_eq!(sanitize_document(&once, &DEFAULT_POLICY), once);
    }

    #[test]
    fn test_clean_html_reparses_after_unwrap() {
        let page = clean_html("<p>a<object><div>x</div></object>b</p>", &DEFAULT_POLICY);
        assert_eq!(page.dom.element_name(page.root).unwrap().as_ref(), "body");
        assert_eq!(
            inner_xhtml(&page.dom, page.root),
            "<p>a</p><div>x</div>b<p></p>"
        );
    }

    #[test]
    fn test_sanitize_document_keeps_doctype() {
        let out = sanitize_document("<!DOCTYPE html><p>x</p>", &DEFAULT_POLICY);
        assert!(out.starts_with("<!DOCTYPE html><html>"));
    }
}
