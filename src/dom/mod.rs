//! HTML document model.
//!
//! Pages are parsed by html5ever into an [`ArenaDom`], queried with CSS
//! selectors, rewritten in place, then written back out as XHTML.

mod arena;
mod element_ref;
mod pretty;
mod serialize;
mod tree_sink;

use html5ever::driver::ParseOpts;
use html5ever::tendril::TendrilSink;

pub use arena::{ArenaDom, ArenaNode, ArenaNodeData, ArenaNodeId, Attribute, ChildrenIter};
pub use element_ref::{ElementRef, PageSelectors, Selector};
pub use pretty::{INDENT, leading_text, prettify, tail_text};
pub use serialize::{inner_xhtml, is_void, to_xhtml};
pub use tree_sink::ArenaSink;

use crate::util::{decode_text, sniff_html_charset};

/// Parse an HTML string into a full document.
///
/// html5ever always materializes `<html>`, `<head>` and `<body>`, so a bare
/// fragment like `<p>hi</p>` comes back wrapped in a document.
pub fn parse_document(html: &str) -> ArenaDom {
    html5ever::parse_document(ArenaSink::new(), ParseOpts::default())
        .from_utf8()
        .one(html.as_bytes())
        .into_dom()
}

/// Parse raw bytes, honoring a `<meta charset>` declaration when the bytes
/// are not valid UTF-8.
pub fn parse_bytes(bytes: &[u8]) -> ArenaDom {
    let text = decode_text(bytes, sniff_html_charset(bytes));
    parse_document(&text)
}
