//! XHTML serialization of an [`ArenaDom`].
//!
//! html5ever hands us an HTML tree; EPUB readers want well-formed XML. The
//! writer closes every element, self-closes void elements (`<br/>`) and
//! escapes text and attribute values.

use super::arena::{ArenaDom, ArenaNodeData, ArenaNodeId};
use crate::util::{escape_xml, escape_xml_text, is_xml_char};

/// Elements with no content model, written as `<tag/>`.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Check whether a tag is a void element.
pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Serialize `node` and its subtree.
///
/// Passing the document node writes every top-level child, doctype included.
pub fn to_xhtml(dom: &ArenaDom, node: ArenaNodeId) -> String {
    let mut out = String::new();
    write_node(dom, node, &mut out);
    out
}

/// Serialize only the children of `node`.
pub fn inner_xhtml(dom: &ArenaDom, node: ArenaNodeId) -> String {
    let mut out = String::new();
    for child in dom.children(node) {
        write_node(dom, child, &mut out);
    }
    out
}

fn write_node(dom: &ArenaDom, id: ArenaNodeId, out: &mut String) {
    let Some(node) = dom.get(id) else {
        return;
    };

    match &node.data {
        ArenaNodeData::Document => {
            for child in dom.children(id) {
                write_node(dom, child, out);
            }
        }
        ArenaNodeData::Doctype { name, .. } => {
            out.push_str("<!DOCTYPE ");
            out.push_str(if name.is_empty() { "html" } else { name });
            out.push('>');
        }
        ArenaNodeData::Comment(text) => {
            // "--" is not allowed inside an XML comment
            out.push_str("<!--");
            let text: String = text.chars().filter(|&c| is_xml_char(c)).collect();
            out.push_str(&text.replace("--", "- -"));
            out.push_str("-->");
        }
        ArenaNodeData::Text(text) => out.push_str(&escape_xml_text(text)),
        ArenaNodeData::Element { name, attrs } => {
            let tag = name.local.as_ref();
            out.push('<');
            out.push_str(tag);
            for attr in attrs {
                out.push(' ');
                if let Some(prefix) = &attr.name.prefix {
                    out.push_str(prefix);
                    out.push(':');
                }
                out.push_str(&attr.name.local);
                out.push_str("=\"");
                out.push_str(&escape_xml(&attr.value));
                out.push('"');
            }

            if is_void(tag) {
                out.push_str("/>");
                return;
            }

            out.push('>');
            for child in dom.children(id) {
                write_node(dom, child, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}
