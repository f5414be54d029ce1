//! Conversion of non-HTML chapter sources into HTML.

use std::io::{Cursor, Read};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::Result;
use crate::util::{decode_text, escape_xml_text, sniff_html_charset};

/// How a source should be turned into HTML, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Html,
    Text,
    Docx,
}

impl SourceKind {
    /// Classify a file path or URL path by extension.
    pub fn from_path(path: &str) -> Self {
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("txt" | "text") => SourceKind::Text,
            Some("docx") => SourceKind::Docx,
            _ => SourceKind::Html,
        }
    }
}

/// Convert raw source bytes to HTML according to `kind`.
pub fn convert_content(kind: SourceKind, data: &[u8]) -> Result<String> {
    match kind {
        SourceKind::Html => Ok(decode_text(data, sniff_html_charset(data)).into_owned()),
        SourceKind::Text => Ok(text_to_html(&decode_text(data, None))),
        SourceKind::Docx => docx_to_html(data),
    }
}

/// Every non-blank line becomes an escaped `<p>`.
pub fn text_to_html(text: &str) -> String {
    let mut html = String::from("<body>");
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        html.push_str("<p>");
        html.push_str(&escape_xml_text(line));
        html.push_str("</p>");
    }
    html.push_str("</body>");
    html
}

/// Formatting of the run currently being read.
#[derive(Default)]
struct RunStyle {
    bold: bool,
    italic: bool,
}

/// Convert a Word document to simple HTML.
///
/// Only the main document part is read. Paragraphs become `<p>`, the
/// built-in `Heading1`..`Heading6` and `Title` styles become headings, bold
/// and italic runs become `<b>`/`<i>` and line breaks become `<br/>`.
pub fn docx_to_html(data: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")?
        .read_to_string(&mut xml)?;

    let mut reader = Reader::from_str(&xml);
    let mut html = String::new();
    let mut paragraph = String::new();
    let mut tag = "p";
    let mut run = RunStyle::default();
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match local_name(e.name().as_ref()) {
                b"p" => {
                    paragraph.clear();
                    tag = "p";
                }
                b"r" => run = RunStyle::default(),
                b"t" => in_text = true,
                other => apply_property(other, &e, &mut tag, &mut run),
            },
            Event::Empty(e) => match local_name(e.name().as_ref()) {
                b"br" => paragraph.push_str("<br/>"),
                b"tab" => paragraph.push(' '),
                other => apply_property(other, &e, &mut tag, &mut run),
            },
            Event::Text(e) if in_text => {
                let text = String::from_utf8_lossy(e.as_ref());
                push_run_text(&mut paragraph, &run, &escape_xml_text(&text));
            }
            Event::GeneralRef(e) if in_text => {
                let entity = String::from_utf8_lossy(e.as_ref());
                if let Some(resolved) = resolve_entity(&entity) {
                    push_run_text(&mut paragraph, &run, &escape_xml_text(&resolved));
                }
            }
            Event::End(e) => match local_name(e.name().as_ref()) {
                b"t" => in_text = false,
                b"p" if !paragraph.trim().is_empty() => {
                    html.push_str(&format!("<{tag}>{paragraph}</{tag}>"));
                    paragraph.clear();
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(html)
}

/// Handle paragraph style and run formatting elements.
fn apply_property(local: &[u8], e: &BytesStart<'_>, tag: &mut &'static str, run: &mut RunStyle) {
    match local {
        b"pStyle" => {
            if let Some(style) = attr_value(e, b"val") {
                *tag = heading_tag(&style);
            }
        }
        b"b" => run.bold = toggle_on(e),
        b"i" => run.italic = toggle_on(e),
        _ => {}
    }
}

fn heading_tag(style: &str) -> &'static str {
    match style {
        "Title" | "Heading1" => "h1",
        "Heading2" => "h2",
        "Heading3" => "h3",
        "Heading4" => "h4",
        "Heading5" => "h5",
        "Heading6" => "h6",
        _ => "p",
    }
}

/// `<w:b/>` switches a property on; `<w:b w:val="0"/>` switches it off.
fn toggle_on(e: &BytesStart<'_>) -> bool {
    !matches!(attr_value(e, b"val").as_deref(), Some("0" | "false" | "off"))
}

fn push_run_text(out: &mut String, run: &RunStyle, text: &str) {
    match (run.bold, run.italic) {
        (true, true) => out.push_str(&format!("<b><i>{text}</i></b>")),
        (true, false) => out.push_str(&format!("<b>{text}</b>")),
        (false, true) => out.push_str(&format!("<i>{text}</i>")),
        (false, false) => out.push_str(text),
    }
}

fn attr_value(e: &BytesStart<'_>, local: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| local_name(attr.key.as_ref()) == local)
        .map(|attr| String::from_utf8_lossy(&attr.value).into_owned())
}

/// Strip the namespace prefix from a qualified name.
fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        _ => {}
    }

    let code = match entity.strip_prefix("#x") {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => entity.strip_prefix('#')?.parse().ok()?,
    };
    char::from_u32(code).map(String::from)
}
