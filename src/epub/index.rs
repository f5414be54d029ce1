//! Navigation and package documents: `toc.xhtml`, `book.ncx`, `book.opf`.

use std::path::Path;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use super::{Assignment, Metadata};
use crate::error::Result;
use crate::util::escape_xml;

/// Characters escaped in manifest and link hrefs.
const HREF: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

pub(crate) fn encode_href(name: &str) -> String {
    utf8_percent_encode(name, HREF).to_string()
}

/// A file in the build tree plus its media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub name: String,
    pub media_type: String,
}

impl Asset {
    /// Describe the file `name` in `dir`, sniffing its type when the
    /// extension is not conclusive.
    pub fn probe(dir: &Path, name: &str) -> Result<Self> {
        let media_type = match media_type(name) {
            "application/octet-stream" => infer::get_from_path(dir.join(name))?
                .map(|kind| kind.mime_type())
                .unwrap_or("application/octet-stream"),
            known => known,
        };
        Ok(Self {
            name: name.to_string(),
            media_type: media_type.to_string(),
        })
    }
}

/// Guess a media type from a file extension.
pub fn media_type(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "xhtml" | "html" | "htm" => "application/xhtml+xml",
        "css" => "text/css",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "tif" | "tiff" => "image/tiff",
        "ncx" => "application/x-dtbncx+xml",
        _ => "application/octet-stream",
    }
}

/// Everything the index documents describe.
pub struct Package<'a> {
    pub metadata: &'a Metadata,
    pub cover: Asset,
    /// Stylesheet file names under `styles/`.
    pub styles: Vec<String>,
    /// Content images under `images/`, cover excluded.
    pub images: Vec<Asset>,
    /// Rendered chapters and their titles, in reading order.
    pub chapters: &'a [(Assignment, String)],
}

impl Package<'_> {
    /// The EPUB 3 navigation document.
    pub fn nav(&self) -> String {
        let lang = escape_xml(&self.metadata.language);
        let mut nav = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" lang="{lang}" xml:lang="{lang}">
  <head>
    <meta charset="utf-8"/>
    <title>{}</title>
  </head>
  <body>
    <nav epub:type="toc" id="toc">
      <h1>Table of Contents</h1>
      <ol>
"#,
            escape_xml(&self.metadata.title)
        );
        for (assignment, title) in self.chapters {
            nav.push_str(&format!(
                "        <li><a href=\"{}\">{}</a></li>\n",
                escape_xml(&assignment.link),
                escape_xml(title)
            ));
        }
        nav.push_str("      </ol>\n    </nav>\n  </body>\n</html>\n");
        nav
    }

    /// The NCX table of contents read by EPUB 2 readers.
    pub fn ncx(&self) -> String {
        let mut ncx = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE ncx PUBLIC "-//NISO//DTD ncx 2005-1//EN" "http://www.daisy.org/z3986/2005/ncx-2005-1.dtd">
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="{}"/>
    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
  <docTitle>
    <text>{}</text>
  </docTitle>
  <docAuthor>
    <text>{}</text>
  </docAuthor>
  <navMap>
"#,
            escape_xml(&self.metadata.identifier),
            escape_xml(&self.metadata.title),
            escape_xml(&self.metadata.creator)
        );
        for (assignment, title) in self.chapters {
            ncx.push_str(&format!(
                "    <navPoint id=\"{}\" playOrder=\"{}\">\n",
                escape_xml(&assignment.id),
                assignment.play_order
            ));
            ncx.push_str(&format!(
                "      <navLabel><text>{}</text></navLabel>\n",
                escape_xml(title)
            ));
            ncx.push_str(&format!(
                "      <content src=\"{}\"/>\n",
                escape_xml(&assignment.link)
            ));
            ncx.push_str("    </navPoint>\n");
        }
        ncx.push_str("  </navMap>\n</ncx>\n");
        ncx
    }

    /// The package document: metadata, manifest and spine.
    pub fn opf(&self) -> String {
        let meta = self.metadata;
        let mut opf = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
"#,
        );

        opf.push_str(&format!(
            "    <dc:identifier id=\"BookId\">{}</dc:identifier>\n",
            escape_xml(&meta.identifier)
        ));
        opf.push_str(&format!(
            "    <dc:title>{}</dc:title>\n",
            escape_xml(&meta.title)
        ));
        opf.push_str(&format!(
            "    <dc:creator>{}</dc:creator>\n",
            escape_xml(&meta.creator)
        ));
        opf.push_str(&format!(
            "    <dc:language>{}</dc:language>\n",
            escape_xml(&meta.language)
        ));
        if !meta.rights.is_empty() {
            opf.push_str(&format!(
                "    <dc:rights>{}</dc:rights>\n",
                escape_xml(&meta.rights)
            ));
        }
        opf.push_str(&format!(
            "    <dc:publisher>{}</dc:publisher>\n",
            escape_xml(&meta.publisher)
        ));
        opf.push_str(&format!(
            "    <dc:date>{}</dc:date>\n",
            meta.date.format("%Y-%m-%d")
        ));
        opf.push_str(&format!(
            "    <meta property=\"dcterms:modified\">{}</meta>\n",
            meta.date.format("%Y-%m-%dT%H:%M:%SZ")
        ));
        opf.push_str("    <meta name=\"cover\" content=\"cover-image\"/>\n");
        opf.push_str("  </metadata>\n  <manifest>\n");

        push_item(&mut opf, "ncx", "book.ncx", "application/x-dtbncx+xml", None);
        push_item(&mut opf, "toc", "toc.xhtml", "application/xhtml+xml", Some("nav"));
        push_item(&mut opf, "coverpage", "coverpage.xhtml", "application/xhtml+xml", None);
        push_item(
            &mut opf,
            "cover-image",
            &format!("images/{}", encode_href(&self.cover.name)),
            &self.cover.media_type,
            Some("cover-image"),
        );
        for (i, name) in self.styles.iter().enumerate() {
            let href = format!("styles/{}", encode_href(name));
            push_item(&mut opf, &format!("style_{}", i + 1), &href, "text/css", None);
        }
        for (i, image) in self.images.iter().enumerate() {
            let href = format!("images/{}", encode_href(&image.name));
            push_item(&mut opf, &format!("image_{}", i + 1), &href, &image.media_type, None);
        }
        for (assignment, _) in self.chapters {
            push_item(
                &mut opf,
                &assignment.id,
                &assignment.link,
                "application/xhtml+xml",
                None,
            );
        }

        opf.push_str("  </manifest>\n  <spine toc=\"ncx\">\n");
        opf.push_str("    <itemref idref=\"coverpage\"/>\n");
        for (assignment, _) in self.chapters {
            opf.push_str(&format!(
                "    <itemref idref=\"{}\"/>\n",
                escape_xml(&assignment.id)
            ));
        }
        opf.push_str("  </spine>\n</package>\n");
        opf
    }
}

fn push_item(opf: &mut String, id: &str, href: &str, media_type: &str, properties: Option<&str>) {
    let properties = properties
        .map(|p| format!(" properties=\"{p}\""))
        .unwrap_or_default();
    opf.push_str(&format!(
        "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"{properties}/>\n",
        escape_xml(id),
        escape_xml(href),
        escape_xml(media_type)
    ));
}
