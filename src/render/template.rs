//! The XHTML page every chapter is poured into.

use crate::util::escape_xml;

/// Prolog written before every chapter page.
pub const XHTML_PROLOG: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE html>\n";

/// Book-wide settings that shape each chapter page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageShell {
    pub language: String,
    /// Stylesheet hrefs relative to the content root, e.g. `styles/styles.css`.
    pub stylesheets: Vec<String>,
}

impl Default for PageShell {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            stylesheets: vec!["styles/styles.css".to_string()],
        }
    }
}

impl PageShell {
    /// Render the empty page for a chapter titled `title`.
    pub fn render(&self, title: &str) -> String {
        let lang = escape_xml(&self.language);
        let mut page = format!(
            "<html xmlns=\"http://www.w3.org/1999/xhtml\" \
             xmlns:epub=\"http://www.idpf.org/2007/ops\" lang=\"{lang}\" xml:lang=\"{lang}\">\n\
             <head>\n<meta charset=\"utf-8\"/>\n<title>{}</title>\n",
            escape_xml(title)
        );
        for href in &self.stylesheets {
            page.push_str(&format!(
                "<link rel=\"stylesheet\" type=\"text/css\" href=\"{}\"/>\n",
                escape_xml(href)
            ));
        }
        // the whitespace gives the indentation pass text nodes to work on
        page.push_str("</head>\n<body>\n</body>\n</html>\n");
        page
    }
}
