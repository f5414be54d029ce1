//! Chapters and the ways to build them.
//!
//! A [`Chapter`] is a title plus raw HTML content, optionally tagged with the
//! URL it came from (needed to resolve relative image links). Constructors
//! accept HTML, plain text, local files or remote pages and can narrow the
//! page down with CSS selectors:
//!
//! ```
//! use pagefold::{Chapter, ChapterOptions};
//!
//! let html = "<title>Ignored</title><h1 class='t'>Real title</h1><div id='c'>Body</div>";
//! let opts = ChapterOptions::new()
//!     .title_selector("h1.t")
//!     .content_selector("#c");
//! let chapter = Chapter::from_html(html, &opts).unwrap();
//! assert_eq!(chapter.title(), "Real title");
//! assert_eq!(chapter.content(), r#"<div id="c">Body</div>"#);
//! ```

pub mod convert;

use std::fmt;
use std::path::Path;

use tracing::debug;
use url::Url;

use crate::dom::{ArenaDom, ArenaNodeId, Selector, parse_document, to_xhtml};
use crate::error::{Error, Result};
use crate::net::{Fetcher, file_url};
use convert::{SourceKind, convert_content};

/// Title used when a page has no `<title>` and none was given.
pub const DEFAULT_TITLE: &str = "Epub Chapter";

/// Selector consulted for the title when none is configured.
pub const DEFAULT_TITLE_SELECTOR: &str = "title";

/// A chapter waiting to be added to a book.
#[derive(Clone, PartialEq, Eq)]
pub struct Chapter {
    title: String,
    content: String,
    url: Option<Url>,
}

impl Chapter {
    /// Create a chapter, rejecting an empty title or empty content.
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        url: Option<Url>,
    ) -> Result<Self> {
        let title = title.into();
        let content = content.into();
        if title.trim().is_empty() {
            return Err(Error::Validation { field: "title" });
        }
        if content.trim().is_empty() {
            return Err(Error::Validation { field: "content" });
        }
        Ok(Self {
            title,
            content,
            url,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Where the content came from; relative image links resolve against it.
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Build a chapter from an HTML page.
    ///
    /// Without an explicit title, the text of the first element matching the
    /// title selector is used (`<title>` by default, falling back to
    /// [`DEFAULT_TITLE`]). A content selector narrows the content to its
    /// matches; several matches are wrapped in one `<div>`. An explicitly
    /// configured selector that matches nothing is an error.
    pub fn from_html(html: &str, opts: &ChapterOptions) -> Result<Self> {
        let title = match &opts.title {
            Some(title) => title.clone(),
            None => find_title(html, opts)?,
        };

        let content = match &opts.content_selector {
            Some(source) => select_content(html, source)?,
            None => html.to_string(),
        };

        Self::new(title, content, opts.url.clone())
    }

    /// Build a chapter from plain text, one paragraph per non-blank line.
    pub fn from_text(text: &str, opts: &ChapterOptions) -> Result<Self> {
        let html = convert::text_to_html(text);
        let opts = ChapterOptions {
            title_selector: None,
            content_selector: None,
            ..opts.clone()
        };
        Self::from_html(&html, &opts)
    }

    /// Build a chapter from a local `.html`, `.txt` or `.docx` file.
    ///
    /// The chapter URL defaults to the file's absolute `file://` URL.
    pub fn from_file(path: impl AsRef<Path>, opts: &ChapterOptions) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let kind = SourceKind::from_path(&path.to_string_lossy());
        debug!(path = %path.display(), ?kind, "reading chapter file");

        let html = convert_content(kind, &data)?;
        let mut opts = opts.clone();
        if opts.url.is_none() {
            opts.url = Some(file_url(path)?);
        }
        Self::from_html(&html, &opts)
    }

    /// Download a page and build a chapter from it.
    ///
    /// Any failure to fetch the page, including a non-2xx status, is an
    /// error. The URL's extension picks the converter, like [`Self::from_file`].
    pub fn from_url(fetcher: &impl Fetcher, url: &str, opts: &ChapterOptions) -> Result<Self> {
        let url = Url::parse(url)?;
        let data = fetcher.fetch(&url)?.error_for_status()?.bytes()?;
        let kind = SourceKind::from_path(url.path());
        debug!(url = %url, ?kind, bytes = data.len(), "fetched chapter page");

        let html = convert_content(kind, &data)?;
        let mut opts = opts.clone();
        opts.url = Some(url);
        Self::from_html(&html, &opts)
    }
}

impl fmt::Debug for Chapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chapter")
            .field("title", &self.title)
            .field("url", &self.url.as_ref().map(Url::as_str))
            .field("content", &format_args!("{} bytes", self.content.len()))
            .finish()
    }
}

fn find_title(html: &str, opts: &ChapterOptions) -> Result<String> {
    let source = opts
        .title_selector
        .as_deref()
        .unwrap_or(DEFAULT_TITLE_SELECTOR);
    let selector = Selector::parse(source)?;
    let dom = parse_document(html);

    let found = selector
        .select_all(&dom, dom.document())
        .into_iter()
        .map(|id| dom.text_of(id).trim().to_string())
        .find(|text| !text.is_empty());

    match (found, &opts.title_selector) {
        (Some(title), _) => Ok(title),
        (None, Some(explicit)) => Err(Error::NoMatch {
            what: "title",
            selector: explicit.clone(),
        }),
        (None, None) => Ok(DEFAULT_TITLE.to_string()),
    }
}

fn select_content(html: &str, source: &str) -> Result<String> {
    let selector = Selector::parse(source)?;
    let dom = parse_document(html);
    let matches = selector.select_all(&dom, dom.document());

    match matches.as_slice() {
        [] => Err(Error::NoMatch {
            what: "content",
            selector: source.to_string(),
        }),
        [single] => Ok(to_xhtml(&dom, *single)),
        several => {
            // nested matches would be emitted twice
            let tops = several
                .iter()
                .filter(|&&id| !has_ancestor_in(&dom, id, several))
                .map(|&id| to_xhtml(&dom, id));
            Ok(format!("<div>{}</div>", tops.collect::<String>()))
        }
    }
}

fn has_ancestor_in(dom: &ArenaDom, id: ArenaNodeId, set: &[ArenaNodeId]) -> bool {
    let mut current = dom.parent(id);
    while let Some(parent) = current {
        if set.contains(&parent) {
            return true;
        }
        current = dom.parent(parent);
    }
    false
}

/// Per-chapter overrides for the constructors.
#[derive(Debug, Clone, Default)]
pub struct ChapterOptions {
    /// Explicit title; skips title lookup.
    pub title: Option<String>,
    /// Origin URL, for resolving relative image links.
    pub url: Option<Url>,
    /// CSS selector locating the title.
    pub title_selector: Option<String>,
    /// CSS selector locating the content.
    pub content_selector: Option<String>,
}

impl ChapterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    pub fn title_selector(mut self, selector: impl Into<String>) -> Self {
        self.title_selector = Some(selector.into());
        self
    }

    pub fn content_selector(mut self, selector: impl Into<String>) -> Self {
        self.content_selector = Some(selector.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_title_then_content() {
        assert!(matches!(
            Chapter::new("", "<p>x</p>", None),
            Err(Error::Validation { field: "title" })
        ));
        assert!(matches!(
            Chapter::new("T", "  ", None),
            Err(Error::Validation { field: "content" })
        ));
        assert!(Chapter::new("T", "<p>x</p>", None).is_ok());
    }

    #[test]
    fn test_title_from_title_element() {
        let chapter = Chapter::from_html(
            "<html><head><title> Hello </title></head><body><p>x</p></body></html>",
            &ChapterOptions::new(),
        )
        .unwrap();
        assert_eq!(chapter.title(), "Hello");
    }

    #[test]
    fn test_default_title_when_missing() {
        let chapter = Chapter::from_html("<p>x</p>", &ChapterOptions::new()).unwrap();
        assert_eq!(chapter.title(), DEFAULT_TITLE);
        assert_eq!(chapter.content(), "<p>x</p>");
    }

    #[test]
    fn test_explicit_title_wins() {
        let opts = ChapterOptions::new().title("Mine").title_selector("h9");
        let chapter = Chapter::from_html("<title>Page</title><p>x</p>", &opts).unwrap();
        assert_eq!(chapter.title(), "Mine");
    }

    #[test]
    fn test_title_selector_without_match_is_error() {
        let opts = ChapterOptions::new().title_selector("h1.missing");
        let err = Chapter::from_html("<h1>x</h1>", &opts).unwrap_err();
        assert!(matches!(
            err,
            Error::NoMatch { what: "title", selector } if selector == "h1.missing"
        ));
    }

    #[test]
    fn test_content_selector_without_match_is_error() {
        let opts = ChapterOptions::new().content_selector("#body");
        let err = Chapter::from_html("<p>x</p>", &opts).unwrap_err();
        assert!(matches!(err, Error::NoMatch { what: "content", .. }));
    }

    #[test]
    fn test_multiple_content_matches_are_wrapped() {
        let opts = ChapterOptions::new().title("T").content_selector("p.keep");
        let chapter = Chapter::from_html(
            r#"<p class="keep">a</p><p>skip</p><p class="keep">b</p>"#,
            &opts,
        )
        .unwrap();
        assert_eq!(
            chapter.content(),
            r#"<div><p class="keep">a</p><p class="keep">b</p></div>"#
        );
    }

    #[test]
    fn test_nested_content_matches_are_not_duplicated() {
        let opts = ChapterOptions::new().title("T").content_selector("div");
        let chapter =
            Chapter::from_html("<div><div>inner</div></div><div>second</div>", &opts).unwrap();
        assert_eq!(
            chapter.content(),
            "<div><div><div>inner</div></div><div>second</div></div>"
        );
    }

    #[test]
    fn test_invalid_selector_is_reported() {
        let opts = ChapterOptions::new().content_selector("div >");
        assert!(matches!(
            Chapter::from_html("<div></div>", &opts),
            Err(Error::InvalidSelector(_))
        ));
    }

    #[test]
    fn test_from_text() {
        let chapter = Chapter::from_text("one\n\ntwo", &ChapterOptions::new().title("T")).unwrap();
        assert_eq!(chapter.content(), "<body><p>one</p><p>two</p></body>");
    }

    #[test]
    fn test_from_file_sets_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello\nworld").unwrap();

        let chapter = Chapter::from_file(&path, &ChapterOptions::new()).unwrap();
        assert_eq!(chapter.title(), DEFAULT_TITLE);
        assert_eq!(chapter.content(), "<body><p>hello</p><p>world</p></body>");
        let url = chapter.url().unwrap();
        assert_eq!(url.scheme(), "file");
        assert!(url.path().ends_with("/notes.txt"));
    }
}
