//! # pagefold
//!
//! Turn web pages and documents into clean EPUB ebooks.
//!
//! ## Features
//!
//! - Sanitize arbitrary HTML down to a tag and attribute whitelist e-readers handle
//! - Build chapters from HTML, plain text, `.docx` files or URLs, optionally
//!   narrowed with CSS selectors
//! - Download and embed remote, local and `data:` images
//! - Package everything as an EPUB 3 book with an NCX fallback and a cover
//!
//! ## Quick Start
//!
//! ```no_run
//! use pagefold::{Chapter, ChapterOptions, Epub, HttpClient, Metadata};
//!
//! let client = HttpClient::new()?;
//! let mut book = Epub::new(Metadata::new("Collected Posts").with_creator("Jane Doe"))?;
//!
//! let opts = ChapterOptions::new().content_selector("article");
//! book.add_chapter(Chapter::from_url(&client, "https://example.com/post-1", &opts)?);
//! book.add_chapter(Chapter::from_text("Thanks for reading.", &ChapterOptions::new().title("Afterword"))?);
//!
//! book.create(Some("posts.epub".as_ref()))?;
//! # Ok::<(), pagefold::Error>(())
//! ```
//!
//! ## Sanitizing on its own
//!
//! ```
//! use pagefold::{DEFAULT_POLICY, sanitize_document};
//!
//! let html = "<div onclick='x()'>Hi<script>evil()</script></div>";
//! let clean = sanitize_document(html, &DEFAULT_POLICY);
//! assert_eq!(clean, "<html><head></head><body><div>Hi</div></body></html>");
//! ```

pub mod chapter;
pub mod clean;
pub mod dom;
pub mod epub;
pub mod error;
pub mod net;
pub mod render;
pub(crate) mod util;

pub use chapter::{Chapter, ChapterOptions};
pub use clean::{
    CleanPage, DEFAULT_POLICY, SanitizeStats, Sanitizer, TagPolicy, clean_html, sanitize_document,
};
pub use epub::{Assignment, Epub, EpubOptions, Metadata};
pub use error::{Error, Result};
pub use net::{Fetched, Fetcher, HttpClient};
pub use render::{ChapterRenderer, PageShell, SimpleRenderer};
