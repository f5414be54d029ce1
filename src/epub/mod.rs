//! EPUB assembly.
//!
//! An [`Epub`] collects chapters in order and, on [`Epub::create`], renders
//! them into a temporary build tree which is then zipped into an `.epub`:
//!
//! ```no_run
//! use pagefold::{Chapter, ChapterOptions, Epub, Metadata};
//!
//! let mut book = Epub::new(Metadata::new("My Book").with_creator("Me"))?;
//! book.add_chapter(Chapter::from_html("<h1>One</h1><p>Hello</p>", &ChapterOptions::new())?);
//! let path = book.create(None)?;
//! println!("wrote {}", path.display());
//! # Ok::<(), pagefold::Error>(())
//! ```

mod builder;
mod cover;
mod index;

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::chapter::Chapter;
use crate::error::{Error, Result};
use crate::net::{Fetcher, HttpClient};
use crate::render::{ChapterRenderer, SimpleRenderer};
pub use builder::{BuildDirs, EpubBuilder, MIMETYPE, output_path};
pub use cover::{COVER_HEIGHT, COVER_WIDTH, cover_svg};
pub use index::{Asset, Package, media_type};

/// Creator and publisher used when none is given.
pub const DEFAULT_CREATOR: &str = "pagefold";

/// Book metadata (Dublin Core).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub title: String,
    pub creator: String,
    pub language: String,
    pub rights: String,
    pub publisher: String,
    pub date: DateTime<Utc>,
    /// Unique identifier, a `urn:uuid:` by default.
    pub identifier: String,
}

impl Metadata {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            creator: DEFAULT_CREATOR.to_string(),
            language: "en".to_string(),
            rights: String::new(),
            publisher: DEFAULT_CREATOR.to_string(),
            date: Utc::now(),
            identifier: format!("urn:uuid:{}", Uuid::new_v4()),
        }
    }

    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = creator.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_rights(mut self, rights: impl Into<String>) -> Self {
        self.rights = rights.into();
        self
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = publisher.into();
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }
}

/// Build settings that are not part of the book's metadata.
pub struct EpubOptions {
    /// Cover image to use instead of the generated one.
    pub cover: Option<PathBuf>,
    /// Extra stylesheets copied into `OEBPS/styles` and linked from every chapter.
    pub css_paths: Vec<PathBuf>,
    /// Build in this (new) directory instead of a temporary one.
    /// It is removed once the book is written.
    pub build_dir: Option<PathBuf>,
    pub renderer: Box<dyn ChapterRenderer>,
    /// Used to download images; an [`HttpClient`] is built when unset.
    pub fetcher: Option<Box<dyn Fetcher>>,
}

impl Default for EpubOptions {
    fn default() -> Self {
        Self {
            cover: None,
            css_paths: Vec::new(),
            build_dir: None,
            renderer: Box::new(SimpleRenderer::new()),
            fetcher: None,
        }
    }
}

impl EpubOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cover(mut self, cover: impl Into<PathBuf>) -> Self {
        self.cover = Some(cover.into());
        self
    }

    pub fn with_css(mut self, path: impl Into<PathBuf>) -> Self {
        self.css_paths.push(path.into());
        self
    }

    pub fn with_build_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.build_dir = Some(dir.into());
        self
    }

    pub fn with_renderer(mut self, renderer: impl ChapterRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn with_fetcher(mut self, fetcher: impl Fetcher + 'static) -> Self {
        self.fetcher = Some(Box::new(fetcher));
        self
    }
}

impl fmt::Debug for EpubOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EpubOptions")
            .field("cover", &self.cover)
            .field("css_paths", &self.css_paths)
            .field("build_dir", &self.build_dir)
            .field("fetcher", &self.fetcher.is_some())
            .finish_non_exhaustive()
    }
}

/// Where a chapter lives inside the book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Manifest id, `chapter_<n>`.
    pub id: String,
    /// File name relative to `OEBPS`, `<n>.xhtml`.
    pub link: String,
    /// 1-based position in the reading order.
    pub play_order: usize,
}

impl Assignment {
    pub fn new(play_order: usize) -> Self {
        Self {
            id: format!("chapter_{play_order}"),
            link: format!("{play_order}.xhtml"),
            play_order,
        }
    }
}

/// A book under construction.
#[derive(Debug)]
pub struct Epub {
    metadata: Metadata,
    options: EpubOptions,
    chapters: Vec<(Assignment, Chapter)>,
}

impl Epub {
    /// Start a book with default options. The title must not be empty.
    pub fn new(metadata: Metadata) -> Result<Self> {
        Self::with_options(metadata, EpubOptions::default())
    }

    pub fn with_options(metadata: Metadata, options: EpubOptions) -> Result<Self> {
        if metadata.title.trim().is_empty() {
            return Err(Error::Validation { field: "title" });
        }
        Ok(Self {
            metadata,
            options,
            chapters: Vec::new(),
        })
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn options(&self) -> &EpubOptions {
        &self.options
    }

    /// Append a chapter; its place in the book is fixed here.
    pub fn add_chapter(&mut self, chapter: Chapter) -> &Assignment {
        let assignment = Assignment::new(self.chapters.len() + 1);
        debug!(
            book = %self.metadata.title,
            play_order = assignment.play_order,
            chapter = %chapter.title(),
            "added chapter"
        );
        self.chapters.push((assignment, chapter));
        &self.chapters[self.chapters.len() - 1].0
    }

    pub fn chapters(&self) -> &[(Assignment, Chapter)] {
        &self.chapters
    }

    /// Render the uncompressed book into a build tree and return it.
    ///
    /// The tree is deleted when the returned [`BuildDirs`] is dropped.
    pub fn build_dir(&self) -> Result<BuildDirs> {
        let fetcher = self.fetcher()?;
        let mut builder = EpubBuilder::new(&self.metadata, &self.options, fetcher.get());
        self.build(&mut builder)?;
        builder
            .into_dirs()
            .ok_or_else(|| Error::Structure("build tree was not created".into()))
    }

    /// Write the book to `path`, or to `./<title>.epub` when `None`.
    ///
    /// The build tree is removed whether or not packaging succeeds.
    pub fn create(&self, path: Option<&Path>) -> Result<PathBuf> {
        let fetcher = self.fetcher()?;
        let mut builder = EpubBuilder::new(&self.metadata, &self.options, fetcher.get());
        let result = self
            .build(&mut builder)
            .and_then(|()| builder.compress(path));
        builder.cleanup();
        result
    }

    fn build(&self, builder: &mut EpubBuilder<'_>) -> Result<()> {
        builder.begin()?;
        for (assignment, chapter) in &self.chapters {
            builder.render_chapter(assignment, chapter)?;
        }
        builder.index()
    }

    fn fetcher(&self) -> Result<FetcherRef<'_>> {
        match &self.options.fetcher {
            Some(fetcher) => Ok(FetcherRef::Borrowed(fetcher.as_ref())),
            None => Ok(FetcherRef::Owned(HttpClient::new()?)),
        }
    }
}

enum FetcherRef<'a> {
    Borrowed(&'a dyn Fetcher),
    Owned(HttpClient),
}

impl FetcherRef<'_> {
    fn get(&self) -> &dyn Fetcher {
        match self {
            FetcherRef::Borrowed(fetcher) => *fetcher,
            FetcherRef::Owned(client) => client,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_defaults() {
        let meta = Metadata::new("Title");
        assert_eq!(meta.creator, DEFAULT_CREATOR);
        assert_eq!(meta.publisher, DEFAULT_CREATOR);
        assert_eq!(meta.language, "en");
        assert!(meta.rights.is_empty());
        assert!(meta.identifier.starts_with("urn:uuid:"));
        assert_ne!(meta.identifier, Metadata::new("Title").identifier);
    }

    #[test]
    fn test_empty_title_is_rejected() {
        assert!(matches!(
            Epub::new(Metadata::new("  ")),
            Err(Error::Validation { field: "title" })
        ));
    }

    #[test]
    fn test_assignments_follow_insertion_order() {
        let mut book = Epub::new(Metadata::new("Book")).unwrap();
        for title in ["A", "B", "C"] {
            book.add_chapter(Chapter::new(title, "<p>x</p>", None).unwrap());
        }
        let assigned: Vec<_> = book
            .chapters()
            .iter()
            .map(|(a, c)| (a.id.as_str(), a.link.as_str(), a.play_order, c.title()))
            .collect();
        assert_eq!(
            assigned,
            vec![
                ("chapter_1", "1.xhtml", 1, "A"),
                ("chapter_2", "2.xhtml", 2, "B"),
                ("chapter_3", "3.xhtml", 3, "C"),
            ]
        );
    }
}
