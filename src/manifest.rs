//! JSON book manifests for the command line.
//!
//! ```json
//! {
//!   "title": "Collected Posts",
//!   "creator": "Jane Doe",
//!   "css": ["extra.css"],
//!   "chapters": [
//!     { "url": "https://example.com/post-1", "content_selector": "article" },
//!     { "file": "notes.docx", "title": "Notes" },
//!     { "text": "Thanks for reading.", "title": "Afterword" }
//!   ]
//! }
//! ```
//!
//! Relative paths are resolved against the manifest's directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use pagefold::{Chapter, ChapterOptions, Fetcher, Metadata, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub title: String,
    pub creator: Option<String>,
    pub language: Option<String>,
    pub rights: Option<String>,
    pub publisher: Option<String>,
    pub cover: Option<PathBuf>,
    #[serde(default)]
    pub css: Vec<PathBuf>,
    pub output: Option<PathBuf>,
    pub chapters: Vec<ChapterEntry>,
}

/// One chapter source plus its per-chapter overrides.
#[derive(Debug, Deserialize)]
pub struct ChapterEntry {
    #[serde(flatten)]
    pub source: Source,
    pub title: Option<String>,
    pub title_selector: Option<String>,
    pub content_selector: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    File(PathBuf),
    Url(String),
    Html(String),
    Text(String),
}

impl Source {
    /// Classify a command-line argument: URLs by scheme, everything else is a file.
    pub fn from_arg(arg: &str) -> Self {
        if arg.starts_with("http://") || arg.starts_with("https://") {
            Source::Url(arg.to_string())
        } else {
            Source::File(PathBuf::from(arg))
        }
    }
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let mut manifest: Manifest = serde_json::from_str(&data)?;
        if let Some(base) = path.parent() {
            manifest.rebase(base);
        }
        Ok(manifest)
    }

    fn rebase(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        self.cover.iter_mut().for_each(join);
        self.css.iter_mut().for_each(join);
        self.output.iter_mut().for_each(join);
        for entry in &mut self.chapters {
            if let Source::File(path) = &mut entry.source {
                join(path);
            }
        }
    }

    pub fn metadata(&self) -> Metadata {
        let mut meta = Metadata::new(&self.title);
        if let Some(creator) = &self.creator {
            meta = meta.with_creator(creator);
        }
        if let Some(language) = &self.language {
            meta = meta.with_language(language);
        }
        if let Some(rights) = &self.rights {
            meta = meta.with_rights(rights);
        }
        if let Some(publisher) = &self.publisher {
            meta = meta.with_publisher(publisher);
        }
        meta
    }
}

impl ChapterEntry {
    pub fn options(&self) -> ChapterOptions {
        ChapterOptions {
            title: self.title.clone(),
            url: None,
            title_selector: self.title_selector.clone(),
            content_selector: self.content_selector.clone(),
        }
    }

    pub fn load(&self, fetcher: &impl Fetcher) -> Result<Chapter> {
        let opts = self.options();
        match &self.source {
            Source::File(path) => Chapter::from_file(path, &opts),
            Source::Url(url) => Chapter::from_url(fetcher, url, &opts),
            Source::Html(html) => Chapter::from_html(html, &opts),
            Source::Text(text) => Chapter::from_text(text, &opts),
        }
    }
}
