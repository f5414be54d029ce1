//! Error types for pagefold operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while building chapters or packaging an EPUB.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// A required value was empty.
    #[error("{field} must not be empty")]
    Validation { field: &'static str },

    /// An explicitly requested selector matched nothing.
    #[error("no {what} matched selector {selector:?}")]
    NoMatch {
        what: &'static str,
        selector: String,
    },

    #[error("invalid selector {0:?}")]
    InvalidSelector(String),

    #[error("cannot fetch {0}: unsupported URL")]
    UnsupportedUrl(String),

    #[error("request for {url} failed with status {status}")]
    Status { url: String, status: u16 },

    #[error("not a recognized image: {}", .0.display())]
    InvalidImage(PathBuf),

    /// The document has no usable structure (missing root, body, ...).
    #[error("malformed document: {0}")]
    Structure(String),

    #[cfg(feature = "cli")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
