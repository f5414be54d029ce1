//! Image localization: download every `<img>` a chapter references and point
//! it at a copy inside the book.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use percent_encoding::percent_decode_str;
use tracing::{debug, warn};
use url::Url;

use crate::dom::{ArenaDom, ArenaNodeId};
use crate::error::Result;
use crate::net::Fetcher;

/// Bytes read up front to sniff the image type.
pub const SNIFF_LEN: u64 = 8192;

/// Book-relative directory images are stored under.
pub const IMAGE_HREF_PREFIX: &str = "images/";

/// What a localization pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LocalizeStats {
    /// Images written to the asset directory.
    pub stored: usize,
    /// Images served from the chapter cache.
    pub reused: usize,
    /// `<img>` elements removed because their source could not be used.
    pub dropped: usize,
    /// Relative images left alone because the chapter has no URL.
    pub skipped: usize,
}

/// Outcome of resolving one `<img src>`.
enum Resolved {
    Remote(Url),
    Inline(Vec<u8>),
    Skip,
    Drop,
}

/// Downloads the images of one chapter.
///
/// The cache maps resolved URLs to book-relative paths and lives as long as
/// the localizer, so a fresh localizer is used for each chapter.
pub struct ImageLocalizer<'a, F: Fetcher + ?Sized> {
    fetcher: &'a F,
    asset_dir: &'a Path,
    chapter: &'a str,
    cache: HashMap<String, String>,
}

impl<'a, F: Fetcher + ?Sized> ImageLocalizer<'a, F> {
    pub fn new(fetcher: &'a F, asset_dir: &'a Path, chapter: &'a str) -> Self {
        Self {
            fetcher,
            asset_dir,
            chapter,
            cache: HashMap::new(),
        }
    }

    /// Localize every `<img>` with a non-empty `src` below `root`.
    ///
    /// Failed images are removed from the tree; only errors writing into the
    /// asset directory are returned.
    pub fn localize(
        &mut self,
        dom: &mut ArenaDom,
        root: ArenaNodeId,
        base: Option<&Url>,
    ) -> Result<LocalizeStats> {
        let mut stats = LocalizeStats::default();

        for img in dom.find_all_by_tag(root, "img") {
            let Some(src) = dom.get_attr(img, "src").filter(|s| !s.is_empty()) else {
                continue;
            };
            let src = src.to_string();

            let (key, source) = match self.resolve(&src, base) {
                Resolved::Skip => {
                    stats.skipped += 1;
                    continue;
                }
                Resolved::Drop => {
                    dom.detach(img);
                    stats.dropped += 1;
                    continue;
                }
                Resolved::Remote(url) => (url.to_string(), Resolved::Remote(url)),
                Resolved::Inline(bytes) => (src.clone(), Resolved::Inline(bytes)),
            };

            if let Some(href) = self.cache.get(&key) {
                dom.set_attr(img, "src", href);
                stats.reused += 1;
                continue;
            }

            let stored = match source {
                Resolved::Remote(url) => self.download(&url)?,
                Resolved::Inline(bytes) => self.store(&mut io::Cursor::new(bytes), "data URL")?,
                Resolved::Skip | Resolved::Drop => None,
            };

            match stored {
                Some(href) => {
                    dom.set_attr(img, "src", &href);
                    self.cache.insert(key, href);
                    stats.stored += 1;
                }
                None => {
                    dom.detach(img);
                    stats.dropped += 1;
                }
            }
        }

        Ok(stats)
    }

    fn resolve(&self, src: &str, base: Option<&Url>) -> Resolved {
        if src.starts_with("data:") {
            return match decode_data_url(src) {
                Some(bytes) => Resolved::Inline(bytes),
                None => {
                    warn!(chapter = %self.chapter, "undecodable data URL image");
                    Resolved::Drop
                }
            };
        }

        let stripped = src.rsplit_once('?').map_or(src, |(head, _)| head);
        match Url::parse(stripped) {
            Ok(url) => Resolved::Remote(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => match base {
                Some(base) => match base.join(stripped) {
                    Ok(url) => Resolved::Remote(url),
                    Err(err) => {
                        warn!(chapter = %self.chapter, src = %stripped, %err, "cannot resolve image URL");
                        Resolved::Drop
                    }
                },
                None => {
                    warn!(
                        chapter = %self.chapter,
                        src = %stripped,
                        "cannot localize relative image without a chapter URL"
                    );
                    Resolved::Skip
                }
            },
            Err(err) => {
                warn!(chapter = %self.chapter, src = %stripped, %err, "invalid image URL");
                Resolved::Drop
            }
        }
    }

    /// Fetch `url` and store it. `None` means the image should be dropped.
    fn download(&self, url: &Url) -> Result<Option<String>> {
        debug!(chapter = %self.chapter, url = %url, "downloading image");
        let fetched = match self.fetcher.fetch(url) {
            Ok(fetched) => fetched,
            Err(err) => {
                warn!(chapter = %self.chapter, url = %url, %err, "image download failed");
                return Ok(None);
            }
        };
        if !fetched.is_success() {
            warn!(chapter = %self.chapter, url = %url, status = fetched.status, "image download failed");
            return Ok(None);
        }
        self.store(&mut fetched.into_reader(), url.as_str())
    }

    /// Sniff the image type from the first bytes of `body` and stream it into
    /// the asset directory under a fresh UUID name.
    fn store(&self, body: &mut dyn Read, origin: &str) -> Result<Option<String>> {
        let mut head = Vec::with_capacity(SNIFF_LEN as usize);
        if let Err(err) = (&mut *body).take(SNIFF_LEN).read_to_end(&mut head) {
            warn!(chapter = %self.chapter, url = %origin, %err, "image read failed");
            return Ok(None);
        }

        let Some(kind) = infer::get(&head).filter(|k| k.matcher_type() == infer::MatcherType::Image)
        else {
            warn!(chapter = %self.chapter, url = %origin, "not a recognized image");
            return Ok(None);
        };

        let name = format!("{}.{}", uuid::Uuid::new_v4(), kind.extension());
        let path = self.asset_dir.join(&name);
        let mut file = File::create(&path)?;
        file.write_all(&head)?;
        if let Err(err) = io::copy(body, &mut file) {
            warn!(chapter = %self.chapter, url = %origin, %err, "image read failed");
            drop(file);
            fs::remove_file(&path)?;
            return Ok(None);
        }

        debug!(chapter = %self.chapter, url = %origin, file = %name, mime = kind.mime_type(), "stored image");
        Ok(Some(format!("{IMAGE_HREF_PREFIX}{name}")))
    }
}

/// Decode the payload of a `data:` URL.
fn decode_data_url(src: &str) -> Option<Vec<u8>> {
    let (meta, payload) = src.strip_prefix("data:")?.split_once(',')?;
    if meta.ends_with(";base64") {
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        STANDARD.decode(compact).ok()
    } else {
        Some(percent_decode_str(payload).collect())
    }
}
