//! The build tree and the phases that fill and package it.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::cover::cover_svg;
use super::index::{Asset, Package, encode_href};
use super::{Assignment, EpubOptions, Metadata};
use crate::chapter::Chapter;
use crate::error::{Error, Result};
use crate::net::Fetcher;
use crate::render::PageShell;
use crate::util::escape_xml;

/// Contents of the `mimetype` entry.
pub const MIMETYPE: &str = "application/epub+zip";

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/book.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

const COVERPAGE_CSS: &str = "\
body {
  margin: 0;
  padding: 0;
  text-align: center;
}

div.cover {
  height: 100%;
  page-break-after: always;
}

div.cover img {
  max-width: 100%;
  max-height: 100%;
}
";

const STYLES_CSS: &str = "\
body {
  font-family: serif;
  line-height: 1.4;
  margin: 0 5%;
}

h1, h2, h3, h4, h5, h6 {
  text-align: center;
  page-break-after: avoid;
}

p {
  text-indent: 1.5em;
  margin: 0.3em 0;
}

img {
  max-width: 100%;
}

blockquote {
  margin: 1em 2em;
  font-style: italic;
}
";

/// Generated cover file name, used when no custom cover is given.
const GENERATED_COVER: &str = "cover.svg";

enum BuildRoot {
    Temp(TempDir),
    Owned(PathBuf),
}

impl BuildRoot {
    fn path(&self) -> &Path {
        match self {
            BuildRoot::Temp(dir) => dir.path(),
            BuildRoot::Owned(path) => path,
        }
    }
}

/// The uncompressed book on disk.
///
/// ```text
/// <root>/mimetype
/// <root>/META-INF/container.xml
/// <root>/OEBPS/{book.opf, book.ncx, toc.xhtml, coverpage.xhtml, N.xhtml}
/// <root>/OEBPS/images/
/// <root>/OEBPS/styles/
/// ```
///
/// The whole tree is removed on drop.
pub struct BuildDirs {
    root: Option<BuildRoot>,
    oebps: PathBuf,
    meta_inf: PathBuf,
    images: PathBuf,
    styles: PathBuf,
}

impl BuildDirs {
    /// Create the tree in `base`, or in a fresh temporary directory.
    pub fn create(base: Option<&Path>) -> Result<Self> {
        let root = match base {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                // fails on an existing directory, which is never ours to delete
                fs::create_dir(path)?;
                BuildRoot::Owned(path.to_path_buf())
            }
            None => BuildRoot::Temp(tempfile::Builder::new().prefix("pagefold-").tempdir()?),
        };
        let oebps = root.path().join("OEBPS");
        let meta_inf = root.path().join("META-INF");
        let images = oebps.join("images");
        let styles = oebps.join("styles");
        // create the handle first so a partial tree is still removed
        let dirs = Self {
            root: Some(root),
            oebps,
            meta_inf,
            images,
            styles,
        };
        for dir in [&dirs.oebps, &dirs.meta_inf, &dirs.images, &dirs.styles] {
            fs::create_dir(dir)?;
        }
        Ok(dirs)
    }

    pub fn root(&self) -> &Path {
        match &self.root {
            Some(root) => root.path(),
            None => Path::new(""),
        }
    }

    pub fn oebps(&self) -> &Path {
        &self.oebps
    }

    pub fn meta_inf(&self) -> &Path {
        &self.meta_inf
    }

    pub fn images(&self) -> &Path {
        &self.images
    }

    pub fn styles(&self) -> &Path {
        &self.styles
    }

    /// Delete the tree now, reporting failure.
    pub fn remove(mut self) -> io::Result<()> {
        match self.root.take() {
            Some(BuildRoot::Temp(dir)) => dir.close(),
            Some(BuildRoot::Owned(path)) => fs::remove_dir_all(path),
            None => Ok(()),
        }
    }
}

impl Drop for BuildDirs {
    fn drop(&mut self) {
        if let Some(BuildRoot::Owned(path)) = self.root.take() {
            let _ = fs::remove_dir_all(path);
        }
    }
}

/// Drives one build: `begin`, `render_chapter` per chapter, `index`,
/// `compress`, then `cleanup`.
pub struct EpubBuilder<'a> {
    metadata: &'a Metadata,
    options: &'a EpubOptions,
    fetcher: &'a dyn Fetcher,
    dirs: Option<BuildDirs>,
    cover: Option<String>,
    shell: PageShell,
    chapters: Vec<(Assignment, String)>,
}

impl<'a> EpubBuilder<'a> {
    pub fn new(metadata: &'a Metadata, options: &'a EpubOptions, fetcher: &'a dyn Fetcher) -> Self {
        Self {
            metadata,
            options,
            fetcher,
            dirs: None,
            cover: None,
            shell: PageShell {
                language: metadata.language.clone(),
                stylesheets: vec!["styles/styles.css".to_string()],
            },
            chapters: Vec::new(),
        }
    }

    pub fn dirs(&self) -> Option<&BuildDirs> {
        self.dirs.as_ref()
    }

    /// Take the build tree, leaving its removal to the caller.
    pub fn into_dirs(mut self) -> Option<BuildDirs> {
        self.dirs.take()
    }

    /// Create the build tree and write the files every book shares.
    pub fn begin(&mut self) -> Result<&BuildDirs> {
        if self.dirs.is_none() {
            info!(
                title = %self.metadata.title,
                creator = %self.metadata.creator,
                "starting book"
            );
            let dirs = BuildDirs::create(self.options.build_dir.as_deref())?;
            self.write_static(&dirs)?;
            self.dirs = Some(dirs);
        }
        self.dirs
            .as_ref()
            .ok_or_else(|| Error::Structure("build tree was not created".into()))
    }

    fn write_static(&mut self, dirs: &BuildDirs) -> Result<()> {
        fs::write(dirs.root().join("mimetype"), MIMETYPE)?;
        fs::write(dirs.meta_inf().join("container.xml"), CONTAINER_XML)?;
        fs::write(dirs.styles().join("coverpage.css"), COVERPAGE_CSS)?;
        fs::write(dirs.styles().join("styles.css"), STYLES_CSS)?;

        let mut taken: HashSet<String> = ["coverpage.css", "styles.css"].map(String::from).into();
        for path in &self.options.css_paths {
            let original = file_name(path)?.to_string_lossy().into_owned();
            let name = unique_name(&mut taken, &original);
            if name != original {
                debug!(from = %original, to = %name, "renaming stylesheet");
            }
            fs::copy(path, dirs.styles().join(&name))?;
            self.shell
                .stylesheets
                .push(format!("styles/{}", encode_href(&name)));
        }

        let cover = match &self.options.cover {
            Some(path) => copy_cover(path, dirs.images())?,
            None => {
                info!(title = %self.metadata.title, "generating cover image");
                let svg = cover_svg(&self.metadata.title, &self.metadata.creator);
                fs::write(dirs.images().join(GENERATED_COVER), svg)?;
                GENERATED_COVER.to_string()
            }
        };
        fs::write(dirs.oebps().join("coverpage.xhtml"), coverpage(&cover))?;
        self.cover = Some(cover);
        Ok(())
    }

    /// Render one chapter into `OEBPS/<link>`.
    pub fn render_chapter(&mut self, assignment: &Assignment, chapter: &Chapter) -> Result<()> {
        let dirs = self
            .dirs
            .as_ref()
            .ok_or_else(|| Error::Structure("cannot render a chapter before begin".into()))?;
        info!(
            play_order = assignment.play_order,
            chapter = %chapter.title(),
            "rendering chapter"
        );
        let page =
            self.options
                .renderer
                .render(chapter, self.fetcher, dirs.images(), &self.shell)?;
        fs::write(dirs.oebps().join(&assignment.link), page)?;
        self.chapters
            .push((assignment.clone(), chapter.title().to_string()));
        Ok(())
    }

    /// Write the navigation document, the NCX and the package document.
    pub fn index(&self) -> Result<()> {
        let (Some(dirs), Some(cover)) = (&self.dirs, &self.cover) else {
            return Err(Error::Structure("cannot index before begin".into()));
        };
        let mut images = Vec::new();
        for name in list_files(dirs.images())? {
            if &name != cover {
                images.push(Asset::probe(dirs.images(), &name)?);
            }
        }
        let package = Package {
            metadata: self.metadata,
            cover: Asset::probe(dirs.images(), cover)?,
            styles: list_files(dirs.styles())?,
            images,
            chapters: &self.chapters,
        };
        info!(title = %self.metadata.title, "writing index files");
        fs::write(dirs.oebps().join("toc.xhtml"), package.nav())?;
        fs::write(dirs.oebps().join("book.ncx"), package.ncx())?;
        fs::write(dirs.oebps().join("book.opf"), package.opf())?;
        Ok(())
    }

    /// Zip the build tree into an `.epub` and return its path.
    ///
    /// The archive is written to a fresh temporary file beside the target and
    /// moved into place once complete; a failed write leaves nothing behind.
    pub fn compress(&self, path: Option<&Path>) -> Result<PathBuf> {
        let dirs = self
            .dirs
            .as_ref()
            .ok_or_else(|| Error::Structure("cannot compress before begin".into()))?;
        let target = output_path(&self.metadata.title, path);
        let parent = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        info!(title = %self.metadata.title, path = %target.display(), "zipping book");

        // dropped, and so deleted, on every early return
        let mut partial = tempfile::Builder::new()
            .prefix(".pagefold-")
            .suffix(".zip")
            .tempfile_in(parent)?;
        write_archive(dirs.root(), BufWriter::new(partial.as_file_mut()))?;
        partial.persist(&target).map_err(io::Error::from)?;
        Ok(target)
    }

    /// Remove the build tree. Safe to call more than once.
    pub fn cleanup(&mut self) {
        if let Some(dirs) = self.dirs.take() {
            let root = dirs.root().to_path_buf();
            if let Err(err) = dirs.remove() {
                warn!(path = %root.display(), error = %err, "failed to remove build directory");
            }
        }
        self.cover = None;
    }
}

/// Resolve where the finished book goes.
///
/// Without a path the book lands in the working directory, named after its
/// title. A path that does not end in `.epub` gets the extension appended.
pub fn output_path(title: &str, path: Option<&Path>) -> PathBuf {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => Path::new(".").join(title.replace(['/', '\\'], "_")),
    };
    if path.extension().is_some_and(|ext| ext == "epub") {
        return path;
    }
    let mut name = OsString::from(path.as_os_str());
    name.push(".epub");
    PathBuf::from(name)
}

fn write_archive<W: Write + Seek>(root: &Path, dest: W) -> Result<()> {
    let mut zip = ZipWriter::new(dest);
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    // mimetype must be the first entry and uncompressed
    zip.start_file("mimetype", stored)?;
    zip.write_all(MIMETYPE.as_bytes())?;

    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if name == "mimetype" {
            continue;
        }
        debug!(entry = %name, "adding to archive");
        zip.start_file(name, deflated)?;
        let mut reader = BufReader::new(File::open(entry.path())?);
        io::copy(&mut reader, &mut zip)?;
    }

    zip.finish()?.flush()?;
    Ok(())
}

fn copy_cover(path: &Path, images: &Path) -> Result<String> {
    let mut head = Vec::new();
    File::open(path)?.take(8192).read_to_end(&mut head)?;
    let is_image = infer::get(&head).is_some_and(|t| t.matcher_type() == infer::MatcherType::Image);
    if !is_image {
        return Err(Error::InvalidImage(path.to_path_buf()));
    }
    let name = file_name(path)?;
    fs::copy(path, images.join(&name))?;
    Ok(name.to_string_lossy().into_owned())
}

fn file_name(path: &Path) -> Result<OsString> {
    path.file_name().map(OsString::from).ok_or_else(|| {
        Error::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no file name", path.display()),
        ))
    })
}

/// Claim `name`, or `<stem>-<n>.<ext>` if it is already taken.
fn unique_name(taken: &mut HashSet<String>, name: &str) -> String {
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map_or_else(|| name.to_string(), |s| s.to_string_lossy().into_owned());
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut candidate = name.to_string();
    let mut n = 1;
    while !taken.insert(candidate.clone()) {
        n += 1;
        candidate = format!("{stem}-{n}{ext}");
    }
    candidate
}

/// Sorted names of the regular files in `dir`.
fn list_files(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

fn coverpage(cover: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
  <head>
    <meta charset="utf-8"/>
    <title>Cover</title>
    <link rel="stylesheet" type="text/css" href="styles/coverpage.css"/>
  </head>
  <body epub:type="cover">
    <div class="cover">
      <img src="images/{}" alt="Cover"/>
    </div>
  </body>
</html>
"#,
        escape_xml(&encode_href(cover))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_rules() {
        assert_eq!(
            output_path("My Book", None),
            Path::new(".").join("My Book.epub")
        );
        assert_eq!(
            output_path("a/b\\c", None),
            Path::new(".").join("a_b_c.epub")
        );
        assert_eq!(
            output_path("T", Some(Path::new("out/book"))),
            PathBuf::from("out/book.epub")
        );
        assert_eq!(
            output_path("T", Some(Path::new("out/book.epub"))),
            PathBuf::from("out/book.epub")
        );
        assert_eq!(
            output_path("T", Some(Path::new("book.zip"))),
            PathBuf::from("book.zip.epub")
        );
    }

    #[test]
    fn test_build_dirs_layout_and_removal() {
        let dirs = BuildDirs::create(None).unwrap();
        let root = dirs.root().to_path_buf();
        assert!(root.join("OEBPS/images").is_dir());
        assert!(root.join("OEBPS/styles").is_dir());
        assert!(root.join("META-INF").is_dir());
        drop(dirs);
        assert!(!root.exists());
    }

    #[test]
    fn test_owned_build_dir_is_removed() {
        let scratch = tempfile::tempdir().unwrap();
        let base = scratch.path().join("build");
        let dirs = BuildDirs::create(Some(&base)).unwrap();
        assert_eq!(dirs.root(), base.as_path());
        dirs.remove().unwrap();
        assert!(!base.exists());
    }

    #[test]
    fn test_existing_build_dir_is_refused() {
        let scratch = tempfile::tempdir().unwrap();
        assert!(BuildDirs::create(Some(scratch.path())).is_err());
        assert!(scratch.path().exists());
    }

    #[test]
    fn test_invalid_cover_is_rejected() {
        let scratch = tempfile::tempdir().unwrap();
        let cover = scratch.path().join("cover.png");
        fs::write(&cover, b"definitely not an image").unwrap();
        let err = copy_cover(&cover, scratch.path()).unwrap_err();
        assert!(matches!(err, Error::InvalidImage(p) if p == cover));
    }

    #[test]
    fn test_unique_name() {
        let mut taken: HashSet<String> = ["styles.css".to_string()].into();
        assert_eq!(unique_name(&mut taken, "extra.css"), "extra.css");
        assert_eq!(unique_name(&mut taken, "styles.css"), "styles-2.css");
        assert_eq!(unique_name(&mut taken, "styles.css"), "styles-3.css");
        assert_eq!(unique_name(&mut taken, "extra.css"), "extra-2.css");
        assert_eq!(unique_name(&mut taken, "README"), "README");
        assert_eq!(unique_name(&mut taken, "README"), "README-2");
    }

    #[test]
    fn test_list_files_is_sorted() {
        let scratch = tempfile::tempdir().unwrap();
        for name in ["b.css", "a.css"] {
            fs::write(scratch.path().join(name), "").unwrap();
        }
        fs::create_dir(scratch.path().join("sub")).unwrap();
        assert_eq!(list_files(scratch.path()).unwrap(), vec!["a.css", "b.css"]);
    }
}
