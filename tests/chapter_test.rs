use std::cell::RefCell;
use std::fs::{self, File};
use std::io::{Cursor, Read, Write};
use std::rc::Rc;

use pagefold::{
    Chapter, ChapterOptions, Epub, EpubOptions, Error, Fetched, Fetcher, HttpClient, Metadata,
    Result,
};
use url::Url;
use zip::ZipArchive;
use zip::write::SimpleFileOptions;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01\x08\x06\0\0\0\x1f\x15\xc4\x89";

/// One canned page; everything else is a 404.
struct OnePage {
    url: &'static str,
    body: &'static [u8],
    requests: Rc<RefCell<usize>>,
}

impl Fetcher for OnePage {
    fn fetch(&self, url: &Url) -> Result<Fetched> {
        *self.requests.borrow_mut() += 1;
        if url.as_str() == self.url {
            Ok(Fetched::new(url.clone(), 200, Cursor::new(self.body)))
        } else {
            Ok(Fetched::new(url.clone(), 404, Cursor::new(&b""[..])))
        }
    }
}

#[test]
fn test_from_url_selects_title_and_content() {
    let web = OnePage {
        url: "https://blog.example/posts/1",
        body: br#"<html><head><title>Site | Post</title></head><body>
            <header><h1 class="post-title">A Post</h1></header>
            <div class="entry"><p>First</p></div>
            <aside>ads</aside>
            <div class="entry"><p>Second</p></div>
        </body></html>"#,
        requests: Rc::default(),
    };
    let opts = ChapterOptions::new()
        .title_selector("h1.post-title")
        .content_selector("div.entry");
    let chapter = Chapter::from_url(&web, "https://blog.example/posts/1", &opts).unwrap();

    assert_eq!(chapter.title(), "A Post");
    assert_eq!(
        chapter.content(),
        r#"<div><div class="entry"><p>First</p></div><div class="entry"><p>Second</p></div></div>"#
    );
    assert_eq!(chapter.url().unwrap().as_str(), "https://blog.example/posts/1");
}

#[test]
fn test_from_url_failure_is_fatal() {
    let web = OnePage {
        url: "https://blog.example/ok",
        body: b"<p>x</p>",
        requests: Rc::default(),
    };
    let err = Chapter::from_url(&web, "https://blog.example/gone", &ChapterOptions::new())
        .unwrap_err();
    assert!(matches!(err, Error::Status { status: 404, .. }));

    let err = Chapter::from_url(&web, "not a url", &ChapterOptions::new()).unwrap_err();
    assert!(matches!(err, Error::Url(_)));
}

#[test]
fn test_from_url_plain_text() {
    let web = OnePage {
        url: "https://files.example/readme.txt",
        body: b"line one\n\nline <two>",
        requests: Rc::default(),
    };
    let opts = ChapterOptions::new().title("Readme");
    let chapter = Chapter::from_url(&web, "https://files.example/readme.txt", &opts).unwrap();
    assert_eq!(
        chapter.content(),
        "<body><p>line one</p><p>line &lt;two&gt;</p></body>"
    );
}

#[test]
fn test_from_file_decodes_declared_charset() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("latin.html");
    let body = b"<html><head><meta charset=\"windows-1252\"><title>Caf\xe9</title></head><body><p>na\xefve</p></body></html>";
    fs::write(&path, body).unwrap();

    let chapter = Chapter::from_file(&path, &ChapterOptions::new()).unwrap();
    assert_eq!(chapter.title(), "Caf\u{e9}");
    assert!(chapter.content().contains("na\u{ef}ve"));
}

#[test]
fn test_from_docx_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.docx");
    let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
    zip.start_file("word/document.xml", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(
        br#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>
<w:p><w:pPr><w:pStyle w:val="Title"/></w:pPr><w:r><w:t>Quarterly</w:t></w:r></w:p>
<w:p><w:r><w:t>Numbers went up.</w:t></w:r></w:p>
</w:body></w:document>"#,
    )
    .unwrap();
    zip.finish().unwrap();

    let opts = ChapterOptions::new().title_selector("h1");
    let chapter = Chapter::from_file(&path, &opts).unwrap();
    assert_eq!(chapter.title(), "Quarterly");
    assert_eq!(
        chapter.content(),
        "<h1>Quarterly</h1><p>Numbers went up.</p>"
    );
}

#[test]
fn test_file_chapter_localizes_relative_images() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("img")).unwrap();
    fs::write(dir.path().join("img").join("dot.png"), PNG).unwrap();
    let page = dir.path().join("page.html");
    fs::write(
        &page,
        r#"<title>Local</title><article><p>See <img src="img/dot.png?v=2" width="1"></p></article>"#,
    )
    .unwrap();

    let chapter = Chapter::from_file(&page, &ChapterOptions::new()).unwrap();
    assert_eq!(chapter.title(), "Local");

    let options = EpubOptions::new().with_fetcher(HttpClient::new().unwrap());
    let mut book = Epub::with_options(Metadata::new("Local Book"), options).unwrap();
    book.add_chapter(chapter);
    let out = book.create(Some(dir.path().join("local.epub").as_path())).unwrap();

    let mut archive = ZipArchive::new(File::open(out).unwrap()).unwrap();
    let mut xhtml = String::new();
    archive
        .by_name("OEBPS/1.xhtml")
        .unwrap()
        .read_to_string(&mut xhtml)
        .unwrap();
    let start = xhtml.find("src=\"images/").unwrap() + "src=\"".len();
    let href = &xhtml[start..start + xhtml[start..].find('"').unwrap()];
    assert!(href.ends_with(".png"));
    assert!(xhtml.contains(r#"width="1""#));

    let mut stored = Vec::new();
    archive
        .by_name(&format!("OEBPS/{href}"))
        .unwrap()
        .read_to_end(&mut stored)
        .unwrap();
    assert_eq!(stored, PNG);
}

#[test]
fn test_unresolvable_relative_image_is_left_alone() {
    let dir = tempfile::tempdir().unwrap();
    let requests = Rc::new(RefCell::new(0));
    let web = OnePage {
        url: "https://unused.example/",
        body: b"",
        requests: Rc::clone(&requests),
    };
    let mut book = Epub::with_options(
        Metadata::new("No Base"),
        EpubOptions::new().with_fetcher(web),
    )
    .unwrap();
    book.add_chapter(Chapter::new("Rel", r#"<p><img src="pic.png"></p>"#, None).unwrap());
    let out = book.create(Some(dir.path().join("rel.epub").as_path())).unwrap();

    assert_eq!(*requests.borrow(), 0);
    let mut archive = ZipArchive::new(File::open(out).unwrap()).unwrap();
    let mut xhtml = String::new();
    archive
        .by_name("OEBPS/1.xhtml")
        .unwrap()
        .read_to_string(&mut xhtml)
        .unwrap();
    assert!(xhtml.contains(r#"<img src="pic.png"/>"#));
}
