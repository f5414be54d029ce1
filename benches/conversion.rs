//! Benchmarks for the sanitize and render pipeline.
//!
//! Run with: cargo bench

use criterion::{Criterion, criterion_group, criterion_main};

use pagefold::{
    Chapter, ChapterRenderer, DEFAULT_POLICY, Error, Fetched, Fetcher, PageShell, Result, SimpleRenderer,
    clean_html, sanitize_document,
};
use url::Url;

struct Offline;

impl Fetcher for Offline {
    fn fetch(&self, url: &Url) -> Result<Fetched> {
        Err(Error::UnsupportedUrl(url.to_string()))
    }
}

/// A long, messy page in the shape blogs usually take.
fn sample_page() -> String {
    let mut html = String::from(
        "<!DOCTYPE html><html><head><title>Sample</title><style>p{}</style>\
         <script>track()</script></head><body><nav><ul><li><a href='/'>Home</a></li></ul></nav><article>",
    );
    for i in 0..200 {
        html.push_str(&format!(
            "<section class='s{i}' data-x='{i}'><h2 id='h{i}'>Heading {i}</h2>\
             <p style='color:red' onclick='x()'>\u{201C}Paragraph\u{201D} {i} with <b>bold</b>, \
             <i class='i'>italic</i> and <a href='#h{i}' target='_blank'>a link</a>.</p>\
             <div><span><img alt='orphan'></span><!-- note {i} --></div></section>",
        ));
    }
    html.push_str("</article><footer>bye</footer></body></html>");
    html
}

fn bench_sanitize_document(c: &mut Criterion) {
    let html = sample_page();
    c.bench_function("sanitize_document", |b| {
        b.iter(|| sanitize_document(&html, &DEFAULT_POLICY));
    });
}

fn bench_clean_html(c: &mut Criterion) {
    let html = sample_page();
    c.bench_function("clean_html", |b| {
        b.iter(|| clean_html(&html, &DEFAULT_POLICY));
    });
}

fn bench_render_chapter(c: &mut Criterion) {
    let chapter = Chapter::new("Sample", sample_page(), None).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let renderer = SimpleRenderer::new();
    let shell = PageShell::default();
    c.bench_function("render_chapter", |b| {
        b.iter(|| renderer.render(&chapter, &Offline, dir.path(), &shell).unwrap());
    });
}

criterion_group!(
    benches,
    bench_sanitize_document,
    bench_clean_html,
    bench_render_chapter
);
criterion_main!(benches);
