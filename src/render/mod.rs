//! Chapter rendering: raw HTML in, finished XHTML page out.
//!
//! Rendering runs in three steps, each a method of [`ChapterRenderer`]:
//!
//! 1. `cleanup` parses and sanitizes the chapter content
//! 2. `hydrate` localizes images into the book
//! 3. `finalize` pours the content into the page shell and serializes it
//!
//! The book builder only talks to the trait, so a custom renderer can swap
//! any step. [`SimpleRenderer`] is the stock implementation.

pub mod images;
pub mod template;

use std::path::Path;

use tracing::{debug, info};

use crate::chapter::Chapter;
use crate::clean::{CleanPage, DEFAULT_POLICY, TagPolicy, clean_html};
use crate::dom::{parse_document, prettify, to_xhtml};
use crate::error::{Error, Result};
use crate::net::Fetcher;
pub use images::{ImageLocalizer, LocalizeStats};
pub use template::{PageShell, XHTML_PROLOG};

/// Everything a renderer needs while working on one chapter.
pub struct RenderContext<'a> {
    pub chapter: &'a Chapter,
    /// The sanitized content produced by `cleanup`.
    pub page: CleanPage,
    pub fetcher: &'a dyn Fetcher,
    /// Directory images are written to (`OEBPS/images`).
    pub image_dir: &'a Path,
    pub shell: &'a PageShell,
}

/// The three rendering steps.
pub trait ChapterRenderer {
    /// Parse and sanitize raw chapter content.
    fn cleanup(&self, content: &str) -> CleanPage;

    /// Adjust the sanitized content before the final render.
    fn hydrate(&self, ctx: &mut RenderContext<'_>) -> Result<()>;

    /// Produce the finished page bytes.
    fn finalize(&self, ctx: RenderContext<'_>) -> Result<Vec<u8>>;

    /// Run all three steps.
    fn render(
        &self,
        chapter: &Chapter,
        fetcher: &dyn Fetcher,
        image_dir: &Path,
        shell: &PageShell,
    ) -> Result<Vec<u8>> {
        let page = self.cleanup(chapter.content());
        let mut ctx = RenderContext {
            chapter,
            page,
            fetcher,
            image_dir,
            shell,
        };
        self.hydrate(&mut ctx)?;
        self.finalize(ctx)
    }
}

/// Sanitize with a tag policy, localize images, indent, serialize.
#[derive(Debug, Clone)]
pub struct SimpleRenderer {
    policy: TagPolicy,
}

impl Default for SimpleRenderer {
    fn default() -> Self {
        Self {
            policy: DEFAULT_POLICY.clone(),
        }
    }
}

impl SimpleRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom whitelist instead of the e-reader default.
    pub fn with_policy(policy: TagPolicy) -> Self {
        Self { policy }
    }
}

impl ChapterRenderer for SimpleRenderer {
    fn cleanup(&self, content: &str) -> CleanPage {
        clean_html(content, &self.policy)
    }

    fn hydrate(&self, ctx: &mut RenderContext<'_>) -> Result<()> {
        let title = ctx.chapter.title();
        let stats = ImageLocalizer::new(ctx.fetcher, ctx.image_dir, title).localize(
            &mut ctx.page.dom,
            ctx.page.root,
            ctx.chapter.url(),
        )?;
        if stats != LocalizeStats::default() {
            info!(
                chapter = %title,
                stored = stats.stored,
                reused = stats.reused,
                dropped = stats.dropped,
                skipped = stats.skipped,
                "localized images"
            );
        }
        Ok(())
    }

    fn finalize(&self, ctx: RenderContext<'_>) -> Result<Vec<u8>> {
        let mut dom = parse_document(&ctx.shell.render(ctx.chapter.title()));
        let body = dom
            .find_by_tag("body")
            .ok_or_else(|| Error::Structure("page shell has no <body>".into()))?;
        let html = dom
            .document_element()
            .ok_or_else(|| Error::Structure("page shell has no root element".into()))?;

        let content = &ctx.page;
        for child in content.dom.children(content.root) {
            let copy = dom.import(&content.dom, child);
            dom.append(body, copy);
        }

        prettify(&mut dom, html, 1);
        let mut out = String::from(XHTML_PROLOG);
        out.push_str(&to_xhtml(&dom, html));
        out.push('\n');
        debug!(chapter = %ctx.chapter.title(), bytes = out.len(), "rendered chapter");
        Ok(out.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;
    use crate::net::Fetched;

    struct NoNetwork;

    impl Fetcher for NoNetwork {
        fn fetch(&self, url: &Url) -> Result<Fetched> {
            Err(Error::UnsupportedUrl(url.to_string()))
        }
    }

    fn render(content: &str) -> String {
        let dir = tempfile::tempdir().unwrap();
        let chapter = Chapter::new("Chapter One", content, None).unwrap();
        let bytes = SimpleRenderer::new()
            .render(&chapter, &NoNetwork, dir.path(), &PageShell::default())
            .unwrap();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_render_produces_xhtml_page() {
        let page = render("<html><body><div>Hello</div><script>evil</script></body></html>");
        assert!(page.starts_with(XHTML_PROLOG));
        assert!(page.contains("<title>Chapter One</title>"));
        assert!(page.contains(r#"href="styles/styles.css""#));
        assert!(page.contains("<div>Hello</div>"));
        assert!(!page.contains("evil"));
        assert!(page.trim_end().ends_with("</html>"));
    }

    #[test]
    fn test_render_keeps_article_content_only() {
        let page = render("<nav>menu</nav><article><h1>Title</h1><p>x<br>y</p></article>");
        assert!(!page.contains("menu"));
        assert!(page.contains("<h1>Title</h1>"));
        assert!(page.contains("<br/>y</p>"));
    }

    #[test]
    fn test_render_indents_body() {
        let page = render("<p>a</p><p>b</p>");
        assert!(page.contains("<body>\n    <p>a</p>"), "{page}");
        assert!(page.contains("<p>b</p>\n  </body>\n</html>"), "{page}");
        assert!(page.contains("<head>\n    <meta charset=\"utf-8\"/>\n"), "{page}");
    }

    #[test]
    fn test_failed_image_is_dropped() {
        let page = render(r#"<p>before<img src="https://example.com/a.png">after</p>"#);
        assert!(!page.contains("<img"));
        assert!(page.contains("beforeafter"));
    }
}
