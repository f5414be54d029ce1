use pagefold::dom::parse_document;
use pagefold::{DEFAULT_POLICY, TagPolicy, clean_html, sanitize_document};
use proptest::prelude::*;

/// Tags the generator nests freely; a mix of whitelisted and foreign ones.
const CONTAINERS: &[&str] = &[
    "div", "p", "b", "i", "em", "strong", "span", "blockquote", "sub", "sup", "u", "small",
    "section", "nav", "x-widget", "mark", "label", "abbr", "button", "object", "table",
];

const ATTRS: &[&str] = &["id", "class", "style", "onclick", "title", "align"];

fn attr() -> impl Strategy<Value = String> {
    (prop::sample::select(ATTRS), "[a-z]{1,6}").prop_map(|(name, value)| format!(" {name}=\"{value}\""))
}

fn fragment() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        "[a-z]{1,8}",
        "[a-z]{1,8}".prop_map(|t| format!("<script>{t}</script>")),
        "[a-z]{1,8}".prop_map(|t| format!("<style>{t}</style>")),
        "[a-z]{1,8}".prop_map(|t| format!("<!--{t}-->")),
        Just("<br>".to_string()),
    ];
    leaf.prop_recursive(4, 48, 4, |inner| {
        (
            prop::sample::select(CONTAINERS),
            prop::collection::vec(attr(), 0..3),
            prop::collection::vec(inner, 1..4),
        )
            .prop_map(|(tag, attrs, children)| {
                format!("<{tag}{}>{}</{tag}>", attrs.concat(), children.concat())
            })
    })
}

fn page() -> impl Strategy<Value = String> {
    prop::collection::vec(fragment(), 1..4)
        .prop_map(|parts| format!("<html><body>{}</body></html>", parts.concat()))
}

fn assert_whitelisted(xhtml: &str, policy: &TagPolicy) -> Result<(), TestCaseError> {
    let dom = parse_document(xhtml);
    for node in dom.descendants(dom.document()) {
        let Some(tag) = dom.element_name(node) else {
            continue;
        };
        prop_assert!(policy.allows_tag(tag), "tag <{}> survived", &**tag);
        for attr in dom.attrs(node) {
            prop_assert!(
                policy.allows_attr(tag, &attr.name.local),
                "attribute {} survived on <{}>",
                &*attr.name.local,
                &**tag
            );
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn prop_sanitize_is_idempotent(html in page()) {
        let once = sanitize_document(&html, &DEFAULT_POLICY);
        let twice = sanitize_document(&once, &DEFAULT_POLICY);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_output_is_whitelisted(html in page()) {
        let clean = sanitize_document(&html, &DEFAULT_POLICY);
        assert_whitelisted(&clean, &DEFAULT_POLICY)?;
        prop_assert!(!clean.contains("<!--"));
    }

    #[test]
    fn prop_whitelisted_text_is_kept(words in prop::collection::vec("[a-z]{1,8}", 1..6)) {
        // wrapping in foreign tags never loses text that sits in allowed ones
        let inner: String = words.iter().map(|w| format!("<p>{w}</p>")).collect();
        let html = format!("<section><x-widget>{inner}</x-widget></section>");
        let clean = sanitize_document(&html, &DEFAULT_POLICY);
        for word in &words {
            let expected = format!("<p>{word}</p>");
            prop_assert!(clean.contains(&expected));
        }
    }
}

#[test]
fn test_end_to_end_document() {
    let clean = sanitize_document(
        "<html><body><div>Hello</div><script>evil</script></body></html>",
        &DEFAULT_POLICY,
    );
    let squash = |s: &str| s.split_whitespace().collect::<String>();
    assert_eq!(
        squash(&clean),
        squash("<html><head></head><body><div>Hello</div></body></html>")
    );
}

#[test]
fn test_unwrapped_scope_boundary_is_stable() {
    for html in [
        "<p>a<button><div>x</div></button>b</p>",
        "<p>a<object><blockquote>q</blockquote></object></p>",
        "<p>a<table><tr><td><div>cell</div></td></tr></table>b</p>",
    ] {
        let once = sanitize_document(html, &DEFAULT_POLICY);
        assert_eq!(sanitize_document(&once, &DEFAULT_POLICY), once, "{html}");
    }
}

#[test]
fn test_unwrap_keeps_nested_allowed_content() {
    let clean = sanitize_document(
        "<section><article><p id=\"a\" onclick=\"x()\">One</p><nav><b>Two</b></nav></article></section>",
        &DEFAULT_POLICY,
    );
    assert!(clean.contains(r#"<p id="a">One</p><b>Two</b>"#), "{clean}");
    assert!(!clean.contains("onclick"));
    assert!(!clean.contains("section"));
}

#[test]
fn test_orphan_images_removed_at_any_depth() {
    let page = clean_html(
        r#"<div><p><span><img alt="x"></span></p><img src="a.png"></div>"#,
        &DEFAULT_POLICY,
    );
    let images = page.dom.find_all_by_tag(page.root, "img");
    assert_eq!(images.len(), 1);
    assert_eq!(page.dom.get_attr(images[0], "src"), Some("a.png"));
}

#[test]
fn test_custom_policy() {
    let policy = TagPolicy::empty()
        .allow("html", &[])
        .allow("head", &[])
        .allow("body", &[])
        .allow("section", &["class"]);
    let clean = sanitize_document(
        r#"<section class="c" id="i"><p>text</p></section>"#,
        &policy,
    );
    assert!(clean.contains(r#"<section class="c"></section>"#), "{clean}");
}
