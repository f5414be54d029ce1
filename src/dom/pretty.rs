//! Indentation pass run over a chapter page before it is serialized.
//!
//! Works on runs of text nodes: the "leading text" of an element is the run
//! before its first child element, its "tail" is the run between it and the
//! next sibling element.

use super::arena::{ArenaDom, ArenaNodeId};

/// One level of indentation.
pub const INDENT: &str = "  ";

/// Re-indent the subtree under `root`, which sits at nesting `level` (the
/// `<html>` element of a page is level 1).
pub fn prettify(dom: &mut ArenaDom, root: ArenaNodeId, level: usize) {
    let start = format!("\n{}", INDENT.repeat(level));
    let end = format!("\n{}", INDENT.repeat(level.saturating_sub(1)));
    let children = dom.element_children(root);

    if children.is_empty() {
        if let Some(tail) = tail_text(dom, root)
            && !tail.is_empty()
        {
            set_tail(dom, root, format!("{}{end}", tail.trim_end()));
        }
        return;
    }

    if let Some(text) = leading_text(dom, root)
        && !text.is_empty()
    {
        set_leading(dom, root, format!("{}{start}", text.trim_end()));
    }
    if let Some(tail) = tail_text(dom, root)
        && !tail.is_empty()
    {
        set_tail(dom, root, format!("{}{end}", tail.trim_end()));
    }

    for &child in &children {
        prettify(dom, child, level + 1);
    }

    if let Some(&last) = children.last() {
        let tail = tail_text(dom, last).unwrap_or_default();
        set_tail(dom, last, format!("{}{end}", tail.trim_end()));
    }
}

/// Consecutive text nodes starting at `first`.
fn text_run(dom: &ArenaDom, first: ArenaNodeId) -> Vec<ArenaNodeId> {
    let mut run = Vec::new();
    let mut current = first;
    while dom.is_text(current) {
        run.push(current);
        current = dom
            .get(current)
            .map(|n| n.next_sibling)
            .unwrap_or(ArenaNodeId::NONE);
    }
    run
}

fn joined(dom: &ArenaDom, run: &[ArenaNodeId]) -> Option<String> {
    if run.is_empty() {
        return None;
    }
    Some(run.iter().filter_map(|&id| dom.text_content(id)).collect())
}

fn leading_run(dom: &ArenaDom, elem: ArenaNodeId) -> Vec<ArenaNodeId> {
    let first = dom
        .get(elem)
        .map(|n| n.first_child)
        .unwrap_or(ArenaNodeId::NONE);
    text_run(dom, first)
}

fn tail_run(dom: &ArenaDom, elem: ArenaNodeId) -> Vec<ArenaNodeId> {
    let next = dom
        .get(elem)
        .map(|n| n.next_sibling)
        .unwrap_or(ArenaNodeId::NONE);
    text_run(dom, next)
}

/// Text before the first child element, `None` if there is no text node.
pub fn leading_text(dom: &ArenaDom, elem: ArenaNodeId) -> Option<String> {
    joined(dom, &leading_run(dom, elem))
}

/// Text after `elem` up to its next sibling element, `None` if there is none.
pub fn tail_text(dom: &ArenaDom, elem: ArenaNodeId) -> Option<String> {
    joined(dom, &tail_run(dom, elem))
}

/// Collapse a run into its first node holding `text`. An empty run gets a
/// new node via `create`.
fn replace_run<F>(dom: &mut ArenaDom, run: Vec<ArenaNodeId>, text: String, create: F)
where
    F: FnOnce(&mut ArenaDom, ArenaNodeId),
{
    match run.split_first() {
        Some((&first, rest)) => {
            dom.set_text(first, text);
            for &extra in rest {
                dom.detach(extra);
            }
        }
        None => {
            let node = dom.create_text(text);
            create(dom, node);
        }
    }
}

fn set_leading(dom: &mut ArenaDom, elem: ArenaNodeId, text: String) {
    let run = leading_run(dom, elem);
    replace_run(dom, run, text, |dom, node| {
        let first = dom
            .get(elem)
            .map(|n| n.first_child)
            .unwrap_or(ArenaNodeId::NONE);
        if first.is_some() {
            dom.insert_before(first, node);
        } else {
            dom.append(elem, node);
        }
    });
}

fn set_tail(dom: &mut ArenaDom, elem: ArenaNodeId, text: String) {
    let Some(parent) = dom.parent(elem) else {
        return;
    };
    let run = tail_run(dom, elem);
    replace_run(dom, run, text, |dom, node| {
        let next = dom
            .get(elem)
            .map(|n| n.next_sibling)
            .unwrap_or(ArenaNodeId::NONE);
        if next.is_some() {
            dom.insert_before(next, node);
        } else {
            dom.append(parent, node);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::super::{parse_document, to_xhtml};
    use super::*;

    fn pretty(html: &str) -> String {
        let mut dom = parse_document(html);
        let root = dom.document_element().unwrap();
        prettify(&mut dom, root, 1);
        to_xhtml(&dom, root)
    }

    #[test]
    fn test_nested_elements_are_indented() {
        assert_eq!(
            pretty("<html><head></head><body><div><p>Hi</p></div></body></html>"),
            "<html><head></head><body><div><p>Hi</p>\n    </div>\n  </body>\n</html>",
        );
    }

    #[test]
    fn test_existing_whitespace_is_trimmed_before_indent() {
        let out = pretty("<html><body>\n\n   <p>a</p>   \n\n</body></html>");
        assert!(out.contains("<body>\n    <p>a</p>\n  </body>"), "{out}");
    }

    #[test]
    fn test_leaf_text_is_kept_verbatim() {
        let out = pretty("<html><body><p>  spaced  </p></body></html>");
        assert!(out.contains("<p>  spaced  </p>"), "{out}");
    }

    #[test]
    fn test_tail_text_keeps_content() {
        let out = pretty("<html><body><p>a</p>tail text   <p>b</p></body></html>");
        assert!(out.contains("<p>a</p>tail text\n"), "{out}");
    }

    #[test]
    fn test_prettify_is_stable() {
        let mut dom = parse_document("<html><body><div><p>x</p><p>y</p></div></body></html>");
        let root = dom.document_element().unwrap();
        prettify(&mut dom, root, 1);
        let once = to_xhtml(&dom, root);
        prettify(&mut dom, root, 1);
        assert_eq!(once, to_xhtml(&dom, root));
    }
}
