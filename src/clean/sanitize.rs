//! Whitelist-based tree rewriting.

use html5ever::ns;
use tracing::trace;

use super::policy::TagPolicy;
use crate::dom::{ArenaDom, ArenaNodeData, ArenaNodeId};

/// Rewrites a document so only whitelisted tags and attributes remain.
///
/// Elements outside the policy are unwrapped: their element children take
/// their place, while text sitting directly inside them is dropped along with
/// the element. Text following an element is a sibling node and is kept.
///
/// Only HTML-namespace elements can match the policy, so SVG and MathML
/// islands are unwrapped like any unknown tag. Namespaced attributes
/// (`xlink:href`, `xml:lang`) are always dropped.
#[derive(Debug, Clone, Copy)]
pub struct Sanitizer<'p> {
    policy: &'p TagPolicy,
}

/// Counts of what a sanitizer pass changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SanitizeStats {
    pub unwrapped: usize,
    pub attrs_removed: usize,
    pub comments_removed: usize,
    pub images_removed: usize,
}

impl<'p> Sanitizer<'p> {
    pub fn new(policy: &'p TagPolicy) -> Self {
        Self { policy }
    }

    /// Sanitize everything below `root`. The root itself is never touched.
    pub fn sanitize(&self, dom: &mut ArenaDom, root: ArenaNodeId) -> SanitizeStats {
        let mut stats = SanitizeStats::default();
        let mut work: Vec<ArenaNodeId> = dom.children(root).collect();

        while let Some(node) = work.pop() {
            let (tag, html) = match dom.get(node).map(|n| &n.data) {
                Some(ArenaNodeData::Element { name, .. }) => {
                    (name.local.to_string(), name.ns == ns!(html))
                }
                Some(ArenaNodeData::Comment(_)) => {
                    dom.detach(node);
                    stats.comments_removed += 1;
                    continue;
                }
                _ => continue,
            };

            let child_list = dom.element_children(node);

            if html && self.policy.allows_tag(&tag) {
                let before = dom.attrs(node).len();
                dom.retain_attrs(node, |attr| {
                    attr.name.prefix.is_none()
                        && attr.name.ns == ns!()
                        && self.policy.allows_attr(&tag, attr.name.local.as_ref())
                });
                stats.attrs_removed += before - dom.attrs(node).len();
                // comments are visited too so they can be dropped
                work.extend(dom.children(node).filter(|&c| !dom.is_element(c)));
            } else {
                trace!(tag = %tag, children = child_list.len(), "unwrapping element");
                for &child in &child_list {
                    dom.detach(child);
                    dom.insert_before(node, child);
                }
                dom.detach(node);
                stats.unwrapped += 1;
            }

            work.extend(child_list);
        }

        stats.images_removed = remove_orphan_images(dom, root);
        stats
    }

    /// Pick the content root of a page and sanitize below it.
    ///
    /// Returns the content root (see [`content_root`]).
    pub fn clean(&self, dom: &mut ArenaDom) -> (ArenaNodeId, SanitizeStats) {
        let root = content_root(dom);
        let stats = self.sanitize(dom, root);
        (root, stats)
    }
}

/// The part of a page worth keeping: the first `<article>` inside `<body>`,
/// else `<body>`, else the document element.
pub fn content_root(dom: &ArenaDom) -> ArenaNodeId {
    let scope = dom
        .find_by_tag("body")
        .or_else(|| dom.document_element())
        .unwrap_or_else(|| dom.document());

    dom.descendants(scope)
        .into_iter()
        .find(|&id| dom.element_name(id).is_some_and(|n| n.as_ref() == "article"))
        .unwrap_or(scope)
}

/// Drop every `<img>` under `root` without a `src` attribute, subtree and
/// all. An empty `src=""` counts as present.
pub fn remove_orphan_images(dom: &mut ArenaDom, root: ArenaNodeId) -> usize {
    let orphans: Vec<_> = dom
        .find_all_by_tag(root, "img")
        .into_iter()
        .filter(|&img| !dom.has_attr(img, "src"))
        .collect();
    for &img in &orphans {
        dom.detach(img);
    }
    orphans.len()
}
