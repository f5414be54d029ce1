//! Tag and attribute whitelist.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Tags that e-readers render reliably, with the attributes each may keep.
const EREADER_TAGS: &[(&str, &[&str])] = &[
    ("a", &["href", "id"]),
    ("b", &["id"]),
    ("big", &[]),
    ("blockquote", &["id"]),
    ("body", &[]),
    ("br", &["id"]),
    ("center", &[]),
    ("cite", &[]),
    ("dd", &["id", "title"]),
    ("del", &[]),
    ("dfn", &[]),
    ("div", &["align", "id", "bgcolor"]),
    ("em", &["id", "title"]),
    ("font", &["color", "face", "id", "size"]),
    ("head", &[]),
    ("h1", &[]),
    ("h2", &[]),
    ("h3", &[]),
    ("h4", &[]),
    ("h5", &[]),
    ("h6", &[]),
    ("html", &[]),
    ("i", &["class", "id"]),
    ("img", &["align", "border", "height", "id", "src", "width"]),
    ("li", &["class", "id", "title"]),
    ("ol", &["id"]),
    ("p", &["align", "id", "title"]),
    ("s", &["id", "style", "title"]),
    ("small", &["id"]),
    ("span", &["bgcolor", "title"]),
    ("strike", &["class", "id"]),
    ("strong", &["class", "id"]),
    ("sub", &["id"]),
    ("sup", &["class", "id"]),
    ("u", &["id"]),
    ("ul", &["class", "id"]),
    ("var", &[]),
];

/// The built-in e-reader policy.
pub static DEFAULT_POLICY: LazyLock<TagPolicy> = LazyLock::new(|| {
    EREADER_TAGS
        .iter()
        .fold(TagPolicy::empty(), |policy, (tag, attrs)| {
            policy.allow(tag, attrs)
        })
});

/// Which tags survive sanitization, and which attributes each keeps.
///
/// Tag and attribute names are stored lowercase. A policy is built once and
/// only read afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPolicy {
    tags: HashMap<String, HashSet<String>>,
}

impl TagPolicy {
    /// A policy that allows nothing.
    pub fn empty() -> Self {
        Self {
            tags: HashMap::new(),
        }
    }

    /// Allow `tag` with the given attributes, extending any earlier entry.
    pub fn allow(mut self, tag: &str, attrs: &[&str]) -> Self {
        self.tags
            .entry(tag.to_ascii_lowercase())
            .or_default()
            .extend(attrs.iter().map(|a| a.to_ascii_lowercase()));
        self
    }

    /// Remove a tag from the whitelist.
    pub fn deny(mut self, tag: &str) -> Self {
        self.tags.remove(&tag.to_ascii_lowercase());
        self
    }

    pub fn allows_tag(&self, tag: &str) -> bool {
        self.tags.contains_key(tag)
    }

    pub fn allows_attr(&self, tag: &str, attr: &str) -> bool {
        self.tags.get(tag).is_some_and(|attrs| attrs.contains(attr))
    }

    /// Attributes allowed on `tag`, if the tag is allowed at all.
    pub fn attrs(&self, tag: &str) -> Option<&HashSet<String>> {
        self.tags.get(tag)
    }

    /// Allowed tag names, in no particular order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }
}

impl Default for TagPolicy {
    fn default() -> Self {
        DEFAULT_POLICY.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_contents() {
        let policy = &*DEFAULT_POLICY;
        assert_eq!(policy.tags().count(), EREADER_TAGS.len());
        assert!(policy.allows_tag("img"));
        assert!(policy.allows_attr("img", "src"));
        assert!(policy.allows_attr("a", "href"));
        assert!(!policy.allows_attr("a", "onclick"));
        assert!(!policy.allows_tag("script"));
        assert!(!policy.allows_tag("article"));
        assert!(policy.attrs("big").is_some_and(|a| a.is_empty()));
    }

    #[test]
    fn test_custom_policy_is_lowercased() {
        let policy = TagPolicy::empty().allow("SECTION", &["ID"]).allow("section", &["title"]);
        assert!(policy.allows_attr("section", "id"));
        assert!(policy.allows_attr("section", "title"));
        assert!(!policy.allows_tag("SECTION"));
    }

    #[test]
    fn test_deny_removes_tag() {
        let policy = TagPolicy::default().deny("font");
        assert!(!policy.allows_tag("font"));
        assert!(DEFAULT_POLICY.allows_tag("font"));
    }
}
