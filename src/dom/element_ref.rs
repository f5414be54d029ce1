//! CSS selector matching over [`ArenaDom`] via the `selectors` crate.
//!
//! Chapter constructors use this to locate the title and content of a page
//! (`h1.title`, `article > div.body`, ...).

use std::fmt;

use html5ever::{LocalName, Namespace};
use selectors::attr::{AttrSelectorOperation, CaseSensitivity, NamespaceConstraint};
use selectors::context::{MatchingContext, SelectorCaches};
use selectors::matching::ElementSelectorFlags;
use selectors::parser::SelectorParseErrorKind;
use selectors::{OpaqueElement, SelectorImpl};

use super::arena::{ArenaDom, ArenaNodeData, ArenaNodeId};
use crate::error::{Error, Result};

/// Selector implementation marker for page documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelectors;

/// Identifier, attribute value and prefix string type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
pub struct IdentStr(pub String);

impl precomputed_hash::PrecomputedHash for IdentStr {
    fn precomputed_hash(&self) -> u32 {
        self.0
            .bytes()
            .fold(0u32, |h, b| h.wrapping_mul(31).wrapping_add(b as u32))
    }
}

impl AsRef<str> for IdentStr {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for IdentStr {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for IdentStr {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl cssparser::ToCss for IdentStr {
    fn to_css<W: fmt::Write>(&self, dest: &mut W) -> fmt::Result {
        dest.write_str(&self.0)
    }
}

/// Tag name atom usable inside selectors.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagName(pub LocalName);

impl precomputed_hash::PrecomputedHash for TagName {
    fn precomputed_hash(&self) -> u32 {
        self.0.precomputed_hash()
    }
}

impl cssparser::ToCss for TagName {
    fn to_css<W: fmt::Write>(&self, dest: &mut W) -> fmt::Result {
        dest.write_str(self.0.as_ref())
    }
}

impl From<String> for TagName {
    fn from(s: String) -> Self {
        Self(LocalName::from(s))
    }
}

impl From<&str> for TagName {
    fn from(s: &str) -> Self {
        Self(LocalName::from(s))
    }
}

impl AsRef<str> for TagName {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

/// Namespace atom usable inside selectors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NamespaceUrl(pub Namespace);

impl precomputed_hash::PrecomputedHash for NamespaceUrl {
    fn precomputed_hash(&self) -> u32 {
        self.0.precomputed_hash()
    }
}

impl cssparser::ToCss for NamespaceUrl {
    fn to_css<W: fmt::Write>(&self, dest: &mut W) -> fmt::Result {
        dest.write_str(self.0.as_ref())
    }
}

impl From<String> for NamespaceUrl {
    fn from(s: String) -> Self {
        Self(Namespace::from(s))
    }
}

impl From<&str> for NamespaceUrl {
    fn from(s: &str) -> Self {
        Self(Namespace::from(s))
    }
}

impl<'i> selectors::parser::Parser<'i> for PageSelectors {
    type Impl = PageSelectors;
    type Error = SelectorParseErrorKind<'i>;
}

/// No pseudo-elements are supported.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PseudoElement {}

impl cssparser::ToCss for PseudoElement {
    fn to_css<W: fmt::Write>(&self, _dest: &mut W) -> fmt::Result {
        match *self {}
    }
}

impl selectors::parser::PseudoElement for PseudoElement {
    type Impl = PageSelectors;

    fn accepts_state_pseudo_classes(&self) -> bool {
        match *self {}
    }

    fn valid_after_slotted(&self) -> bool {
        match *self {}
    }
}

/// No dynamic pseudo-classes are supported; structural ones (`:first-child`,
/// `:nth-of-type(..)`) are handled by the selectors crate itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PseudoClass {}

impl selectors::parser::NonTSPseudoClass for PseudoClass {
    type Impl = PageSelectors;

    fn is_active_or_hover(&self) -> bool {
        match *self {}
    }

    fn is_user_action_state(&self) -> bool {
        match *self {}
    }
}

impl cssparser::ToCss for PseudoClass {
    fn to_css<W: fmt::Write>(&self, _dest: &mut W) -> fmt::Result {
        match *self {}
    }
}

impl SelectorImpl for PageSelectors {
    type ExtraMatchingData<'a> = ();
    type AttrValue = IdentStr;
    type Identifier = IdentStr;
    type LocalName = TagName;
    type NamespaceUrl = NamespaceUrl;
    type NamespacePrefix = IdentStr;
    type BorrowedLocalName = TagName;
    type BorrowedNamespaceUrl = NamespaceUrl;
    type NonTSPseudoClass = PseudoClass;
    type PseudoElement = PseudoElement;
}

/// Reference to an element in the ArenaDom for selector matching.
#[derive(Clone, Copy)]
pub struct ElementRef<'a> {
    pub dom: &'a ArenaDom,
    pub id: ArenaNodeId,
}

impl<'a> ElementRef<'a> {
    pub fn new(dom: &'a ArenaDom, id: ArenaNodeId) -> Self {
        Self { dom, id }
    }

    fn sibling_element(&self, next: bool) -> Option<Self> {
        let step = |id: ArenaNodeId| {
            self.dom.get(id).map(|n| {
                if next {
                    n.next_sibling
                } else {
                    n.prev_sibling
                }
            })
        };
        let mut current = step(self.id)?;
        while current.is_some() {
            if self.dom.is_element(current) {
                return Some(Self::new(self.dom, current));
            }
            current = step(current)?;
        }
        None
    }

    fn is_anchor_with_href(&self) -> bool {
        self.dom
            .element_name(self.id)
            .is_some_and(|n| n.as_ref() == "a")
            && self.dom.has_attr(self.id, "href")
    }
}

impl fmt::Debug for ElementRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementRef")
            .field("id", &self.id)
            .field("name", &self.dom.element_name(self.id))
            .finish()
    }
}

impl selectors::Element for ElementRef<'_> {
    type Impl = PageSelectors;

    fn opaque(&self) -> OpaqueElement {
        OpaqueElement::new(self)
    }

    fn parent_element(&self) -> Option<Self> {
        self.dom
            .parent(self.id)
            .filter(|&p| self.dom.is_element(p))
            .map(|p| Self::new(self.dom, p))
    }

    fn parent_node_is_shadow_root(&self) -> bool {
        false
    }

    fn containing_shadow_host(&self) -> Option<Self> {
        None
    }

    fn is_pseudo_element(&self) -> bool {
        false
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        self.sibling_element(false)
    }

    fn next_sibling_element(&self) -> Option<Self> {
        self.sibling_element(true)
    }

    fn first_element_child(&self) -> Option<Self> {
        self.dom
            .children(self.id)
            .find(|&c| self.dom.is_element(c))
            .map(|c| Self::new(self.dom, c))
    }

    fn is_html_element_in_html_document(&self) -> bool {
        true
    }

    fn has_local_name(&self, name: &TagName) -> bool {
        self.dom
            .element_name(self.id)
            .is_some_and(|n| n == &name.0)
    }

    fn has_namespace(&self, ns: &NamespaceUrl) -> bool {
        self.dom
            .element_namespace(self.id)
            .is_some_and(|n| n == &ns.0)
    }

    fn is_same_type(&self, other: &Self) -> bool {
        self.dom.element_name(self.id) == other.dom.element_name(other.id)
    }

    fn attr_matches(
        &self,
        ns: &NamespaceConstraint<&NamespaceUrl>,
        local_name: &TagName,
        operation: &AttrSelectorOperation<&IdentStr>,
    ) -> bool {
        self.dom
            .attrs(self.id)
            .iter()
            .filter(|attr| match ns {
                NamespaceConstraint::Any => true,
                NamespaceConstraint::Specific(ns) => attr.name.ns == ns.0,
            })
            .find(|attr| attr.name.local == local_name.0)
            .is_some_and(|attr| operation.eval_str(&attr.value))
    }

    fn match_non_ts_pseudo_class(
        &self,
        pc: &PseudoClass,
        _context: &mut MatchingContext<'_, Self::Impl>,
    ) -> bool {
        match *pc {}
    }

    fn match_pseudo_element(
        &self,
        pe: &PseudoElement,
        _context: &mut MatchingContext<'_, Self::Impl>,
    ) -> bool {
        match *pe {}
    }

    fn is_link(&self) -> bool {
        self.is_anchor_with_href()
    }

    fn is_html_slot_element(&self) -> bool {
        false
    }

    fn has_id(&self, id: &IdentStr, case_sensitivity: CaseSensitivity) -> bool {
        self.dom
            .element_id(self.id)
            .is_some_and(|own| case_sensitivity.eq(own.as_bytes(), id.0.as_bytes()))
    }

    fn has_class(&self, name: &IdentStr, case_sensitivity: CaseSensitivity) -> bool {
        self.dom
            .element_classes(self.id)
            .any(|c| case_sensitivity.eq(c.as_bytes(), name.0.as_bytes()))
    }

    fn imported_part(&self, _name: &IdentStr) -> Option<IdentStr> {
        None
    }

    fn is_part(&self, _name: &IdentStr) -> bool {
        false
    }

    fn is_empty(&self) -> bool {
        self.dom.children(self.id).all(|child| {
            match self.dom.get(child).map(|n| &n.data) {
                Some(ArenaNodeData::Element { .. }) => false,
                Some(ArenaNodeData::Text(t)) => t.trim().is_empty(),
                _ => true,
            }
        })
    }

    fn is_root(&self) -> bool {
        self.dom
            .parent(self.id)
            .is_some_and(|p| p == self.dom.document())
    }

    fn apply_selector_flags(&self, _flags: ElementSelectorFlags) {}

    fn add_element_unique_hashes(&self, _filter: &mut selectors::bloom::BloomFilter) -> bool {
        false
    }

    fn has_custom_state(&self, _name: &IdentStr) -> bool {
        false
    }
}

/// A parsed, comma-separated CSS selector list.
#[derive(Debug, Clone)]
pub struct Selector {
    source: String,
    list: Vec<selectors::parser::Selector<PageSelectors>>,
}

impl Selector {
    /// Parse a selector list such as `"h1.title, header h1"`.
    pub fn parse(source: &str) -> Result<Self> {
        let mut input = cssparser::ParserInput::new(source);
        let mut parser = cssparser::Parser::new(&mut input);
        let list = selectors::parser::SelectorList::parse(
            &PageSelectors,
            &mut parser,
            selectors::parser::ParseRelative::No,
        )
        .map_err(|_| Error::InvalidSelector(source.to_string()))?;

        Ok(Self {
            source: source.to_string(),
            list: list.slice().to_vec(),
        })
    }

    /// The selector text this was parsed from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Check whether an element matches any selector in the list.
    pub fn matches(&self, dom: &ArenaDom, id: ArenaNodeId) -> bool {
        let mut caches = SelectorCaches::default();
        self.matches_with(dom, id, &mut caches)
    }

    fn matches_with(&self, dom: &ArenaDom, id: ArenaNodeId, caches: &mut SelectorCaches) -> bool {
        if !dom.is_element(id) {
            return false;
        }
        let elem = ElementRef::new(dom, id);
        let mut context = MatchingContext::new(
            selectors::matching::MatchingMode::Normal,
            None,
            caches,
            selectors::context::QuirksMode::NoQuirks,
            selectors::matching::NeedsSelectorFlags::No,
            selectors::matching::MatchingForInvalidation::No,
        );
        self.list.iter().any(|selector| {
            selectors::matching::matches_selector(selector, 0, None, &elem, &mut context)
        })
    }

    /// All matching elements under `root`, in document order.
    pub fn select_all(&self, dom: &ArenaDom, root: ArenaNodeId) -> Vec<ArenaNodeId> {
        let mut caches = SelectorCaches::default();
        dom.descendants(root)
            .into_iter()
            .filter(|&id| self.matches_with(dom, id, &mut caches))
            .collect()
    }
}
