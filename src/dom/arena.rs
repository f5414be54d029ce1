//! Arena-based DOM for HTML parsing and tree surgery.
//!
//! All nodes live in one vector and link to each other by index, so moving a
//! subtree is a matter of rewriting a handful of ids. Detached nodes stay in
//! the arena but are unreachable from the document.

use html5ever::{LocalName, Namespace, QualName, ns};

/// Unique identifier for a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArenaNodeId(pub u32);

impl ArenaNodeId {
    /// Sentinel value for no node.
    pub const NONE: ArenaNodeId = ArenaNodeId(u32::MAX);

    /// Check if this is a valid node ID.
    pub fn is_some(&self) -> bool {
        self.0 != u32::MAX
    }

    /// Check if this is the sentinel value.
    pub fn is_none(&self) -> bool {
        self.0 == u32::MAX
    }
}

/// Node type in the arena DOM.
#[derive(Debug, Clone)]
pub enum ArenaNodeData {
    /// Document root.
    Document,
    /// Element with name and attributes.
    Element {
        name: QualName,
        attrs: Vec<Attribute>,
    },
    /// Text content.
    Text(String),
    /// Comment or processing instruction.
    Comment(String),
    /// Document type declaration.
    Doctype {
        name: String,
        public_id: String,
        system_id: String,
    },
}

/// HTML attribute.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: QualName,
    pub value: String,
}

/// A node in the arena DOM.
#[derive(Debug)]
pub struct ArenaNode {
    pub data: ArenaNodeData,
    pub parent: ArenaNodeId,
    pub first_child: ArenaNodeId,
    pub last_child: ArenaNodeId,
    pub prev_sibling: ArenaNodeId,
    pub next_sibling: ArenaNodeId,
}

impl ArenaNode {
    fn new(data: ArenaNodeData) -> Self {
        Self {
            data,
            parent: ArenaNodeId::NONE,
            first_child: ArenaNodeId::NONE,
            last_child: ArenaNodeId::NONE,
            prev_sibling: ArenaNodeId::NONE,
            next_sibling: ArenaNodeId::NONE,
        }
    }
}

/// Arena-based DOM tree.
pub struct ArenaDom {
    nodes: Vec<ArenaNode>,
    document: ArenaNodeId,
}

impl ArenaDom {
    /// Create a new empty DOM with a document root.
    pub fn new() -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            document: ArenaNodeId::NONE,
        };
        dom.document = dom.alloc(ArenaNode::new(ArenaNodeData::Document));
        dom
    }

    fn alloc(&mut self, node: ArenaNode) -> ArenaNodeId {
        let id = ArenaNodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Get the document root ID.
    pub fn document(&self) -> ArenaNodeId {
        self.document
    }

    /// Get a node by ID.
    pub fn get(&self, id: ArenaNodeId) -> Option<&ArenaNode> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.0 as usize)
    }

    /// Get a mutable node by ID.
    pub fn get_mut(&mut self, id: ArenaNodeId) -> Option<&mut ArenaNode> {
        if id.is_none() {
            return None;
        }
        self.nodes.get_mut(id.0 as usize)
    }

    /// Create a new element node.
    pub fn create_element(&mut self, name: QualName, attrs: Vec<Attribute>) -> ArenaNodeId {
        self.alloc(ArenaNode::new(ArenaNodeData::Element { name, attrs }))
    }

    /// Create a new HTML element by local name, without attributes.
    pub fn create_html_element(&mut self, local: &str) -> ArenaNodeId {
        self.create_element(QualName::new(None, ns!(html), LocalName::from(local)), vec![])
    }

    /// Create a new text node.
    pub fn create_text(&mut self, text: String) -> ArenaNodeId {
        self.alloc(ArenaNode::new(ArenaNodeData::Text(text)))
    }

    /// Create a new comment node.
    pub fn create_comment(&mut self, text: String) -> ArenaNodeId {
        self.alloc(ArenaNode::new(ArenaNodeData::Comment(text)))
    }

    /// Create a doctype node.
    pub fn create_doctype(
        &mut self,
        name: String,
        public_id: String,
        system_id: String,
    ) -> ArenaNodeId {
        self.alloc(ArenaNode::new(ArenaNodeData::Doctype {
            name,
            public_id,
            system_id,
        }))
    }

    /// Append a child to a parent node.
    ///
    /// The child must already be detached.
    pub fn append(&mut self, parent: ArenaNodeId, child: ArenaNodeId) {
        let last_child = self
            .get(parent)
            .map(|n| n.last_child)
            .unwrap_or(ArenaNodeId::NONE);

        if let Some(child_node) = self.get_mut(child) {
            child_node.parent = parent;
            child_node.prev_sibling = last_child;
            child_node.next_sibling = ArenaNodeId::NONE;
        }

        if let Some(last_node) = self.get_mut(last_child) {
            last_node.next_sibling = child;
        }

        if let Some(parent_node) = self.get_mut(parent) {
            if parent_node.first_child.is_none() {
                parent_node.first_child = child;
            }
            parent_node.last_child = child;
        }
    }

    /// Insert a detached node before a sibling.
    pub fn insert_before(&mut self, sibling: ArenaNodeId, new_node: ArenaNodeId) {
        let (parent, prev) = match self.get(sibling) {
            Some(n) => (n.parent, n.prev_sibling),
            None => return,
        };

        if let Some(new) = self.get_mut(new_node) {
            new.parent = parent;
            new.prev_sibling = prev;
            new.next_sibling = sibling;
        }

        if let Some(sib) = self.get_mut(sibling) {
            sib.prev_sibling = new_node;
        }

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = new_node;
            }
        } else if let Some(par) = self.get_mut(parent) {
            par.first_child = new_node;
        }
    }

    /// Unlink a node from its parent and siblings.
    ///
    /// The node keeps its own children, so detaching drops the whole subtree
    /// from the document.
    pub fn detach(&mut self, id: ArenaNodeId) {
        let (parent, prev, next) = match self.get(id) {
            Some(n) => (n.parent, n.prev_sibling, n.next_sibling),
            None => return,
        };

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = next;
            }
        } else if let Some(p) = self.get_mut(parent) {
            p.first_child = next;
        }

        if next.is_some() {
            if let Some(n) = self.get_mut(next) {
                n.prev_sibling = prev;
            }
        } else if let Some(p) = self.get_mut(parent) {
            p.last_child = prev;
        }

        if let Some(node) = self.get_mut(id) {
            node.parent = ArenaNodeId::NONE;
            node.prev_sibling = ArenaNodeId::NONE;
            node.next_sibling = ArenaNodeId::NONE;
        }
    }

    /// Append text to an existing text node, or create new if last child isn't text.
    pub fn append_text(&mut self, parent: ArenaNodeId, text: &str) {
        let last_child = self
            .get(parent)
            .map(|n| n.last_child)
            .unwrap_or(ArenaNodeId::NONE);

        if let Some(last) = self.get_mut(last_child)
            && let ArenaNodeData::Text(ref mut existing) = last.data
        {
            existing.push_str(text);
            return;
        }

        let text_node = self.create_text(text.to_string());
        self.append(parent, text_node);
    }

    /// Iterate over children of a node.
    pub fn children(&self, parent: ArenaNodeId) -> ChildrenIter<'_> {
        let first = self
            .get(parent)
            .map(|n| n.first_child)
            .unwrap_or(ArenaNodeId::NONE);
        ChildrenIter {
            dom: self,
            current: first,
        }
    }

    /// Element children of a node, collected so the tree can be mutated afterwards.
    pub fn element_children(&self, parent: ArenaNodeId) -> Vec<ArenaNodeId> {
        self.children(parent)
            .filter(|&c| self.is_element(c))
            .collect()
    }

    /// Parent of a node, if attached.
    pub fn parent(&self, id: ArenaNodeId) -> Option<ArenaNodeId> {
        self.get(id).map(|n| n.parent).filter(|p| p.is_some())
    }

    /// All descendants of `root` in document order (root excluded).
    pub fn descendants(&self, root: ArenaNodeId) -> Vec<ArenaNodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<ArenaNodeId> = self.children(root).collect();
        stack.reverse();
        while let Some(id) = stack.pop() {
            out.push(id);
            let mut children: Vec<_> = self.children(id).collect();
            children.reverse();
            stack.extend(children);
        }
        out
    }

    /// Find the first node under `root` matching a predicate (DFS, root included).
    pub fn find_from<F>(&self, root: ArenaNodeId, predicate: F) -> Option<ArenaNodeId>
    where
        F: Fn(&ArenaNode) -> bool,
    {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.get(id) {
                if predicate(node) {
                    return Some(id);
                }
                // Push children in reverse order for left-to-right traversal
                let mut children: Vec<_> = self.children(id).collect();
                children.reverse();
                stack.extend(children);
            }
        }
        None
    }

    /// Find element by tag name (first match).
    pub fn find_by_tag(&self, tag: &str) -> Option<ArenaNodeId> {
        self.find_by_tag_from(self.document, tag)
    }

    /// Find element by tag name under `root` (first match, root included).
    pub fn find_by_tag_from(&self, root: ArenaNodeId, tag: &str) -> Option<ArenaNodeId> {
        self.find_from(root, |node| {
            matches!(&node.data, ArenaNodeData::Element { name, .. } if name.local.as_ref() == tag)
        })
    }

    /// All elements under `root` with the given tag, in document order.
    pub fn find_all_by_tag(&self, root: ArenaNodeId, tag: &str) -> Vec<ArenaNodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|&id| self.element_name(id).is_some_and(|n| n.as_ref() == tag))
            .collect()
    }

    /// The `<html>` element (first element child of the document).
    pub fn document_element(&self) -> Option<ArenaNodeId> {
        self.children(self.document).find(|&c| self.is_element(c))
    }

    /// Deep-copy a subtree of another DOM into this arena, returning the
    /// detached copy.
    pub fn import(&mut self, src: &ArenaDom, root: ArenaNodeId) -> ArenaNodeId {
        let Some(node) = src.get(root) else {
            return ArenaNodeId::NONE;
        };
        let copy = self.alloc(ArenaNode::new(node.data.clone()));
        for child in src.children(root) {
            let child_copy = self.import(src, child);
            self.append(copy, child_copy);
        }
        copy
    }
}

impl Default for ArenaDom {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over children of a node.
pub struct ChildrenIter<'a> {
    dom: &'a ArenaDom,
    current: ArenaNodeId,
}

impl Iterator for ChildrenIter<'_> {
    type Item = ArenaNodeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_none() {
            return None;
        }
        let id = self.current;
        self.current = self
            .dom
            .get(id)
            .map(|n| n.next_sibling)
            .unwrap_or(ArenaNodeId::NONE);
        Some(id)
    }
}

/// Convenience methods for element nodes.
impl ArenaDom {
    /// Get element's local name (tag).
    pub fn element_name(&self, id: ArenaNodeId) -> Option<&LocalName> {
        self.get(id).and_then(|n| match &n.data {
            ArenaNodeData::Element { name, .. } => Some(&name.local),
            _ => None,
        })
    }

    /// Get element's namespace.
    pub fn element_namespace(&self, id: ArenaNodeId) -> Option<&Namespace> {
        self.get(id).and_then(|n| match &n.data {
            ArenaNodeData::Element { name, .. } => Some(&name.ns),
            _ => None,
        })
    }

    /// Get element attributes.
    pub fn attrs(&self, id: ArenaNodeId) -> &[Attribute] {
        self.get(id)
            .and_then(|n| match &n.data {
                ArenaNodeData::Element { attrs, .. } => Some(attrs.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    /// Get an attribute value.
    pub fn get_attr(&self, id: ArenaNodeId, attr_name: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|a| a.name.local.as_ref() == attr_name)
            .map(|a| a.value.as_str())
    }

    /// Check whether an attribute is present, whatever its value.
    pub fn has_attr(&self, id: ArenaNodeId, attr_name: &str) -> bool {
        self.get_attr(id, attr_name).is_some()
    }

    /// Set an attribute, replacing an existing value.
    pub fn set_attr(&mut self, id: ArenaNodeId, attr_name: &str, value: &str) {
        if let Some(node) = self.get_mut(id)
            && let ArenaNodeData::Element { attrs, .. } = &mut node.data
        {
            if let Some(attr) = attrs.iter_mut().find(|a| a.name.local.as_ref() == attr_name) {
                attr.value = value.to_string();
            } else {
                attrs.push(Attribute {
                    name: QualName::new(None, ns!(), LocalName::from(attr_name)),
                    value: value.to_string(),
                });
            }
        }
    }

    /// Keep only the attributes for which `keep` returns true.
    pub fn retain_attrs<F>(&mut self, id: ArenaNodeId, mut keep: F)
    where
        F: FnMut(&Attribute) -> bool,
    {
        if let Some(node) = self.get_mut(id)
            && let ArenaNodeData::Element { attrs, .. } = &mut node.data
        {
            attrs.retain(|a| keep(a));
        }
    }

    /// Get element's id attribute.
    pub fn element_id(&self, id: ArenaNodeId) -> Option<&str> {
        self.get_attr(id, "id")
    }

    /// Get element's classes.
    pub fn element_classes(&self, id: ArenaNodeId) -> impl Iterator<Item = &str> {
        self.get_attr(id, "class")
            .unwrap_or("")
            .split_whitespace()
    }

    /// Check if node is an element.
    pub fn is_element(&self, id: ArenaNodeId) -> bool {
        self.get(id)
            .is_some_and(|n| matches!(n.data, ArenaNodeData::Element { .. }))
    }

    /// Check if node is a text node.
    pub fn is_text(&self, id: ArenaNodeId) -> bool {
        self.get(id)
            .is_some_and(|n| matches!(n.data, ArenaNodeData::Text(_)))
    }

    /// Get text content of a text node.
    pub fn text_content(&self, id: ArenaNodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            ArenaNodeData::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Replace the contents of a text node.
    pub fn set_text(&mut self, id: ArenaNodeId, text: String) {
        if let Some(node) = self.get_mut(id)
            && let ArenaNodeData::Text(existing) = &mut node.data
        {
            *existing = text;
        }
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_of(&self, id: ArenaNodeId) -> String {
        let mut out = String::new();
        if let Some(text) = self.text_content(id) {
            out.push_str(text);
        }
        for node in self.descendants(id) {
            if let Some(text) = self.text_content(node) {
                out.push_str(text);
            }
        }
        out
    }
}
