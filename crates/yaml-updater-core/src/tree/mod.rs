/*
 * tree/mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Arena-backed YAML line tree shared by both parsers.
 */

//! The line model shared by the comment tree and the oracle tree.
//!
//! Both parsers produce a [`YamlTree`]: an arena of [`Node`]s addressed by
//! [`NodeId`]. Parent links are indices, so reparenting during a merge is an
//! index rewrite. Nodes differ only in their [`Payload`]:
//!
//! - [`Payload::Comments`]: raw value lines, preceding comment lines, the
//!   original key spelling, the engine-decoded value and a provenance flag
//! - [`Payload::Structure`]: the exact value decoded by the YAML engine
//!
//! Shape conventions (identical in both trees):
//!
//! - a property is a node with a `key`
//! - a list element is a node with `list_item` set; its `[index]` is its
//!   position among the parent's list items
//! - an object list element whose first property shares the dash line is a
//!   *virtual wrapper* (`list_item_with_property`) holding the properties as
//!   children, the first of them on the wrapper's line
//! - trailing comment lines with no following property form one key-less
//!   "comment-only" node at the end of the root
//! - everything from a second document marker on is one more comment-only
//!   node flagged as `trailing_document`, always the root's last child

mod path;

pub use path::YamlPath;

use std::collections::BTreeSet;

use yaml_rust2::Yaml;

use crate::comments::scan::value_text;

/// Index of a node inside its [`YamlTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Comment-tree payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentData {
    /// Raw value lines. The first entry is the text after `key:` (or after the
    /// dash for scalar list items); continuation lines are kept verbatim.
    pub value: Vec<String>,
    /// Comment and blank lines immediately preceding the node.
    pub top_comment: Vec<String>,
    /// Key exactly as written (quotes preserved).
    pub source_key: Option<String>,
    /// Engine-decoded value, filled by the cross-check.
    pub parsed_value: Option<Yaml>,
    /// Set on nodes introduced from the update document during a merge.
    pub added: bool,
    /// Comment-only node holding the verbatim text of later documents.
    pub trailing_document: bool,
}

/// Oracle-tree payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructureData {
    /// Decoded scalar (or flow collection) value; `None` for block containers.
    pub value: Option<Yaml>,
    /// The value came from an alias and follows its anchor.
    pub alias: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Comments(CommentData),
    Structure(StructureData),
}

/// A single tree node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Leading indentation columns.
    pub padding: usize,
    /// 1-based source line; 0 for the virtual root.
    pub line_num: usize,
    /// Unquoted property name.
    pub key: Option<String>,
    pub list_item: bool,
    pub list_item_with_property: bool,
    pub payload: Payload,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    pub(crate) fn new(padding: usize, line_num: usize, payload: Payload) -> Self {
        Self {
            padding,
            line_num,
            key: None,
            list_item: false,
            list_item_with_property: false,
            payload,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn has_comments(&self) -> bool {
        matches!(self.payload, Payload::Comments(_))
    }

    pub fn comments(&self) -> Option<&CommentData> {
        match &self.payload {
            Payload::Comments(data) => Some(data),
            Payload::Structure(_) => None,
        }
    }

    pub fn comments_mut(&mut self) -> Option<&mut CommentData> {
        match &mut self.payload {
            Payload::Comments(data) => Some(data),
            Payload::Structure(_) => None,
        }
    }

    /// The exact decoded value used for identity comparisons.
    pub fn identity(&self) -> Option<&Yaml> {
        match &self.payload {
            Payload::Comments(data) => data.parsed_value.as_ref(),
            Payload::Structure(data) => data.value.as_ref(),
        }
    }

    pub fn is_property(&self) -> bool {
        self.key.is_some()
    }

    pub fn is_comment_only(&self) -> bool {
        self.key.is_none() && !self.list_item && self.parent.is_some()
    }

    pub fn is_added(&self) -> bool {
        self.comments().is_some_and(|c| c.added)
    }

    pub fn is_trailing_document(&self) -> bool {
        self.comments().is_some_and(|c| c.trailing_document)
    }

    pub fn is_alias(&self) -> bool {
        matches!(&self.payload, Payload::Structure(data) if data.alias)
    }

    /// Whether the node carries an inline (non-empty, non-null) value.
    pub fn has_scalar_value(&self) -> bool {
        match &self.payload {
            Payload::Comments(data) => {
                data.value.len() > 1
                    || data.value.first().is_some_and(|v| !value_text(v).is_empty())
            }
            Payload::Structure(data) => data.value.as_ref().is_some_and(|v| !v.is_null()),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Arena holding one parsed document.
#[derive(Debug, Clone)]
pub struct YamlTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl YamlTree {
    /// Empty comment tree (virtual root only).
    pub fn new_comments() -> Self {
        Self::with_root(Payload::Comments(CommentData::default()))
    }

    /// Empty oracle tree (virtual root only).
    pub fn new_structure() -> Self {
        Self::with_root(Payload::Structure(StructureData::default()))
    }

    fn with_root(payload: Payload) -> Self {
        Self {
            nodes: vec![Node::new(0, 0, payload)],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn has_comments(&self) -> bool {
        self.node(self.root).has_comments()
    }

    pub fn is_empty(&self) -> bool {
        self.children(self.root).is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Append `node` as the last child of `parent`.
    pub(crate) fn add_child(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Replace the children of `id`, rewriting each child's parent link.
    pub(crate) fn set_children(&mut self, id: NodeId, children: Vec<NodeId>) {
        for child in &children {
            self.nodes[child.0].parent = Some(id);
        }
        self.nodes[id.0].children = children;
    }

    /// Unlink `id` from its parent. The node stays in the arena, unreachable.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }

    pub fn child_by_key(&self, id: NodeId, key: &str) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|c| self.node(*c).key.as_deref() == Some(key))
    }

    /// The level holds a sequence (first child is a list item).
    pub fn is_list(&self, id: NodeId) -> bool {
        self.children(id)
            .first()
            .is_some_and(|c| self.node(*c).list_item)
    }

    /// A sequence whose items are all scalars (never merged, compared whole).
    pub fn is_scalar_list(&self, id: NodeId) -> bool {
        self.is_list(id)
            && self
                .children(id)
                .iter()
                .all(|c| self.node(*c).list_item && self.children(*c).is_empty())
    }

    /// A node compared as a single value: no children, or a scalar list.
    pub fn is_leaf_value(&self, id: NodeId) -> bool {
        self.children(id).is_empty() || self.is_scalar_list(id)
    }

    /// Position of a list item among its parent's list items.
    pub fn list_index(&self, id: NodeId) -> usize {
        self.parent(id)
            .map(|p| {
                self.children(p)
                    .iter()
                    .filter(|c| self.node(**c).list_item)
                    .position(|c| *c == id)
                    .unwrap_or(0)
            })
            .unwrap_or(0)
    }

    /// Path of `id`, computed from the current sibling order.
    pub fn path(&self, id: NodeId) -> YamlPath {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(c) = current {
            if c == self.root {
                break;
            }
            chain.push(c);
            current = self.parent(c);
        }

        let mut path = YamlPath::root();
        for c in chain.into_iter().rev() {
            let node = self.node(c);
            if node.list_item {
                path = path.item(self.list_index(c));
            } else if let Some(key) = &node.key {
                path = path.child(key);
            }
        }
        path
    }

    /// Locate a node by `/`-path (with optional `[index]` suffixes).
    pub fn find(&self, path: &str) -> Option<NodeId> {
        let steps = YamlPath::new(path).steps()?;
        if steps.is_empty() {
            return None;
        }
        let mut current = self.root;
        for step in steps {
            if let Some(key) = &step.key {
                current = self.child_by_key(current, key)?;
            }
            for index in step.indices {
                current = self
                    .children(current)
                    .iter()
                    .copied()
                    .filter(|c| self.node(*c).list_item)
                    .nth(index)?;
            }
        }
        Some(current)
    }

    /// Like [`YamlTree::find`], retrying a `.`-separated path as `/`-separated.
    pub fn resolve(&self, path: &str) -> Option<NodeId> {
        self.find(path).or_else(|| {
            if path.contains('.') && !path.contains('/') {
                self.find(&path.replace('.', "/"))
            } else {
                None
            }
        })
    }

    /// Deep-copy a subtree of `other` into this arena, tagging every copy as added.
    ///
    /// The copy is not attached; callers link it with [`YamlTree::set_children`].
    pub(crate) fn graft(&mut self, other: &YamlTree, id: NodeId) -> NodeId {
        let source = other.node(id);
        let mut node = source.clone();
        node.children = Vec::new();
        node.parent = None;
        if let Some(data) = node.comments_mut() {
            data.added = true;
        }
        let new_id = NodeId(self.nodes.len());
        self.nodes.push(node);

        let children: Vec<NodeId> = other
            .children(id)
            .iter()
            .map(|c| self.graft(other, *c))
            .collect();
        self.set_children(new_id, children);
        new_id
    }

    /// Move a subtree `delta` columns, including multiline value lines and
    /// comment lines (blank lines untouched).
    pub fn shift(&mut self, id: NodeId, delta: isize) {
        if delta == 0 {
            return;
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = &mut self.nodes[current.0];
            node.padding = node.padding.saturating_add_signed(delta);
            if let Payload::Comments(data) = &mut node.payload {
                for line in data.value.iter_mut().skip(1) {
                    *line = shift_line(line, delta);
                }
                for line in data.top_comment.iter_mut() {
                    *line = shift_line(line, delta);
                }
            }
            stack.extend(node.children.iter().copied());
        }
    }

    /// Pre-order traversal of the subtree below `id` (excluding `id`).
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        result
    }

    /// The key-less node holding trailing comment lines, if any.
    pub fn trailing_comment(&self) -> Option<NodeId> {
        self.children(self.root)
            .iter()
            .rev()
            .copied()
            .take_while(|c| self.node(*c).is_comment_only())
            .find(|c| !self.node(*c).is_trailing_document())
    }

    /// The node holding the text of a second and later documents, if any.
    pub fn trailing_document(&self) -> Option<NodeId> {
        self.children(self.root)
            .last()
            .copied()
            .filter(|c| self.node(*c).is_trailing_document())
    }

    /// Unified paths of every leaf value in the document.
    pub fn leaf_paths(&self) -> BTreeSet<YamlPath> {
        self.descendants(self.root)
            .into_iter()
            .filter(|id| {
                let node = self.node(*id);
                !node.is_comment_only()
                    && self.is_leaf_value(*id)
                    && !self.parent(*id).is_some_and(|p| self.is_scalar_list(p))
            })
            .map(|id| self.path(id).unified())
            .collect()
    }

    /// Rebuild the engine value of a subtree from decoded identities.
    pub fn to_yaml(&self, id: NodeId) -> Yaml {
        let children = self.children(id);
        if children.is_empty() {
            return self.node(id).identity().cloned().unwrap_or(Yaml::Null);
        }
        if self.is_list(id) {
            return Yaml::Array(children.iter().map(|c| self.to_yaml(*c)).collect());
        }
        Yaml::Hash(
            children
                .iter()
                .filter_map(|c| {
                    let key = self.node(*c).key.clone()?;
                    Some((Yaml::String(key), self.to_yaml(*c)))
                })
                .collect(),
        )
    }

    /// Human-readable rendering of a subtree for diagnostics.
    pub fn dump(&self, id: NodeId) -> Vec<String> {
        let mut lines = Vec::new();
        self.dump_into(id, 0, &mut lines);
        lines
    }

    fn dump_into(&self, id: NodeId, depth: usize, lines: &mut Vec<String>) {
        let node = self.node(id);
        if id != self.root {
            let mut label = String::new();
            if node.list_item {
                label.push_str(if node.list_item_with_property { "-*" } else { "-" });
            }
            if let Some(key) = &node.key {
                if !label.is_empty() {
                    label.push(' ');
                }
                label.push_str(key);
                label.push(':');
            }
            if node.is_comment_only() {
                label.push_str("# (trailing comment)");
            }
            let value = match &node.payload {
                Payload::Comments(data) => data
                    .value
                    .first()
                    .map(|v| value_text(v).to_string())
                    .unwrap_or_default(),
                Payload::Structure(data) => {
                    data.value.as_ref().map(format_value).unwrap_or_default()
                }
            };
            if !value.is_empty() {
                label.push(' ');
                label.push_str(&value);
            }
            lines.push(format!(
                "{}{}  [L{} P{}]",
                "  ".repeat(depth),
                label,
                node.line_num,
                node.padding
            ));
        }
        let depth = if id == self.root { depth } else { depth + 1 };
        for child in self.children(id) {
            self.dump_into(*child, depth, lines);
        }
    }
}

/// Shift a single line; shrinking only removes leading whitespace.
pub(crate) fn shift_line(line: &str, delta: isize) -> String {
    if line.trim().is_empty() {
        return line.to_string();
    }
    if delta > 0 {
        format!("{}{}", " ".repeat(delta.unsigned_abs()), line)
    } else {
        let mut remaining = delta.unsigned_abs();
        let trimmed = line.trim_start_matches(|c: char| {
            if remaining > 0 && (c == ' ' || c == '\t') {
                remaining -= 1;
                true
            } else {
                false
            }
        });
        trimmed.to_string()
    }
}

/// Compact rendering of a decoded value for messages.
pub fn format_value(value: &Yaml) -> String {
    match value {
        Yaml::String(s) => format!("{:?}", s),
        Yaml::Integer(i) => i.to_string(),
        Yaml::Real(r) => r.clone(),
        Yaml::Boolean(b) => b.to_string(),
        Yaml::Null => "null".to_string(),
        Yaml::Array(items) => format!(
            "[{}]",
            items.iter().map(format_value).collect::<Vec<_>>().join(", ")
        ),
        Yaml::Hash(hash) => format!(
            "{{{}}}",
            hash.iter()
                .map(|(k, v)| format!("{}: {}", format_value(k), format_value(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Yaml::Alias(id) => format!("*{}", id),
        Yaml::BadValue => "<bad value>".to_string(),
    }
}
