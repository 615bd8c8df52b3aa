use std::collections::{BTreeMap, BTreeSet};

use slotmap::{SlotMap, new_key_type};

use crate::error::{EditorError, Result};

new_key_type! {
    /// Stable handle of a node in a [`Document`] arena.
    pub struct NodeId;
}

pub type Attrs = BTreeMap<String, String>;

pub const ROOT_TAG: &str = "#root";
pub const FRAGMENT_TAG: &str = "#fragment";
pub const FILLER_TAG: &str = "br";
pub const CONTENTEDITABLE: &str = "contenteditable";

const VOID_TAGS: &[&str] = &["br", "hr", "img", "input", "wbr"];
const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "br", "code", "em", "font", "i", "img", "kbd", "label", "mark", "s",
    "small", "span", "strike", "strong", "sub", "sup", "u", "wbr",
];
const TEXT_BLOCK_TAGS: &[&str] = &["p", "h1", "h2", "h3", "h4", "h5", "h6", "pre", "div"];
pub const LIST_TAGS: &[&str] = &["ul", "ol"];
pub const LIST_ITEM_TAG: &str = "li";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Element { tag: String, attrs: Attrs },
    Text(String),
}

#[derive(Debug, Clone)]
struct Slot {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed editable tree.
///
/// Nodes own no pointers to each other: the parent is an index into the arena
/// and siblings are derived from the parent's child list.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: SlotMap<NodeId, Slot>,
    root: NodeId,
    extra_void: BTreeSet<String>,
    extra_inline: BTreeSet<String>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Slot {
            data: NodeData::Element {
                tag: ROOT_TAG.to_string(),
                attrs: Attrs::new(),
            },
            parent: None,
            children: Vec::new(),
        });
        Self {
            nodes,
            root,
            extra_void: BTreeSet::new(),
            extra_inline: BTreeSet::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn declare_void(&mut self, tag: impl Into<String>) {
        self.extra_void.insert(tag.into());
    }

    pub fn declare_inline(&mut self, tag: impl Into<String>) {
        self.extra_inline.insert(tag.into());
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of live nodes, detached ones included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id).map(|slot| &slot.data)
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.data(id)? {
            NodeData::Element { tag, .. } => Some(tag.as_str()),
            NodeData::Text(_) => None,
        }
    }

    pub fn has_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag(id) == Some(tag)
    }

    /// Renames an element in place, keeping attributes and children.
    pub fn set_tag(&mut self, id: NodeId, new_tag: impl Into<String>) {
        if let Some(Slot {
            data: NodeData::Element { tag, .. },
            ..
        }) = self.nodes.get_mut(id)
        {
            *tag = new_tag.into();
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.data(id)? {
            NodeData::Text(text) => Some(text.as_str()),
            NodeData::Element { .. } => None,
        }
    }

    pub fn text_mut(&mut self, id: NodeId) -> Option<&mut String> {
        match &mut self.nodes.get_mut(id)?.data {
            NodeData::Text(text) => Some(text),
            NodeData::Element { .. } => None,
        }
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.data(id), Some(NodeData::Text(_)))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.data(id), Some(NodeData::Element { .. }))
    }

    pub fn attrs(&self, id: NodeId) -> Option<&Attrs> {
        match self.data(id)? {
            NodeData::Element { attrs, .. } => Some(attrs),
            NodeData::Text(_) => None,
        }
    }

    pub fn attr(&self, id: NodeId, key: &str) -> Option<&str> {
        self.attrs(id)?.get(key).map(String::as_str)
    }

    pub fn set_attr(&mut self, id: NodeId, key: impl Into<String>, value: impl Into<String>) {
        if let Some(Slot {
            data: NodeData::Element { attrs, .. },
            ..
        }) = self.nodes.get_mut(id)
        {
            attrs.insert(key.into(), value.into());
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, key: &str) -> Option<String> {
        match self.nodes.get_mut(id) {
            Some(Slot {
                data: NodeData::Element { attrs, .. },
                ..
            }) => attrs.remove(key),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|slot| slot.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.children(id).get(index).copied()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let ix = self.index_in_parent(id)?;
        ix.checked_sub(1).and_then(|ix| self.child(parent, ix))
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let ix = self.index_in_parent(id)?;
        self.child(parent, ix + 1)
    }

    pub fn create_element(&mut self, tag: impl Into<String>, attrs: Attrs) -> NodeId {
        self.nodes.insert(Slot {
            data: NodeData::Element {
                tag: tag.into(),
                attrs,
            },
            parent: None,
            children: Vec::new(),
        })
    }

    pub fn element(&mut self, tag: impl Into<String>) -> NodeId {
        self.create_element(tag, Attrs::new())
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.nodes.insert(Slot {
            data: NodeData::Text(text.into()),
            parent: None,
            children: Vec::new(),
        })
    }

    /// A detached container owning nodes pending reinsertion.
    pub fn create_fragment(&mut self) -> NodeId {
        self.element(FRAGMENT_TAG)
    }

    /// Shallow copy: same data, no children, detached.
    pub fn shallow_clone(&mut self, id: NodeId) -> Result<NodeId> {
        let data = self.data(id).ok_or(EditorError::NodeNotFound(id))?.clone();
        Ok(self.nodes.insert(Slot {
            data,
            parent: None,
            children: Vec::new(),
        }))
    }

    pub fn deep_clone(&mut self, id: NodeId) -> Result<NodeId> {
        let copy = self.shallow_clone(id)?;
        for child in self.children(id).to_vec() {
            let child_copy = self.deep_clone(child)?;
            self.append(copy, child_copy)?;
        }
        Ok(copy)
    }

    /// Unlinks `id` from its parent. The subtree stays alive in the arena.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(slot) = self.nodes.get_mut(parent) {
            slot.children.retain(|c| *c != id);
        }
        if let Some(slot) = self.nodes.get_mut(id) {
            slot.parent = None;
        }
    }

    /// Detaches `id` and frees its whole subtree.
    pub fn remove(&mut self, id: NodeId) {
        self.detach(id);
        self.free_subtree(id);
    }

    fn free_subtree(&mut self, id: NodeId) {
        let Some(slot) = self.nodes.remove(id) else {
            return;
        };
        for child in slot.children {
            self.free_subtree(child);
        }
    }

    pub fn insert_at(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<()> {
        if !self.is_element(parent) {
            return Err(EditorError::NodeNotFound(parent));
        }
        if !self.contains(child) {
            return Err(EditorError::NodeNotFound(child));
        }
        if child == parent || self.is_inclusive_ancestor(child, parent) {
            return Err(EditorError::BoundaryNotFound("cannot insert a node into itself"));
        }
        self.detach(child);
        let slot = self
            .nodes
            .get_mut(parent)
            .ok_or(EditorError::NodeNotFound(parent))?;
        let index = index.min(slot.children.len());
        slot.children.insert(index, child);
        if let Some(slot) = self.nodes.get_mut(child) {
            slot.parent = Some(parent);
        }
        Ok(())
    }

    pub fn append(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let len = self.children(parent).len();
        self.insert_at(parent, len, child)
    }

    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) -> Result<()> {
        let parent = self
            .parent(reference)
            .ok_or(EditorError::BoundaryNotFound("reference has no parent"))?;
        self.detach(node);
        let ix = self
            .index_in_parent(reference)
            .ok_or(EditorError::NodeNotFound(reference))?;
        self.insert_at(parent, ix, node)
    }

    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) -> Result<()> {
        let parent = self
            .parent(reference)
            .ok_or(EditorError::BoundaryNotFound("reference has no parent"))?;
        self.detach(node);
        let ix = self
            .index_in_parent(reference)
            .ok_or(EditorError::NodeNotFound(reference))?;
        self.insert_at(parent, ix + 1, node)
    }

    /// Moves every child of `from` to the end of `to`.
    pub fn move_children(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        for child in self.children(from).to_vec() {
            self.append(to, child)?;
        }
        Ok(())
    }

    /// Replaces `id` with its own children, then frees it.
    pub fn replace_with_children(&mut self, id: NodeId) -> Result<()> {
        let parent = self
            .parent(id)
            .ok_or(EditorError::BoundaryNotFound("unwrap target has no parent"))?;
        let mut ix = self.index_in_parent(id).ok_or(EditorError::NodeNotFound(id))?;
        for child in self.children(id).to_vec() {
            self.insert_at(parent, ix, child)?;
            ix += 1;
        }
        self.remove(id);
        Ok(())
    }

    /// Removes every child of `id`, freeing them.
    pub fn clear_children(&mut self, id: NodeId) {
        for child in self.children(id).to_vec() {
            self.remove(child);
        }
    }

    /// Splits a text leaf at a byte offset. The right half becomes a new
    /// sibling directly after `id` and is returned.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Result<NodeId> {
        let text = self.text_mut(id).ok_or(EditorError::NodeNotFound(id))?;
        let offset = clamp_to_char_boundary(text, offset);
        let right = text.split_off(offset);
        let right = self.create_text(right);
        if self.parent(id).is_some() {
            self.insert_after(id, right)?;
        }
        Ok(right)
    }

    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Ancestors of `id` from its parent upwards.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(node) = current {
            out.push(node);
            current = self.parent(node);
        }
        out
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        self.contains(id) && self.is_inclusive_ancestor(self.root, id)
    }

    pub fn closest(&self, id: NodeId, pred: impl Fn(&Self, NodeId) -> bool) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if pred(self, node) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    pub fn common_ancestor(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        let mut current = Some(a);
        while let Some(node) = current {
            if self.is_inclusive_ancestor(node, b) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    /// Nearest inclusive ancestor of `id` that is a direct child of `scope`.
    pub fn root_level_ancestor(&self, id: NodeId, scope: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            let parent = self.parent(current)?;
            if parent == scope {
                return Some(current);
            }
            current = parent;
        }
    }

    /// Child index path from the root.
    pub fn path_of(&self, id: NodeId) -> Option<Vec<usize>> {
        let mut path = Vec::new();
        let mut current = id;
        while current != self.root {
            path.push(self.index_in_parent(current)?);
            current = self.parent(current)?;
        }
        path.reverse();
        Some(path)
    }

    pub fn node_at_path(&self, path: &[usize]) -> Option<NodeId> {
        let mut current = self.root;
        for &ix in path {
            current = self.child(current, ix)?;
        }
        Some(current)
    }

    /// Pre-order descendants of `id`, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Next node in pre-order, not leaving `scope`.
    pub fn next_in_order(&self, id: NodeId, scope: NodeId) -> Option<NodeId> {
        if let Some(first) = self.first_child(id) {
            return Some(first);
        }
        let mut current = id;
        while current != scope {
            if let Some(next) = self.next_sibling(current) {
                return Some(next);
            }
            current = self.parent(current)?;
        }
        None
    }

    /// Previous node in pre-order, not leaving `scope`.
    pub fn prev_in_order(&self, id: NodeId, scope: NodeId) -> Option<NodeId> {
        if id == scope {
            return None;
        }
        match self.prev_sibling(id) {
            Some(mut prev) => {
                while let Some(last) = self.last_child(prev) {
                    prev = last;
                }
                Some(prev)
            }
            None => self.parent(id).filter(|p| *p != scope),
        }
    }

    pub fn text_leaves(&self, id: NodeId) -> Vec<NodeId> {
        if self.is_text(id) {
            return vec![id];
        }
        self.descendants(id)
            .into_iter()
            .filter(|n| self.is_text(*n))
            .collect()
    }

    pub fn text_content(&self, id: NodeId) -> String {
        self.text_leaves(id)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect()
    }

    /// True when the subtree holds no non-empty text leaf.
    pub fn is_empty(&self, id: NodeId) -> bool {
        self.text_leaves(id)
            .into_iter()
            .all(|n| self.text(n).is_none_or(str::is_empty))
    }

    /// True when nothing in the subtree would be visible: no text and no
    /// forced-visible element other than a filler.
    pub fn is_blank(&self, id: NodeId) -> bool {
        if self.is_forced_visible(id) && !self.has_tag(id, FILLER_TAG) {
            return false;
        }
        self.is_empty(id)
            && self
                .descendants(id)
                .into_iter()
                .all(|n| !self.is_forced_visible(n) || self.has_tag(n, FILLER_TAG))
    }

    pub fn is_void(&self, id: NodeId) -> bool {
        self.tag(id).is_some_and(|tag| self.is_void_tag(tag))
    }

    pub fn is_void_tag(&self, tag: &str) -> bool {
        VOID_TAGS.contains(&tag) || self.extra_void.contains(tag)
    }

    pub fn is_inline(&self, id: NodeId) -> bool {
        match self.data(id) {
            Some(NodeData::Text(_)) => true,
            Some(NodeData::Element { tag, attrs }) => {
                !is_non_editable_attrs(attrs)
                    && (INLINE_TAGS.contains(&tag.as_str()) || self.extra_inline.contains(tag))
            }
            None => false,
        }
    }

    pub fn is_block(&self, id: NodeId) -> bool {
        self.is_element(id) && !self.is_inline(id)
    }

    pub fn is_text_block(&self, id: NodeId) -> bool {
        self.tag(id).is_some_and(|tag| {
            TEXT_BLOCK_TAGS.contains(&tag) || tag == LIST_ITEM_TAG || tag == "blockquote"
        }) && !self.is_non_editable(id)
    }

    pub fn is_list(&self, id: NodeId) -> bool {
        self.tag(id).is_some_and(|tag| LIST_TAGS.contains(&tag))
    }

    pub fn is_list_item(&self, id: NodeId) -> bool {
        self.has_tag(id, LIST_ITEM_TAG)
    }

    pub fn is_non_editable(&self, id: NodeId) -> bool {
        self.attrs(id).is_some_and(is_non_editable_attrs)
    }

    /// Root, or an element explicitly marked editable.
    pub fn is_editable_scope(&self, id: NodeId) -> bool {
        id == self.root || self.attr(id, CONTENTEDITABLE) == Some("true")
    }

    /// Nearest non-editable inclusive ancestor below the nearest editable scope.
    pub fn non_editable_ancestor(&self, id: NodeId) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.is_editable_scope(node) {
                return None;
            }
            if self.is_non_editable(node) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    pub fn is_forced_visible(&self, id: NodeId) -> bool {
        self.is_void(id) || self.is_non_editable(id)
    }

    /// Nearest inclusive ancestor that is a block (or the root).
    pub fn block_of(&self, id: NodeId) -> NodeId {
        self.closest(id, |doc, n| doc.is_block(n)).unwrap_or(self.root)
    }

    /// First text leaf containing `needle`, with the byte offset of the match.
    pub fn find_text(&self, needle: &str) -> Option<(NodeId, usize)> {
        self.text_leaves(self.root)
            .into_iter()
            .find_map(|n| self.text(n)?.find(needle).map(|ix| (n, ix)))
    }

    /// Replaces the root's children with `nodes`.
    pub fn replace_root_children(&mut self, nodes: Vec<NodeId>) -> Result<()> {
        let root = self.root;
        self.clear_children(root);
        for node in nodes {
            self.append(root, node)?;
        }
        Ok(())
    }

    pub fn same_type(&self, a: NodeId, b: NodeId) -> bool {
        match (self.data(a), self.data(b)) {
            (Some(NodeData::Text(_)), Some(NodeData::Text(_))) => true,
            (
                Some(NodeData::Element { tag: ta, attrs: aa }),
                Some(NodeData::Element { tag: tb, attrs: ab }),
            ) => ta == tb && aa == ab,
            _ => false,
        }
    }
}

fn is_non_editable_attrs(attrs: &Attrs) -> bool {
    attrs.get(CONTENTEDITABLE).map(String::as_str) == Some("false")
}

pub fn clamp_to_char_boundary(s: &str, mut ix: usize) -> usize {
    ix = ix.min(s.len());
    while ix > 0 && !s.is_char_boundary(ix) {
        ix -= 1;
    }
    ix
}

pub fn prev_char_boundary(s: &str, ix: usize) -> usize {
    let ix = clamp_to_char_boundary(s, ix);
    s[..ix].char_indices().last().map(|(i, _)| i).unwrap_or(0)
}

pub fn next_char_boundary(s: &str, ix: usize) -> usize {
    let ix = clamp_to_char_boundary(s, ix);
    s[ix..]
        .chars()
        .next()
        .map(|c| ix + c.len_utf8())
        .unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph(doc: &mut Document, text: &str) -> NodeId {
        let p = doc.element("p");
        let t = doc.create_text(text);
        doc.append(p, t).unwrap();
        let root = doc.root();
        doc.append(root, p).unwrap();
        p
    }

    #[test]
    fn root_level_ancestor_stops_below_scope() {
        let mut doc = Document::new();
        let p = paragraph(&mut doc, "hello");
        let leaf = doc.first_child(p).unwrap();
        assert_eq!(doc.root_level_ancestor(leaf, doc.root()), Some(p));
        assert_eq!(doc.root_level_ancestor(doc.root(), doc.root()), None);
    }

    #[test]
    fn split_text_inserts_right_half_after() {
        let mut doc = Document::new();
        let p = paragraph(&mut doc, "héllo");
        let leaf = doc.first_child(p).unwrap();
        let right = doc.split_text(leaf, 2).unwrap();
        // Offset 2 is inside 'é', clamps back to 1.
        assert_eq!(doc.text(leaf), Some("h"));
        assert_eq!(doc.text(right), Some("éllo"));
        assert_eq!(doc.children(p), &[leaf, right]);
    }

    #[test]
    fn emptiness_ignores_fillers_but_not_images() {
        let mut doc = Document::new();
        let p = paragraph(&mut doc, "");
        let br = doc.element("br");
        doc.append(p, br).unwrap();
        assert!(doc.is_empty(p));
        assert!(doc.is_blank(p));

        let img = doc.element("img");
        doc.append(p, img).unwrap();
        assert!(doc.is_empty(p));
        assert!(!doc.is_blank(p));
    }

    #[test]
    fn removed_ids_are_not_reused_silently() {
        let mut doc = Document::new();
        let p = paragraph(&mut doc, "x");
        doc.remove(p);
        let q = doc.element("p");
        assert!(!doc.contains(p));
        assert_ne!(p, q);
        assert_eq!(doc.tag(p), None);
    }

    #[test]
    fn paths_round_trip() {
        let mut doc = Document::new();
        paragraph(&mut doc, "a");
        let p = paragraph(&mut doc, "b");
        let leaf = doc.first_child(p).unwrap();
        let path = doc.path_of(leaf).unwrap();
        assert_eq!(path, vec![1, 0]);
        assert_eq!(doc.node_at_path(&path), Some(leaf));
    }
}
