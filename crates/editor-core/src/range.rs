use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::tree::{Document, FILLER_TAG, NodeId, clamp_to_char_boundary};

/// A boundary point. `offset` is a child index on elements and a byte offset
/// on text leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub node: NodeId,
    pub offset: usize,
}

impl Position {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }

    /// The point directly before `node` in its parent.
    pub fn before(doc: &Document, node: NodeId) -> Option<Self> {
        Some(Self::new(doc.parent(node)?, doc.index_in_parent(node)?))
    }

    /// The point directly after `node` in its parent.
    pub fn after(doc: &Document, node: NodeId) -> Option<Self> {
        Some(Self::new(doc.parent(node)?, doc.index_in_parent(node)? + 1))
    }

    fn key(&self, doc: &Document) -> Option<Vec<usize>> {
        let mut key = doc.path_of(self.node)?;
        key.push(self.offset);
        Some(key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn collapsed(at: Position) -> Self {
        Self { start: at, end: at }
    }

    /// Range whose start precedes its end in document order.
    pub fn ordered(doc: &Document, a: Position, b: Position) -> Self {
        if compare_positions(doc, a, b) == Ordering::Greater {
            Self::new(b, a)
        } else {
            Self::new(a, b)
        }
    }

    /// Range selecting exactly `node`.
    pub fn around(doc: &Document, node: NodeId) -> Option<Self> {
        Some(Self::new(
            Position::before(doc, node)?,
            Position::after(doc, node)?,
        ))
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    pub fn is_valid(&self, doc: &Document) -> bool {
        doc.is_attached(self.start.node) && doc.is_attached(self.end.node)
    }

    pub fn common_ancestor(&self, doc: &Document) -> Option<NodeId> {
        doc.common_ancestor(self.start.node, self.end.node)
    }

    /// The node wholly selected by this range, when it selects exactly one.
    pub fn selected_node(&self, doc: &Document) -> Option<NodeId> {
        if self.start.node != self.end.node || self.end.offset != self.start.offset + 1 {
            return None;
        }
        doc.child(self.start.node, self.start.offset)
    }
}

/// Orders two positions in document order.
///
/// Positions are compared by their index path; a text offset acts as one more
/// path segment below the leaf.
pub fn compare_positions(doc: &Document, a: Position, b: Position) -> Ordering {
    match (a.key(doc), b.key(doc)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => Ordering::Equal,
    }
}

/// The node at a boundary: the child at `offset`, or the container itself
/// when the offset falls past all children or the container is a text leaf.
pub fn boundary_node(doc: &Document, pos: Position) -> NodeId {
    if doc.is_text(pos.node) {
        return pos.node;
    }
    doc.child(pos.node, pos.offset).unwrap_or(pos.node)
}

pub fn range_start_node(doc: &Document, range: &Range) -> NodeId {
    boundary_node(doc, range.start)
}

pub fn range_end_node(doc: &Document, range: &Range) -> NodeId {
    boundary_node(doc, range.end)
}

/// Leaves that carry visible content: text leaves and forced-visible
/// elements other than fillers.
fn content_units(doc: &Document, node: NodeId) -> Vec<NodeId> {
    doc.descendants(node)
        .into_iter()
        .filter(|n| {
            doc.is_text(*n) || (doc.is_forced_visible(*n) && !doc.has_tag(*n, FILLER_TAG))
        })
        .collect()
}

fn unit_has_content(doc: &Document, unit: NodeId) -> bool {
    match doc.text(unit) {
        Some(text) => !text.is_empty(),
        None => true,
    }
}

/// True when nothing visible lies between the start of `node` and the range
/// start.
pub fn is_at_start_of(doc: &Document, range: &Range, node: NodeId) -> bool {
    let boundary = range.start;
    if !doc.is_inclusive_ancestor(node, boundary.node) {
        return false;
    }
    for unit in content_units(doc, node) {
        if unit == boundary.node {
            if boundary.offset > 0 {
                return false;
            }
            continue;
        }
        let Some(before) = Position::before(doc, unit) else {
            continue;
        };
        if compare_positions(doc, before, boundary) == Ordering::Less
            && !doc.is_inclusive_ancestor(unit, boundary.node)
            && unit_has_content(doc, unit)
        {
            return false;
        }
    }
    true
}

/// True when nothing visible lies between the range end and the end of
/// `node`.
pub fn is_at_end_of(doc: &Document, range: &Range, node: NodeId) -> bool {
    let boundary = range.end;
    if !doc.is_inclusive_ancestor(node, boundary.node) {
        return false;
    }
    for unit in content_units(doc, node) {
        if unit == boundary.node {
            if doc.text(unit).is_some_and(|t| boundary.offset < t.len()) {
                return false;
            }
            continue;
        }
        let Some(before) = Position::before(doc, unit) else {
            continue;
        };
        if compare_positions(doc, boundary, before) != Ordering::Greater
            && unit_has_content(doc, unit)
        {
            return false;
        }
    }
    true
}

/// Byte offset of `pos` within the concatenated text of `container`.
pub fn text_offset(doc: &Document, container: NodeId, pos: Position) -> usize {
    let mut offset = 0;
    for leaf in doc.text_leaves(container) {
        let len = doc.text(leaf).map_or(0, str::len);
        if leaf == pos.node {
            return offset + pos.offset.min(len);
        }
        let Some(before) = Position::before(doc, leaf) else {
            continue;
        };
        if compare_positions(doc, before, pos) == Ordering::Less {
            offset += len;
        } else {
            break;
        }
    }
    offset
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affinity {
    /// Prefer the end of the leaf before the offset.
    Upstream,
    /// Prefer the start of the leaf after the offset.
    Downstream,
}

/// Inverse of [`text_offset`]: resolves a byte offset inside `container` to a
/// leaf position. Falls back to the container start when it holds no text.
pub fn position_at_text_offset(
    doc: &Document,
    container: NodeId,
    offset: usize,
    affinity: Affinity,
) -> Position {
    let leaves = doc.text_leaves(container);
    let mut consumed = 0;
    for (ix, leaf) in leaves.iter().enumerate() {
        let text = doc.text(*leaf).unwrap_or_default();
        let end = consumed + text.len();
        let is_last = ix + 1 == leaves.len();
        let inside = match affinity {
            Affinity::Upstream => offset <= end,
            Affinity::Downstream => offset < end || (offset == end && is_last),
        };
        if inside {
            let local = clamp_to_char_boundary(text, offset.saturating_sub(consumed));
            return Position::new(*leaf, local);
        }
        consumed = end;
    }
    Position::new(container, 0)
}

/// Collapsed position at the very start of `container`'s text.
pub fn start_of(doc: &Document, container: NodeId) -> Position {
    position_at_text_offset(doc, container, 0, Affinity::Downstream)
}

/// Collapsed position at the very end of `container`'s text.
pub fn end_of(doc: &Document, container: NodeId) -> Position {
    let len = doc.text_content(container).len();
    position_at_text_offset(doc, container, len, Affinity::Upstream)
}

/// A range encoded as index paths, independent of node identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedRange {
    pub start: SerializedPosition,
    pub end: SerializedPosition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedPosition {
    pub path: Vec<usize>,
    pub offset: usize,
}

impl SerializedRange {
    pub fn from_range(doc: &Document, range: &Range) -> Option<Self> {
        let encode = |pos: Position| {
            Some(SerializedPosition {
                path: doc.path_of(pos.node)?,
                offset: pos.offset,
            })
        };
        Some(Self {
            start: encode(range.start)?,
            end: encode(range.end)?,
        })
    }

    /// Resolves the paths against `doc`, clamping to the nearest existing
    /// node and offset.
    pub fn resolve(&self, doc: &Document) -> Option<Range> {
        Some(Range::new(
            resolve_position(doc, &self.start)?,
            resolve_position(doc, &self.end)?,
        ))
    }
}

fn resolve_position(doc: &Document, pos: &SerializedPosition) -> Option<Position> {
    let mut node = doc.root();
    for &ix in &pos.path {
        let children = doc.children(node);
        if children.is_empty() {
            break;
        }
        node = children[ix.min(children.len() - 1)];
    }
    let offset = match doc.text(node) {
        Some(text) => clamp_to_char_boundary(text, pos.offset),
        None => pos.offset.min(doc.children(node).len()),
    };
    Some(Position::new(node, offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::parse_into;

    fn doc_from(html: &str) -> Document {
        let mut doc = Document::new();
        let root = doc.root();
        parse_into(&mut doc, root, html).unwrap();
        doc
    }

    #[test]
    fn start_detection_skips_empty_leaves() {
        let doc = doc_from("<ul><li><b></b>abc</li></ul>");
        let (leaf, _) = doc.find_text("abc").unwrap();
        let li = doc.parent(leaf).unwrap();
        let at_start = Range::collapsed(Position::new(leaf, 0));
        let inside = Range::collapsed(Position::new(leaf, 1));
        assert!(is_at_start_of(&doc, &at_start, li));
        assert!(!is_at_start_of(&doc, &inside, li));
        assert!(!is_at_end_of(&doc, &inside, li));
        assert!(is_at_end_of(&doc, &Range::collapsed(Position::new(leaf, 3)), li));
    }

    #[test]
    fn text_offsets_map_back_to_leaves() {
        let doc = doc_from("<p>ab<b>cd</b>ef</p>");
        let p = doc.first_child(doc.root()).unwrap();
        let (cd, _) = doc.find_text("cd").unwrap();
        assert_eq!(text_offset(&doc, p, Position::new(cd, 1)), 3);
        assert_eq!(
            position_at_text_offset(&doc, p, 2, Affinity::Downstream),
            Position::new(cd, 0)
        );
        let (ab, _) = doc.find_text("ab").unwrap();
        assert_eq!(
            position_at_text_offset(&doc, p, 2, Affinity::Upstream),
            Position::new(ab, 2)
        );
    }

    #[test]
    fn boundary_node_falls_back_to_container() {
        let doc = doc_from("<p>a</p><p>b</p>");
        let root = doc.root();
        let second = doc.child(root, 1).unwrap();
        assert_eq!(boundary_node(&doc, Position::new(root, 1)), second);
        assert_eq!(boundary_node(&doc, Position::new(root, 2)), root);
    }

    #[test]
    fn ordering_follows_document_order() {
        let doc = doc_from("<p>ab</p><p>cd</p>");
        let (ab, _) = doc.find_text("ab").unwrap();
        let (cd, _) = doc.find_text("cd").unwrap();
        let root = doc.root();
        assert_eq!(
            compare_positions(&doc, Position::new(ab, 2), Position::new(cd, 0)),
            Ordering::Less
        );
        assert_eq!(
            compare_positions(&doc, Position::new(root, 1), Position::new(ab, 1)),
            Ordering::Greater
        );
    }
}
