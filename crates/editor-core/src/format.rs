//! Toggling wrapper elements over a range.
//!
//! Every inline format goes through the same cycle: split the inline
//! ancestors at both range boundaries, pull the middle out into a fragment,
//! normalize it, optionally wrap it, then put it back and merge the seams so
//! no two identical wrappers end up adjacent.

use std::cmp::Ordering;

use crate::error::{EditorError, Result};
use crate::range::{
    Affinity, Position, Range, compare_positions, position_at_text_offset, text_offset,
};
use crate::state::EditorState;
use crate::tree::{Attrs, Document, NodeId};

pub const BOLD: &[&str] = &["b", "strong"];
pub const ITALIC: &[&str] = &["i", "em"];
pub const UNDERLINE: &[&str] = &["u"];
pub const STRIKE: &[&str] = &["s", "strike"];
pub const MARK: &[&str] = &["mark"];
pub const LINK: &[&str] = &["a"];
pub const REMOVABLE_FORMATS: &[&str] = &[
    "b", "strong", "i", "em", "u", "s", "strike", "mark", "span", "font", "sub", "sup", "code",
];

/// Matches elements by tag name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    tags: Vec<String>,
}

impl Selector {
    pub fn tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tags: tags.into_iter().map(|t| t.as_ref().to_string()).collect(),
        }
    }

    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        doc.tag(node)
            .is_some_and(|tag| self.tags.iter().any(|t| t == tag))
    }

    /// The canonical tag used when creating a wrapper.
    pub fn primary(&self) -> &str {
        self.tags.first().map(String::as_str).unwrap_or("span")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapTemplate {
    pub tag: String,
    pub attrs: Attrs,
}

impl WrapTemplate {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Attrs::new(),
        }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }
}

/// A format toggled at a collapsed caret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFormat {
    pub selector: Selector,
    pub template: WrapTemplate,
    pub apply: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatMode {
    Apply,
    Remove,
}

/// Result of splitting a container at a boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundarySplit {
    /// Child index in the container where the boundary now lies.
    pub index: usize,
    /// `(original, clone)` for every node that was cut in two; the clone
    /// holds the content after the boundary.
    pub clones: Vec<(NodeId, NodeId)>,
}

/// Splits every node between `container` and `pos` so that `pos` falls
/// between two children of `container`.
pub fn split_boundary(doc: &mut Document, container: NodeId, pos: Position) -> Result<BoundarySplit> {
    if !doc.is_inclusive_ancestor(container, pos.node) {
        return Err(EditorError::BoundaryNotFound("position outside container"));
    }
    let missing = EditorError::BoundaryNotFound("detached boundary");
    let mut clones = Vec::new();

    let (mut node, mut index) = match doc.text(pos.node).map(str::len) {
        Some(_) if pos.node == container => return Err(missing),
        Some(len) => {
            let parent = doc.parent(pos.node).ok_or(missing.clone())?;
            let ix = doc.index_in_parent(pos.node).ok_or(missing.clone())?;
            if pos.offset == 0 {
                (parent, ix)
            } else if pos.offset >= len {
                (parent, ix + 1)
            } else {
                let right = doc.split_text(pos.node, pos.offset)?;
                clones.push((pos.node, right));
                (parent, ix + 1)
            }
        }
        None => (pos.node, pos.offset.min(doc.children(pos.node).len())),
    };

    while node != container {
        let parent = doc.parent(node).ok_or(missing.clone())?;
        let ix = doc.index_in_parent(node).ok_or(missing.clone())?;
        let len = doc.children(node).len();
        if index == 0 {
            index = ix;
        } else if index >= len {
            index = ix + 1;
        } else {
            let clone = doc.shallow_clone(node)?;
            for child in doc.children(node)[index..].to_vec() {
                doc.append(clone, child)?;
            }
            doc.insert_after(node, clone)?;
            clones.push((node, clone));
            index = ix + 1;
        }
        node = parent;
    }

    Ok(BoundarySplit { index, clones })
}

/// Splits `container` at both ends of `range` and returns the index of the
/// first selected child together with the selected children.
pub fn extract_range(
    doc: &mut Document,
    container: NodeId,
    range: &Range,
) -> Result<(usize, Vec<NodeId>)> {
    let end = split_boundary(doc, container, range.end)?.index;
    let len_before = doc.children(container).len();
    let start = split_boundary(doc, container, range.start)?.index;
    let end = end + (doc.children(container).len() - len_before);
    Ok((start, doc.children(container)[start..end].to_vec()))
}

/// Like [`extract_range`], but moves the selected children into a detached
/// fragment.
pub fn extract_to_fragment(
    doc: &mut Document,
    container: NodeId,
    range: &Range,
) -> Result<(usize, NodeId)> {
    let (index, nodes) = extract_range(doc, container, range)?;
    let fragment = doc.create_fragment();
    for node in nodes {
        doc.append(fragment, node)?;
    }
    Ok((index, fragment))
}

/// Result of [`split`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOutcome {
    /// Detached fragment holding the ancestor's middle content.
    pub fragment: NodeId,
    pub parent: NodeId,
    /// Where the middle content used to be.
    pub index: usize,
}

/// Splits the nearest ancestor matching `selector` around `range`.
///
/// Content before and after the range stays in place as siblings; the
/// ancestor's middle content is returned as a fragment.
pub fn split(doc: &mut Document, range: &Range, selector: &Selector) -> Result<Option<SplitOutcome>> {
    let common = range
        .common_ancestor(doc)
        .ok_or(EditorError::BoundaryNotFound("range has no common ancestor"))?;
    let Some(ancestor) = doc.closest(common, |d, n| selector.matches(d, n)) else {
        return Ok(None);
    };
    let parent = doc
        .parent(ancestor)
        .ok_or(EditorError::BoundaryNotFound("split target has no parent"))?;

    let (mut index, pieces) = extract_range(doc, parent, range)?;
    let fragment = doc.create_fragment();
    for piece in pieces {
        doc.move_children(piece, fragment)?;
        doc.remove(piece);
    }

    if let Some(after) = doc.child(parent, index)
        && selector.matches(doc, after)
        && doc.is_blank(after)
    {
        doc.remove(after);
    }
    if index > 0
        && let Some(before) = doc.child(parent, index - 1)
        && before == ancestor
        && doc.is_blank(before)
    {
        doc.remove(before);
        index -= 1;
    }

    Ok(Some(SplitOutcome {
        fragment,
        parent,
        index,
    }))
}

/// Replaces every element in `fragment` matching `selector` with its children.
pub fn unwrap(doc: &mut Document, fragment: NodeId, selector: &Selector) -> Result<()> {
    for node in doc.descendants(fragment) {
        if doc.contains(node) && selector.matches(doc, node) {
            doc.replace_with_children(node)?;
        }
    }
    Ok(())
}

/// Wraps each inline run root of `fragment` in its own copy of `template`.
/// Block children are descended into.
pub fn wrap_inline(doc: &mut Document, fragment: NodeId, template: &WrapTemplate) -> Result<()> {
    for child in doc.children(fragment).to_vec() {
        if doc.is_void(child) || doc.text(child).is_some_and(str::is_empty) {
            continue;
        }
        if doc.is_inline(child) {
            let wrapper = doc.create_element(template.tag.clone(), template.attrs.clone());
            doc.insert_before(child, wrapper)?;
            doc.append(wrapper, child)?;
        } else if !doc.is_non_editable(child) {
            wrap_inline(doc, child, template)?;
        }
    }
    Ok(())
}

/// Collapses adjacent identical elements matching `selector` anywhere in
/// `fragment`.
pub fn merge_siblings(doc: &mut Document, fragment: NodeId, selector: &Selector) -> Result<()> {
    let mut ix = 0;
    while ix + 1 < doc.children(fragment).len() {
        let left = doc.children(fragment)[ix];
        let right = doc.children(fragment)[ix + 1];
        if selector.matches(doc, left) && doc.same_type(left, right) {
            merge_pair(doc, left, right)?;
        } else {
            ix += 1;
        }
    }
    for child in doc.children(fragment).to_vec() {
        if doc.is_element(child) {
            merge_siblings(doc, child, selector)?;
        }
    }
    Ok(())
}

/// Whether `a` and `b` can be fused into one node.
pub fn mergeable(doc: &Document, a: NodeId, b: NodeId) -> bool {
    if !doc.same_type(a, b) {
        return false;
    }
    doc.is_text(a) || (doc.is_inline(a) && !doc.is_void(a) && !doc.is_non_editable(a))
}

/// Fuses `right` into `left`, descending into the seam while node types keep
/// matching. Returns `left`.
pub fn merge_pair(doc: &mut Document, left: NodeId, right: NodeId) -> Result<NodeId> {
    if let Some(text) = doc.text(right).map(str::to_owned) {
        if let Some(existing) = doc.text_mut(left) {
            existing.push_str(&text);
            doc.remove(right);
            return Ok(left);
        }
        return Err(EditorError::BoundaryNotFound("cannot merge text into element"));
    }

    let seam = doc.children(left).len();
    doc.move_children(right, left)?;
    doc.remove(right);
    if seam > 0
        && let (Some(a), Some(b)) = (doc.child(left, seam - 1), doc.child(left, seam))
        && mergeable(doc, a, b)
    {
        merge_pair(doc, a, b)?;
    }
    Ok(left)
}

/// Reconciles the boundaries of freshly inserted siblings `first..=last`
/// with their neighbours.
pub fn merge(doc: &mut Document, first: NodeId, last: NodeId) -> Result<()> {
    let mut last = last;
    if let Some(prev) = doc.prev_sibling(first)
        && mergeable(doc, prev, first)
    {
        let merged = merge_pair(doc, prev, first)?;
        if first == last {
            last = merged;
        }
    }
    if let Some(next) = doc.next_sibling(last)
        && mergeable(doc, last, next)
    {
        merge_pair(doc, last, next)?;
    }
    Ok(())
}

/// Merges the two children of `parent` around `index`, if compatible.
pub fn merge_at(doc: &mut Document, parent: NodeId, index: usize) -> Result<()> {
    if index == 0 {
        return Ok(());
    }
    if let (Some(a), Some(b)) = (doc.child(parent, index - 1), doc.child(parent, index))
        && mergeable(doc, a, b)
    {
        merge_pair(doc, a, b)?;
    }
    Ok(())
}

/// Removes inline wrappers left without any content.
pub fn prune_blank_inline(doc: &mut Document, container: NodeId) {
    for node in doc.descendants(container).into_iter().rev() {
        if doc.contains(node)
            && doc.is_element(node)
            && doc.is_inline(node)
            && !doc.is_void(node)
            && doc.children(node).is_empty()
        {
            doc.remove(node);
        }
    }
    for node in doc.descendants(container) {
        if doc.contains(node) && doc.text(node).is_some_and(str::is_empty) {
            let has_siblings = doc.parent(node).is_some_and(|p| doc.children(p).len() > 1);
            if has_siblings {
                doc.remove(node);
            }
        }
    }
}

/// A block whose inline content is addressed by a range segment.
fn is_inline_container(doc: &Document, node: NodeId) -> bool {
    doc.is_block(node)
        && !doc.is_void(node)
        && !doc.is_non_editable(node)
        && doc
            .children(node)
            .iter()
            .all(|c| doc.is_inline(*c) || doc.is_list(*c))
}

/// Inline container owning a boundary.
pub fn owner_block(doc: &Document, node: NodeId) -> NodeId {
    doc.closest(node, |d, n| is_inline_container(d, n))
        .unwrap_or_else(|| doc.block_of(node))
}

/// Index after the last inline child: nested lists are excluded.
fn inline_end(doc: &Document, block: NodeId) -> usize {
    doc.children(block)
        .iter()
        .position(|c| !doc.is_inline(*c))
        .unwrap_or(doc.children(block).len())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    block: NodeId,
    start: Position,
    end: Position,
}

/// Splits a range into one segment per inline container it touches.
fn segments(doc: &Document, range: &Range) -> Vec<Segment> {
    let start_owner = owner_block(doc, range.start.node);
    let end_owner = owner_block(doc, range.end.node);
    if start_owner == end_owner {
        return vec![Segment {
            block: start_owner,
            start: range.start,
            end: range.end,
        }];
    }

    let scope = doc
        .common_ancestor(start_owner, end_owner)
        .unwrap_or(doc.root());
    let mut out = Vec::new();
    let mut candidates = vec![scope];
    candidates.extend(doc.descendants(scope));
    for block in candidates {
        if !is_inline_container(doc, block) {
            continue;
        }
        let start = if block == start_owner {
            range.start
        } else {
            Position::new(block, 0)
        };
        let end = if block == end_owner {
            range.end
        } else {
            Position::new(block, inline_end(doc, block))
        };
        let block_start = Position::new(block, 0);
        let block_end = Position::new(block, inline_end(doc, block));
        let intersects = compare_positions(doc, range.start, block_end) != Ordering::Greater
            && compare_positions(doc, range.end, block_start) != Ordering::Less;
        if intersects {
            out.push(Segment { block, start, end });
        }
    }
    out
}

/// True when every non-empty text leaf touched by `range` sits inside an
/// element matching `selector`.
pub fn range_fully_matches(doc: &Document, range: &Range, selector: &Selector) -> bool {
    let mut touched = false;
    for segment in segments(doc, range) {
        let from = text_offset(doc, segment.block, segment.start);
        let to = text_offset(doc, segment.block, segment.end);
        let mut offset = 0;
        for leaf in doc.text_leaves(segment.block) {
            let len = doc.text(leaf).map_or(0, str::len);
            let (a, b) = (offset, offset + len);
            offset = b;
            if len == 0 || b <= from || a >= to {
                continue;
            }
            touched = true;
            let wrapped = doc
                .closest(leaf, |d, n| n == segment.block || selector.matches(d, n))
                .is_some_and(|n| n != segment.block);
            if !wrapped {
                return false;
            }
        }
    }
    touched
}

/// Pulls each segment of `range` out into a fragment, lets `transform`
/// rewrite it, then reinserts it and merges the seams. Returns the range
/// covering the same text afterwards.
pub fn transform_range(
    doc: &mut Document,
    range: &Range,
    mut transform: impl FnMut(&mut Document, NodeId) -> Result<()>,
) -> Result<Range> {
    let segments = segments(doc, range);
    let (Some(first), Some(last)) = (segments.first().copied(), segments.last().copied()) else {
        return Err(EditorError::BoundaryNotFound("range touches no text block"));
    };
    let start_offset = text_offset(doc, first.block, first.start);
    let end_offset = text_offset(doc, last.block, last.end);

    for segment in segments {
        let segment_range = Range::new(segment.start, segment.end);
        if segment_range.is_collapsed() {
            continue;
        }
        let (index, fragment) = extract_to_fragment(doc, segment.block, &segment_range)?;
        transform(doc, fragment)?;
        let nodes = doc.children(fragment).to_vec();
        for (ix, node) in nodes.iter().enumerate() {
            doc.insert_at(segment.block, index + ix, *node)?;
        }
        doc.remove(fragment);
        match (nodes.first(), nodes.last()) {
            (Some(first), Some(last)) if doc.contains(*first) && doc.contains(*last) => {
                merge(doc, *first, *last)?
            }
            _ => merge_at(doc, segment.block, index)?,
        }
        prune_blank_inline(doc, segment.block);
    }

    Ok(Range::new(
        position_at_text_offset(doc, first.block, start_offset, Affinity::Downstream),
        position_at_text_offset(doc, last.block, end_offset, Affinity::Upstream),
    ))
}

/// Applies or removes a wrapper over a non-collapsed range.
pub fn format_range(
    doc: &mut Document,
    range: &Range,
    selector: &Selector,
    template: &WrapTemplate,
    mode: FormatMode,
) -> Result<Range> {
    transform_range(doc, range, |doc, fragment| {
        unwrap(doc, fragment, selector)?;
        if mode == FormatMode::Apply {
            wrap_inline(doc, fragment, template)?;
            merge_siblings(doc, fragment, selector)?;
        }
        Ok(())
    })
}

/// Toggles a wrapper: removes it when the whole range already carries it,
/// applies it otherwise. A collapsed range records a pending format.
pub fn toggle_format(state: &mut EditorState, selector: &Selector, template: &WrapTemplate) -> Result<()> {
    let range = state.range()?;
    if range.is_collapsed() {
        toggle_pending(state, &range, selector, template);
        return Ok(());
    }
    let mode = if range_fully_matches(&state.doc, &range, selector) {
        FormatMode::Remove
    } else {
        FormatMode::Apply
    };
    let enclosed = match mode {
        FormatMode::Remove => unwrap_enclosing(&mut state.doc, &range, selector)?,
        FormatMode::Apply => None,
    };
    let next = match enclosed {
        Some(next) => next,
        None => format_range(&mut state.doc, &range, selector, template, mode)?,
    };
    state.set_range(next);
    Ok(())
}

/// Removes the one wrapper enclosing all of `range`: split around the range,
/// unwrap the middle, reinsert and merge the seams. `None` when no single
/// wrapper holds the whole range.
fn unwrap_enclosing(doc: &mut Document, range: &Range, selector: &Selector) -> Result<Option<Range>> {
    let Some(common) = range.common_ancestor(doc) else {
        return Ok(None);
    };
    if doc.closest(common, |d, n| selector.matches(d, n)).is_none() {
        return Ok(None);
    }
    let block = owner_block(doc, common);
    let start = text_offset(doc, block, range.start);
    let end = text_offset(doc, block, range.end);

    let Some(outcome) = split(doc, range, selector)? else {
        return Ok(None);
    };
    unwrap(doc, outcome.fragment, selector)?;
    let nodes = doc.children(outcome.fragment).to_vec();
    for (ix, node) in nodes.iter().enumerate() {
        doc.insert_at(outcome.parent, outcome.index + ix, *node)?;
    }
    doc.remove(outcome.fragment);
    match (nodes.first(), nodes.last()) {
        (Some(first), Some(last)) if doc.contains(*first) && doc.contains(*last) => {
            merge(doc, *first, *last)?
        }
        _ => merge_at(doc, outcome.parent, outcome.index)?,
    }
    prune_blank_inline(doc, block);

    Ok(Some(Range::new(
        position_at_text_offset(doc, block, start, Affinity::Downstream),
        position_at_text_offset(doc, block, end, Affinity::Upstream),
    )))
}

fn toggle_pending(state: &mut EditorState, range: &Range, selector: &Selector, template: &WrapTemplate) {
    if let Some(ix) = state.pending.iter().position(|p| p.selector == *selector) {
        state.pending.remove(ix);
        return;
    }
    let inside = state
        .doc
        .closest(range.start.node, |d, n| selector.matches(d, n))
        .is_some();
    state.pending.push(PendingFormat {
        selector: selector.clone(),
        template: template.clone(),
        apply: !inside,
    });
}

/// Applies pending formats to freshly inserted text, then clears them.
pub fn apply_pending(state: &mut EditorState, inserted: &Range) -> Result<()> {
    let pending = std::mem::take(&mut state.pending);
    let mut range = *inserted;
    for format in pending {
        let mode = if format.apply {
            FormatMode::Apply
        } else {
            FormatMode::Remove
        };
        range = format_range(&mut state.doc, &range, &format.selector, &format.template, mode)?;
    }
    state.set_range(Range::collapsed(range.end));
    Ok(())
}

/// Sets one attribute of a wrapper element (mark colours, link targets).
///
/// An empty `value` clears the attribute and drops the wrapper once
/// `other_key` is empty too.
pub fn set_wrapper_attr(
    state: &mut EditorState,
    selector: &Selector,
    key: &str,
    value: &str,
    other_key: &str,
) -> Result<()> {
    let range = state.range()?;
    let doc = &mut state.doc;

    if range.is_collapsed() {
        if let Some(wrapper) = doc.closest(range.start.node, |d, n| selector.matches(d, n)) {
            update_wrapper(doc, wrapper, key, value, other_key)?;
            let block = owner_block(doc, range.start.node);
            let offset = text_offset(doc, block, range.start);
            prune_blank_inline(doc, block);
            state.set_range(Range::collapsed(position_at_text_offset(
                &state.doc,
                block,
                offset,
                Affinity::Upstream,
            )));
        } else if !value.is_empty() {
            let template = WrapTemplate::new(selector.primary()).attr(key, value);
            state.pending.retain(|p| p.selector != *selector);
            state.pending.push(PendingFormat {
                selector: selector.clone(),
                template,
                apply: true,
            });
        }
        return Ok(());
    }

    let next = transform_range(doc, &range, |doc, fragment| {
        let existing = std::iter::once(fragment)
            .chain(doc.descendants(fragment))
            .find(|n| selector.matches(doc, *n))
            .and_then(|n| doc.attrs(n).cloned());
        let mut attrs = existing.unwrap_or_default();
        if value.is_empty() {
            attrs.remove(key);
        } else {
            attrs.insert(key.to_string(), value.to_string());
        }
        unwrap(doc, fragment, selector)?;
        if attrs.values().any(|v| !v.is_empty()) {
            let template = WrapTemplate {
                tag: selector.primary().to_string(),
                attrs,
            };
            wrap_inline(doc, fragment, &template)?;
            merge_siblings(doc, fragment, selector)?;
        }
        Ok(())
    })?;
    state.set_range(next);
    Ok(())
}

fn update_wrapper(doc: &mut Document, wrapper: NodeId, key: &str, value: &str, other_key: &str) -> Result<()> {
    if !value.is_empty() {
        doc.set_attr(wrapper, key, value);
        return Ok(());
    }
    let other_empty = doc.attr(wrapper, other_key).is_none_or(str::is_empty);
    if !other_empty {
        doc.remove_attr(wrapper, key);
        return Ok(());
    }
    let parent = doc
        .parent(wrapper)
        .ok_or(EditorError::BoundaryNotFound("wrapper has no parent"))?;
    let index = doc
        .index_in_parent(wrapper)
        .ok_or(EditorError::NodeNotFound(wrapper))?;
    let count = doc.children(wrapper).len();
    doc.replace_with_children(wrapper)?;
    if count > 0 {
        merge_at(doc, parent, index + count)?;
    }
    merge_at(doc, parent, index)
}
