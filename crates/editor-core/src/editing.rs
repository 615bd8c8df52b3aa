//! Text and structure edits at the current range.

use crate::error::{EditorError, Result};
use crate::format::{apply_pending, merge, merge_at, owner_block, split_boundary};
use crate::markup::parse_fragment;
use crate::range::{
    Affinity, Position, Range, end_of, position_at_text_offset, start_of, text_offset,
};
use crate::state::EditorState;
use crate::tree::{Document, FILLER_TAG, NodeId, clamp_to_char_boundary, next_char_boundary, prev_char_boundary};

const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];
pub const PLACEHOLDER_ATTR: &str = "data-ui-placeholder";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Backward,
    Forward,
}

/// Pre-order elements and leaves of `scope`, not descending into
/// non-editable blocks.
fn editable_nodes(doc: &Document, scope: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = doc.children(scope).iter().rev().copied().collect();
    while let Some(node) = stack.pop() {
        if doc.is_non_editable(node) {
            continue;
        }
        out.push(node);
        stack.extend(doc.children(node).iter().rev().copied());
    }
    out
}

/// Inserts a filler into `node` when it would otherwise render as nothing.
/// Returns whether a filler was added.
pub fn ensure_non_empty(doc: &mut Document, node: NodeId) -> bool {
    if !doc.is_element(node) || doc.is_void(node) || !doc.is_blank(node) {
        return false;
    }
    let children = doc.children(node);
    if !children.iter().all(|c| doc.is_inline(*c)) {
        return false;
    }
    if children.iter().any(|c| doc.has_tag(*c, FILLER_TAG)) {
        return false;
    }
    doc.clear_children(node);
    let filler = doc.element(FILLER_TAG);
    doc.append(node, filler).is_ok()
}

fn trim_trailing_filler(doc: &mut Document, node: NodeId) {
    let Some(last) = doc.last_child(node) else {
        return;
    };
    if !doc.has_tag(last, FILLER_TAG) || doc.is_empty(node) {
        return;
    }
    if doc.prev_sibling(last).is_some_and(|prev| !doc.has_tag(prev, FILLER_TAG)) {
        doc.remove(last);
    }
}

/// Restores structural invariants below `scope`: no empty wrappers or lists,
/// no stray empty leaves, a filler in every visually empty block.
pub fn repair(doc: &mut Document, scope: NodeId) {
    for node in editable_nodes(doc, scope).into_iter().rev() {
        if !doc.contains(node) {
            continue;
        }
        // An empty leaf survives only as the sole child of a block, where it
        // holds the caret.
        let removable_leaf = doc
            .parent(node)
            .is_some_and(|p| doc.children(p).len() > 1 || doc.is_inline(p));
        let empty_leaf = doc.text(node).is_some_and(str::is_empty) && removable_leaf;
        let childless = doc.is_element(node) && doc.children(node).is_empty();
        let empty_wrapper = childless && doc.is_inline(node) && !doc.is_void(node);
        let empty_list = childless && doc.is_list(node);
        if empty_leaf || empty_wrapper || empty_list {
            doc.remove(node);
        }
    }

    for node in editable_nodes(doc, scope) {
        if doc.is_element(node) && !doc.is_inline(node) && !doc.is_void(node) {
            ensure_non_empty(doc, node);
            trim_trailing_filler(doc, node);
        }
    }

    if doc.is_editable_scope(scope)
        && doc.children(scope).is_empty()
        && let Err(err) = append_empty_paragraph(doc, scope)
    {
        tracing::debug!(?scope, %err, "could not refill empty scope");
    }
}

fn append_empty_paragraph(doc: &mut Document, scope: NodeId) -> Result<()> {
    let p = doc.element("p");
    let filler = doc.element(FILLER_TAG);
    doc.append(p, filler)?;
    doc.append(scope, p)
}

/// Nearest editable scope around `node` (the root unless nested).
pub fn editable_scope(doc: &Document, node: NodeId) -> NodeId {
    doc.closest(node, |d, n| d.is_editable_scope(n))
        .unwrap_or(doc.root())
}

/// Outermost non-editable ancestor of `node` inside its editable scope.
pub fn outermost_non_editable(doc: &Document, node: NodeId) -> Option<NodeId> {
    let mut found = None;
    let mut current = Some(node);
    while let Some(id) = current {
        if doc.is_editable_scope(id) {
            break;
        }
        if doc.is_non_editable(id) {
            found = Some(id);
        }
        current = doc.parent(id);
    }
    found
}

/// Block holding the content directly before `block`, or the non-editable
/// block in the way.
pub fn prev_block(doc: &Document, block: NodeId) -> Option<NodeId> {
    let scope = editable_scope(doc, block);
    let mut current = doc.prev_in_order(block, scope);
    while let Some(node) = current {
        if let Some(opaque) = outermost_non_editable(doc, node) {
            return Some(opaque);
        }
        if (doc.is_text(node) || doc.is_void(node)) && !doc.is_inclusive_ancestor(block, node) {
            return Some(content_block(doc, node));
        }
        current = doc.prev_in_order(node, scope);
    }
    None
}

/// Block holding the content directly after `block`'s own content.
pub fn next_block(doc: &Document, block: NodeId) -> Option<NodeId> {
    let scope = editable_scope(doc, block);
    let mut current = doc.next_in_order(block, scope);
    while let Some(node) = current {
        if doc.is_non_editable(node) && doc.parent(node) != Some(block) {
            return Some(node);
        }
        if (doc.is_text(node) || doc.is_void(node)) && content_block(doc, node) != block {
            return Some(content_block(doc, node));
        }
        current = doc.next_in_order(node, scope);
    }
    None
}

fn content_block(doc: &Document, node: NodeId) -> NodeId {
    if doc.is_void(node) && doc.is_block(node) {
        return node;
    }
    owner_block(doc, node)
}

fn guard_editable(doc: &Document, range: &Range) -> Result<()> {
    if doc.non_editable_ancestor(range.start.node).is_some()
        || doc.non_editable_ancestor(range.end.node).is_some()
    {
        return Err(EditorError::NotEditable);
    }
    Ok(())
}

/// Collapses a non-collapsed range by deleting its content ("delete for
/// input"). A range selecting exactly one non-editable block removes it.
pub fn delete_for_input(state: &mut EditorState) -> Result<Range> {
    let range = state.range()?;
    if range.is_collapsed() {
        return Ok(range);
    }
    if let Some(node) = state.focused_non_editable() {
        remove_block(state, node)?;
    } else {
        delete_selection(state)?;
    }
    state.range()
}

/// Removes the selected content. When either boundary sits in a block below
/// the common ancestor, the trailing block is merged into the leading one.
pub fn delete_selection(state: &mut EditorState) -> Result<()> {
    let range = state.range()?;
    if range.is_collapsed() {
        return Ok(());
    }
    guard_editable(&state.doc, &range)?;
    let doc = &mut state.doc;
    let common = range
        .common_ancestor(doc)
        .ok_or(EditorError::BoundaryNotFound("range has no common ancestor"))?;

    if let Some(text) = doc.text_mut(common) {
        let from = clamp_to_char_boundary(text, range.start.offset);
        let to = clamp_to_char_boundary(text, range.end.offset).max(from);
        text.replace_range(from..to, "");
        let block = owner_block(doc, common);
        let block_offset = text_offset(doc, block, Position::new(common, from));
        let scope = editable_scope(doc, common);
        repair(doc, scope);
        let cursor = if doc.is_attached(common) {
            Position::new(common, from)
        } else if doc.is_attached(block) {
            position_at_text_offset(doc, block, block_offset, Affinity::Upstream)
        } else {
            start_of(doc, scope)
        };
        state.set_range(Range::collapsed(cursor));
        return Ok(());
    }

    let below_common =
        |doc: &Document, n: NodeId| n != common && doc.is_block(n) && doc.is_inclusive_ancestor(common, n);
    let start_block = doc.closest(range.start.node, below_common);
    let end_block = doc.closest(range.end.node, below_common);
    let anchor = start_block.unwrap_or_else(|| owner_block(doc, range.start.node));
    let anchor_offset = text_offset(doc, anchor, range.start);

    let end_split = split_boundary(doc, common, range.end)?;
    let len_before = doc.children(common).len();
    let start_index = split_boundary(doc, common, range.start)?.index;
    let end_index = end_split.index + (doc.children(common).len() - len_before);
    for node in doc.children(common)[start_index..end_index].to_vec() {
        doc.remove(node);
    }

    let trailing = end_block.and_then(|block| {
        end_split
            .clones
            .iter()
            .find(|(orig, _)| *orig == block)
            .map(|(_, clone)| *clone)
            .or(Some(block).filter(|b| doc.is_attached(*b)))
    });
    let leading = start_block.filter(|b| doc.is_attached(*b));

    match trailing {
        Some(trailing)
            if (start_block.is_some() || end_block.is_some())
                && !doc.is_non_editable(trailing)
                && leading.is_none_or(|l| !doc.is_non_editable(l)) =>
        {
            join_blocks(doc, common, start_index, leading, trailing)?;
        }
        _ => merge_at(doc, common, start_index)?,
    }

    let cursor = doc
        .is_attached(anchor)
        .then(|| position_at_text_offset(doc, anchor, anchor_offset, Affinity::Upstream));
    let scope = editable_scope(doc, common);
    repair(doc, scope);
    let cursor = match cursor.filter(|c| doc.is_attached(c.node)) {
        Some(cursor) => cursor,
        None => fallback_cursor(doc, common, start_index),
    };
    state.set_range(Range::collapsed(cursor));
    Ok(())
}

/// Moves the trailing block's children onto the leading block (or into
/// `common` at `index` when the start was inline), then drops the trailing
/// block and any wrappers it leaves empty.
fn join_blocks(
    doc: &mut Document,
    common: NodeId,
    index: usize,
    leading: Option<NodeId>,
    trailing: NodeId,
) -> Result<()> {
    let mut emptied = doc.parent(trailing);
    let trailing_blank = doc.is_blank(trailing);
    match leading {
        Some(leading) => {
            if !trailing_blank {
                if doc.is_blank(leading) {
                    doc.clear_children(leading);
                }
                let seam = inline_len(doc, leading);
                let moved = inline_children(doc, trailing);
                for (ix, child) in moved.into_iter().enumerate() {
                    doc.insert_at(leading, seam + ix, child)?;
                }
                merge_at(doc, leading, seam)?;
            }
            for child in doc.children(trailing).to_vec() {
                if !doc.is_inline(child) {
                    doc.append(leading, child)?;
                }
            }
        }
        None => {
            let moved = if trailing_blank {
                Vec::new()
            } else {
                doc.children(trailing).to_vec()
            };
            let count = moved.len();
            for (ix, child) in moved.into_iter().enumerate() {
                doc.insert_at(common, index + ix, child)?;
            }
            merge_at(doc, common, index)?;
            if count > 0 {
                merge_at(doc, common, index + count)?;
            }
        }
    }
    doc.remove(trailing);
    while let Some(node) = emptied {
        if node == common || !doc.contains(node) || !doc.children(node).is_empty() {
            break;
        }
        emptied = doc.parent(node);
        doc.remove(node);
    }
    Ok(())
}

fn inline_len(doc: &Document, block: NodeId) -> usize {
    doc.children(block)
        .iter()
        .position(|c| !doc.is_inline(*c))
        .unwrap_or(doc.children(block).len())
}

fn inline_children(doc: &Document, block: NodeId) -> Vec<NodeId> {
    let len = inline_len(doc, block);
    doc.children(block)[..len].to_vec()
}

fn fallback_cursor(doc: &Document, common: NodeId, index: usize) -> Position {
    let container = if doc.is_attached(common) {
        common
    } else {
        doc.root()
    };
    match doc
        .child(container, index)
        .or_else(|| doc.last_child(container))
    {
        Some(node) if doc.is_element(node) => start_of(doc, node),
        Some(node) => Position::new(node, 0),
        None => Position::new(container, 0),
    }
}

/// Deletes one character in `direction`, merging blocks at block
/// boundaries. Moves focus onto a non-editable neighbour instead of merging
/// into it.
pub fn delete_collapsed(state: &mut EditorState, direction: Direction) -> Result<()> {
    if let Some(node) = state.focused_non_editable() {
        return remove_block(state, node);
    }
    let range = state.range()?;
    if !range.is_collapsed() {
        return delete_selection(state);
    }
    guard_editable(&state.doc, &range)?;

    let doc = &state.doc;
    let pos = range.start;
    let block = owner_block(doc, pos.node);
    let offset = text_offset(doc, block, pos);
    let own_text = own_text(doc, block);

    let extended = match direction {
        Direction::Backward if offset > 0 => {
            let prev = prev_char_boundary(&own_text, offset);
            Range::new(position_at_text_offset(doc, block, prev, Affinity::Downstream), pos)
        }
        Direction::Forward if offset < own_text.len() => {
            let next = next_char_boundary(&own_text, offset);
            Range::new(pos, position_at_text_offset(doc, block, next, Affinity::Upstream))
        }
        Direction::Backward => {
            let Some(prev) = prev_block(doc, block) else {
                return Ok(());
            };
            if doc.is_non_editable(prev) {
                return focus_block(state, prev);
            }
            if doc.is_void(prev) {
                state.doc.remove(prev);
                return Ok(());
            }
            Range::new(end_of(doc, prev), pos)
        }
        Direction::Forward => {
            let Some(next) = next_block(doc, block) else {
                return Ok(());
            };
            if doc.is_non_editable(next) {
                return focus_block(state, next);
            }
            if doc.is_void(next) {
                state.doc.remove(next);
                return Ok(());
            }
            Range::new(pos, start_of(doc, next))
        }
    };

    state.set_range(extended);
    delete_selection(state)
}

/// Text of the block's own inline content, without nested blocks.
fn own_text(doc: &Document, block: NodeId) -> String {
    inline_children(doc, block)
        .into_iter()
        .map(|child| doc.text_content(child))
        .collect()
}

pub fn focus_block(state: &mut EditorState, node: NodeId) -> Result<()> {
    let range = Range::around(&state.doc, node).ok_or(EditorError::NodeNotFound(node))?;
    state.set_range(range);
    Ok(())
}

/// Removes a whole block. The cursor moves to the following sibling's
/// start, else the preceding sibling's end, else the parent.
pub fn remove_block(state: &mut EditorState, node: NodeId) -> Result<()> {
    let doc = &mut state.doc;
    let parent = doc
        .parent(node)
        .ok_or(EditorError::BoundaryNotFound("block has no parent"))?;
    let next = doc.next_sibling(node);
    let prev = doc.prev_sibling(node);
    doc.remove(node);
    tracing::debug!(?node, "removed block");

    let scope = editable_scope(doc, parent);
    repair(doc, scope);
    let cursor = match (next, prev) {
        (Some(next), _) if doc.is_attached(next) => start_of(doc, next),
        (_, Some(prev)) if doc.is_attached(prev) => end_of(doc, prev),
        _ if doc.is_attached(parent) => start_of(doc, parent),
        _ => start_of(doc, scope),
    };
    state.set_range(Range::collapsed(cursor));
    Ok(())
}

/// Inserts an empty paragraph right after `node` and moves the cursor into it.
pub fn insert_paragraph_after(state: &mut EditorState, node: NodeId) -> Result<()> {
    let paragraph = state.new_paragraph();
    let filler = state.doc.element(FILLER_TAG);
    state.doc.append(paragraph, filler)?;
    state.doc.insert_after(node, paragraph)?;
    state.set_range(Range::collapsed(Position::new(paragraph, 0)));
    Ok(())
}

/// Splits the root-level block at the cursor. The cursor lands at the start
/// of the new block.
pub fn insert_paragraph(state: &mut EditorState) -> Result<()> {
    if let Some(node) = state.focused_non_editable() {
        return insert_paragraph_after(state, node);
    }
    let range = delete_for_input(state)?;
    guard_editable(&state.doc, &range)?;
    let pos = range.start;
    let scope = editable_scope(&state.doc, pos.node);

    let Some(mut block) = state.doc.root_level_ancestor(pos.node, scope) else {
        let paragraph = state.new_paragraph();
        let filler = state.doc.element(FILLER_TAG);
        state.doc.append(paragraph, filler)?;
        state.doc.insert_at(scope, pos.offset, paragraph)?;
        state.set_range(Range::collapsed(Position::new(paragraph, 0)));
        return Ok(());
    };

    if state.doc.is_inline(block) {
        let paragraph = state.new_paragraph();
        state.doc.insert_before(block, paragraph)?;
        state.doc.append(paragraph, block)?;
        block = paragraph;
    }

    let doc = &mut state.doc;
    let index = split_boundary(doc, block, pos)?.index;
    let rest: Vec<NodeId> = doc.children(block)[index..].to_vec();
    let rest_blank = rest.iter().all(|n| doc.is_blank(*n));
    let heading = doc.tag(block).is_some_and(|t| HEADING_TAGS.contains(&t));

    let new_block = if rest_blank && heading {
        let tag = state.config.paragraph_tag.clone();
        state.doc.element(tag)
    } else {
        state.doc.shallow_clone(block)?
    };
    let doc = &mut state.doc;
    for node in rest {
        doc.append(new_block, node)?;
    }
    doc.insert_after(block, new_block)?;
    ensure_non_empty(doc, new_block);
    ensure_non_empty(doc, block);
    repair(doc, scope);

    let cursor = start_of(doc, new_block);
    state.set_range(Range::collapsed(cursor));
    Ok(())
}

/// Inserts plain text at the cursor, replacing any selection.
pub fn insert_text(state: &mut EditorState, text: &str) -> Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    let range = delete_for_input(state)?;
    guard_editable(&state.doc, &range)?;
    let doc = &mut state.doc;
    let (leaf, offset) = text_slot(doc, range.start)?;

    let Some(content) = doc.text_mut(leaf) else {
        return Err(EditorError::NodeNotFound(leaf));
    };
    let offset = clamp_to_char_boundary(content, offset);
    content.insert_str(offset, text);
    let inserted = Range::new(
        Position::new(leaf, offset),
        Position::new(leaf, offset + text.len()),
    );

    let scope = editable_scope(doc, leaf);
    repair(doc, scope);
    state.set_range(Range::collapsed(inserted.end));
    if !state.pending.is_empty() {
        apply_pending(state, &inserted)?;
    }
    Ok(())
}

/// Finds or creates the text leaf receiving input at `pos`.
fn text_slot(doc: &mut Document, pos: Position) -> Result<(NodeId, usize)> {
    if doc.is_text(pos.node) {
        return Ok((pos.node, pos.offset));
    }
    let container = pos.node;
    if doc.is_editable_scope(container) || doc.is_list(container) {
        if let Some(next) = doc.child(container, pos.offset)
            && doc.is_text_block(next)
        {
            return text_slot(doc, Position::new(next, 0));
        }
        if pos.offset > 0
            && let Some(prev) = doc.child(container, pos.offset - 1)
            && doc.is_text_block(prev)
        {
            let end = doc.children(prev).len();
            return text_slot(doc, Position::new(prev, end));
        }
    }
    if pos.offset > 0
        && let Some(prev) = doc.child(container, pos.offset - 1)
        && let Some(text) = doc.text(prev)
    {
        return Ok((prev, text.len()));
    }
    if let Some(next) = doc.child(container, pos.offset)
        && doc.is_text(next)
    {
        return Ok((next, 0));
    }

    let leaf = doc.create_text("");
    if doc.is_editable_scope(container) || doc.is_list(container) {
        let paragraph = doc.element("p");
        doc.append(paragraph, leaf)?;
        doc.insert_at(container, pos.offset, paragraph)?;
    } else {
        doc.insert_at(container, pos.offset, leaf)?;
    }
    Ok((leaf, 0))
}

/// Inserts text line by line; line breaks become paragraph splits.
pub fn insert_lines(state: &mut EditorState, text: &str) -> Result<()> {
    let normalized = text.replace("\r\n", "\n");
    for (ix, line) in normalized.split('\n').enumerate() {
        if ix > 0 {
            insert_paragraph(state)?;
        }
        insert_text(state, line)?;
    }
    Ok(())
}

/// Parses `html` and splices it at the cursor. Markup without usable
/// content is skipped.
pub fn insert_fragment(state: &mut EditorState, html: &str) -> Result<()> {
    let fragment = parse_fragment(&mut state.doc, html)?;
    let doc = &mut state.doc;
    let unusable = doc.children(fragment).is_empty() || doc.is_blank(fragment);
    if unusable {
        doc.remove(fragment);
        return Ok(());
    }

    let range = match delete_for_input(state) {
        Ok(range) => range,
        Err(err) => {
            state.doc.remove(fragment);
            return Err(err);
        }
    };
    if let Err(err) = guard_editable(&state.doc, &range) {
        state.doc.remove(fragment);
        return Err(err);
    }

    let doc = &state.doc;
    let inline_only = doc.children(fragment).iter().all(|n| doc.is_inline(*n));
    let result = if inline_only {
        splice_inline(state, fragment, range.start)
    } else {
        splice_blocks(state, fragment, range.start)
    };
    state.doc.remove(fragment);
    result
}

fn splice_inline(state: &mut EditorState, fragment: NodeId, pos: Position) -> Result<()> {
    let doc = &mut state.doc;
    let (container, pos) = if doc.is_editable_scope(pos.node) {
        let (leaf, offset) = text_slot(doc, pos)?;
        let parent = doc.parent(leaf).ok_or(EditorError::NodeNotFound(leaf))?;
        (parent, Position::new(leaf, offset))
    } else if doc.is_text(pos.node) {
        (doc.parent(pos.node).ok_or(EditorError::NodeNotFound(pos.node))?, pos)
    } else {
        (pos.node, pos)
    };

    let block = owner_block(doc, container);
    let before = text_offset(doc, block, pos);
    let inserted_len = doc.text_content(fragment).len();
    let index = split_boundary(doc, container, pos)?.index;
    let nodes = doc.children(fragment).to_vec();
    for (ix, node) in nodes.iter().enumerate() {
        doc.insert_at(container, index + ix, *node)?;
    }
    if let (Some(first), Some(last)) = (nodes.first(), nodes.last()) {
        merge(doc, *first, *last)?;
    }
    let scope = editable_scope(doc, block);
    repair(doc, scope);
    let cursor = position_at_text_offset(doc, block, before + inserted_len, Affinity::Upstream);
    state.set_range(Range::collapsed(cursor));
    Ok(())
}

fn splice_blocks(state: &mut EditorState, fragment: NodeId, pos: Position) -> Result<()> {
    let scope = editable_scope(&state.doc, pos.node);
    wrap_inline_runs(state, fragment)?;
    let doc = &mut state.doc;

    let split = split_boundary(doc, scope, pos)?;
    let index = split.index;
    let nodes = doc.children(fragment).to_vec();
    for (ix, node) in nodes.iter().enumerate() {
        doc.insert_at(scope, index + ix, *node)?;
    }
    let after = index + nodes.len();
    if let Some(next) = doc.child(scope, after)
        && doc.is_blank(next)
        && !doc.is_forced_visible(next)
    {
        doc.remove(next);
    }
    if index > 0
        && let Some(prev) = doc.child(scope, index - 1)
        && doc.is_blank(prev)
        && !doc.is_forced_visible(prev)
    {
        doc.remove(prev);
    }

    repair(doc, scope);
    let cursor = match nodes.last().filter(|n| doc.is_attached(**n)) {
        Some(last) => end_of(doc, *last),
        None => start_of(doc, scope),
    };
    state.set_range(Range::collapsed(cursor));
    Ok(())
}

/// Wraps runs of inline children of `fragment` into paragraphs.
fn wrap_inline_runs(state: &mut EditorState, fragment: NodeId) -> Result<()> {
    let mut current: Option<NodeId> = None;
    for child in state.doc.children(fragment).to_vec() {
        if !state.doc.is_inline(child) {
            current = None;
            continue;
        }
        let paragraph = match current {
            Some(paragraph) => paragraph,
            None => {
                let paragraph = state.new_paragraph();
                state.doc.insert_before(child, paragraph)?;
                current = Some(paragraph);
                paragraph
            }
        };
        state.doc.append(paragraph, child)?;
    }
    Ok(())
}

pub fn select_all(state: &mut EditorState) -> Result<()> {
    let root = state.doc.root();
    let range = Range::new(start_of(&state.doc, root), end_of(&state.doc, root));
    state.set_range(range);
    Ok(())
}

/// Inserts a non-editable placeholder block after the cursor's block and
/// returns it. The placeholder is UI-only and never serialized.
pub fn insert_placeholder(state: &mut EditorState, label: &str) -> Result<NodeId> {
    let tag = state.config.ui_only_tag.clone();
    let doc = &mut state.doc;
    let placeholder = doc.element(tag);
    doc.set_attr(placeholder, "contenteditable", "false");
    doc.set_attr(placeholder, PLACEHOLDER_ATTR, label);
    let label_leaf = doc.create_text(label);
    doc.append(placeholder, label_leaf)?;

    let root = doc.root();
    let anchor = state
        .range()
        .ok()
        .and_then(|r| state.doc.root_level_ancestor(r.end.node, root));
    match anchor {
        Some(anchor) => state.doc.insert_after(anchor, placeholder)?,
        None => state.doc.append(root, placeholder)?,
    }
    Ok(placeholder)
}

/// Replaces a placeholder with parsed markup, or removes it when the markup
/// holds nothing.
pub fn resolve_placeholder(state: &mut EditorState, placeholder: NodeId, html: &str) -> Result<()> {
    if !state.doc.is_attached(placeholder)
        || state.doc.attr(placeholder, PLACEHOLDER_ATTR).is_none()
    {
        return Err(EditorError::NodeNotFound(placeholder));
    }
    let fragment = parse_fragment(&mut state.doc, html)?;
    wrap_inline_runs(state, fragment)?;
    let doc = &mut state.doc;
    for node in doc.children(fragment).to_vec() {
        doc.insert_before(placeholder, node)?;
    }
    doc.remove(fragment);
    doc.remove(placeholder);
    let root = doc.root();
    repair(doc, root);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::serialize::Serializer;

    fn state_from(html: &str) -> EditorState {
        let mut state = EditorState::new(EditorConfig::default(), Serializer::new("editor-ui"));
        state.replace_content(html).unwrap();
        state
    }

    #[test]
    fn repair_fills_blank_blocks_and_drops_empty_wrappers() {
        let mut state = state_from("<p><b></b></p><ul><li></li></ul><ul></ul>");
        let root = state.doc.root();
        repair(&mut state.doc, root);
        assert_eq!(state.serialize(), "<p><br/></p><ul><li><br/></li></ul>");
    }

    #[test]
    fn repair_trims_trailing_filler_after_text() {
        let mut state = state_from("<p>ab<br/></p><p>a<br/><br/></p>");
        let root = state.doc.root();
        repair(&mut state.doc, root);
        assert_eq!(state.serialize(), "<p>ab</p><p>a<br/><br/></p>");
    }

    #[test]
    fn block_neighbours_skip_nested_structure() {
        let state = state_from("<p>a</p><ul><li>b<ul><li>c</li></ul></li></ul>");
        let doc = &state.doc;
        let (b, _) = doc.find_text("b").unwrap();
        let (c, _) = doc.find_text("c").unwrap();
        let outer = doc.parent(b).unwrap();
        let inner = doc.parent(c).unwrap();
        assert_eq!(next_block(doc, outer), Some(inner));
        assert_eq!(prev_block(doc, inner), Some(outer));
        assert_eq!(prev_block(doc, outer), doc.first_child(doc.root()));
    }
}
