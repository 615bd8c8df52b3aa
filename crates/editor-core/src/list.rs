//! Nested lists edited through a flat model.
//!
//! A list region is captured as one entry per item (plus the blocks right
//! around it), the command changes depths and kinds on the flat entries, and
//! the tree is rebuilt from scratch. Editing `ul > li > ul > li` in place is
//! where doubly nested wrappers and orphaned items come from; the flat model
//! cannot express either.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::editing::{Direction, editable_scope, focus_block, next_block};
use crate::error::{EditorError, Result};
use crate::format::{merge_pair, mergeable, owner_block, split_boundary};
use crate::range::{
    Affinity, Position, Range, compare_positions, position_at_text_offset, text_offset,
};
use crate::state::EditorState;
use crate::tree::{Attrs, Document, LIST_ITEM_TAG, NodeId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Item {
        list_tag: String,
        list_attrs: Attrs,
        item_attrs: Attrs,
    },
    /// A text block next to the list.
    Block { tag: String, attrs: Attrs },
    /// Carried through unchanged; `content` holds the node itself.
    Opaque,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub depth: usize,
    pub kind: EntryKind,
    pub content: Vec<NodeId>,
    pub selected: bool,
}

impl ListEntry {
    pub fn item(depth: usize, list_tag: &str) -> Self {
        Self {
            depth,
            kind: EntryKind::Item {
                list_tag: list_tag.to_string(),
                list_attrs: Attrs::new(),
                item_attrs: Attrs::new(),
            },
            content: Vec::new(),
            selected: false,
        }
    }

    pub fn is_item(&self) -> bool {
        matches!(self.kind, EntryKind::Item { .. })
    }

    pub fn list_tag(&self) -> Option<&str> {
        match &self.kind {
            EntryKind::Item { list_tag, .. } => Some(list_tag),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Anchor {
    entry: usize,
    offset: usize,
}

/// Target of a retype command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Retype {
    List(String),
    Block(String),
}

#[derive(Debug, Clone)]
pub struct ListModel {
    pub entries: Vec<ListEntry>,
    scope: NodeId,
    index: usize,
    roots: Vec<NodeId>,
    owners: Vec<NodeId>,
    start: Anchor,
    end: Anchor,
    taken: bool,
}

impl ListModel {
    /// A detached model, mostly useful for exercising depth rules.
    pub fn from_entries(entries: Vec<ListEntry>) -> Self {
        Self {
            entries,
            scope: NodeId::default(),
            index: 0,
            roots: Vec::new(),
            owners: Vec::new(),
            start: Anchor::default(),
            end: Anchor::default(),
            taken: true,
        }
    }

    /// Reads the root-level region spanning `range`, extended over adjacent
    /// lists and one neighbouring block on each side. The tree is not touched.
    pub fn capture(doc: &Document, range: &Range) -> Option<Self> {
        let scope = editable_scope(doc, range.start.node);
        let first = region_node(doc, scope, range.start)?;
        let last = region_node(doc, scope, range.end)?;
        let mut from = doc.index_in_parent(first)?;
        let mut to = doc.index_in_parent(last)?.max(from);
        let siblings = doc.children(scope);

        while from > 0 && doc.is_list(siblings[from - 1]) {
            from -= 1;
        }
        if from > 0 {
            from -= 1;
        }
        while to + 1 < siblings.len() && doc.is_list(siblings[to + 1]) {
            to += 1;
        }
        if to + 1 < siblings.len() {
            to += 1;
        }

        let roots = siblings[from..=to].to_vec();
        let mut model = Self {
            entries: Vec::new(),
            scope,
            index: from,
            roots: roots.clone(),
            owners: Vec::new(),
            start: Anchor::default(),
            end: Anchor::default(),
            taken: false,
        };
        for root in roots {
            if doc.is_list(root) {
                model.flatten_list(doc, root, 0);
            } else if is_plain_block(doc, root) {
                let (tag, attrs) = element_parts(doc, root);
                model.push(root, 0, EntryKind::Block { tag, attrs }, doc.children(root).to_vec());
            } else {
                model.push(root, 0, EntryKind::Opaque, vec![root]);
            }
        }

        for (ix, owner) in model.owners.iter().enumerate() {
            model.entries[ix].selected = intersects(doc, range, *owner);
        }
        model.start = model.anchor_for(doc, range.start);
        model.end = model.anchor_for(doc, range.end);
        Some(model)
    }

    fn flatten_list(&mut self, doc: &Document, list: NodeId, depth: usize) {
        let (list_tag, list_attrs) = element_parts(doc, list);
        for child in doc.children(list) {
            if !doc.is_list_item(*child) {
                self.push(*child, depth, EntryKind::Opaque, vec![*child]);
                continue;
            }
            let (_, item_attrs) = element_parts(doc, *child);
            let content = doc
                .children(*child)
                .iter()
                .copied()
                .filter(|c| !doc.is_list(*c))
                .collect();
            self.push(
                *child,
                depth,
                EntryKind::Item {
                    list_tag: list_tag.clone(),
                    list_attrs: list_attrs.clone(),
                    item_attrs,
                },
                content,
            );
            for nested in doc.children(*child) {
                if doc.is_list(*nested) {
                    self.flatten_list(doc, *nested, depth + 1);
                }
            }
        }
    }

    fn push(&mut self, owner: NodeId, depth: usize, kind: EntryKind, content: Vec<NodeId>) {
        self.owners.push(owner);
        self.entries.push(ListEntry {
            depth,
            kind,
            content,
            selected: false,
        });
    }

    fn anchor_for(&self, doc: &Document, pos: Position) -> Anchor {
        let deepest = self
            .owners
            .iter()
            .enumerate()
            .filter(|(_, owner)| doc.is_inclusive_ancestor(**owner, pos.node))
            .last();
        match deepest {
            Some((entry, owner)) if !self.entries[entry].is_opaque() => Anchor {
                entry,
                offset: text_offset(doc, *owner, pos),
            },
            Some((entry, _)) => Anchor { entry, offset: 0 },
            None => Anchor {
                entry: self.entries.iter().position(|e| e.selected).unwrap_or(0),
                offset: 0,
            },
        }
    }

    /// Entry holding the range start.
    pub fn anchor_entry(&self) -> usize {
        self.start.entry
    }

    /// Original node of an entry. Only meaningful before [`Self::take`].
    pub fn owner(&self, entry: usize) -> Option<NodeId> {
        self.owners.get(entry).copied()
    }

    pub fn depths(&self) -> Vec<usize> {
        self.entries.iter().map(|e| e.depth).collect()
    }

    pub fn has_selected_items(&self) -> bool {
        self.entries.iter().any(|e| e.selected && e.is_item())
    }

    /// Detaches entry content and deletes the captured region.
    pub fn take(&mut self, doc: &mut Document) -> Result<()> {
        if self.taken {
            return Ok(());
        }
        for entry in &self.entries {
            for node in &entry.content {
                doc.detach(*node);
            }
        }
        for root in &self.roots {
            if doc.contains(*root) && doc.parent(*root).is_some() {
                doc.remove(*root);
            }
        }
        self.taken = true;
        Ok(())
    }

    pub fn set_depth(&mut self, entry: usize, depth: usize) {
        if let Some(entry) = self.entries.get_mut(entry) {
            entry.depth = depth;
        }
    }

    pub fn indent(&mut self) {
        for entry in self.entries.iter_mut().filter(|e| e.selected && e.is_item()) {
            entry.depth += 1;
        }
    }

    /// Outdents selected items; top-level items become paragraphs.
    pub fn outdent(&mut self, paragraph: &str) {
        for entry in self.entries.iter_mut().filter(|e| e.selected && e.is_item()) {
            if entry.depth == 0 {
                entry.kind = EntryKind::Block {
                    tag: paragraph.to_string(),
                    attrs: Attrs::new(),
                };
            } else {
                entry.depth -= 1;
            }
        }
    }

    /// Converts selected entries. Retyping to a list every selected item
    /// already belongs to turns them back into paragraphs.
    pub fn retype(&mut self, target: &Retype, paragraph: &str) {
        let selected = || self.entries.iter().filter(|e| e.selected && !e.is_opaque());
        let toggle_off = match target {
            Retype::List(tag) => {
                selected().count() > 0 && selected().all(|e| e.list_tag() == Some(tag.as_str()))
            }
            Retype::Block(_) => false,
        };

        for entry in self.entries.iter_mut().filter(|e| e.selected && !e.is_opaque()) {
            entry.kind = match target {
                Retype::List(_) if toggle_off => {
                    entry.depth = 0;
                    EntryKind::Block {
                        tag: paragraph.to_string(),
                        attrs: Attrs::new(),
                    }
                }
                Retype::List(tag) => {
                    let (list_attrs, item_attrs) = match &entry.kind {
                        EntryKind::Item {
                            list_tag,
                            list_attrs,
                            item_attrs,
                        } if list_tag == tag => (list_attrs.clone(), item_attrs.clone()),
                        EntryKind::Item { item_attrs, .. } => (Attrs::new(), item_attrs.clone()),
                        _ => (Attrs::new(), Attrs::new()),
                    };
                    EntryKind::Item {
                        list_tag: tag.clone(),
                        list_attrs,
                        item_attrs,
                    }
                }
                Retype::Block(tag) => {
                    entry.depth = 0;
                    EntryKind::Block {
                        tag: tag.clone(),
                        attrs: Attrs::new(),
                    }
                }
            };
        }
    }

    /// Splits the item at the cursor. An empty item ends the list and becomes
    /// a paragraph instead.
    pub fn insert_paragraph(&mut self, doc: &mut Document, paragraph: &str) -> Result<()> {
        let Anchor { entry: ix, offset } = self.start;
        let Some(entry) = self.entries.get(ix) else {
            return Err(EditorError::BoundaryNotFound("no list entry at cursor"));
        };
        if !entry.is_item() {
            return Err(EditorError::BoundaryNotFound("cursor is not in a list item"));
        }

        if entry.content.iter().all(|n| doc.is_blank(*n)) {
            let entry = &mut self.entries[ix];
            entry.kind = EntryKind::Block {
                tag: paragraph.to_string(),
                attrs: Attrs::new(),
            };
            entry.depth = 0;
            self.end = self.start;
            return Ok(());
        }

        let holder = doc.element(LIST_ITEM_TAG);
        for node in &self.entries[ix].content {
            doc.append(holder, *node)?;
        }
        let pos = position_at_text_offset(doc, holder, offset, Affinity::Downstream);
        let split = split_boundary(doc, holder, pos)?.index;
        let children = doc.children(holder).to_vec();
        for node in &children {
            doc.detach(*node);
        }
        doc.remove(holder);

        let (left, right) = children.split_at(split);
        let mut next = self.entries[ix].clone();
        self.entries[ix].content = left.to_vec();
        self.entries[ix].selected = false;
        next.content = right.to_vec();
        next.selected = true;
        self.entries.insert(ix + 1, next);
        self.owners.clear();
        self.start = Anchor {
            entry: ix + 1,
            offset: 0,
        };
        self.end = self.start;
        Ok(())
    }

    /// Appends the content of `entry` to the entry before it and drops it.
    /// Returns false when either side is opaque or there is nothing before.
    pub fn merge_into_previous(&mut self, doc: &mut Document, entry: usize) -> bool {
        if entry == 0 || entry >= self.entries.len() {
            return false;
        }
        let prev = entry - 1;
        if self.entries[prev].is_opaque() || self.entries[entry].is_opaque() {
            return false;
        }

        let moved = self.entries.remove(entry);
        let target = &mut self.entries[prev];
        if target.content.iter().all(|n| doc.is_blank(*n)) && !moved.content.is_empty() {
            for node in target.content.drain(..) {
                doc.remove(node);
            }
        }
        let offset: usize = target.content.iter().map(|n| doc.text_content(*n).len()).sum();
        if moved.content.iter().all(|n| doc.is_blank(*n)) {
            for node in moved.content {
                doc.remove(node);
            }
        } else {
            target.content.extend(moved.content);
        }
        target.selected = true;
        self.owners.clear();
        self.start = Anchor {
            entry: prev,
            offset,
        };
        self.end = self.start;
        true
    }

    /// Keeps consecutive items within one level of each other. An entry that
    /// jumps deeper is pulled up to one below its predecessor, and so is
    /// every later entry that shared its original depth.
    pub fn sanitize_depths(&mut self) {
        let mut prev: Option<usize> = None;
        let mut remap: BTreeMap<usize, usize> = BTreeMap::new();
        for entry in &mut self.entries {
            if !entry.is_item() {
                entry.depth = 0;
                prev = None;
                remap.clear();
                continue;
            }
            let original = entry.depth;
            let allowed = prev.map_or(0, |p| p + 1);
            let depth = remap.get(&original).copied().unwrap_or(original).min(allowed);
            remap.retain(|d, _| *d < original);
            remap.insert(original, depth);
            entry.depth = depth;
            prev = Some(depth);
        }
    }

    /// Sanitizes and materializes the model at the captured position.
    /// Returns the range mapped onto the rebuilt nodes.
    pub fn rebuild(mut self, doc: &mut Document) -> Result<Range> {
        self.take(doc)?;
        self.sanitize_depths();

        let mut roots: Vec<NodeId> = Vec::new();
        let mut owners: Vec<NodeId> = Vec::with_capacity(self.entries.len());
        let mut stack: Vec<(NodeId, Option<NodeId>)> = Vec::new();

        for entry in &self.entries {
            let owner = match &entry.kind {
                EntryKind::Item {
                    list_tag,
                    list_attrs,
                    item_attrs,
                } => {
                    let depth = entry.depth.min(stack.len());
                    stack.truncate(depth + 1);
                    if let Some((list, _)) = stack.get(depth)
                        && (doc.tag(*list) != Some(list_tag.as_str())
                            || doc.attrs(*list) != Some(list_attrs))
                    {
                        stack.truncate(depth);
                    }
                    if stack.len() <= depth {
                        let list = doc.create_element(list_tag.clone(), list_attrs.clone());
                        match depth.checked_sub(1).and_then(|d| stack.get(d)).and_then(|(_, li)| *li) {
                            Some(parent_item) => doc.append(parent_item, list)?,
                            None => roots.push(list),
                        }
                        stack.push((list, None));
                    }
                    let item = doc.create_element(LIST_ITEM_TAG, item_attrs.clone());
                    let (list, last) = &mut stack[depth];
                    doc.append(*list, item)?;
                    *last = Some(item);
                    item
                }
                EntryKind::Block { tag, attrs } => {
                    stack.clear();
                    let block = doc.create_element(tag.clone(), attrs.clone());
                    roots.push(block);
                    block
                }
                EntryKind::Opaque => {
                    stack.clear();
                    roots.extend(entry.content.iter().copied());
                    owners.push(entry.content.first().copied().unwrap_or(self.scope));
                    continue;
                }
            };
            for node in &entry.content {
                doc.append(owner, *node)?;
            }
            owners.push(owner);
        }

        for owner in &owners {
            join_adjacent(doc, *owner)?;
        }

        for (ix, node) in roots.iter().enumerate() {
            doc.insert_at(self.scope, self.index + ix, *node)?;
        }
        crate::editing::repair(doc, self.scope);

        let position = |doc: &Document, anchor: Anchor| -> Position {
            match owners.get(anchor.entry).filter(|o| doc.is_attached(**o)) {
                Some(owner) => {
                    let own_len = own_text_len(doc, *owner);
                    let affinity = if anchor.offset >= own_len {
                        Affinity::Upstream
                    } else {
                        Affinity::Downstream
                    };
                    position_at_text_offset(doc, *owner, anchor.offset.min(own_len), affinity)
                }
                None => Position::new(self.scope, self.index.min(doc.children(self.scope).len())),
            }
        };
        let start = position(doc, self.start);
        let end = if self.end == self.start {
            start
        } else {
            position(doc, self.end)
        };
        Ok(Range::new(start, end))
    }
}

impl ListEntry {
    fn is_opaque(&self) -> bool {
        matches!(self.kind, EntryKind::Opaque)
    }
}

fn region_node(doc: &Document, scope: NodeId, pos: Position) -> Option<NodeId> {
    doc.root_level_ancestor(pos.node, scope).or_else(|| {
        let children = doc.children(scope);
        children
            .get(pos.offset.min(children.len().saturating_sub(1)))
            .copied()
    })
}

fn element_parts(doc: &Document, node: NodeId) -> (String, Attrs) {
    (
        doc.tag(node).unwrap_or_default().to_string(),
        doc.attrs(node).cloned().unwrap_or_default(),
    )
}

fn is_plain_block(doc: &Document, node: NodeId) -> bool {
    doc.is_text_block(node) && doc.children(node).iter().all(|c| doc.is_inline(*c))
}

/// Whether `range` touches the entry's own content (nested lists excluded).
fn intersects(doc: &Document, range: &Range, owner: NodeId) -> bool {
    let own_end = doc
        .children(owner)
        .iter()
        .position(|c| doc.is_list(*c))
        .unwrap_or(doc.children(owner).len());
    let before = Position::new(owner, 0);
    let after = Position::new(owner, own_end);
    let inside_own = |pos: Position| {
        doc.is_inclusive_ancestor(owner, pos.node)
            && compare_positions(doc, pos, after) != Ordering::Greater
    };
    if inside_own(range.start) || inside_own(range.end) {
        return true;
    }
    if doc.is_non_editable(owner) || !doc.is_element(owner) {
        return false;
    }
    compare_positions(doc, range.start, before) == Ordering::Less
        && compare_positions(doc, range.end, after) == Ordering::Greater
}

fn own_text_len(doc: &Document, owner: NodeId) -> usize {
    doc.children(owner)
        .iter()
        .filter(|c| !doc.is_list(**c))
        .map(|c| doc.text_content(*c).len())
        .sum()
}

fn join_adjacent(doc: &mut Document, owner: NodeId) -> Result<()> {
    let mut ix = 1;
    while ix < doc.children(owner).len() {
        let (a, b) = (doc.children(owner)[ix - 1], doc.children(owner)[ix]);
        if mergeable(doc, a, b) {
            merge_pair(doc, a, b)?;
        } else {
            ix += 1;
        }
    }
    Ok(())
}

/// Runs `edit` against the tree, rolling tree and selection back when it
/// fails part way through.
fn atomically<T>(state: &mut EditorState, edit: impl FnOnce(&mut EditorState) -> Result<T>) -> Result<T> {
    let checkpoint = state.doc.clone();
    let range = state.range;
    let result = edit(state);
    if result.is_err() {
        state.doc = checkpoint;
        state.range = range;
    }
    result
}

fn run(state: &mut EditorState, mutate: impl FnOnce(&mut ListModel, &mut Document, &str) -> Result<()>) -> Result<()> {
    let range = state.range()?;
    let mut model = ListModel::capture(&state.doc, &range)
        .ok_or(EditorError::BoundaryNotFound("no list region"))?;
    let paragraph = state.config.paragraph_tag.clone();
    atomically(state, |state| {
        model.take(&mut state.doc)?;
        mutate(&mut model, &mut state.doc, &paragraph)?;
        let next = model.rebuild(&mut state.doc)?;
        state.set_range(next);
        Ok(())
    })
}

/// Whether the range touches at least one list item.
pub fn selection_in_list(state: &EditorState) -> bool {
    state
        .range()
        .ok()
        .and_then(|range| ListModel::capture(&state.doc, &range))
        .is_some_and(|model| model.has_selected_items())
}

pub fn indent(state: &mut EditorState) -> Result<()> {
    run(state, |model, _, _| {
        model.indent();
        Ok(())
    })
}

pub fn outdent(state: &mut EditorState) -> Result<()> {
    run(state, |model, _, paragraph| {
        model.outdent(paragraph);
        Ok(())
    })
}

pub fn retype(state: &mut EditorState, target: Retype) -> Result<()> {
    run(state, |model, _, paragraph| {
        model.retype(&target, paragraph);
        Ok(())
    })
}

pub fn insert_paragraph(state: &mut EditorState) -> Result<()> {
    crate::editing::delete_for_input(state)?;
    run(state, |model, doc, paragraph| model.insert_paragraph(doc, paragraph))
}

/// List-aware collapsed deletion. Returns false when the cursor is not at
/// a list item boundary and plain deletion applies.
pub fn delete_at_boundary(state: &mut EditorState, direction: Direction) -> Result<bool> {
    let range = state.range()?;
    if !range.is_collapsed() {
        return Ok(false);
    }
    let doc = &state.doc;
    let block = owner_block(doc, range.start.node);
    let offset = text_offset(doc, block, range.start);

    match direction {
        Direction::Backward => {
            if !doc.is_list_item(block) || offset > 0 {
                return Ok(false);
            }
        }
        Direction::Forward => {
            if offset < own_text_len(doc, block) {
                return Ok(false);
            }
            let next = next_block(doc, block);
            let next_is_item = next.is_some_and(|n| doc.is_list_item(n));
            if !doc.is_list_item(block) && !next_is_item {
                return Ok(false);
            }
            match next {
                None => return Ok(true),
                Some(next) if doc.is_non_editable(next) => {
                    focus_block(state, next)?;
                    return Ok(true);
                }
                Some(_) => {}
            }
        }
    }

    let Some(mut model) = ListModel::capture(doc, &range) else {
        return Ok(false);
    };
    let target = match direction {
        Direction::Backward => model.anchor_entry(),
        Direction::Forward => model.anchor_entry() + 1,
    };
    if target == 0 || target >= model.entries.len() {
        return Ok(true);
    }
    let opaque = [target - 1, target]
        .into_iter()
        .find(|ix| model.entries[*ix].is_opaque());
    if let Some(ix) = opaque {
        if let Some(owner) = model.owner(ix).filter(|o| doc.is_non_editable(*o)) {
            focus_block(state, owner)?;
        }
        return Ok(true);
    }

    atomically(state, |state| {
        model.take(&mut state.doc)?;
        if !model.merge_into_previous(&mut state.doc, target) {
            return Err(EditorError::BoundaryNotFound("list entries cannot be merged"));
        }
        let next = model.rebuild(&mut state.doc)?;
        state.set_range(next);
        Ok(true)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(depths: &[usize]) -> ListModel {
        ListModel::from_entries(depths.iter().map(|d| ListEntry::item(*d, "ul")).collect())
    }

    #[test]
    fn deep_jump_clamps_to_one_below_previous() {
        let mut m = model(&[0, 0]);
        m.set_depth(1, 5);
        m.sanitize_depths();
        assert_eq!(m.depths(), vec![0, 1]);
    }

    #[test]
    fn entries_sharing_the_jumped_depth_follow_it() {
        let mut m = model(&[0, 5, 5, 6, 5, 1]);
        m.sanitize_depths();
        assert_eq!(m.depths(), vec![0, 1, 1, 2, 1, 1]);
    }

    #[test]
    fn first_item_cannot_be_nested() {
        let mut m = model(&[2, 3]);
        m.sanitize_depths();
        assert_eq!(m.depths(), vec![0, 1]);
    }

    #[test]
    fn blocks_restart_the_depth_run() {
        let mut entries: Vec<ListEntry> = [0, 1].iter().map(|d| ListEntry::item(*d, "ol")).collect();
        entries.push(ListEntry {
            depth: 0,
            kind: EntryKind::Block {
                tag: "p".into(),
                attrs: Attrs::new(),
            },
            content: Vec::new(),
            selected: false,
        });
        entries.push(ListEntry::item(1, "ol"));
        let mut m = ListModel::from_entries(entries);
        m.sanitize_depths();
        assert_eq!(m.depths(), vec![0, 1, 0, 0]);
    }

    #[test]
    fn outdent_keeps_neighbouring_depths_within_one() {
        let mut m = model(&[0, 1, 2, 2, 1]);
        m.entries[1].selected = true;
        m.outdent("p");
        m.sanitize_depths();
        let depths = m.depths();
        assert_eq!(depths, vec![0, 0, 1, 1, 1]);
        assert!(depths.windows(2).all(|w| w[0].abs_diff(w[1]) <= 1));
    }

    #[test]
    fn failed_list_edit_leaves_the_tree_untouched() {
        use crate::config::EditorConfig;
        use crate::serialize::Serializer;

        let html = "<p>x</p><ul><li>a</li><li>b<ul><li>c</li></ul></li></ul><p>y</p>";
        let mut state = EditorState::new(EditorConfig::default(), Serializer::new("editor-ui"));
        state.replace_content(html).unwrap();
        let (leaf, _) = state.doc.find_text("b").unwrap();
        let caret = Range::collapsed(Position::new(leaf, 1));
        state.set_range(caret);

        let result = run(&mut state, |model, _, _| {
            model.indent();
            Err(EditorError::BoundaryNotFound("rejected"))
        });

        assert!(result.is_err());
        assert_eq!(state.serialize(), html);
        assert_eq!(state.range(), Ok(caret));
        assert!(state.doc.is_attached(leaf));
    }

    #[test]
    fn outdent_at_top_level_becomes_paragraph() {
        let mut m = model(&[0, 1]);
        for entry in &mut m.entries {
            entry.selected = true;
        }
        m.outdent("p");
        assert!(!m.entries[0].is_item());
        assert_eq!(m.entries[1].depth, 0);
        assert!(m.entries[1].is_item());
    }
}
