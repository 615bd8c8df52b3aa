//! Reordering non-editable blocks by drag and drop.
//!
//! The dragged block is never moved as a live node: its markup is captured
//! when the drag starts and re-materialized at the drop position, while the
//! original is removed. Content blocks that keep per-node state rebuild it
//! from the markup.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{EditorError, Result};
use crate::markup::parse_fragment;
use crate::range::Range;
use crate::state::EditorState;
use crate::tree::NodeId;

pub const DRAGGING_ATTR: &str = "data-ui-dragging";
pub const DROP_INDICATOR_ATTR: &str = "data-ui-drop-indicator";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DropSide {
    Before,
    After,
}

/// Vertical extent of a rendered node, in host units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeRect {
    pub top: f32,
    pub height: f32,
}

impl NodeRect {
    pub fn new(top: f32, height: f32) -> Self {
        Self { top, height }
    }

    pub fn midpoint(&self) -> f32 {
        self.top + self.height / 2.0
    }
}

/// Host geometry lookup.
pub trait Layout {
    fn rect(&self, node: NodeId) -> Option<NodeRect>;
}

impl Layout for HashMap<NodeId, NodeRect> {
    fn rect(&self, node: NodeId) -> Option<NodeRect> {
        self.get(&node).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragState {
    pub node: NodeId,
    /// Markup captured when the drag started.
    pub serialized: String,
    pub target: Option<(NodeId, DropSide)>,
    indicator: Option<NodeId>,
}

/// Starts dragging `node`. Only non-editable blocks are draggable.
pub fn drag_start(state: &mut EditorState, node: NodeId) -> Result<()> {
    let doc = &state.doc;
    if !doc.is_attached(node) || !doc.is_non_editable(node) || doc.is_inline(node) {
        return Err(EditorError::NotEditable);
    }
    if state.drag.is_some() {
        restore(state);
    }
    let serialized = state.serializer.serialize_node(&state.doc, node);
    state.doc.set_attr(node, DRAGGING_ATTR, "true");
    tracing::debug!(?node, "drag started");
    state.drag = Some(DragState {
        node,
        serialized,
        target: None,
        indicator: None,
    });
    Ok(())
}

/// Nearest inclusive ancestor of `node` that is a direct child of an
/// editable scope.
pub fn drop_candidate(state: &EditorState, node: NodeId) -> Option<NodeId> {
    let doc = &state.doc;
    let mut current = node;
    loop {
        let parent = doc.parent(current)?;
        if doc.is_editable_scope(parent) {
            return Some(current);
        }
        current = parent;
    }
}

/// Updates the drop target for a pointer at `pointer_y` over `over`.
/// Returns the recorded target; hovering the dragged block itself clears it.
pub fn drag_over(
    state: &mut EditorState,
    over: NodeId,
    pointer_y: f32,
    layout: &impl Layout,
) -> Result<Option<(NodeId, DropSide)>> {
    let dragged = state
        .drag
        .as_ref()
        .map(|drag| drag.node)
        .ok_or(EditorError::BoundaryNotFound("no drag in progress"))?;

    let candidate = drop_candidate(state, over)
        .filter(|c| !state.doc.is_inclusive_ancestor(dragged, *c))
        .filter(|c| !state.doc.has_tag(*c, &state.config.ui_only_tag));
    let target = candidate.and_then(|candidate| {
        let rect = layout.rect(candidate)?;
        let side = if pointer_y < rect.midpoint() {
            DropSide::Before
        } else {
            DropSide::After
        };
        Some((candidate, side))
    });

    if state.drag.as_ref().and_then(|d| d.target) == target {
        return Ok(target);
    }
    remove_indicator(state);
    if let Some((candidate, side)) = target {
        let indicator = state.doc.element(state.config.ui_only_tag.clone());
        state.doc.set_attr(indicator, DROP_INDICATOR_ATTR, "true");
        match side {
            DropSide::Before => state.doc.insert_before(candidate, indicator)?,
            DropSide::After => state.doc.insert_after(candidate, indicator)?,
        }
        if let Some(drag) = state.drag.as_mut() {
            drag.indicator = Some(indicator);
        }
    }
    if let Some(drag) = state.drag.as_mut() {
        drag.target = target;
    }
    Ok(target)
}

/// Finishes the drag. With a recorded target the original block is removed
/// and its captured markup inserted there; otherwise the block is restored.
/// Returns the re-materialized node.
pub fn drag_end(state: &mut EditorState) -> Result<Option<NodeId>> {
    remove_indicator(state);
    let Some(drag) = state.drag.take() else {
        return Ok(None);
    };
    let target = drag
        .target
        .filter(|(target, _)| state.doc.is_attached(*target) && *target != drag.node);
    let Some((target, side)) = target else {
        state.doc.remove_attr(drag.node, DRAGGING_ATTR);
        tracing::debug!(node = ?drag.node, "drag cancelled");
        return Ok(None);
    };

    let fragment = match parse_fragment(&mut state.doc, &drag.serialized) {
        Ok(fragment) => fragment,
        Err(err) => {
            state.doc.remove_attr(drag.node, DRAGGING_ATTR);
            return Err(err);
        }
    };
    state.doc.remove(drag.node);
    let nodes = state.doc.children(fragment).to_vec();
    let mut anchor = target;
    for (ix, node) in nodes.iter().enumerate() {
        match side {
            _ if ix > 0 => state.doc.insert_after(anchor, *node)?,
            DropSide::Before => state.doc.insert_before(target, *node)?,
            DropSide::After => state.doc.insert_after(target, *node)?,
        }
        anchor = *node;
    }
    state.doc.remove(fragment);

    let dropped = nodes.first().copied();
    if let Some(range) = dropped.and_then(|node| Range::around(&state.doc, node)) {
        state.set_range(range);
    }
    tracing::debug!(?target, ?side, "block dropped");
    Ok(dropped)
}

fn remove_indicator(state: &mut EditorState) {
    let indicator = state.drag.as_mut().and_then(|drag| drag.indicator.take());
    if let Some(indicator) = indicator {
        state.doc.remove(indicator);
    }
}

fn restore(state: &mut EditorState) {
    remove_indicator(state);
    if let Some(drag) = state.drag.take() {
        state.doc.remove_attr(drag.node, DRAGGING_ATTR);
    }
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
    fn indicator_is_single_and_never_serialized() {
        let mut state = state_from(r#"<p>a</p><div contenteditable="false">x</div><p>b</p>"#);
        let root = state.doc.root();
        let first = state.doc.child(root, 0).unwrap();
        let block = state.doc.child(root, 1).unwrap();
        let layout: HashMap<NodeId, NodeRect> = [(first, NodeRect::new(0.0, 20.0))].into();

        drag_start(&mut state, block).unwrap();
        let leaf = state.doc.first_child(first).unwrap();
        drag_over(&mut state, leaf, 2.0, &layout).unwrap();
        drag_over(&mut state, leaf, 15.0, &layout).unwrap();

        let indicators = state
            .doc
            .descendants(root)
            .into_iter()
            .filter(|n| state.doc.attr(*n, DROP_INDICATOR_ATTR).is_some())
            .count();
        assert_eq!(indicators, 1);
        assert_eq!(state.drag.as_ref().unwrap().target, Some((first, DropSide::After)));
        assert_eq!(
            state.serialize(),
            r#"<p>a</p><div contenteditable="false">x</div><p>b</p>"#
        );
    }

    #[test]
    fn editable_blocks_are_not_draggable() {
        let mut state = state_from("<p>a</p>");
        let p = state.doc.first_child(state.doc.root()).unwrap();
        assert_eq!(drag_start(&mut state, p), Err(EditorError::NotEditable));
        assert!(state.drag.is_none());
    }
}
