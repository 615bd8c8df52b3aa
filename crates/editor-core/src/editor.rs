use std::time::Instant;

use crate::command::{Command, CommandKind};
use crate::config::EditorConfig;
use crate::drag::{DropSide, Layout, drag_end, drag_over, drag_start};
use crate::editing::{insert_placeholder, repair, resolve_placeholder};
use crate::error::Result;
use crate::extension::{Capability, ExtensionRegistry};
use crate::history::History;
use crate::range::{Range, SerializedRange, start_of};
use crate::serialize::Serializer;
use crate::state::EditorState;
use crate::tree::{Document, NodeId};
use crate::value::EditorValue;

type ChangeListener = Box<dyn FnMut(&str)>;

/// Host-facing editor: owns the tree, the selection and the history, and
/// routes commands through the extension registry.
pub struct Editor {
    state: EditorState,
    registry: ExtensionRegistry,
    listeners: Vec<ChangeListener>,
    last_serialized: String,
}

impl Editor {
    pub fn new(config: EditorConfig, registry: ExtensionRegistry) -> Self {
        let config = config.with_defaults();
        let mut serializer = Serializer::new(config.ui_only_tag.clone());
        for plugin in registry.content_plugins() {
            serializer.register(plugin);
        }
        let mut state = EditorState::new(config, serializer);
        registry.declare_schema(&mut state.doc);
        let mut editor = Self {
            state,
            registry,
            listeners: Vec::new(),
            last_serialized: String::new(),
        };
        editor.normalize_and_reset();
        editor
    }

    pub fn with_default_extensions() -> Self {
        Self::new(EditorConfig::default(), ExtensionRegistry::standard())
    }

    pub fn from_html(html: &str) -> Result<Self> {
        let mut editor = Self::with_default_extensions();
        editor.load_html(html)?;
        Ok(editor)
    }

    pub fn doc(&self) -> &Document {
        &self.state.doc
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    pub fn history(&self) -> &History {
        &self.state.history
    }

    pub fn range(&self) -> Option<Range> {
        self.state.range().ok()
    }

    /// Host selection change. Drops pending formats, as does every command
    /// that moves the selection.
    pub fn set_range(&mut self, range: Range) {
        self.state.set_range(range);
        self.state.pending.clear();
        self.registry.selection_changed(&mut self.state);
    }

    pub fn serialize(&self) -> String {
        self.state.serialize()
    }

    pub fn serialize_fragment(&self, nodes: &[NodeId]) -> String {
        self.state.serialize_fragment(nodes)
    }

    pub fn value(&self) -> EditorValue {
        EditorValue::from_html(self.serialize())
    }

    pub fn load_value(&mut self, value: &EditorValue) -> Result<()> {
        self.load_html(&value.html)
    }

    /// Capabilities enabled at the current selection.
    pub fn selection_capabilities(&self) -> Vec<Capability> {
        match self.state.range() {
            Ok(range) => self.registry.selection_capabilities(&self.state, &range),
            Err(_) => Vec::new(),
        }
    }

    pub fn can_undo(&self) -> bool {
        self.state.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.state.history.can_redo()
    }

    /// Registers a listener called with the new markup after every change.
    pub fn on_change(&mut self, listener: impl FnMut(&str) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Replaces the content and starts a fresh history.
    pub fn load_html(&mut self, html: &str) -> Result<()> {
        self.state.replace_content(html)?;
        self.normalize_and_reset();
        Ok(())
    }

    /// Replaces the content as an undoable change, keeping the selection
    /// where its paths still resolve.
    pub fn set_content(&mut self, html: &str) -> Result<()> {
        self.set_content_at(html, Instant::now())
    }

    pub fn set_content_at(&mut self, html: &str, now: Instant) -> Result<()> {
        self.flush_changes_at(now);
        let selection = self
            .state
            .range()
            .ok()
            .and_then(|range| SerializedRange::from_range(&self.state.doc, &range));
        self.state.replace_content(html)?;
        self.attach_and_repair();
        self.state.range = selection.and_then(|s| s.resolve(&self.state.doc));
        self.state.pending.clear();
        self.registry.selection_changed(&mut self.state);
        self.flush_changes_at(now);
        Ok(())
    }

    /// Runs `command` without flushing. Failures are logged and the command
    /// counts as handled.
    pub fn dispatch(&mut self, command: impl Into<Command>) -> bool {
        self.dispatch_at(command, Instant::now())
    }

    pub fn dispatch_at(&mut self, command: impl Into<Command>, now: Instant) -> bool {
        let command = command.into();
        self.flush_changes_at(now);
        let before = self.state.range;
        let pending_before = self.state.pending.clone();
        match self.registry.dispatch(&mut self.state, &command) {
            Ok(true) => {}
            Ok(false) => tracing::debug!(kind = ?command.kind, "command not claimed"),
            Err(err) => tracing::debug!(kind = ?command.kind, %err, "command failed"),
        }
        if self.state.range != before && self.state.pending == pending_before {
            self.state.pending.clear();
        }
        self.after_command(before);
        if matches!(command.kind, CommandKind::HistoryUndo | CommandKind::HistoryRedo) {
            self.sync_without_recording();
        }
        true
    }

    /// Dispatches and immediately publishes the resulting change.
    pub fn run_command(&mut self, command: impl Into<Command>) -> bool {
        self.run_command_at(command, Instant::now())
    }

    pub fn run_command_at(&mut self, command: impl Into<Command>, now: Instant) -> bool {
        let handled = self.dispatch_at(command, now);
        self.flush_changes_at(now);
        handled
    }

    pub fn undo(&mut self) -> bool {
        self.run_command(CommandKind::HistoryUndo)
    }

    pub fn redo(&mut self) -> bool {
        self.run_command(CommandKind::HistoryRedo)
    }

    /// Publishes the current markup to listeners and history when it
    /// differs from the last published one.
    pub fn flush_changes(&mut self) -> bool {
        self.flush_changes_at(Instant::now())
    }

    pub fn flush_changes_at(&mut self, now: Instant) -> bool {
        let serialized = self.state.serialize();
        if serialized == self.last_serialized {
            return false;
        }
        let snapshot = self.state.snapshot();
        self.state.history.set_state(snapshot, now);
        self.publish(serialized);
        true
    }

    /// Advances the history debounce timer.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.flush_changes_at(now);
        self.state.history.tick(now)
    }

    pub fn drag_start(&mut self, node: NodeId) -> Result<()> {
        drag_start(&mut self.state, node)
    }

    pub fn drag_over(
        &mut self,
        over: NodeId,
        pointer_y: f32,
        layout: &impl Layout,
    ) -> Result<Option<(NodeId, DropSide)>> {
        drag_over(&mut self.state, over, pointer_y, layout)
    }

    /// Ends the drag and publishes the move. Returns the dropped node.
    pub fn drag_end(&mut self) -> Result<Option<NodeId>> {
        self.drag_end_at(Instant::now())
    }

    pub fn drag_end_at(&mut self, now: Instant) -> Result<Option<NodeId>> {
        let before = self.state.range;
        let dropped = drag_end(&mut self.state)?;
        if self.state.range != before {
            self.state.pending.clear();
        }
        if dropped.is_some() {
            self.registry.attach_all(&mut self.state);
        }
        self.after_command(before);
        self.flush_changes_at(now);
        Ok(dropped)
    }

    pub fn insert_placeholder(&mut self, label: &str) -> Result<NodeId> {
        insert_placeholder(&mut self.state, label)
    }

    pub fn resolve_placeholder(&mut self, placeholder: NodeId, html: &str) -> Result<()> {
        resolve_placeholder(&mut self.state, placeholder, html)?;
        self.registry.attach_all(&mut self.state);
        self.flush_changes();
        Ok(())
    }

    /// Runs every extension's teardown hook.
    pub fn detach(&mut self) {
        self.registry.detach_all(&mut self.state);
    }

    fn after_command(&mut self, before: Option<Range>) {
        if self.state.take_content_replaced() {
            self.registry.attach_all(&mut self.state);
        }
        if self.state.range != before {
            self.registry.selection_changed(&mut self.state);
        }
    }

    /// Publishes a history-restored state without recording it again.
    fn sync_without_recording(&mut self) {
        let serialized = self.state.serialize();
        if serialized != self.last_serialized {
            self.publish(serialized);
        }
    }

    fn publish(&mut self, serialized: String) {
        for listener in &mut self.listeners {
            listener(&serialized);
        }
        self.last_serialized = serialized;
    }

    /// Attach hooks mark content blocks non-editable, so they run before
    /// the repair pass.
    fn attach_and_repair(&mut self) {
        self.state.take_content_replaced();
        self.registry.attach_all(&mut self.state);
        let root = self.state.doc.root();
        repair(&mut self.state.doc, root);
    }

    fn normalize_and_reset(&mut self) {
        self.attach_and_repair();
        let doc = &self.state.doc;
        let root = doc.root();
        let first_editable = doc
            .children(root)
            .iter()
            .copied()
            .find(|block| !doc.is_non_editable(*block))
            .unwrap_or(root);
        self.state.range = Some(Range::collapsed(start_of(doc, first_editable)));
        self.state.pending.clear();
        self.registry.selection_changed(&mut self.state);
        let snapshot = self.state.snapshot();
        self.last_serialized = snapshot.content.clone();
        self.state.history.reset(snapshot);
    }
}
