use std::sync::Arc;

use crate::command::Command;
use crate::error::{EditorError, Result};
use crate::range::{Range, range_end_node, range_start_node};
use crate::serialize::ContentPlugin;
use crate::state::EditorState;
use crate::tree::{Document, NodeId};

pub type Capability = String;

pub const CAP_TEXT: &str = "text";
pub const CAP_INLINE_FORMAT: &str = "inline-format";
pub const CAP_MARK: &str = "mark";
pub const CAP_LINK: &str = "link";
pub const CAP_LIST: &str = "list";
pub const CAP_BLOCK_STRUCTURE: &str = "block-structure";
pub const CAP_HISTORY: &str = "history";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    Claimed,
    Declined,
}

/// A registered capability provider.
///
/// Handlers run in registration order; the first one returning
/// [`Handled::Claimed`] stops the chain.
pub trait EditorExtension: Send + Sync {
    fn id(&self) -> &'static str;

    /// Node type this extension owns.
    fn tag(&self) -> Option<&'static str> {
        None
    }

    /// Whether the owned node type is inline-level.
    fn inline(&self) -> bool {
        false
    }

    fn capabilities(&self) -> Vec<Capability> {
        Vec::new()
    }

    fn content_plugins(&self) -> Vec<Arc<dyn ContentPlugin>> {
        Vec::new()
    }

    /// Called when a tree becomes active, and again whenever its content is
    /// replaced wholesale.
    fn attach(&self, _state: &mut EditorState) {}

    fn detach(&self, _state: &mut EditorState) {}

    fn handle(&self, _state: &mut EditorState, _command: &Command) -> Result<Handled> {
        Ok(Handled::Declined)
    }

    fn selection_changed(&self, _state: &mut EditorState) {}
}

#[derive(Default)]
pub struct ExtensionRegistry {
    extensions: Vec<Box<dyn EditorExtension>>,
}

impl ExtensionRegistry {
    pub fn new(extensions: impl IntoIterator<Item = Box<dyn EditorExtension>>) -> Result<Self> {
        let mut registry = Self::default();
        for extension in extensions {
            registry.register(extension)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, extension: Box<dyn EditorExtension>) -> Result<()> {
        if self.extensions.iter().any(|e| e.id() == extension.id()) {
            return Err(EditorError::DuplicateExtension(extension.id().to_string()));
        }
        self.extensions.push(extension);
        Ok(())
    }

    pub fn extensions(&self) -> &[Box<dyn EditorExtension>] {
        &self.extensions
    }

    pub fn get(&self, id: &str) -> Option<&dyn EditorExtension> {
        self.extensions
            .iter()
            .find(|e| e.id() == id)
            .map(|e| e.as_ref())
    }

    /// Union of every declared capability, in registration order.
    pub fn capabilities(&self) -> Vec<Capability> {
        let mut all: Vec<Capability> = Vec::new();
        for capability in self.extensions.iter().flat_map(|e| e.capabilities()) {
            if !all.contains(&capability) {
                all.push(capability);
            }
        }
        all
    }

    pub fn content_plugins(&self) -> Vec<Arc<dyn ContentPlugin>> {
        self.extensions
            .iter()
            .flat_map(|e| e.content_plugins())
            .collect()
    }

    /// Declares inline node types and void content plugins on `doc`.
    pub fn declare_schema(&self, doc: &mut Document) {
        for extension in &self.extensions {
            if let (Some(tag), true) = (extension.tag(), extension.inline()) {
                doc.declare_inline(tag);
            }
            for plugin in extension.content_plugins() {
                if plugin.is_void() {
                    doc.declare_void(plugin.tag());
                }
            }
        }
    }

    /// Capabilities available for `range`: the full set, narrowed by every
    /// restricting node around and inside the range.
    pub fn selection_capabilities(&self, state: &EditorState, range: &Range) -> Vec<Capability> {
        let doc = &state.doc;
        let attr = state.config.capabilities_attr.as_str();
        let mut allowed = self.capabilities();

        let start = range_start_node(doc, range);
        restrict_by_ancestors(doc, start, attr, &mut allowed);

        let end = range_end_node(doc, range);
        if end == start {
            return allowed;
        }
        restrict_by_ancestors(doc, end, attr, &mut allowed);

        if !range.is_collapsed() {
            let mut current = doc.next_in_order(start, doc.root());
            while let Some(node) = current {
                if node == end {
                    break;
                }
                restrict(doc, node, attr, &mut allowed);
                current = doc.next_in_order(node, doc.root());
            }
        }

        allowed
    }

    /// Runs the first handler that claims `command`. Returns whether any did.
    pub fn dispatch(&self, state: &mut EditorState, command: &Command) -> Result<bool> {
        for extension in &self.extensions {
            if extension.handle(state, command)? == Handled::Claimed {
                tracing::trace!(extension = extension.id(), kind = ?command.kind, "command claimed");
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn attach_all(&self, state: &mut EditorState) {
        for extension in &self.extensions {
            extension.attach(state);
        }
    }

    pub fn detach_all(&self, state: &mut EditorState) {
        for extension in self.extensions.iter().rev() {
            extension.detach(state);
        }
    }

    pub fn selection_changed(&self, state: &mut EditorState) {
        for extension in &self.extensions {
            extension.selection_changed(state);
        }
    }
}

fn restrict_by_ancestors(doc: &Document, node: NodeId, attr: &str, allowed: &mut Vec<Capability>) {
    let mut current = Some(node);
    while let Some(id) = current {
        if id == doc.root() {
            break;
        }
        restrict(doc, id, attr, allowed);
        current = doc.parent(id);
    }
}

fn restrict(doc: &Document, node: NodeId, attr: &str, allowed: &mut Vec<Capability>) {
    let Some(list) = doc.attr(node, attr) else {
        return;
    };
    let permitted: Vec<&str> = list.split(',').map(str::trim).collect();
    allowed.retain(|capability| permitted.contains(&capability.as_str()));
}
