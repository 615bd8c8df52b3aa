use crate::config::EditorConfig;
use crate::drag::DragState;
use crate::error::{EditorError, Result};
use crate::format::PendingFormat;
use crate::history::{History, Snapshot};
use crate::markup::parse_fragment;
use crate::range::{Range, SerializedRange};
use crate::serialize::Serializer;
use crate::tree::{Document, NodeId};

/// Per-editor context handed to every command handler.
pub struct EditorState {
    pub doc: Document,
    pub range: Option<Range>,
    /// Formats toggled at a collapsed caret, applied to the next inserted text.
    pub pending: Vec<PendingFormat>,
    pub drag: Option<DragState>,
    pub history: History,
    pub config: EditorConfig,
    pub serializer: Serializer,
    content_replaced: bool,
}

impl EditorState {
    pub fn new(config: EditorConfig, serializer: Serializer) -> Self {
        let history = History::new(
            Snapshot::new(String::new(), None),
            config.history_cap,
            config.debounce(),
        );
        Self {
            doc: Document::new(),
            range: None,
            pending: Vec::new(),
            drag: None,
            history,
            config,
            serializer,
            content_replaced: false,
        }
    }

    /// The current range in document order, if it still points into the
    /// document.
    pub fn range(&self) -> Result<Range> {
        self.range
            .filter(|range| range.is_valid(&self.doc))
            .map(|range| Range::ordered(&self.doc, range.start, range.end))
            .ok_or(EditorError::BoundaryNotFound("no selection"))
    }

    /// Stores `range` with its boundaries in document order. Hosts may
    /// report backwards selections (anchor after focus).
    pub fn set_range(&mut self, range: Range) {
        let range = if range.is_valid(&self.doc) {
            Range::ordered(&self.doc, range.start, range.end)
        } else {
            range
        };
        self.range = Some(range);
    }

    pub fn serialize(&self) -> String {
        self.serializer.serialize(&self.doc)
    }

    pub fn serialize_fragment(&self, nodes: &[NodeId]) -> String {
        self.serializer.serialize_fragment(&self.doc, nodes)
    }

    pub fn snapshot(&self) -> Snapshot {
        let selection = self
            .range
            .filter(|range| range.is_valid(&self.doc))
            .and_then(|range| SerializedRange::from_range(&self.doc, &range));
        Snapshot::new(self.serialize(), selection)
    }

    /// Replaces the content with parsed markup. The old tree is untouched
    /// when the markup cannot be read.
    pub fn replace_content(&mut self, html: &str) -> Result<()> {
        let fragment = parse_fragment(&mut self.doc, html)?;
        let nodes = self.doc.children(fragment).to_vec();
        self.doc.replace_root_children(nodes)?;
        self.doc.remove(fragment);
        self.drag = None;
        self.content_replaced = true;
        Ok(())
    }

    /// Restores content and selection from a history snapshot.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.replace_content(&snapshot.content)?;
        self.range = snapshot
            .selection
            .as_ref()
            .and_then(|selection| selection.resolve(&self.doc));
        Ok(())
    }

    /// Set once the tree was rebuilt wholesale; lifecycle hooks rerun then.
    pub fn take_content_replaced(&mut self) -> bool {
        std::mem::take(&mut self.content_replaced)
    }

    pub fn new_paragraph(&mut self) -> NodeId {
        let tag = self.config.paragraph_tag.clone();
        self.doc.element(tag)
    }

    /// The non-editable block currently selected as a whole, if any.
    pub fn focused_non_editable(&self) -> Option<NodeId> {
        let range = self.range().ok()?;
        range
            .selected_node(&self.doc)
            .filter(|node| self.doc.is_non_editable(*node))
    }
}
