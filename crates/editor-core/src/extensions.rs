use std::sync::Arc;

use crate::command::{Command, CommandKind};
use crate::editing::{
    Direction, delete_collapsed, delete_selection, insert_fragment, insert_lines,
    insert_paragraph, insert_paragraph_after, insert_placeholder, insert_text, remove_block,
    select_all,
};
use crate::error::{EditorError, Result};
use crate::extension::{
    CAP_BLOCK_STRUCTURE, CAP_HISTORY, CAP_INLINE_FORMAT, CAP_LINK, CAP_LIST, CAP_MARK, CAP_TEXT,
    Capability, EditorExtension, ExtensionRegistry, Handled,
};
use crate::format::{
    BOLD, ITALIC, LINK, MARK, REMOVABLE_FORMATS, STRIKE, Selector, UNDERLINE, WrapTemplate,
    owner_block, set_wrapper_attr, toggle_format, transform_range, unwrap,
};
use crate::list::{self, Retype};
use crate::serialize::{ContentPlugin, UI_ATTR_PREFIX, escape_into};
use crate::state::EditorState;
use crate::tree::{CONTENTEDITABLE, Document, NodeData, NodeId};

pub const SELECTED_ATTR: &str = "data-ui-selected";
pub const CAPTION_TAG: &str = "figcaption";
pub const EMBED_TAG: &str = "embed-block";
pub const EMBED_PREVIEW_CLASS: &str = "embed-preview";
const BLOCK_FORMAT_TAGS: &[&str] = &["p", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre"];

impl ExtensionRegistry {
    /// Every built-in extension, in dispatch priority order.
    pub fn standard() -> Self {
        let extensions: Vec<Box<dyn EditorExtension>> = vec![
            Box::new(HistoryExtension),
            Box::new(NonEditableExtension),
            Box::new(CaptionExtension),
            Box::new(ListExtension),
            Box::new(LinkExtension),
            Box::new(MarkExtension),
            Box::new(InlineFormatExtension),
            Box::new(BlockFormatExtension),
            Box::new(EmbedExtension),
            Box::new(CoreExtension),
        ];
        Self::new(extensions).expect("standard registry must be valid")
    }

    /// Plain text editing only.
    pub fn minimal() -> Self {
        let extensions: Vec<Box<dyn EditorExtension>> =
            vec![Box::new(HistoryExtension), Box::new(CoreExtension)];
        Self::new(extensions).expect("minimal registry must be valid")
    }
}

fn claimed(result: Result<()>) -> Result<Handled> {
    result.map(|()| Handled::Claimed)
}

pub struct HistoryExtension;

impl EditorExtension for HistoryExtension {
    fn id(&self) -> &'static str {
        "history"
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![CAP_HISTORY.to_string()]
    }

    fn handle(&self, state: &mut EditorState, command: &Command) -> Result<Handled> {
        let snapshot = match command.kind {
            CommandKind::HistoryUndo => state.history.undo().cloned(),
            CommandKind::HistoryRedo => state.history.redo().cloned(),
            _ => return Ok(Handled::Declined),
        };
        if let Some(snapshot) = snapshot {
            state.pending.clear();
            state.restore(&snapshot)?;
        }
        Ok(Handled::Claimed)
    }
}

/// Delete and Enter while a non-editable block is selected as a whole.
pub struct NonEditableExtension;

impl EditorExtension for NonEditableExtension {
    fn id(&self) -> &'static str {
        "non-editable"
    }

    fn handle(&self, state: &mut EditorState, command: &Command) -> Result<Handled> {
        let Some(node) = state.focused_non_editable() else {
            return Ok(Handled::Declined);
        };
        match command.kind {
            CommandKind::DeleteContentBackward | CommandKind::DeleteContentForward => {
                claimed(remove_block(state, node))
            }
            CommandKind::InsertParagraph => claimed(insert_paragraph_after(state, node)),
            _ => Ok(Handled::Declined),
        }
    }

    fn selection_changed(&self, state: &mut EditorState) {
        let root = state.doc.root();
        for node in state.doc.descendants(root) {
            if state.doc.attr(node, SELECTED_ATTR).is_some() {
                state.doc.remove_attr(node, SELECTED_ATTR);
            }
        }
        if let Some(node) = state.focused_non_editable() {
            state.doc.set_attr(node, SELECTED_ATTR, "true");
        }
    }

    fn detach(&self, state: &mut EditorState) {
        let root = state.doc.root();
        for node in state.doc.descendants(root) {
            state.doc.remove_attr(node, SELECTED_ATTR);
        }
    }
}

/// Figure captions: single-line, inline formatting only.
pub struct CaptionExtension;

impl CaptionExtension {
    fn caption_at(state: &EditorState) -> Option<NodeId> {
        let range = state.range().ok()?;
        let doc = &state.doc;
        let start = doc.closest(range.start.node, |d, n| d.has_tag(n, CAPTION_TAG));
        let end = doc.closest(range.end.node, |d, n| d.has_tag(n, CAPTION_TAG));
        start.or(end)
    }
}

impl EditorExtension for CaptionExtension {
    fn id(&self) -> &'static str {
        "caption"
    }

    fn tag(&self) -> Option<&'static str> {
        Some(CAPTION_TAG)
    }

    fn attach(&self, state: &mut EditorState) {
        let attr = state.config.capabilities_attr.clone();
        let root = state.doc.root();
        for node in state.doc.descendants(root) {
            if state.doc.has_tag(node, CAPTION_TAG) {
                state.doc.set_attr(node, attr.clone(), CAP_INLINE_FORMAT);
            }
        }
    }

    fn detach(&self, state: &mut EditorState) {
        let attr = state.config.capabilities_attr.clone();
        let root = state.doc.root();
        for node in state.doc.descendants(root) {
            if state.doc.has_tag(node, CAPTION_TAG) {
                state.doc.remove_attr(node, &attr);
            }
        }
    }

    fn handle(&self, state: &mut EditorState, command: &Command) -> Result<Handled> {
        if Self::caption_at(state).is_none() {
            return Ok(Handled::Declined);
        }
        match command.kind {
            CommandKind::InsertParagraph
            | CommandKind::FormatIndent
            | CommandKind::FormatOutdent
            | CommandKind::InsertOrderedList
            | CommandKind::InsertUnorderedList
            | CommandKind::FormatBlock => Ok(Handled::Claimed),
            CommandKind::InsertFromPaste | CommandKind::InsertFromDrop => {
                let text = command
                    .transfer
                    .as_ref()
                    .and_then(|t| t.text.clone())
                    .or_else(|| command.value.clone())
                    .unwrap_or_default();
                claimed(insert_text(state, &text.replace(['\r', '\n'], " ")))
            }
            _ => Ok(Handled::Declined),
        }
    }
}

pub struct ListExtension;

impl EditorExtension for ListExtension {
    fn id(&self) -> &'static str {
        "list"
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![CAP_LIST.to_string()]
    }

    fn handle(&self, state: &mut EditorState, command: &Command) -> Result<Handled> {
        match command.kind {
            CommandKind::InsertOrderedList => claimed(list::retype(state, Retype::List("ol".into()))),
            CommandKind::InsertUnorderedList => {
                claimed(list::retype(state, Retype::List("ul".into())))
            }
            CommandKind::FormatIndent if list::selection_in_list(state) => {
                claimed(list::indent(state))
            }
            CommandKind::FormatOutdent if list::selection_in_list(state) => {
                claimed(list::outdent(state))
            }
            CommandKind::FormatBlock if list::selection_in_list(state) => {
                let tag = block_tag(command)?;
                claimed(list::retype(state, Retype::Block(tag)))
            }
            CommandKind::InsertParagraph if cursor_in_item(state) => {
                claimed(list::insert_paragraph(state))
            }
            CommandKind::DeleteContentBackward => {
                Ok(handled_if(list::delete_at_boundary(state, Direction::Backward)?))
            }
            CommandKind::DeleteContentForward => {
                Ok(handled_if(list::delete_at_boundary(state, Direction::Forward)?))
            }
            _ => Ok(Handled::Declined),
        }
    }
}

fn handled_if(done: bool) -> Handled {
    if done { Handled::Claimed } else { Handled::Declined }
}

fn cursor_in_item(state: &EditorState) -> bool {
    state
        .range()
        .is_ok_and(|range| state.doc.is_list_item(owner_block(&state.doc, range.start.node)))
}

fn block_tag(command: &Command) -> Result<String> {
    let tag = command.value_str().trim().to_ascii_lowercase();
    if BLOCK_FORMAT_TAGS.contains(&tag.as_str()) {
        Ok(tag)
    } else {
        Err(EditorError::BoundaryNotFound("unsupported block tag"))
    }
}

pub struct LinkExtension;

impl EditorExtension for LinkExtension {
    fn id(&self) -> &'static str {
        "link"
    }

    fn tag(&self) -> Option<&'static str> {
        Some("a")
    }

    fn inline(&self) -> bool {
        true
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![CAP_LINK.to_string()]
    }

    fn handle(&self, state: &mut EditorState, command: &Command) -> Result<Handled> {
        let selector = Selector::tags(LINK);
        let value = command.value_str().trim();
        match command.kind {
            CommandKind::InsertLink => {
                claimed(set_wrapper_attr(state, &selector, "href", value, "title"))
            }
            CommandKind::FormatLinkTitle => {
                claimed(set_wrapper_attr(state, &selector, "title", value, "href"))
            }
            _ => Ok(Handled::Declined),
        }
    }
}

/// Text and background colour highlights.
pub struct MarkExtension;

impl EditorExtension for MarkExtension {
    fn id(&self) -> &'static str {
        "mark"
    }

    fn tag(&self) -> Option<&'static str> {
        Some("mark")
    }

    fn inline(&self) -> bool {
        true
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![CAP_MARK.to_string()]
    }

    fn handle(&self, state: &mut EditorState, command: &Command) -> Result<Handled> {
        let selector = Selector::tags(MARK);
        let value = command.value_str().trim();
        match command.kind {
            CommandKind::FormatFontColor => {
                claimed(set_wrapper_attr(state, &selector, "color", value, "background"))
            }
            CommandKind::FormatBackColor => {
                claimed(set_wrapper_attr(state, &selector, "background", value, "color"))
            }
            _ => Ok(Handled::Declined),
        }
    }
}

pub struct InlineFormatExtension;

impl EditorExtension for InlineFormatExtension {
    fn id(&self) -> &'static str {
        "inline-format"
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![CAP_INLINE_FORMAT.to_string()]
    }

    fn handle(&self, state: &mut EditorState, command: &Command) -> Result<Handled> {
        let (tags, tag) = match command.kind {
            CommandKind::FormatBold => (BOLD, "b"),
            CommandKind::FormatItalic => (ITALIC, "i"),
            CommandKind::FormatUnderline => (UNDERLINE, "u"),
            CommandKind::FormatStrikeThrough => (STRIKE, "s"),
            CommandKind::FormatRemove => return claimed(remove_formats(state)),
            _ => return Ok(Handled::Declined),
        };
        claimed(toggle_format(state, &Selector::tags(tags), &WrapTemplate::new(tag)))
    }
}

fn remove_formats(state: &mut EditorState) -> Result<()> {
    let range = state.range()?;
    state.pending.clear();
    if range.is_collapsed() {
        return Ok(());
    }
    let selector = Selector::tags(REMOVABLE_FORMATS);
    let next = transform_range(&mut state.doc, &range, |doc, fragment| {
        unwrap(doc, fragment, &selector)
    })?;
    state.set_range(next);
    Ok(())
}

/// Retags the root-level text blocks touched by the selection.
pub struct BlockFormatExtension;

impl EditorExtension for BlockFormatExtension {
    fn id(&self) -> &'static str {
        "block-format"
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![CAP_BLOCK_STRUCTURE.to_string()]
    }

    fn handle(&self, state: &mut EditorState, command: &Command) -> Result<Handled> {
        if command.kind != CommandKind::FormatBlock {
            return Ok(Handled::Declined);
        }
        let tag = block_tag(command)?;
        let range = state.range()?;
        let doc = &mut state.doc;
        let root = doc.root();
        let first = doc.root_level_ancestor(range.start.node, root);
        let last = doc.root_level_ancestor(range.end.node, root);
        let (Some(first), Some(last)) = (first, last) else {
            return Err(EditorError::BoundaryNotFound("selection outside blocks"));
        };
        let from = doc.index_in_parent(first).unwrap_or(0);
        let to = doc.index_in_parent(last).unwrap_or(from);
        for block in doc.children(root)[from..=to.max(from)].to_vec() {
            if doc.is_text_block(block) && !doc.is_list_item(block) {
                doc.set_tag(block, tag.clone());
            }
        }
        Ok(Handled::Claimed)
    }
}

/// Serializes embed blocks as their bare element. The preview children and
/// the non-editable flag are rebuilt on attach.
struct EmbedSerializer;

impl ContentPlugin for EmbedSerializer {
    fn tag(&self) -> &'static str {
        EMBED_TAG
    }

    fn serialize(&self, doc: &Document, node: NodeId) -> Option<String> {
        let Some(NodeData::Element { tag, attrs }) = doc.data(node) else {
            return None;
        };
        let mut out = format!("<{tag}");
        for (key, value) in attrs {
            if key.starts_with(UI_ATTR_PREFIX) || key == CONTENTEDITABLE {
                continue;
            }
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            escape_into(value, &mut out);
            out.push('"');
        }
        out.push_str("/>");
        Some(out)
    }
}

pub struct EmbedExtension;

impl EditorExtension for EmbedExtension {
    fn id(&self) -> &'static str {
        "embed"
    }

    fn tag(&self) -> Option<&'static str> {
        Some(EMBED_TAG)
    }

    fn content_plugins(&self) -> Vec<Arc<dyn ContentPlugin>> {
        vec![Arc::new(EmbedSerializer)]
    }

    fn attach(&self, state: &mut EditorState) {
        let root = state.doc.root();
        for node in state.doc.descendants(root) {
            if !state.doc.has_tag(node, EMBED_TAG) || !state.doc.children(node).is_empty() {
                continue;
            }
            state.doc.set_attr(node, CONTENTEDITABLE, "false");
            if let Err(err) = attach_preview(&mut state.doc, node) {
                tracing::debug!(?node, %err, "embed preview not attached");
            }
        }
    }
}

fn attach_preview(doc: &mut Document, embed: NodeId) -> Result<()> {
    let src = doc.attr(embed, "data-src").unwrap_or_default().to_string();
    let preview = doc.element("div");
    doc.set_attr(preview, "class", EMBED_PREVIEW_CLASS);
    let label = doc.create_text(src);
    doc.append(preview, label)?;
    doc.append(embed, preview)
}

/// Text input, paste and drop, Enter, Delete, select-all.
pub struct CoreExtension;

impl EditorExtension for CoreExtension {
    fn id(&self) -> &'static str {
        "core"
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![CAP_TEXT.to_string()]
    }

    fn handle(&self, state: &mut EditorState, command: &Command) -> Result<Handled> {
        match command.kind {
            CommandKind::InsertText => claimed(insert_text(state, command.value_str())),
            CommandKind::InsertFromPaste | CommandKind::InsertFromDrop => {
                claimed(insert_transfer(state, command))
            }
            CommandKind::InsertParagraph => claimed(insert_paragraph(state)),
            CommandKind::DeleteContentBackward => {
                claimed(delete_collapsed(state, Direction::Backward))
            }
            CommandKind::DeleteContentForward => {
                claimed(delete_collapsed(state, Direction::Forward))
            }
            CommandKind::SelectAll => claimed(select_all(state)),
            _ => Ok(Handled::Declined),
        }
    }
}

fn insert_transfer(state: &mut EditorState, command: &Command) -> Result<()> {
    let Some(transfer) = command.transfer.as_ref() else {
        return insert_lines(state, command.value_str());
    };
    if let Some(html) = transfer.html.as_deref().filter(|h| !h.trim().is_empty()) {
        return insert_fragment(state, html);
    }
    if let Some(text) = transfer.text.as_deref() {
        return insert_lines(state, text);
    }
    if let Some(file) = transfer.file.as_deref() {
        if !state.range()?.is_collapsed() {
            delete_selection(state)?;
        }
        let placeholder = insert_placeholder(state, file)?;
        tracing::debug!(?placeholder, file, "inserted upload placeholder");
    }
    Ok(())
}
