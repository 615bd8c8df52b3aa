use serde::{Deserialize, Serialize};

/// Abstract editing request. Names follow the host's input-type vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandKind {
    InsertText,
    InsertFromPaste,
    InsertFromDrop,
    InsertParagraph,
    DeleteContentBackward,
    DeleteContentForward,
    FormatBold,
    FormatItalic,
    FormatUnderline,
    FormatStrikeThrough,
    FormatRemove,
    FormatFontColor,
    FormatBackColor,
    InsertLink,
    FormatLinkTitle,
    FormatIndent,
    FormatOutdent,
    InsertOrderedList,
    InsertUnorderedList,
    FormatBlock,
    HistoryUndo,
    HistoryRedo,
    SelectAll,
}

/// Rich payload of paste and drop commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Name of a dropped file; its upload is handled by the host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    #[serde(rename = "type")]
    pub kind: CommandKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer: Option<Transfer>,
}

impl Command {
    pub fn new(kind: CommandKind) -> Self {
        Self {
            kind,
            value: None,
            transfer: None,
        }
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn transfer(mut self, transfer: Transfer) -> Self {
        self.transfer = Some(transfer);
        self
    }

    pub fn insert_text(text: impl Into<String>) -> Self {
        Self::new(CommandKind::InsertText).value(text)
    }

    pub fn paste_html(html: impl Into<String>) -> Self {
        Self::new(CommandKind::InsertFromPaste).transfer(Transfer {
            html: Some(html.into()),
            ..Transfer::default()
        })
    }

    pub fn value_str(&self) -> &str {
        self.value.as_deref().unwrap_or_default()
    }
}

impl From<CommandKind> for Command {
    fn from(kind: CommandKind) -> Self {
        Self::new(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_host_json() {
        let command: Command =
            serde_json::from_str(r#"{ "type": "insertLink", "value": "https://x.dev" }"#)
                .expect("decode command");
        assert_eq!(command.kind, CommandKind::InsertLink);
        assert_eq!(command.value_str(), "https://x.dev");

        let json = serde_json::to_string(&Command::new(CommandKind::HistoryUndo)).unwrap();
        assert_eq!(json, r#"{"type":"historyUndo"}"#);
    }
}
