use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_HISTORY_CAP: usize = 500;
const DEFAULT_DEBOUNCE_MS: u64 = 300;
const DEFAULT_UI_ONLY_TAG: &str = "editor-ui";
const DEFAULT_PARAGRAPH_TAG: &str = "p";
const DEFAULT_CAPABILITIES_ATTR: &str = "data-ui-capabilities";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub history_cap: usize,
    pub debounce_ms: u64,
    /// Tag of ephemeral decoration nodes, never serialized.
    pub ui_only_tag: String,
    pub paragraph_tag: String,
    /// Attribute holding a comma separated capability allow-list.
    pub capabilities_attr: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_cap: DEFAULT_HISTORY_CAP,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            ui_only_tag: DEFAULT_UI_ONLY_TAG.to_string(),
            paragraph_tag: DEFAULT_PARAGRAPH_TAG.to_string(),
            capabilities_attr: DEFAULT_CAPABILITIES_ATTR.to_string(),
        }
    }
}

impl EditorConfig {
    pub fn with_defaults(mut self) -> Self {
        if self.history_cap == 0 {
            self.history_cap = DEFAULT_HISTORY_CAP;
        }
        if self.ui_only_tag.is_empty() {
            self.ui_only_tag = DEFAULT_UI_ONLY_TAG.to_string();
        }
        if self.paragraph_tag.is_empty() {
            self.paragraph_tag = DEFAULT_PARAGRAPH_TAG.to_string();
        }
        if self.capabilities_attr.is_empty() {
            self.capabilities_attr = DEFAULT_CAPABILITIES_ATTR.to_string();
        }
        self
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Self>(s).map(Self::with_defaults)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = EditorConfig::from_json_str(r#"{ "debounce_ms": 50, "history_cap": 0 }"#)
            .expect("parse config");
        assert_eq!(config.debounce(), Duration::from_millis(50));
        assert_eq!(config.history_cap, 500);
        assert_eq!(config.ui_only_tag, "editor-ui");
    }
}
