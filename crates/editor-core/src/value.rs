use serde::{Deserialize, Serialize};

const DEFAULT_SCHEMA: &str = "manos-editor";
const DEFAULT_VERSION: u32 = 1;

fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

fn default_version() -> u32 {
    DEFAULT_VERSION
}

/// Persisted editor content: the serialized markup plus a schema tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorValue {
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_version")]
    pub version: u32,
    pub html: String,
}

impl EditorValue {
    pub fn from_html(html: impl Into<String>) -> Self {
        Self {
            schema: default_schema(),
            version: default_version(),
            html: html.into(),
        }
    }

    pub fn into_html(self) -> String {
        self.html
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
