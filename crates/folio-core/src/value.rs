use serde::{Deserialize, Serialize};

use crate::content::{ContentState, RawContent};
use crate::error::InvariantError;

const DEFAULT_SCHEMA: &str = "folio";
const DEFAULT_VERSION: u32 = 1;

fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

fn default_version() -> u32 {
    DEFAULT_VERSION
}

/// Versioned JSON envelope for stored documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentValue {
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_version")]
    pub version: u32,
    pub content: RawContent,
}

impl DocumentValue {
    pub fn from_content(content: &ContentState) -> Self {
        Self {
            schema: default_schema(),
            version: default_version(),
            content: content.to_raw(),
        }
    }

    pub fn into_content(self) -> Result<ContentState, InvariantError> {
        ContentState::from_raw(self.content)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
