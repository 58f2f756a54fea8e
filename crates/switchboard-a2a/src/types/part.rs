//! Content part types for the A2A protocol.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A content part within a message or artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Part {
    /// Text content
    #[serde(rename = "text")]
    Text(TextPart),

    /// File reference or inline file
    #[serde(rename = "file")]
    File(FilePart),

    /// Structured data
    #[serde(rename = "data")]
    Data(DataPart),
}

impl Part {
    /// Create a text part
    pub fn text(content: impl Into<String>) -> Self {
        Part::Text(TextPart {
            text: content.into(),
            metadata: HashMap::new(),
        })
    }

    /// Create a data part
    pub fn data(data: serde_json::Value) -> Self {
        Part::Data(DataPart {
            data,
            metadata: HashMap::new(),
        })
    }

    /// Get the text content if this is a text part
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text(t) => Some(&t.text),
            _ => None,
        }
    }
}

/// Text content part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextPart {
    /// The text content
    pub text: String,

    /// Additional metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// File part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePart {
    /// The file, by reference or inline
    pub file: FileContent,

    /// Additional metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// File payload of a [`FilePart`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    /// Optional file name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// MIME type of the file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// URI to the file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    /// Base64 encoded content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<String>,
}

/// Structured data part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPart {
    /// The structured data
    pub data: serde_json::Value,

    /// Additional metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}
