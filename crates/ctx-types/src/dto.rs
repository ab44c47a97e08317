//! Request and response DTOs for the context search/add endpoints and chat.

use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// Visibility classifier passed through to the service unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    Internal,
    External,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Internal => "internal",
            Scope::External => "external",
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "internal" => Ok(Scope::Internal),
            "external" => Ok(Scope::External),
            other => Err(format!("unknown scope: {other}")),
        }
    }
}

/// Search mode, sent as the `mode` URL query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    Fast,
    Standard,
}

impl QueryMode {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryMode::Fast => "fast",
            QueryMode::Standard => "standard",
        }
    }
}

impl std::fmt::Display for QueryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(QueryMode::Fast),
            "standard" => Ok(QueryMode::Standard),
            other => Err(format!("unknown query mode: {other}")),
        }
    }
}

/// Kind of context being added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextType {
    #[default]
    Resource,
    Conversation,
    Instruction,
}

impl FromStr for ContextType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "resource" => Ok(ContextType::Resource),
            "conversation" => Ok(ContextType::Conversation),
            "instruction" => Ok(ContextType::Instruction),
            other => Err(format!("unknown context type: {other}")),
        }
    }
}

/// Optional search filter (`body_metadata`). Field names are camelCase on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<Vec<String>>,
}

/// Context search request body.
///
/// Thresholds are not validated here; out-of-range values go to the service as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub similarity_threshold: f64,
    pub minimum_similarity_threshold: f64,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_metadata: Option<BodyMetadata>,
}

impl SearchRequest {
    pub fn new(
        query: impl Into<String>,
        similarity_threshold: f64,
        minimum_similarity_threshold: f64,
    ) -> Self {
        Self {
            query: query.into(),
            similarity_threshold,
            minimum_similarity_threshold,
            scope: Scope::Internal,
            body_metadata: None,
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_body_metadata(mut self, metadata: BodyMetadata) -> Self {
        self.body_metadata = Some(metadata);
        self
    }
}

/// Secondary search options, carried in the URL query string rather than the body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<QueryMode>,
}

impl SearchOptions {
    pub fn with_mode(mode: QueryMode) -> Self {
        Self { mode: Some(mode) }
    }
}

/// One matched context. The service owns the shape; known fields are lifted
/// out and everything else is kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ContextRecord {
    /// Content text, or an empty string when the record carries none.
    pub fn content_or_empty(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

/// Context search response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub contexts: Vec<ContextRecord>,
}

/// Absent and `null` both mean no contexts.
fn null_as_empty<'de, D>(d: D) -> Result<Vec<ContextRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<ContextRecord>>::deserialize(d)?.unwrap_or_default())
}

/// Single document in an add request. Document metadata is opaque to this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: None,
        }
    }
}

/// Request-level metadata for an add call (camelCase on the wire).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    /// RFC 3339 timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<Vec<String>>,
}

/// Context add request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddRequest {
    pub documents: Vec<Document>,
    #[serde(default)]
    pub context_type: ContextType,
    pub source: String,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<AddMetadata>,
}

/// Add responses are passed back as raw JSON.
pub type AddResponse = serde_json::Value;

/// Single chat message (system/user/assistant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}
