use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type Metadata = IndexMap<String, Value>;

/// Separator the backend uses between a document id and its chunk index.
pub const CHUNK_SEPARATOR: &str = "_chunk_";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeItem {
    pub content: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl KnowledgeItem {
    pub fn new(content: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            category: category.into(),
            ..Self::default()
        }
    }

    pub fn is_submittable(&self) -> bool {
        !self.content.trim().is_empty() && !self.category.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub extra: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeSearchResult {
    pub content: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub metadata: SearchMetadata,
}

impl KnowledgeSearchResult {
    /// Logical document id; empty when the entry carries no `metadata.id`.
    pub fn document_id(&self) -> &str {
        self.metadata
            .id
            .as_deref()
            .map(document_id_from)
            .unwrap_or_default()
    }

    /// Case-insensitive substring match; only an empty query matches everything.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.content.to_lowercase().contains(&query)
            || self.category.to_lowercase().contains(&query)
    }
}

/// `"doc123_chunk_2"` -> `"doc123"`; ids without a chunk suffix pass through.
pub fn document_id_from(raw: &str) -> &str {
    raw.split_once(CHUNK_SEPARATOR)
        .map_or(raw, |(prefix, _)| prefix)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeChunk {
    pub chunk_index: u32,
    pub content: String,
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeDetail {
    pub doc_id: String,
    pub content: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeSet<String>>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub chunks: Vec<KnowledgeChunk>,
}

impl KnowledgeDetail {
    pub fn to_update(&self) -> KnowledgeUpdate {
        KnowledgeUpdate {
            content: Some(self.content.clone()),
            category: Some(self.category.clone()),
            title: self.title.clone(),
            tags: self.tags.clone(),
            metadata: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateField {
    Content,
    Category,
}

impl KnowledgeUpdate {
    /// Content and category must both be present and non-blank.
    pub fn missing_field(&self) -> Option<UpdateField> {
        let blank = |value: &Option<String>| value.as_deref().is_none_or(|v| v.trim().is_empty());
        if blank(&self.content) {
            return Some(UpdateField::Content);
        }
        if blank(&self.category) {
            return Some(UpdateField::Category);
        }
        None
    }
}

/// Splits comma separated tag input, dropping blanks.
pub fn parse_tags(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct KnowledgeCount {
    pub total: u64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeAck {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportRowError {
    pub row: u64,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ImportResult {
    #[serde(default)]
    pub success_count: u64,
    #[serde(default)]
    pub failed_count: u64,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub errors: Vec<ImportRowError>,
    #[serde(default)]
    pub preview: Vec<KnowledgeItem>,
}

impl ImportResult {
    pub fn succeeded(&self) -> bool {
        self.success_count > 0
    }
}

/// File picked for upload, read fully into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Lower-cased extension including the dot, e.g. `.csv`.
    pub fn extension(&self) -> Option<String> {
        self.file_name
            .rfind('.')
            .map(|idx| self.file_name[idx..].to_ascii_lowercase())
    }
}

/// Formats an ISO-8601 timestamp for display, keeping the raw text when unparseable.
pub fn display_timestamp(raw: &str) -> String {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.format("%Y-%m-%d %H:%M:%S").to_string();
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return parsed.format("%Y-%m-%d %H:%M:%S").to_string();
    }
    raw.to_string()
}

pub fn content_preview(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    let head: String = content.chars().take(max_chars).collect();
    format!("{head}...")
}
