use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::MessageId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// Coarse answer confidence. The backend sends the Chinese labels.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub enum Confidence {
    #[serde(rename = "高", alias = "high")]
    High,
    #[default]
    #[serde(rename = "中", alias = "medium")]
    Medium,
    #[serde(rename = "低", alias = "low")]
    Low,
}

impl Confidence {
    pub fn label(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Epoch milliseconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>, image_url: Option<String>) -> Self {
        Self {
            id: MessageId::new_v4(),
            role: Role::User,
            content: content.into(),
            image_url,
            timestamp: Utc::now().timestamp_millis(),
            confidence: None,
            sources: Vec::new(),
        }
    }

    pub fn assistant(response: ChatResponse) -> Self {
        Self {
            id: MessageId::new_v4(),
            role: Role::Assistant,
            content: response.answer,
            image_url: None,
            timestamp: Utc::now().timestamp_millis(),
            confidence: Some(response.confidence),
            sources: response.knowledge_sources,
        }
    }

    /// Synthetic assistant entry standing in for a failed turn.
    pub fn failure(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new_v4(),
            role: Role::Assistant,
            content: content.into(),
            image_url: None,
            timestamp: Utc::now().timestamp_millis(),
            confidence: Some(Confidence::Low),
            sources: Vec::new(),
        }
    }

    pub fn to_history(&self) -> HistoryEntry {
        HistoryEntry {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    pub use_knowledge_base: bool,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl ChatRequest {
    pub fn text(question: impl Into<String>, history: Vec<HistoryEntry>) -> Self {
        Self {
            question: question.into(),
            image_url: None,
            image_base64: None,
            use_knowledge_base: true,
            history,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatResponse {
    pub answer: String,
    #[serde(default)]
    pub confidence: Confidence,
    #[serde(default)]
    pub knowledge_sources: Vec<String>,
    #[serde(default, alias = "llm_model")]
    pub model_used: String,
    #[serde(default)]
    pub has_image: bool,
    #[serde(default)]
    pub out_of_scope: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct SimpleChatReply {
    pub question: String,
    pub answer: String,
}

/// Image picked for the next turn, kept in memory only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageAttachment {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime_type = image_mime_for(&file_name).to_string();
        Self {
            file_name,
            mime_type,
            bytes,
        }
    }

    pub fn preview_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, BASE64.encode(&self.bytes))
    }
}

fn image_mime_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_backend_chat_response() {
        let response: ChatResponse = serde_json::from_value(json!({
            "answer": "NMN 建议早晨服用",
            "confidence": "高",
            "knowledge_sources": ["NAD+ 前体"],
            "llm_model": "qwen-max",
            "has_image": false,
            "relevance_score": 0.82
        }))
        .expect("decode");
        assert_eq!(response.confidence, Confidence::High);
        assert_eq!(response.model_used, "qwen-max");
        assert_eq!(response.relevance_score, Some(0.82));
        assert!(!response.out_of_scope);
    }

    #[test]
    fn missing_confidence_defaults_to_medium() {
        let response: ChatResponse =
            serde_json::from_value(json!({ "answer": "ok", "confidence": "low" })).expect("decode");
        assert_eq!(response.confidence, Confidence::Low);
        let response: ChatResponse =
            serde_json::from_value(json!({ "answer": "ok" })).expect("decode");
        assert_eq!(response.confidence, Confidence::Medium);
    }

    #[test]
    fn text_request_omits_image_fields() {
        let request = ChatRequest::text(
            "hi",
            vec![HistoryEntry {
                role: Role::User,
                content: "hello".to_string(),
            }],
        );
        let value = serde_json::to_value(&request).expect("encode");
        assert_eq!(
            value,
            json!({
                "question": "hi",
                "use_knowledge_base": true,
                "history": [{ "role": "user", "content": "hello" }]
            })
        );
    }

    #[test]
    fn image_preview_is_data_uri() {
        let image = ImageAttachment::new("report.PNG", vec![1, 2, 3]);
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.preview_data_uri(), "data:image/png;base64,AQID");
    }

    #[test]
    fn history_entry_strips_image_and_metadata() {
        let mut message = ChatMessage::user("look", Some("data:image/png;base64,AA==".into()));
        message.sources = vec!["x".into()];
        assert_eq!(
            message.to_history(),
            HistoryEntry {
                role: Role::User,
                content: "look".to_string(),
            }
        );
    }
}
