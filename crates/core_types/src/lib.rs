use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

mod chat;
mod error;
mod knowledge;

pub use chat::{
    ChatMessage, ChatRequest, ChatResponse, Confidence, HealthStatus, HistoryEntry,
    ImageAttachment, Role, SimpleChatReply,
};
pub use error::{ApiResult, RequestError};
pub use knowledge::{
    CHUNK_SEPARATOR, ImportResult, ImportRowError, KnowledgeAck, KnowledgeChunk, KnowledgeCount,
    KnowledgeDetail, KnowledgeItem, KnowledgeSearchResult, KnowledgeUpdate, Metadata,
    SearchMetadata, UpdateField, UploadFile, content_preview, display_timestamp,
    document_id_from, parse_tags,
};

pub type MessageId = Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UiLanguage {
    ZhCn,
    EnUs,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    Error,
    Warning,
    Info,
}

/// Remote RAG service as seen by the controllers.
#[async_trait]
pub trait RagBackend: Send + Sync {
    async fn send_chat_turn(&self, request: ChatRequest) -> ApiResult<ChatResponse>;

    async fn send_chat_turn_with_image(
        &self,
        question: &str,
        image: &ImageAttachment,
        use_knowledge: bool,
    ) -> ApiResult<ChatResponse>;

    async fn chat_simple(&self, question: &str, use_knowledge: bool)
    -> ApiResult<SimpleChatReply>;

    async fn list_knowledge(
        &self,
        limit: u32,
        offset: u32,
    ) -> ApiResult<Vec<KnowledgeSearchResult>>;

    async fn search_knowledge(
        &self,
        query: &str,
        top_k: u32,
    ) -> ApiResult<Vec<KnowledgeSearchResult>>;

    async fn knowledge_count(&self) -> ApiResult<KnowledgeCount>;

    async fn knowledge_detail(&self, doc_id: &str) -> ApiResult<KnowledgeDetail>;

    async fn create_knowledge(&self, item: &KnowledgeItem) -> ApiResult<KnowledgeAck>;

    async fn create_knowledge_batch(&self, items: &[KnowledgeItem]) -> ApiResult<KnowledgeAck>;

    async fn update_knowledge(
        &self,
        doc_id: &str,
        patch: &KnowledgeUpdate,
    ) -> ApiResult<KnowledgeAck>;

    async fn delete_knowledge(&self, doc_id: &str) -> ApiResult<KnowledgeAck>;

    async fn import_knowledge_file(
        &self,
        file: &UploadFile,
        format: Option<&str>,
        default_category: &str,
    ) -> ApiResult<ImportResult>;

    async fn health(&self) -> ApiResult<HealthStatus>;
}
