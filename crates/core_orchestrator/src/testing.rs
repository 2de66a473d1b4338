use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use core_types::{
    ApiResult, ChatRequest, ChatResponse, Confidence, HealthStatus, ImageAttachment, ImportResult,
    KnowledgeAck, KnowledgeCount, KnowledgeDetail, KnowledgeItem, KnowledgeSearchResult,
    KnowledgeUpdate, RagBackend, RequestError, SearchMetadata, SimpleChatReply, UploadFile,
};
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ChatText(ChatRequest),
    ChatImage {
        question: String,
        file_name: String,
        use_knowledge: bool,
    },
    Simple(String),
    List { limit: u32, offset: u32 },
    Search(String),
    Count,
    Detail(String),
    Create(KnowledgeItem),
    CreateBatch(usize),
    Update(String, KnowledgeUpdate),
    Delete(String),
    Import {
        file_name: String,
        format: Option<String>,
        category: String,
    },
    Health,
}

#[derive(Debug, Clone)]
pub enum Reply<T> {
    Ok(T),
    Fail(u16, Option<&'static str>),
    Timeout,
}

impl<T: Clone> Reply<T> {
    fn resolve(&self) -> ApiResult<T> {
        match self {
            Self::Ok(value) => Ok(value.clone()),
            Self::Fail(status, detail) => Err(RequestError::Server {
                status: *status,
                detail: detail.map(str::to_string),
            }),
            Self::Timeout => Err(RequestError::Timeout {
                after: Duration::from_secs(60),
            }),
        }
    }
}

pub fn entry(id: Option<&str>, content: &str, category: &str) -> KnowledgeSearchResult {
    KnowledgeSearchResult {
        content: content.to_string(),
        category: category.to_string(),
        score: 1.0,
        metadata: SearchMetadata {
            id: id.map(str::to_string),
            ..SearchMetadata::default()
        },
    }
}

pub fn detail(doc_id: &str) -> KnowledgeDetail {
    KnowledgeDetail {
        doc_id: doc_id.to_string(),
        content: "NMN 是 NAD+ 的前体".to_string(),
        category: "NAD+与抗衰老".to_string(),
        title: Some("NMN".to_string()),
        tags: None,
        created_at: "2024-01-01T00:00:00".to_string(),
        updated_at: None,
        metadata: Default::default(),
        chunks: Vec::new(),
    }
}

/// In-memory backend that records every call and answers from scripted replies.
pub struct FakeBackend {
    calls: Mutex<Vec<Call>>,
    pub chat: Mutex<Reply<ChatResponse>>,
    /// Delay applied before every chat reply.
    pub chat_delay: Mutex<Duration>,
    pub list: Mutex<Reply<Vec<KnowledgeSearchResult>>>,
    /// Consumed before `list`; each item delays its reply.
    pub list_queue: Mutex<VecDeque<(Duration, Reply<Vec<KnowledgeSearchResult>>)>>,
    pub search: Mutex<Reply<Vec<KnowledgeSearchResult>>>,
    pub count: Mutex<Reply<KnowledgeCount>>,
    pub detail: Mutex<Reply<KnowledgeDetail>>,
    pub ack: Mutex<Reply<KnowledgeAck>>,
    pub import: Mutex<Reply<ImportResult>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            chat: Mutex::new(Reply::Ok(ChatResponse {
                answer: "answer".to_string(),
                confidence: Confidence::High,
                knowledge_sources: vec!["source".to_string()],
                model_used: "qwen-max".to_string(),
                has_image: false,
                out_of_scope: false,
                relevance_score: None,
            })),
            chat_delay: Mutex::new(Duration::ZERO),
            list: Mutex::new(Reply::Ok(Vec::new())),
            list_queue: Mutex::new(VecDeque::new()),
            search: Mutex::new(Reply::Ok(Vec::new())),
            count: Mutex::new(Reply::Ok(KnowledgeCount {
                total: 0,
                message: String::new(),
            })),
            detail: Mutex::new(Reply::Ok(detail("doc1"))),
            ack: Mutex::new(Reply::Ok(KnowledgeAck {
                success: true,
                ..KnowledgeAck::default()
            })),
            import: Mutex::new(Reply::Ok(ImportResult::default())),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count_calls(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    async fn chat_reply(&self) -> ApiResult<ChatResponse> {
        let delay = *self.chat_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.chat.lock().resolve()
    }
}

#[async_trait]
impl RagBackend for FakeBackend {
    async fn send_chat_turn(&self, request: ChatRequest) -> ApiResult<ChatResponse> {
        self.record(Call::ChatText(request));
        self.chat_reply().await
    }

    async fn send_chat_turn_with_image(
        &self,
        question: &str,
        image: &ImageAttachment,
        use_knowledge: bool,
    ) -> ApiResult<ChatResponse> {
        self.record(Call::ChatImage {
            question: question.to_string(),
            file_name: image.file_name.clone(),
            use_knowledge,
        });
        self.chat_reply().await
    }

    async fn chat_simple(
        &self,
        question: &str,
        _use_knowledge: bool,
    ) -> ApiResult<SimpleChatReply> {
        self.record(Call::Simple(question.to_string()));
        Ok(SimpleChatReply {
            question: question.to_string(),
            answer: "simple".to_string(),
        })
    }

    async fn list_knowledge(
        &self,
        limit: u32,
        offset: u32,
    ) -> ApiResult<Vec<KnowledgeSearchResult>> {
        self.record(Call::List { limit, offset });
        let queued = self.list_queue.lock().pop_front();
        match queued {
            Some((delay, reply)) => {
                tokio::time::sleep(delay).await;
                reply.resolve()
            }
            None => self.list.lock().resolve(),
        }
    }

    async fn search_knowledge(
        &self,
        query: &str,
        _top_k: u32,
    ) -> ApiResult<Vec<KnowledgeSearchResult>> {
        self.record(Call::Search(query.to_string()));
        self.search.lock().resolve()
    }

    async fn knowledge_count(&self) -> ApiResult<KnowledgeCount> {
        self.record(Call::Count);
        self.count.lock().resolve()
    }

    async fn knowledge_detail(&self, doc_id: &str) -> ApiResult<KnowledgeDetail> {
        self.record(Call::Detail(doc_id.to_string()));
        self.detail.lock().resolve()
    }

    async fn create_knowledge(&self, item: &KnowledgeItem) -> ApiResult<KnowledgeAck> {
        self.record(Call::Create(item.clone()));
        self.ack.lock().resolve()
    }

    async fn create_knowledge_batch(&self, items: &[KnowledgeItem]) -> ApiResult<KnowledgeAck> {
        self.record(Call::CreateBatch(items.len()));
        self.ack.lock().resolve()
    }

    async fn update_knowledge(
        &self,
        doc_id: &str,
        patch: &KnowledgeUpdate,
    ) -> ApiResult<KnowledgeAck> {
        self.record(Call::Update(doc_id.to_string(), patch.clone()));
        self.ack.lock().resolve()
    }

    async fn delete_knowledge(&self, doc_id: &str) -> ApiResult<KnowledgeAck> {
        self.record(Call::Delete(doc_id.to_string()));
        self.ack.lock().resolve()
    }

    async fn import_knowledge_file(
        &self,
        file: &UploadFile,
        format: Option<&str>,
        default_category: &str,
    ) -> ApiResult<ImportResult> {
        self.record(Call::Import {
            file_name: file.file_name.clone(),
            format: format.map(str::to_string),
            category: default_category.to_string(),
        });
        self.import.lock().resolve()
    }

    async fn health(&self) -> ApiResult<HealthStatus> {
        self.record(Call::Health);
        Ok(HealthStatus {
            status: "healthy".to_string(),
            service: "fake".to_string(),
            version: None,
            message: None,
        })
    }
}
