use std::sync::Arc;

use core_types::{
    ChatMessage, ChatRequest, HistoryEntry, ImageAttachment, RagBackend, SimpleChatReply,
};
use i18n::I18n;
use notifications::NotificationCenter;
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::KnowledgeCounter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingImage {
    pub attachment: ImageAttachment,
    /// `data:` URI shown next to the input and stored on the user entry.
    pub preview: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatState {
    pub transcript: Vec<ChatMessage>,
    pub draft: String,
    pub pending_image: Option<PendingImage>,
    pub pending_send: bool,
    pub knowledge_count: u64,
}

impl ChatState {
    /// Input is disabled while a turn is in flight.
    pub fn can_submit(&self) -> bool {
        !self.pending_send && (!self.draft.trim().is_empty() || self.pending_image.is_some())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Nothing to send: blank text and no image.
    Skipped,
    /// A turn is already in flight.
    Busy,
    Answered(ChatMessage),
    Failed(ChatMessage),
}

enum TurnPlan {
    Text(ChatRequest),
    Image {
        question: String,
        attachment: ImageAttachment,
    },
}

/// Clears `pending_send` when a turn completes or its future is dropped mid-request.
struct PendingGuard<'a> {
    state: &'a Mutex<ChatState>,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().pending_send = false;
    }
}

/// Owns one conversation transcript and drives chat turns against the backend.
pub struct ChatSession {
    backend: Arc<dyn RagBackend>,
    notices: NotificationCenter,
    counter: KnowledgeCounter,
    i18n: I18n,
    history_limit: usize,
    use_knowledge_base: bool,
    state: Mutex<ChatState>,
}

impl ChatSession {
    pub fn new(
        backend: Arc<dyn RagBackend>,
        notices: NotificationCenter,
        counter: KnowledgeCounter,
        i18n: I18n,
    ) -> Self {
        Self {
            backend,
            notices,
            counter,
            i18n,
            history_limit: 10,
            use_knowledge_base: true,
            state: Mutex::new(ChatState::default()),
        }
    }

    pub fn with_history_limit(mut self, history_limit: usize) -> Self {
        self.history_limit = history_limit;
        self
    }

    pub fn with_knowledge_base(mut self, enabled: bool) -> Self {
        self.use_knowledge_base = enabled;
        self
    }

    pub fn snapshot(&self) -> ChatState {
        self.state.lock().clone()
    }

    pub fn transcript(&self) -> Vec<ChatMessage> {
        self.state.lock().transcript.clone()
    }

    pub fn is_pending(&self) -> bool {
        self.state.lock().pending_send
    }

    pub fn set_draft(&self, text: impl Into<String>) {
        self.state.lock().draft = text.into();
    }

    pub fn attach_image(&self, attachment: ImageAttachment) {
        let preview = attachment.preview_data_uri();
        debug!(file = %attachment.file_name, "image attached");
        self.state.lock().pending_image = Some(PendingImage {
            attachment,
            preview,
        });
    }

    pub fn remove_image(&self) {
        self.state.lock().pending_image = None;
    }

    /// Loads the knowledge count and shares it with whoever observes the counter.
    pub async fn refresh_count(&self) -> Option<u64> {
        match self.backend.knowledge_count().await {
            Ok(count) => {
                self.state.lock().knowledge_count = count.total;
                self.counter.publish(count.total);
                Some(count.total)
            }
            Err(err) => {
                warn!(error = %err, "{}", self.i18n.t("chat.count_failed"));
                None
            }
        }
    }

    /// Convenience for `set_draft` + `attach_image` + `submit_turn`.
    pub async fn send(&self, text: &str, image: Option<ImageAttachment>) -> TurnOutcome {
        if self.is_pending() {
            return TurnOutcome::Busy;
        }
        self.set_draft(text);
        if let Some(image) = image {
            self.attach_image(image);
        }
        self.submit_turn().await
    }

    /// Sends the current draft (text and/or image) as one turn.
    pub async fn submit_turn(&self) -> TurnOutcome {
        let plan = {
            let mut state = self.state.lock();
            if state.pending_send {
                return TurnOutcome::Busy;
            }
            let text = state.draft.trim().to_string();
            if text.is_empty() && state.pending_image.is_none() {
                return TurnOutcome::Skipped;
            }

            let history = recent_history(&state.transcript, self.history_limit);
            let image = state.pending_image.take();
            let preview = image.as_ref().map(|p| p.preview.clone());
            state.transcript.push(ChatMessage::user(text.clone(), preview));
            state.draft.clear();
            state.pending_send = true;

            match image {
                Some(pending) => TurnPlan::Image {
                    question: if text.is_empty() {
                        self.i18n.t("chat.default_image_prompt").to_string()
                    } else {
                        text
                    },
                    attachment: pending.attachment,
                },
                None => TurnPlan::Text(ChatRequest {
                    use_knowledge_base: self.use_knowledge_base,
                    ..ChatRequest::text(text, history)
                }),
            }
        };

        let pending = PendingGuard { state: &self.state };
        let result = match plan {
            TurnPlan::Text(request) => {
                debug!(history = request.history.len(), "sending text turn");
                self.backend.send_chat_turn(request).await
            }
            TurnPlan::Image {
                question,
                attachment,
            } => {
                debug!(file = %attachment.file_name, "sending image turn");
                self.backend
                    .send_chat_turn_with_image(&question, &attachment, self.use_knowledge_base)
                    .await
            }
        };

        let outcome = match result {
            Ok(response) => TurnOutcome::Answered(ChatMessage::assistant(response)),
            Err(err) => {
                error!(error = %err, "chat turn failed");
                let text = self
                    .i18n
                    .format("chat.error_reply", &[("detail", &err.user_message())]);
                self.notices.error(text.clone());
                TurnOutcome::Failed(ChatMessage::failure(text))
            }
        };

        if let TurnOutcome::Answered(message) | TurnOutcome::Failed(message) = &outcome {
            self.state.lock().transcript.push(message.clone());
        }
        drop(pending);
        outcome
    }

    /// One-shot question outside the transcript.
    pub async fn ask_simple(&self, question: &str) -> Option<SimpleChatReply> {
        if question.trim().is_empty() {
            return None;
        }
        match self
            .backend
            .chat_simple(question.trim(), self.use_knowledge_base)
            .await
        {
            Ok(reply) => Some(reply),
            Err(err) => {
                error!(error = %err, "simple chat failed");
                self.notices.error(
                    self.i18n
                        .format("chat.error_reply", &[("detail", &err.user_message())]),
                );
                None
            }
        }
    }
}

/// Last `limit` transcript entries, oldest first, reduced to role and content.
fn recent_history(transcript: &[ChatMessage], limit: usize) -> Vec<HistoryEntry> {
    let start = transcript.len().saturating_sub(limit);
    transcript[start..]
        .iter()
        .map(ChatMessage::to_history)
        .collect()
}
