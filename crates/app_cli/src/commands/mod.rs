use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use config::AppConfig;
use core_orchestrator::{ChatSession, KnowledgeCounter, KnowledgeManager};
use core_types::{RagBackend, UploadFile};
use i18n::I18n;
use notifications::NotificationCenter;

use crate::output::NoticePrinter;

pub mod chat;
pub mod knowledge;

/// Shared handles every command runs against.
pub struct AppContext {
    pub backend: Arc<dyn RagBackend>,
    pub config: AppConfig,
    pub i18n: I18n,
    pub notices: NotificationCenter,
    pub counter: KnowledgeCounter,
    printer: NoticePrinter,
}

impl AppContext {
    pub fn new(backend: Arc<dyn RagBackend>, config: AppConfig) -> Self {
        Self {
            backend,
            i18n: I18n::new(config.language),
            config,
            notices: NotificationCenter::new(),
            counter: KnowledgeCounter::new(),
            printer: NoticePrinter::new(),
        }
    }

    pub fn chat_session(&self, use_knowledge_base: bool) -> ChatSession {
        ChatSession::new(
            self.backend.clone(),
            self.notices.clone(),
            self.counter.clone(),
            self.i18n.clone(),
        )
        .with_history_limit(self.config.chat.history_limit)
        .with_knowledge_base(use_knowledge_base && self.config.chat.use_knowledge_base)
    }

    pub fn knowledge_manager(&self) -> KnowledgeManager {
        KnowledgeManager::new(
            self.backend.clone(),
            self.notices.clone(),
            self.counter.clone(),
            self.i18n.clone(),
        )
        .with_page_size(self.config.knowledge.page_size)
        .with_default_category(self.config.knowledge.default_category.clone())
    }

    /// Writes notices raised since the last flush to stderr.
    pub fn flush_notices(&mut self) -> Result<()> {
        let mut err = io::stderr().lock();
        self.printer.flush(&self.notices, &mut err)?;
        err.flush()?;
        Ok(())
    }
}

pub async fn health(ctx: &mut AppContext) -> Result<bool> {
    let ok = match ctx.backend.health().await {
        Ok(status) => {
            let version = status.version.as_deref().unwrap_or("-");
            println!(
                "{} ({} {}, {})",
                ctx.i18n.t("health.ok"),
                status.service,
                version,
                status.status
            );
            true
        }
        Err(err) => {
            tracing::error!(error = %err, "health check failed");
            eprintln!(
                "{}",
                ctx.i18n
                    .format("health.failed", &[("detail", &err.user_message())])
            );
            false
        }
    };
    Ok(ok)
}

pub(crate) async fn read_upload(path: &Path) -> Result<UploadFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(UploadFile::new(file_name, bytes))
}
