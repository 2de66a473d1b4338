use std::sync::Arc;

use core_types::{
    ImportResult, KnowledgeAck, KnowledgeDetail, KnowledgeItem, KnowledgeSearchResult,
    KnowledgeUpdate, RagBackend, UpdateField, UploadFile,
};
use i18n::I18n;
use notifications::NotificationCenter;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::import::{ALLOWED_IMPORT_EXTENSIONS, IMPORT_AUTO_CLOSE, ImportRejection, validate_import};
use crate::{KnowledgeCounter, RequestSlot};

#[derive(Debug, Clone, PartialEq)]
pub struct EditForm {
    pub doc_id: String,
    pub draft: KnowledgeUpdate,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportDialog {
    pub open: bool,
    pub uploading: bool,
    pub result: Option<ImportResult>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnowledgeState {
    pub entries: Vec<KnowledgeSearchResult>,
    pub count: u64,
    pub filter: String,
    pub loading: bool,
    pub viewing: Option<KnowledgeDetail>,
    pub editing: Option<EditForm>,
    /// Document awaiting delete confirmation.
    pub delete_confirm: Option<String>,
    pub import: ImportDialog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryActions {
    pub view: bool,
    pub edit: bool,
    pub delete: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    NotEditing,
    Rejected(UpdateField),
    Saved(KnowledgeAck),
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    NothingToConfirm,
    Deleted(KnowledgeAck),
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    Rejected(ImportRejection),
    /// At least one row imported; the dialog has closed and data was refreshed.
    Imported(ImportResult),
    /// The server accepted the file but imported nothing.
    NothingImported(ImportResult),
    Failed,
}

pub fn resolve_document_id(entry: &KnowledgeSearchResult) -> &str {
    entry.document_id()
}

/// Case-insensitive match on content or category; an empty query keeps everything.
pub fn filter_entries(entries: &[KnowledgeSearchResult], query: &str) -> Vec<KnowledgeSearchResult> {
    entries
        .iter()
        .filter(|entry| entry.matches(query))
        .cloned()
        .collect()
}

/// Listing, editing, deleting and importing knowledge documents.
pub struct KnowledgeManager {
    backend: Arc<dyn RagBackend>,
    notices: NotificationCenter,
    counter: KnowledgeCounter,
    i18n: I18n,
    page_size: u32,
    default_category: String,
    state: Mutex<KnowledgeState>,
    list_slot: RequestSlot,
    count_slot: RequestSlot,
}

impl KnowledgeManager {
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
            page_size: 100,
            default_category: "通用".to_string(),
            state: Mutex::new(KnowledgeState::default()),
            list_slot: RequestSlot::new(),
            count_slot: RequestSlot::new(),
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_default_category(mut self, category: impl Into<String>) -> Self {
        self.default_category = category.into();
        self
    }

    pub fn snapshot(&self) -> KnowledgeState {
        self.state.lock().clone()
    }

    /// Initial load: list and count are fetched independently.
    pub async fn load(&self) {
        futures::join!(self.refresh_list(), self.refresh_count());
    }

    /// Returns true when the fetched list was applied.
    pub async fn refresh_list(&self) -> bool {
        let ticket = self.list_slot.issue();
        self.state.lock().loading = true;
        let result = self.backend.list_knowledge(self.page_size, 0).await;

        let mut state = self.state.lock();
        match result {
            Ok(entries) => {
                if !self.list_slot.settle(ticket) {
                    debug!("dropping stale knowledge list response");
                    return false;
                }
                debug!(count = entries.len(), "knowledge list loaded");
                state.entries = entries;
                state.loading = false;
                true
            }
            Err(err) => {
                if self.list_slot.is_stale(ticket) {
                    debug!(error = %err, "ignoring failure of superseded list request");
                    return false;
                }
                error!(error = %err, "failed to load knowledge list");
                state.loading = false;
                drop(state);
                self.notices.error(self.i18n.t("knowledge.list_failed"));
                false
            }
        }
    }

    pub async fn refresh_count(&self) -> bool {
        let ticket = self.count_slot.issue();
        let result = self.backend.knowledge_count().await;

        match result {
            Ok(count) => {
                let mut state = self.state.lock();
                if !self.count_slot.settle(ticket) {
                    debug!("dropping stale knowledge count response");
                    return false;
                }
                state.count = count.total;
                drop(state);
                self.counter.publish(count.total);
                true
            }
            Err(err) => {
                if self.count_slot.is_stale(ticket) {
                    return false;
                }
                error!(error = %err, "failed to load knowledge count");
                self.notices.error(self.i18n.t("knowledge.count_failed"));
                false
            }
        }
    }

    pub fn set_filter(&self, query: impl Into<String>) {
        self.state.lock().filter = query.into();
    }

    pub fn filtered(&self) -> Vec<KnowledgeSearchResult> {
        let state = self.state.lock();
        filter_entries(&state.entries, &state.filter)
    }

    pub fn entry_actions(entry: &KnowledgeSearchResult) -> EntryActions {
        let enabled = !resolve_document_id(entry).is_empty();
        EntryActions {
            view: enabled,
            edit: enabled,
            delete: enabled,
        }
    }

    pub async fn view_document(&self, doc_id: &str) -> Option<KnowledgeDetail> {
        if doc_id.is_empty() {
            return None;
        }
        match self.backend.knowledge_detail(doc_id).await {
            Ok(detail) => {
                self.state.lock().viewing = Some(detail.clone());
                Some(detail)
            }
            Err(err) => {
                error!(doc_id, error = %err, "failed to load knowledge detail");
                self.notices.error(self.i18n.t("knowledge.detail_failed"));
                None
            }
        }
    }

    pub fn close_view(&self) {
        self.state.lock().viewing = None;
    }

    /// Loads the full document before the edit form opens.
    pub async fn begin_edit(&self, doc_id: &str) -> bool {
        if doc_id.is_empty() {
            return false;
        }
        match self.backend.knowledge_detail(doc_id).await {
            Ok(detail) => {
                self.state.lock().editing = Some(EditForm {
                    doc_id: doc_id.to_string(),
                    draft: detail.to_update(),
                });
                true
            }
            Err(err) => {
                error!(doc_id, error = %err, "failed to load document for editing");
                self.notices.error(self.i18n.t("knowledge.edit_load_failed"));
                false
            }
        }
    }

    /// Applies `edit` to the open form's draft; false when no form is open.
    pub fn update_draft(&self, edit: impl FnOnce(&mut KnowledgeUpdate)) -> bool {
        let mut state = self.state.lock();
        match state.editing.as_mut() {
            Some(form) => {
                edit(&mut form.draft);
                true
            }
            None => false,
        }
    }

    pub fn cancel_edit(&self) {
        self.state.lock().editing = None;
    }

    pub async fn submit_edit(&self) -> EditOutcome {
        let Some(form) = self.state.lock().editing.clone() else {
            return EditOutcome::NotEditing;
        };
        if let Some(field) = form.draft.missing_field() {
            let key = match field {
                UpdateField::Content => "knowledge.content_required",
                UpdateField::Category => "knowledge.category_required",
            };
            self.notices.error(self.i18n.t(key));
            return EditOutcome::Rejected(field);
        }

        match self.backend.update_knowledge(&form.doc_id, &form.draft).await {
            Ok(ack) => {
                info!(doc_id = %form.doc_id, "knowledge updated");
                self.state.lock().editing = None;
                self.notices.success(self.i18n.t("knowledge.update_success"));
                self.load().await;
                EditOutcome::Saved(ack)
            }
            Err(err) => {
                error!(doc_id = %form.doc_id, error = %err, "knowledge update failed");
                self.notices.error(
                    self.i18n
                        .format("knowledge.update_failed", &[("detail", &err.user_message())]),
                );
                EditOutcome::Failed
            }
        }
    }

    /// First step of a delete: open the confirmation for `doc_id`.
    pub fn request_delete(&self, doc_id: &str) -> bool {
        if doc_id.is_empty() {
            return false;
        }
        self.state.lock().delete_confirm = Some(doc_id.to_string());
        true
    }

    pub fn cancel_delete(&self) {
        self.state.lock().delete_confirm = None;
    }

    /// Second step: issue the delete for the document awaiting confirmation.
    pub async fn confirm_delete(&self) -> DeleteOutcome {
        let Some(doc_id) = self.state.lock().delete_confirm.take() else {
            return DeleteOutcome::NothingToConfirm;
        };
        match self.backend.delete_knowledge(&doc_id).await {
            Ok(ack) => {
                info!(doc_id = %doc_id, "knowledge deleted");
                self.notices.success(self.i18n.t("knowledge.delete_success"));
                self.load().await;
                DeleteOutcome::Deleted(ack)
            }
            Err(err) => {
                error!(doc_id = %doc_id, error = %err, "knowledge delete failed");
                self.notices.error(self.i18n.t("knowledge.delete_failed"));
                DeleteOutcome::Failed
            }
        }
    }

    /// Adds one entry; a blank category falls back to the default category.
    pub async fn add_knowledge(&self, mut item: KnowledgeItem) -> Option<KnowledgeAck> {
        item.content = item.content.trim().to_string();
        item.category = item.category.trim().to_string();
        if item.content.is_empty() {
            self.notices.error(self.i18n.t("knowledge.content_required"));
            return None;
        }
        if item.category.is_empty() {
            item.category = self.default_category.clone();
        }

        match self.backend.create_knowledge(&item).await {
            Ok(ack) => {
                self.notices.success(self.i18n.t("knowledge.add_success"));
                self.load().await;
                Some(ack)
            }
            Err(err) => {
                error!(error = %err, "failed to add knowledge");
                self.notices.error(
                    self.i18n
                        .format("knowledge.add_failed", &[("detail", &err.user_message())]),
                );
                None
            }
        }
    }

    /// Adds every submittable item in one call; blank rows are dropped first.
    pub async fn add_batch(&self, items: Vec<KnowledgeItem>) -> Option<KnowledgeAck> {
        let items: Vec<_> = items
            .into_iter()
            .filter(KnowledgeItem::is_submittable)
            .collect();
        if items.is_empty() {
            self.notices.warning(self.i18n.t("knowledge.batch_empty"));
            return None;
        }

        match self.backend.create_knowledge_batch(&items).await {
            Ok(ack) => {
                self.notices.success(
                    self.i18n
                        .format("knowledge.batch_success", &[("count", &items.len().to_string())]),
                );
                self.load().await;
                Some(ack)
            }
            Err(err) => {
                error!(error = %err, "failed to add knowledge batch");
                self.notices.error(
                    self.i18n
                        .format("knowledge.add_failed", &[("detail", &err.user_message())]),
                );
                None
            }
        }
    }

    pub async fn search(&self, query: &str, top_k: u32) -> Vec<KnowledgeSearchResult> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        match self.backend.search_knowledge(query.trim(), top_k).await {
            Ok(results) => results,
            Err(err) => {
                error!(error = %err, "knowledge search failed");
                self.notices.error(
                    self.i18n
                        .format("knowledge.search_failed", &[("detail", &err.user_message())]),
                );
                Vec::new()
            }
        }
    }

    pub fn open_import(&self) {
        self.state.lock().import = ImportDialog {
            open: true,
            ..ImportDialog::default()
        };
    }

    pub fn close_import(&self) {
        self.state.lock().import = ImportDialog::default();
    }

    /// Validates locally, uploads, and on success closes the dialog after a
    /// fixed delay and refreshes list and count.
    pub async fn import_file(&self, file: &UploadFile, format: Option<&str>) -> ImportOutcome {
        if let Err(rejection) = validate_import(file) {
            warn!(file = %file.file_name, reason = %rejection, "import rejected locally");
            let text = match &rejection {
                ImportRejection::UnsupportedExtension { .. } => self.i18n.format(
                    "import.unsupported_format",
                    &[("formats", &ALLOWED_IMPORT_EXTENSIONS.join(", "))],
                ),
                ImportRejection::TooLarge { .. } => self.i18n.t("import.too_large").to_string(),
            };
            self.notices.error(text);
            return ImportOutcome::Rejected(rejection);
        }

        {
            let mut state = self.state.lock();
            state.import.open = true;
            state.import.uploading = true;
            state.import.result = None;
        }

        let result = self
            .backend
            .import_knowledge_file(file, format, &self.default_category)
            .await;

        let result = match result {
            Ok(result) => result,
            Err(err) => {
                error!(file = %file.file_name, error = %err, "import failed");
                self.state.lock().import.uploading = false;
                self.notices.error(
                    self.i18n
                        .format("import.failed", &[("detail", &err.user_message())]),
                );
                return ImportOutcome::Failed;
            }
        };

        info!(
            file = %file.file_name,
            success = result.success_count,
            failed = result.failed_count,
            total = result.total_count,
            "import finished"
        );
        {
            let mut state = self.state.lock();
            state.import.uploading = false;
            state.import.result = Some(result.clone());
        }

        if !result.succeeded() {
            self.notices.error(self.i18n.t("import.none_imported"));
            return ImportOutcome::NothingImported(result);
        }

        self.notices.success(
            self.i18n
                .format("import.success", &[("count", &result.success_count.to_string())]),
        );
        if result.failed_count > 0 {
            self.notices.error(
                self.i18n
                    .format("import.partial_failed", &[("count", &result.failed_count.to_string())]),
            );
        }

        tokio::time::sleep(IMPORT_AUTO_CLOSE).await;
        self.close_import();
        self.load().await;
        ImportOutcome::Imported(result)
    }
}
