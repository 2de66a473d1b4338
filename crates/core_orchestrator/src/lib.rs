//! Request/response orchestration between UI state and the RAG backend.
//!
//! Controllers are shared behind `Arc` and take `&self`; their state sits in a
//! mutex that is never held across an `.await`, so views can read a snapshot
//! while a call is in flight.

mod chat;
mod count;
mod import;
mod knowledge;
mod scroll;
mod slot;

#[cfg(test)]
mod testing;

pub use chat::{ChatSession, ChatState, PendingImage, TurnOutcome};
pub use count::KnowledgeCounter;
pub use import::{
    ALLOWED_IMPORT_EXTENSIONS, IMPORT_AUTO_CLOSE, ImportRejection, MAX_IMPORT_BYTES,
    validate_import,
};
pub use knowledge::{
    DeleteOutcome, EditForm, EditOutcome, EntryActions, ImportDialog, ImportOutcome,
    KnowledgeManager, KnowledgeState, filter_entries, resolve_document_id,
};
pub use scroll::{ScrollTracker, ScrollUpdate};
pub use slot::{RequestSlot, Ticket};
