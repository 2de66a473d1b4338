use std::io::{self, Write};

use core_types::{
    ChatMessage, Confidence, ImportResult, KnowledgeDetail, KnowledgeSearchResult, NoticeKind,
    Role, content_preview, display_timestamp,
};
use i18n::I18n;
use notifications::NotificationCenter;

/// Characters of entry content shown in list views.
pub const PREVIEW_CHARS: usize = 150;

/// Prints each notice once, in creation order.
#[derive(Debug, Default)]
pub struct NoticePrinter {
    last_seq: u64,
}

impl NoticePrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flush(&mut self, notices: &NotificationCenter, out: &mut impl Write) -> io::Result<()> {
        for notice in notices.since(self.last_seq) {
            writeln!(out, "[{}] {}", kind_tag(notice.kind), notice.text)?;
            self.last_seq = notice.seq;
        }
        Ok(())
    }
}

fn kind_tag(kind: NoticeKind) -> &'static str {
    match kind {
        NoticeKind::Success => "ok",
        NoticeKind::Error => "error",
        NoticeKind::Warning => "warn",
        NoticeKind::Info => "info",
    }
}

pub fn confidence_label(i18n: &I18n, confidence: Confidence) -> &str {
    match confidence {
        Confidence::High => i18n.t("confidence.high"),
        Confidence::Medium => i18n.t("confidence.medium"),
        Confidence::Low => i18n.t("confidence.low"),
    }
}

pub fn write_message(i18n: &I18n, message: &ChatMessage, out: &mut impl Write) -> io::Result<()> {
    let speaker = match message.role {
        Role::User => i18n.t("chat.role.user"),
        Role::Assistant => i18n.t("chat.role.assistant"),
    };
    write!(out, "{speaker}: {}", message.content)?;
    if message.image_url.is_some() {
        write!(out, " [image]")?;
    }
    writeln!(out)?;

    if let Some(confidence) = message.confidence {
        writeln!(
            out,
            "  {}",
            i18n.format(
                "chat.confidence",
                &[("level", confidence_label(i18n, confidence))]
            )
        )?;
    }
    if !message.sources.is_empty() {
        writeln!(
            out,
            "  {}",
            i18n.format("chat.sources", &[("sources", &message.sources.join(", "))])
        )?;
    }
    Ok(())
}

pub fn write_entry(entry: &KnowledgeSearchResult, out: &mut impl Write) -> io::Result<()> {
    let doc_id = entry.document_id();
    let created = entry
        .metadata
        .created_at
        .as_deref()
        .map(display_timestamp)
        .unwrap_or_default();
    writeln!(
        out,
        "{} [{}] {}",
        if doc_id.is_empty() { "-" } else { doc_id },
        entry.category,
        created
    )?;
    writeln!(out, "  {}", content_preview(&entry.content, PREVIEW_CHARS))
}

pub fn write_detail(detail: &KnowledgeDetail, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{} [{}]", detail.doc_id, detail.category)?;
    if let Some(title) = &detail.title {
        writeln!(out, "title: {title}")?;
    }
    if let Some(tags) = detail.tags.as_ref().filter(|t| !t.is_empty()) {
        let tags: Vec<_> = tags.iter().map(String::as_str).collect();
        writeln!(out, "tags: {}", tags.join(", "))?;
    }
    writeln!(out, "created: {}", display_timestamp(&detail.created_at))?;
    if let Some(updated) = &detail.updated_at {
        writeln!(out, "updated: {}", display_timestamp(updated))?;
    }
    writeln!(out)?;
    writeln!(out, "{}", detail.content)?;
    if detail.chunks.len() > 1 {
        writeln!(out)?;
        for chunk in &detail.chunks {
            writeln!(
                out,
                "#{} {}",
                chunk.chunk_index,
                content_preview(&chunk.content, PREVIEW_CHARS)
            )?;
        }
    }
    Ok(())
}

/// Success, failed and total counts followed by one line per rejected row.
pub fn write_import_summary(
    i18n: &I18n,
    result: &ImportResult,
    out: &mut impl Write,
) -> io::Result<()> {
    writeln!(
        out,
        "{}",
        i18n.format(
            "import.summary",
            &[
                ("success", &result.success_count.to_string()),
                ("failed", &result.failed_count.to_string()),
                ("total", &result.total_count.to_string()),
            ]
        )
    )?;
    for row in &result.errors {
        writeln!(
            out,
            "  {}",
            i18n.format(
                "import.row_error",
                &[("row", &row.row.to_string()), ("error", &row.error)]
            )
        )?;
    }
    Ok(())
}
