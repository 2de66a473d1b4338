use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use core_orchestrator::{DeleteOutcome, EditOutcome, ImportOutcome, KnowledgeManager};
use core_types::{KnowledgeItem, parse_tags};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{AppContext, read_upload};
use crate::cli::KnowledgeCommand;
use crate::output::{write_detail, write_entry, write_import_summary};

pub async fn run(ctx: &mut AppContext, command: KnowledgeCommand) -> Result<bool> {
    let manager = ctx.knowledge_manager();
    let ok = match command {
        KnowledgeCommand::List { filter } => list(ctx, &manager, filter).await?,
        KnowledgeCommand::Count => {
            let ok = manager.refresh_count().await;
            if ok {
                print_count(ctx, manager.snapshot().count);
            }
            ok
        }
        KnowledgeCommand::Show { doc_id } => match manager.view_document(&doc_id).await {
            Some(detail) => {
                write_detail(&detail, &mut io::stdout().lock())?;
                true
            }
            None => false,
        },
        KnowledgeCommand::Add {
            content,
            category,
            title,
            tags,
        } => {
            let item = KnowledgeItem {
                title: title.filter(|t| !t.trim().is_empty()),
                tags: collect_tags(&tags),
                ..KnowledgeItem::new(content, category)
            };
            match manager.add_knowledge(item).await {
                Some(ack) => {
                    if let Some(doc_id) = ack.doc_id {
                        println!("{doc_id}");
                    }
                    true
                }
                None => false,
            }
        }
        KnowledgeCommand::AddBatch { file } => {
            let items = read_batch(&file).await?;
            manager.add_batch(items).await.is_some()
        }
        KnowledgeCommand::Search { query, top_k } => {
            let results = manager.search(&query, top_k).await;
            let mut out = io::stdout().lock();
            for result in &results {
                write!(out, "{:.3} ", result.score)?;
                write_entry(result, &mut out)?;
            }
            true
        }
        KnowledgeCommand::Edit {
            doc_id,
            content,
            category,
            title,
            tags,
        } => {
            if manager.begin_edit(&doc_id).await {
                manager.update_draft(|draft| {
                    if content.is_some() {
                        draft.content = content;
                    }
                    if category.is_some() {
                        draft.category = category;
                    }
                    if title.is_some() {
                        draft.title = title;
                    }
                    if let Some(tags) = collect_tags(&tags) {
                        draft.tags = Some(tags);
                    }
                });
                matches!(manager.submit_edit().await, EditOutcome::Saved(_))
            } else {
                false
            }
        }
        KnowledgeCommand::Delete { doc_id, yes } => delete(ctx, &manager, &doc_id, yes).await?,
        KnowledgeCommand::Import {
            file,
            format,
            category,
        } => {
            let manager = match category {
                Some(category) => manager.with_default_category(category),
                None => manager,
            };
            import(ctx, &manager, &file, format.as_deref()).await?
        }
    };
    ctx.flush_notices()?;
    Ok(ok)
}

/// Repeated `--tag` values; `None` when no usable tag was given.
fn collect_tags(raw: &[String]) -> Option<BTreeSet<String>> {
    let tags = parse_tags(&raw.join(","));
    (!tags.is_empty()).then_some(tags)
}

fn print_count(ctx: &AppContext, count: u64) {
    println!(
        "{}",
        ctx.i18n
            .format("knowledge.count_label", &[("count", &count.to_string())])
    );
}

async fn list(ctx: &mut AppContext, manager: &KnowledgeManager, filter: Option<String>) -> Result<bool> {
    manager.load().await;
    if let Some(filter) = filter {
        manager.set_filter(filter);
    }

    let entries = manager.filtered();
    let mut out = io::stdout().lock();
    if entries.is_empty() {
        writeln!(out, "{}", ctx.i18n.t("knowledge.empty"))?;
    }
    for entry in &entries {
        write_entry(entry, &mut out)?;
    }
    drop(out);
    print_count(ctx, manager.snapshot().count);
    Ok(true)
}

async fn read_batch(path: &Path) -> Result<Vec<KnowledgeItem>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of knowledge items", path.display()))
}

async fn confirm(question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush()?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let answer = lines.next_line().await?.unwrap_or_default();
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

async fn delete(ctx: &mut AppContext, manager: &KnowledgeManager, doc_id: &str, yes: bool) -> Result<bool> {
    if !manager.request_delete(doc_id) {
        return Ok(false);
    }
    if !yes && !confirm(ctx.i18n.t("knowledge.delete_confirm")).await? {
        manager.cancel_delete();
        println!("{}", ctx.i18n.t("knowledge.delete_cancelled"));
        return Ok(true);
    }
    Ok(matches!(manager.confirm_delete().await, DeleteOutcome::Deleted(_)))
}

async fn import(
    ctx: &mut AppContext,
    manager: &KnowledgeManager,
    path: &Path,
    format: Option<&str>,
) -> Result<bool> {
    let file = read_upload(path).await?;
    manager.open_import();
    let outcome = manager.import_file(&file, format).await;
    ctx.flush_notices()?;

    match outcome {
        ImportOutcome::Imported(result) => {
            write_import_summary(&ctx.i18n, &result, &mut io::stdout().lock())?;
            print_count(ctx, manager.snapshot().count);
            Ok(true)
        }
        ImportOutcome::NothingImported(result) => {
            write_import_summary(&ctx.i18n, &result, &mut io::stdout().lock())?;
            Ok(false)
        }
        ImportOutcome::Rejected(_) | ImportOutcome::Failed => Ok(false),
    }
}
