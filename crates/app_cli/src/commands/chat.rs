use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use core_orchestrator::{ChatSession, ScrollTracker, TurnOutcome};
use core_types::ImageAttachment;
use i18n::I18n;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use super::{AppContext, read_upload};
use crate::output::write_message;

const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

async fn load_image(path: &Path) -> Result<ImageAttachment> {
    let file = read_upload(path).await?;
    Ok(ImageAttachment::new(file.file_name, file.bytes))
}

/// Prints transcript entries the tracker has not shown yet.
fn redraw(session: &ChatSession, tracker: &mut ScrollTracker, i18n: &I18n) -> Result<()> {
    let state = session.snapshot();
    let Some(update) = tracker.observe(&state) else {
        return Ok(());
    };
    let mut out = io::stdout().lock();
    for message in &state.transcript[update.new_entries] {
        write_message(i18n, message, &mut out)?;
    }
    if update.pending {
        writeln!(out, "{}", i18n.t("chat.pending"))?;
    }
    out.flush()?;
    Ok(())
}

/// Runs one turn while redrawing the transcript as it changes.
async fn run_turn(
    ctx: &mut AppContext,
    session: &ChatSession,
    tracker: &mut ScrollTracker,
) -> Result<TurnOutcome> {
    let turn = session.submit_turn();
    tokio::pin!(turn);
    let mut ticker = tokio::time::interval(REDRAW_INTERVAL);
    let outcome = loop {
        tokio::select! {
            biased;
            outcome = &mut turn => break outcome,
            _ = ticker.tick() => redraw(session, tracker, &ctx.i18n)?,
        }
    };
    redraw(session, tracker, &ctx.i18n)?;
    ctx.flush_notices()?;
    Ok(outcome)
}

/// Line shown for outcomes that produce no transcript entry.
fn outcome_hint<'a>(i18n: &'a I18n, outcome: &TurnOutcome) -> Option<&'a str> {
    match outcome {
        TurnOutcome::Busy => Some(i18n.t("chat.busy")),
        _ => None,
    }
}

fn prompt(ctx: &AppContext, session: &ChatSession) -> Result<()> {
    let mut out = io::stdout().lock();
    let label = ctx
        .i18n
        .format("knowledge.count_label", &[("count", &ctx.counter.get().to_string())]);
    match &session.snapshot().pending_image {
        Some(image) => write!(out, "[{label}] [{}] > ", image.attachment.file_name)?,
        None => write!(out, "[{label}] > ")?,
    }
    out.flush()?;
    Ok(())
}

pub async fn repl(ctx: &mut AppContext, use_knowledge_base: bool) -> Result<bool> {
    let session = ctx.chat_session(use_knowledge_base);
    let mut tracker = ScrollTracker::new();

    println!("{}", ctx.i18n.t("app.title"));
    println!("{}", ctx.i18n.t("chat.welcome"));
    println!("{}", ctx.i18n.t("chat.placeholder"));
    println!("{}", ctx.i18n.t("chat.repl_help"));
    session.refresh_count().await;
    info!("chat session started");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt(ctx, &session)?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        match line.split_once(' ').unwrap_or((line, "")) {
            ("/quit" | "/exit", _) => break,
            ("/count", _) => {
                if let Some(total) = session.refresh_count().await {
                    println!(
                        "{}",
                        ctx.i18n
                            .format("knowledge.count_label", &[("count", &total.to_string())])
                    );
                }
            }
            ("/drop-image", _) => {
                session.remove_image();
                println!("{}", ctx.i18n.t("chat.image_removed"));
            }
            ("/image", path) if !path.trim().is_empty() => {
                match load_image(Path::new(path.trim())).await {
                    Ok(image) => {
                        println!(
                            "{}",
                            ctx.i18n
                                .format("chat.image_attached", &[("name", &image.file_name)])
                        );
                        session.attach_image(image);
                    }
                    Err(err) => eprintln!("{err:#}"),
                }
            }
            _ => {
                session.set_draft(line);
                let outcome = run_turn(ctx, &session, &mut tracker).await?;
                debug!(?outcome, "turn finished");
                if let Some(hint) = outcome_hint(&ctx.i18n, &outcome) {
                    println!("{hint}");
                }
            }
        }
        ctx.flush_notices()?;
    }
    Ok(true)
}

pub async fn ask(
    ctx: &mut AppContext,
    question: Option<String>,
    image: Option<&Path>,
    use_knowledge_base: bool,
) -> Result<bool> {
    let session = ctx.chat_session(use_knowledge_base);
    let image = match image {
        Some(path) => Some(load_image(path).await?),
        None => None,
    };
    let outcome = session
        .send(question.as_deref().unwrap_or_default(), image)
        .await;
    ctx.flush_notices()?;

    let mut out = io::stdout().lock();
    match outcome {
        TurnOutcome::Answered(message) => {
            write_message(&ctx.i18n, &message, &mut out)?;
            Ok(true)
        }
        TurnOutcome::Failed(message) => {
            write_message(&ctx.i18n, &message, &mut out)?;
            Ok(false)
        }
        TurnOutcome::Skipped | TurnOutcome::Busy => {
            if let Some(hint) = outcome_hint(&ctx.i18n, &outcome) {
                writeln!(out, "{hint}")?;
            }
            Ok(false)
        }
    }
}

pub async fn simple(ctx: &mut AppContext, question: &str, use_knowledge_base: bool) -> Result<bool> {
    let session = ctx.chat_session(use_knowledge_base);
    let reply = session.ask_simple(question).await;
    ctx.flush_notices()?;
    match reply {
        Some(reply) => {
            println!("{}", reply.answer);
            Ok(true)
        }
        None => Ok(false),
    }
}
