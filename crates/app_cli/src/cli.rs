use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use core_types::UiLanguage;

/// Top-level parser for the `ragdesk` binary.
#[derive(Debug, Parser)]
#[command(
    name = "ragdesk",
    version,
    about = "Terminal front end for the anti-aging RAG assistant"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Backend base URL, overrides config and RAGDESK_API_URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Interface language
    #[arg(long, global = true, value_enum)]
    pub lang: Option<Lang>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Lang {
    Zh,
    En,
}

impl From<Lang> for UiLanguage {
    fn from(lang: Lang) -> Self {
        match lang {
            Lang::Zh => Self::ZhCn,
            Lang::En => Self::EnUs,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Interactive chat session
    Chat {
        /// Answer without consulting the knowledge base
        #[arg(long)]
        no_knowledge: bool,
    },
    /// Ask a single question
    Ask {
        question: Option<String>,
        /// Image to send with the question
        #[arg(long)]
        image: Option<PathBuf>,
        #[arg(long)]
        no_knowledge: bool,
    },
    /// Ask through the simplified chat endpoint
    Simple {
        question: String,
        #[arg(long)]
        no_knowledge: bool,
    },
    /// Check backend health
    Health,
    /// Manage the knowledge base
    #[command(subcommand)]
    Knowledge(KnowledgeCommand),
}

#[derive(Debug, Subcommand)]
pub enum KnowledgeCommand {
    /// List entries, optionally filtered by content or category
    List {
        #[arg(long)]
        filter: Option<String>,
    },
    /// Show the number of stored entries
    Count,
    /// Show one document with its chunks
    Show { doc_id: String },
    /// Add a single entry
    Add {
        #[arg(long)]
        content: String,
        #[arg(long, default_value = "")]
        category: String,
        #[arg(long)]
        title: Option<String>,
        /// Tag, repeat for several
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Add entries from a JSON array file
    AddBatch { file: PathBuf },
    /// Semantic search
    Search {
        query: String,
        #[arg(long, default_value_t = 3)]
        top_k: u32,
    },
    /// Edit an entry; omitted fields keep their stored value
    Edit {
        doc_id: String,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        title: Option<String>,
        /// Replaces the stored tags, repeat for several
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Delete an entry after confirmation
    Delete {
        doc_id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Import entries from a file
    Import {
        file: PathBuf,
        /// File format hint, detected from the extension when omitted
        #[arg(long)]
        format: Option<String>,
        /// Category for rows without one
        #[arg(long)]
        category: Option<String>,
    },
}
