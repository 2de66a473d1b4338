use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::{fs, path::Path};

use anyhow::Result;
use api_client::HttpRagClient;
use clap::Parser;
use config::{AppConfig, ConfigStore};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod output;

use cli::{Cli, Commands};
use commands::AppContext;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut data_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    data_dir.push("ragdesk");
    if let Err(err) = fs::create_dir_all(&data_dir) {
        eprintln!("failed to prepare data dir: {err}");
    }
    let _log_guard = init_local_logger(&data_dir.join("logs"), cli.verbose);

    let config = load_config(&cli);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("failed to create tokio runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = runtime.block_on(run(cli.command, config));
    if let Err(err) = &outcome {
        error!("{err:#}");
        eprintln!("{err:#}");
    }
    exit_code(&outcome)
}

/// Zero only when the requested operation went through.
fn exit_code(outcome: &Result<bool>) -> ExitCode {
    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) | Err(_) => ExitCode::FAILURE,
    }
}

fn load_config(cli: &Cli) -> AppConfig {
    let mut config = match ConfigStore::from_default_location().and_then(|s| s.load_or_init()) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to load config: {err:#}");
            AppConfig::default()
        }
    };
    config.apply_env();
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }
    if let Some(lang) = cli.lang {
        config.language = lang.into();
    }
    config
}

async fn run(command: Commands, config: AppConfig) -> Result<bool> {
    let client = HttpRagClient::new(&config.api.base_url)?;
    info!(base_url = %client.base_url(), "backend configured");
    let mut ctx = AppContext::new(Arc::new(client), config);

    match command {
        Commands::Chat { no_knowledge } => commands::chat::repl(&mut ctx, !no_knowledge).await,
        Commands::Ask {
            question,
            image,
            no_knowledge,
        } => commands::chat::ask(&mut ctx, question, image.as_deref(), !no_knowledge).await,
        Commands::Simple {
            question,
            no_knowledge,
        } => commands::chat::simple(&mut ctx, &question, !no_knowledge).await,
        Commands::Health => commands::health(&mut ctx).await,
        Commands::Knowledge(command) => commands::knowledge::run(&mut ctx, command).await,
    }
}

fn init_local_logger(log_dir: &Path, verbose: bool) -> tracing_appender::non_blocking::WorkerGuard {
    if let Err(err) = fs::create_dir_all(log_dir) {
        eprintln!("failed to create log dir `{}`: {err}", log_dir.display());
    }
    let file_appender = tracing_appender::rolling::daily(log_dir, "ragdesk.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,app_cli=debug"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .json()
        .with_writer(writer)
        .init();

    guard
}
