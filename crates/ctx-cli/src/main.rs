//! Context API command line: timed search (default), add, recall, chat.

use clap::Parser;
use ctx_cli::agent::QnaAgent;
use ctx_cli::cli::{Cli, Command};
use ctx_cli::commands;
use ctx_client::{AlchemystClient, OpenAiChatModel};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before logging init so RUST_LOG may come from .env.
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "failed to load .env"),
    }

    let cli = Cli::parse();
    let store = AlchemystClient::from_env()?;
    tracing::debug!(base_url = %store.config().base_url, "context client ready");
    let mut out = std::io::stdout();

    match cli.command.unwrap_or_default() {
        Command::Search(args) => {
            commands::run_search(&store, &args, &mut out).await?;
        }
        Command::Add(args) => {
            commands::run_add(&store, &args, &mut out).await?;
        }
        Command::Recall => {
            commands::run_recall(&store, &mut out).await?;
        }
        Command::Chat => {
            let chat = OpenAiChatModel::from_env()?;
            let mut agent = QnaAgent::new(store, chat);
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            commands::run_chat(&mut agent, stdin, &mut out).await?;
        }
    }
    Ok(())
}
