use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use repo_rag::RagClient;
use repo_rag::config::Config;
use repo_rag::mcp_server::RagMcpServer;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_COMMIT_HASH"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ")"
);

#[derive(Parser)]
#[command(name = "repo-rag")]
#[command(version = VERSION)]
#[command(about = "Ingest git repositories into a vector store and answer questions about them")]
struct Cli {
    /// Path to a config file (defaults to the platform config directory)
    #[arg(short, long, global = true, env = "REPO_RAG_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the MCP protocol over stdio (default)
    Serve,
    /// Ingest one repository
    Ingest {
        /// Git URL or local path of the repository
        #[arg(value_name = "URL")]
        repo_url: String,
    },
    /// Ingest several repositories in parallel
    IngestAll {
        /// Git URLs or local paths of the repositories
        #[arg(value_name = "URL", required = true)]
        repo_urls: Vec<String>,
    },
    /// Ask a question about the ingested repositories
    Ask {
        #[arg(value_name = "QUESTION")]
        question: String,
    },
    /// Ask the configured preset question
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the MCP protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,lance=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    tracing::info!("repo-rag {}", VERSION);

    let client = RagClient::with_config(config).await?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            RagMcpServer::with_client(Arc::new(client))?
                .run_stdio()
                .await?;
        }
        Commands::Ingest { repo_url } => {
            let report = client.ingest_repository(&repo_url).await?;
            print_json(&report)?;
        }
        Commands::IngestAll { repo_urls } => {
            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupted, stopping batch");
                    on_signal.cancel();
                }
            });

            let report = client
                .ingest_repositories_with_cancel(repo_urls, cancel)
                .await?;
            print_json(&report)?;
        }
        Commands::Ask { question } => {
            let response = client.chat(&question).await?;
            print_json(&response)?;
        }
        Commands::Info => {
            let response = client.info().await?;
            print_json(&response)?;
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
