//! # Repo RAG - Question Answering over Git Repositories
//!
//! Clones git repositories, splits their text, source and PDF files into
//! token-bounded chunks, embeds the chunks locally and stores them in an
//! embedded vector database. Questions are answered by a chat model with
//! the most relevant chunks supplied as context.
//!
//! ## Key Features
//!
//! - **Repository Ingestion**: git2 clones into disposable working directories
//! - **Token Chunking**: `cl100k_base` token bounds with paragraph-aware splits
//! - **PDF Support**: Page-by-page text extraction with page numbers kept
//! - **Bounded Parallelism**: Batches of repositories ingested concurrently
//! - **Local Embeddings**: FastEmbed (all-MiniLM-L6-v2 by default)
//! - **Embedded Storage**: LanceDB, no server required
//! - **MCP Protocol**: Ingestion, chat and info tools for AI assistants
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐       ┌──────────────┐
//! │  RagMcpServer   │       │     CLI      │
//! └────────┬────────┘       └──────┬───────┘
//!          └──────────┬────────────┘
//!              ┌──────▼──────┐
//!              │  RagClient  │
//!              └──────┬──────┘
//!        ┌────────────┼──────────────┐
//! ┌──────▼───────┐ ┌──▼──────────┐ ┌─▼───────────┐
//! │ ingest       │ │ EmbeddingSink│ │ ChatService │
//! │ (git2, walk, │ │ (FastEmbed + │ │ (retriever +│
//! │  chunk)      │ │  LanceDB)    │ │  Ollama)    │
//! └──────────────┘ └──────────────┘ └─────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`ingest`]: Clone, walk, filter and chunk repositories; batch coordination
//! - [`client`]: Library client wiring ingestion, storage and chat together
//! - [`chat`]: Retrieval-augmented question answering
//! - [`mcp_server`]: MCP protocol server implementation with tools and prompts
//! - [`embedding`]: Embedding generation using FastEmbed
//! - [`vector_db`]: Vector database abstraction backed by LanceDB
//! - [`config`]: Configuration management with environment variable support
//! - [`types`]: MCP request/response types with JSON schema
//! - [`error`]: Error types and result aliases
//! - [`paths`]: Platform data and config directories
//!
//! ## Usage Example
//!
//! ```no_run
//! use repo_rag::RagClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = RagClient::new().await?;
//!     let report = client
//!         .ingest_repositories(vec![
//!             "https://github.com/rust-lang/book.git".to_string(),
//!             "https://github.com/rust-lang/rustlings.git".to_string(),
//!         ])
//!         .await;
//!     println!("{} of {} repositories ingested", report.succeeded, report.submitted);
//!
//!     let answer = client.info().await?;
//!     println!("{}", answer.answer);
//!     Ok(())
//! }
//! ```

/// Retrieval-augmented chat over the vector store
pub mod chat;

/// Library client combining ingestion, storage and chat
pub mod client;

/// Configuration management with environment variable overrides
pub mod config;

/// Embedding generation using FastEmbed (all-MiniLM-L6-v2)
pub mod embedding;

/// Error types and utilities
pub mod error;

/// Repository cloning, walking, filtering, chunking and batch coordination
pub mod ingest;

/// MCP server implementation with tools and prompts
pub mod mcp_server;

/// Platform-specific data and config paths
pub mod paths;

/// MCP request/response types with JSON schema definitions
pub mod types;

/// Vector database abstraction backed by LanceDB
pub mod vector_db;

pub use client::RagClient;
pub use config::Config;
pub use error::{RagError, Result};
