use crate::client::RagClient;
use crate::types::*;

use anyhow::{Context, Result};
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler, ServiceExt,
    handler::server::{router::prompt::PromptRouter, tool::ToolRouter, wrapper::Parameters},
    model::*,
    prompt, prompt_handler, prompt_router,
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct RagMcpServer {
    client: Arc<RagClient>,
    tool_router: ToolRouter<Self>,
    prompt_router: PromptRouter<Self>,
}

impl RagMcpServer {
    /// Create a new RAG MCP server with default configuration
    pub async fn new() -> Result<Self> {
        let client = RagClient::new().await?;
        Self::with_client(Arc::new(client))
    }

    /// Create a new RAG MCP server with an existing client
    pub fn with_client(client: Arc<RagClient>) -> Result<Self> {
        Ok(Self {
            client,
            tool_router: Self::tool_router(),
            prompt_router: Self::prompt_router(),
        })
    }

    /// Get the underlying client
    pub fn client(&self) -> &RagClient {
        &self.client
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("Serialization failed: {}", e))
}

#[tool_router(router = tool_router)]
impl RagMcpServer {
    #[tool(
        description = "Clone a git repository, split its text, source and PDF files into token-bounded chunks, and store their embeddings for question answering"
    )]
    async fn ingest_repository(
        &self,
        Parameters(req): Parameters<IngestRepositoryRequest>,
    ) -> Result<String, String> {
        req.validate()?;

        let report = self
            .client
            .ingest_repository(&req.repo_url)
            .await
            .map_err(|e| format!("{:#}", e))?;

        to_json(&report)
    }

    #[tool(
        description = "Ingest several git repositories in parallel. Returns immediately and continues in the background unless wait is true."
    )]
    async fn ingest_repositories(
        &self,
        Parameters(req): Parameters<IngestRepositoriesRequest>,
    ) -> Result<String, String> {
        req.validate()?;

        let submitted = req.repo_urls.len();
        let response = if req.wait {
            let report = self.client.ingest_repositories(req.repo_urls).await;
            BatchIngestResponse {
                submitted,
                background: false,
                report: Some(report),
            }
        } else {
            // The batch logs its own outcome; nobody awaits the handle
            let _handle = self.client.spawn_batch_ingestion(req.repo_urls);
            BatchIngestResponse {
                submitted,
                background: true,
                report: None,
            }
        };

        to_json(&response)
    }

    #[tool(description = "Answer a question using the ingested repositories as context")]
    async fn chat(&self, Parameters(req): Parameters<ChatRequest>) -> Result<String, String> {
        req.validate()?;

        let response = self
            .client
            .chat(&req.question)
            .await
            .map_err(|e| format!("{:#}", e))?;

        to_json(&response)
    }

    #[tool(description = "Ask the configured preset question about the ingested repositories")]
    async fn info(&self, Parameters(_req): Parameters<InfoRequest>) -> Result<String, String> {
        let response = self
            .client
            .info()
            .await
            .map_err(|e| format!("{:#}", e))?;

        to_json(&response)
    }
}

// Prompts for slash commands
#[prompt_router]
impl RagMcpServer {
    #[prompt(
        name = "ingest",
        description = "Ingest a git repository so it can be asked about"
    )]
    async fn ingest_prompt(
        &self,
        Parameters(args): Parameters<serde_json::Value>,
    ) -> Result<GetPromptResult, McpError> {
        let url = args.get("url").and_then(|v| v.as_str()).unwrap_or("");

        let messages = vec![PromptMessage::new_text(
            PromptMessageRole::User,
            format!("Please ingest the git repository at '{}'.", url),
        )];

        Ok(GetPromptResult {
            description: Some(format!("Ingest repository {}", url)),
            messages,
        })
    }

    #[prompt(
        name = "ask",
        description = "Ask a question about the ingested repositories"
    )]
    async fn ask_prompt(
        &self,
        Parameters(args): Parameters<serde_json::Value>,
    ) -> Result<Vec<PromptMessage>, McpError> {
        let question = args.get("question").and_then(|v| v.as_str()).unwrap_or("");

        Ok(vec![PromptMessage::new_text(
            PromptMessageRole::User,
            format!(
                "Using the ingested repositories as context, answer: {}",
                question
            ),
        )])
    }

    #[prompt(
        name = "info",
        description = "Ask the configured preset question about the ingested repositories"
    )]
    async fn info_prompt(&self) -> Vec<PromptMessage> {
        vec![PromptMessage::new_text(
            PromptMessageRole::User,
            self.client.config().chat.info_question.clone(),
        )]
    }
}

#[tool_handler(router = self.tool_router)]
#[prompt_handler]
impl ServerHandler for RagMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_prompts()
                .build(),
            server_info: Implementation {
                name: "repo-rag".into(),
                title: Some("Repo RAG - Ask Questions About Git Repositories".into()),
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Git repository ingestion and retrieval-augmented chat. \
                Use ingest_repository or ingest_repositories to load repositories, \
                then chat to ask questions about them, or info for the preset question."
                    .into(),
            ),
        }
    }
}

impl RagMcpServer {
    pub async fn serve_stdio() -> Result<()> {
        tracing::info!("Starting RAG MCP server");

        let server = Self::new().await.context("Failed to create MCP server")?;
        server.run_stdio().await
    }

    /// Serve an already configured server over stdio
    pub async fn run_stdio(self) -> Result<()> {
        let transport = rmcp::transport::io::stdio();

        self.serve(transport).await?.waiting().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests;
