use super::*;
use crate::client::test_support::{TestClient, create_test_client, sample_repo};

async fn create_test_server() -> (RagMcpServer, TestClient) {
    let t = create_test_client().await;
    let server = RagMcpServer::with_client(Arc::new(t.client.clone())).unwrap();
    (server, t)
}

#[tokio::test]
async fn test_get_info() {
    let (server, _t) = create_test_server().await;

    let info = server.get_info();

    assert_eq!(info.server_info.name, "repo-rag");
    assert_eq!(info.server_info.version, env!("CARGO_PKG_VERSION"));
    assert!(info.capabilities.tools.is_some());
    assert!(info.capabilities.prompts.is_some());

    let instructions = info.instructions.as_deref().unwrap();
    assert!(instructions.contains("ingest_repository"));
    assert!(instructions.contains("ingest_repositories"));
    assert!(instructions.contains("chat"));
}

#[tokio::test]
async fn test_server_cloneable() {
    let (server, _t) = create_test_server().await;
    let cloned = server.clone();
    assert_eq!(cloned.client().embedding_dimension(), server.client().embedding_dimension());
}

// ===== Tool Handler Tests =====

#[tokio::test]
async fn test_tool_ingest_repository() {
    let (server, _t) = create_test_server().await;
    let repo = sample_repo();

    let json = server
        .ingest_repository(Parameters(IngestRepositoryRequest {
            repo_url: repo.path().to_string_lossy().to_string(),
        }))
        .await
        .unwrap();

    let report: IngestReport = serde_json::from_str(&json).unwrap();
    assert_eq!(report.files_ingested, 2);
    assert!(report.chunks_written > 0);
}

#[tokio::test]
async fn test_tool_ingest_repository_validation_failure() {
    let (server, _t) = create_test_server().await;

    let result = server
        .ingest_repository(Parameters(IngestRepositoryRequest {
            repo_url: " ".to_string(),
        }))
        .await;

    assert!(result.unwrap_err().contains("cannot be empty"));
}

#[tokio::test]
async fn test_tool_ingest_repository_clone_failure() {
    let (server, t) = create_test_server().await;
    let missing = t.work_dir.path().join("missing-repo");

    let result = server
        .ingest_repository(Parameters(IngestRepositoryRequest {
            repo_url: missing.to_string_lossy().to_string(),
        }))
        .await;

    assert!(result.unwrap_err().contains("missing-repo"));
}

#[tokio::test]
async fn test_tool_ingest_repositories_wait() {
    let (server, _t) = create_test_server().await;
    let first = sample_repo();
    let second = sample_repo();

    let json = server
        .ingest_repositories(Parameters(IngestRepositoriesRequest {
            repo_urls: vec![
                first.path().to_string_lossy().to_string(),
                second.path().to_string_lossy().to_string(),
            ],
            wait: true,
        }))
        .await
        .unwrap();

    let response: BatchIngestResponse = serde_json::from_str(&json).unwrap();
    assert_eq!(response.submitted, 2);
    assert!(!response.background);
    let report = response.report.unwrap();
    assert_eq!(report.succeeded, 2);
    assert!(report.is_complete());
}

#[tokio::test]
async fn test_tool_ingest_repositories_background() {
    let (server, t) = create_test_server().await;
    let repo = sample_repo();

    let json = server
        .ingest_repositories(Parameters(IngestRepositoriesRequest {
            repo_urls: vec![repo.path().to_string_lossy().to_string()],
            wait: false,
        }))
        .await
        .unwrap();

    let response: BatchIngestResponse = serde_json::from_str(&json).unwrap();
    assert!(response.background);
    assert!(response.report.is_none());

    // The detached batch eventually lands in the store
    let mut stored = 0;
    for _ in 0..100 {
        stored = t.client.chunk_count().await.unwrap();
        if stored > 0 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    assert!(stored > 0);
}

#[tokio::test]
async fn test_tool_ingest_repositories_empty() {
    let (server, _t) = create_test_server().await;

    let result = server
        .ingest_repositories(Parameters(IngestRepositoriesRequest {
            repo_urls: vec![],
            wait: true,
        }))
        .await;

    assert!(result.unwrap_err().contains("repo_urls"));
}

#[tokio::test]
async fn test_tool_chat_with_empty_store() {
    let (server, _t) = create_test_server().await;

    let json = server
        .chat(Parameters(ChatRequest {
            question: "What does the author do?".to_string(),
        }))
        .await
        .unwrap();

    let response: ChatResponse = serde_json::from_str(&json).unwrap();
    assert_eq!(response.answer, "stub answer");
    assert!(response.sources.is_empty());
}

#[tokio::test]
async fn test_tool_chat_validation_failure() {
    let (server, _t) = create_test_server().await;

    let result = server
        .chat(Parameters(ChatRequest {
            question: "   ".to_string(),
        }))
        .await;

    assert!(result.unwrap_err().contains("cannot be empty"));
}

#[tokio::test]
async fn test_tool_info() {
    let (server, t) = create_test_server().await;

    let json = server.info(Parameters(InfoRequest {})).await.unwrap();
    let response: ChatResponse = serde_json::from_str(&json).unwrap();
    assert_eq!(response.model, "stub");

    let prompts = t.chat_model.prompts.lock().unwrap();
    assert!(prompts[0].contains("primary skill"));
}

#[tokio::test]
async fn test_info_descriptions_follow_configured_question() {
    let (server, _t) = create_test_server().await;

    let tool = server
        .tool_router
        .list_all()
        .into_iter()
        .find(|t| t.name == "info")
        .unwrap();
    let description = tool.description.unwrap_or_default();
    assert!(description.contains("configured"));
    assert!(!description.contains("primary skill"));

    let prompt = server
        .prompt_router
        .list_all()
        .into_iter()
        .find(|p| p.name == "info")
        .unwrap();
    assert!(!prompt.description.unwrap_or_default().contains("primary skill"));
}

// ===== Prompt Handler Tests =====

#[tokio::test]
async fn test_prompt_ingest_with_url() {
    let (server, _t) = create_test_server().await;

    let args = serde_json::json!({ "url": "https://example.com/repo.git" });
    let result = server.ingest_prompt(Parameters(args)).await.unwrap();

    assert!(result.description.is_some());
    let debug_str = format!("{:?}", result.messages[0].content);
    assert!(debug_str.contains("https://example.com/repo.git"));
}

#[tokio::test]
async fn test_prompt_ask() {
    let (server, _t) = create_test_server().await;

    let args = serde_json::json!({ "question": "Which languages are used?" });
    let messages = server.ask_prompt(Parameters(args)).await.unwrap();

    assert_eq!(messages.len(), 1);
    let debug_str = format!("{:?}", messages[0].content);
    assert!(debug_str.contains("Which languages are used?"));
}

#[tokio::test]
async fn test_prompt_info() {
    let (server, _t) = create_test_server().await;

    let messages = server.info_prompt().await;
    let debug_str = format!("{:?}", messages[0].content);
    assert!(debug_str.contains("primary skill"));
}
