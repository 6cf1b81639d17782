use super::*;
use tempfile::{NamedTempFile, TempDir};

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.embedding.model_name, "all-MiniLM-L6-v2");
    assert_eq!(config.embedding.batch_size, 32);
    assert_eq!(config.ingestion.chunk_tokens, 800);
    assert_eq!(config.ingestion.max_concurrent_repos, 16);
    assert_eq!(config.ingestion.batch_wait_secs, 3600);
    assert_eq!(config.ingestion.on_batch_timeout, BatchTimeoutPolicy::Detach);
    assert!(!config.ingestion.abort_on_sink_error);
    assert_eq!(config.chat.top_k, 4);
}

#[test]
fn test_default_extensions() {
    let config = IngestionConfig::default();
    let mut extensions = config.extensions.clone();
    extensions.sort();
    assert_eq!(
        extensions,
        vec![
            "csv", "html", "java", "js", "json", "md", "pdf", "py", "ts", "txt", "xml"
        ]
    );
    assert_eq!(config.skip_dirs, vec![".git"]);
}

#[test]
fn test_validate_valid_config() {
    let config = Config::default();
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_with_zero_batch_size() {
    let mut config = Config::default();
    config.embedding.batch_size = 0;

    let result = config.validate();
    assert!(matches!(
        result.unwrap_err(),
        RagError::Config(ConfigError::InvalidValue { .. })
    ));
}

#[test]
fn test_validate_with_zero_chunk_tokens() {
    let mut config = Config::default();
    config.ingestion.chunk_tokens = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_with_zero_concurrency() {
    let mut config = Config::default();
    config.ingestion.max_concurrent_repos = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_with_empty_extensions() {
    let mut config = Config::default();
    config.ingestion.extensions.clear();

    match config.validate() {
        Err(RagError::Config(ConfigError::InvalidValue { key, .. })) => {
            assert_eq!(key, "ingestion.extensions");
        }
        other => panic!("expected invalid extensions, got {:?}", other),
    }
}

#[test]
fn test_validate_min_score_bounds() {
    let mut config = Config::default();

    config.chat.min_score = 0.0;
    assert!(config.validate().is_ok());

    config.chat.min_score = 1.0;
    assert!(config.validate().is_ok());

    config.chat.min_score = 1.1;
    assert!(config.validate().is_err());

    config.chat.min_score = -0.1;
    assert!(config.validate().is_err());
}

#[test]
fn test_save_and_load() {
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path();

    let mut config = Config::default();
    config.embedding.batch_size = 64;
    config.ingestion.on_batch_timeout = BatchTimeoutPolicy::Abort;
    config.ingestion.branch = Some("main".to_string());

    config.save(path).unwrap();
    let loaded = Config::from_file(path).unwrap();

    assert_eq!(loaded.embedding.batch_size, 64);
    assert_eq!(loaded.ingestion.on_batch_timeout, BatchTimeoutPolicy::Abort);
    assert_eq!(loaded.ingestion.branch.as_deref(), Some("main"));
}

#[test]
fn test_load_nonexistent_file() {
    let result = Config::from_file(Path::new("/nonexistent/config.toml"));
    assert!(matches!(
        result.unwrap_err(),
        RagError::Config(ConfigError::FileNotFound(_))
    ));
}

#[test]
fn test_from_file_invalid_toml() {
    let temp_file = NamedTempFile::new().unwrap();
    std::fs::write(temp_file.path(), "invalid toml {{{ content").unwrap();

    let result = Config::from_file(temp_file.path());
    assert!(matches!(
        result.unwrap_err(),
        RagError::Config(ConfigError::ParseFailed(_))
    ));
}

#[test]
fn test_from_file_partial_config() {
    let temp_file = NamedTempFile::new().unwrap();
    let partial_config = r#"
[ingestion]
chunk_tokens = 256
on_batch_timeout = "abort"
"#;
    std::fs::write(temp_file.path(), partial_config).unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();
    assert_eq!(config.ingestion.chunk_tokens, 256);
    assert_eq!(config.ingestion.on_batch_timeout, BatchTimeoutPolicy::Abort);
    assert_eq!(config.ingestion.max_concurrent_repos, 16);
    assert_eq!(config.embedding.batch_size, 32);
}

#[test]
fn test_from_file_validates_loaded_config() {
    let temp_file = NamedTempFile::new().unwrap();
    std::fs::write(
        temp_file.path(),
        "[ingestion]\nmax_concurrent_repos = 0\n",
    )
    .unwrap();

    let result = Config::from_file(temp_file.path());
    assert!(matches!(
        result.unwrap_err(),
        RagError::Config(ConfigError::InvalidValue { .. })
    ));
}

#[test]
fn test_toml_serialization() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).unwrap();
    assert!(toml_str.contains("chunk_tokens"));
    assert!(toml_str.contains("on_batch_timeout = \"detach\""));
    assert!(toml_str.contains("model_name"));
}

#[test]
fn test_apply_env_overrides() {
    // Safety: these variables are only touched by this test
    unsafe {
        std::env::set_var("REPO_RAG_CHUNK_TOKENS", "128");
        std::env::set_var("REPO_RAG_MAX_CONCURRENT_REPOS", "4");
        std::env::set_var("REPO_RAG_CHAT_MODEL", "mistral");
    }

    let mut config = Config::default();
    config.apply_env_overrides();

    assert_eq!(config.ingestion.chunk_tokens, 128);
    assert_eq!(config.ingestion.max_concurrent_repos, 4);
    assert_eq!(config.chat.model, "mistral");

    unsafe {
        std::env::remove_var("REPO_RAG_CHUNK_TOKENS");
        std::env::remove_var("REPO_RAG_MAX_CONCURRENT_REPOS");
        std::env::remove_var("REPO_RAG_CHAT_MODEL");
    }
}

#[test]
fn test_apply_env_overrides_with_invalid_values() {
    unsafe {
        std::env::set_var("REPO_RAG_BATCH_WAIT_SECS", "not_a_number");
    }

    let mut config = Config::default();
    config.apply_env_overrides();

    // Unparseable values are ignored
    assert_eq!(config.ingestion.batch_wait_secs, 3600);

    unsafe {
        std::env::remove_var("REPO_RAG_BATCH_WAIT_SECS");
    }
}

#[test]
fn test_save_creates_parent_directory() {
    let temp_dir = TempDir::new().unwrap();
    let nested_path = temp_dir.path().join("nested").join("config.toml");

    Config::default().save(&nested_path).unwrap();
    assert!(nested_path.exists());
}

#[test]
fn test_load_with_explicit_path() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    let mut config = Config::default();
    config.chat.top_k = 9;
    config.save(&path).unwrap();

    let loaded = Config::load(Some(&path)).unwrap();
    assert_eq!(loaded.chat.top_k, 9);
}

#[test]
fn test_explicit_file_wins_over_env() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    let mut config = Config::default();
    config.embedding.batch_size = 12;
    config.chat.base_url = "http://file-host:11434".to_string();
    config.save(&path).unwrap();

    unsafe {
        std::env::set_var("REPO_RAG_BATCH_SIZE", "99");
        std::env::set_var("REPO_RAG_CHAT_URL", "http://env-host:11434");
    }

    let loaded = Config::load(Some(&path));

    unsafe {
        std::env::remove_var("REPO_RAG_BATCH_SIZE");
        std::env::remove_var("REPO_RAG_CHAT_URL");
    }

    let loaded = loaded.unwrap();
    assert_eq!(loaded.embedding.batch_size, 12);
    assert_eq!(loaded.chat.base_url, "http://file-host:11434");
}

#[test]
fn test_validate_concurrency_above_cap() {
    let mut config = Config::default();
    config.ingestion.max_concurrent_repos = 16;
    assert!(config.validate().is_ok());

    config.ingestion.max_concurrent_repos = 32;
    let err = config.validate().unwrap_err();
    assert!(matches!(
        err,
        RagError::Config(ConfigError::InvalidValue { ref key, .. }) if key == "ingestion.max_concurrent_repos"
    ));
}

#[test]
fn test_validate_chunk_tokens_minimum() {
    let mut config = Config::default();
    config.ingestion.chunk_tokens = crate::ingest::MIN_CHUNK_TOKENS - 1;
    assert!(config.validate().is_err());

    config.ingestion.chunk_tokens = crate::ingest::MIN_CHUNK_TOKENS;
    assert!(config.validate().is_ok());
}

#[test]
fn test_from_file_rejects_concurrency_above_cap() {
    let temp_file = NamedTempFile::new().unwrap();
    std::fs::write(
        temp_file.path(),
        "[ingestion]\nmax_concurrent_repos = 32\n",
    )
    .unwrap();

    assert!(Config::load(Some(temp_file.path())).is_err());
}
