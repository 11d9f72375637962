//! Configuration module for the TaskLens backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for API authentication (required in production)
    pub api_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Path to Tantivy search index directory
    pub index_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// API key for the completion service; model extraction is disabled
    /// without it
    pub completion_api_key: Option<String>,
    /// Completion service endpoint
    pub completion_api_url: String,
    /// Model identifier sent to the completion service
    pub completion_model: String,
    /// Upper bound on one completion request
    pub completion_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_psk = env::var("TASKLENS_API_PSK").ok();

        let db_path = env::var("TASKLENS_DB_PATH")
            .unwrap_or_else(|_| "./data/app.sqlite".to_string())
            .into();

        let index_path = env::var("TASKLENS_INDEX_PATH")
            .unwrap_or_else(|_| "./data/index".to_string())
            .into();

        let bind_addr = env::var("TASKLENS_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid TASKLENS_BIND_ADDR format");

        let log_level = env::var("TASKLENS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let completion_api_key = env::var("TASKLENS_LLM_API_KEY").ok();

        let completion_api_url = env::var("TASKLENS_LLM_API_URL")
            .unwrap_or_else(|_| "https://api.anthropic.com/v1/messages".to_string());

        let completion_model = env::var("TASKLENS_LLM_MODEL")
            .unwrap_or_else(|_| "claude-3-haiku-20240307".to_string());

        let completion_timeout = env::var("TASKLENS_LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        Self {
            api_psk,
            db_path,
            index_path,
            bind_addr,
            log_level,
            completion_api_key,
            completion_api_url,
            completion_model,
            completion_timeout,
        }
    }
}
