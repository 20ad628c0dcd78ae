use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// `ANTHROPIC_API_KEY` is the only required variable; everything else has a
/// local-development default.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    /// Directory of job-description files (.txt / .pdf) fed to ingestion.
    pub jobs_dir: PathBuf,
    /// Directory holding the persisted vector index.
    pub index_dir: PathBuf,
    /// Base URL of an OpenAI-compatible embeddings endpoint.
    pub embeddings_url: String,
    /// Embedding model identifier. Must match the model recorded in the
    /// index metadata — ingestion and query embeddings have to agree.
    pub embeddings_model: String,
    /// Bearer token for the embeddings endpoint, if it requires one.
    pub embeddings_api_key: Option<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            jobs_dir: PathBuf::from(env_or("JOBS_DIR", "data/market_jobs")),
            index_dir: PathBuf::from(env_or("INDEX_DIR", "index")),
            embeddings_url: env_or("EMBEDDINGS_URL", "http://127.0.0.1:8080/v1"),
            embeddings_model: env_or("EMBEDDINGS_MODEL", "all-MiniLM-L6-v2"),
            embeddings_api_key: std::env::var("EMBEDDINGS_API_KEY").ok(),
            port: env_or("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
