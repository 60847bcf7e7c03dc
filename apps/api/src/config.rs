use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Every setting has a default; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Crate log level used when `RUST_LOG` is unset.
    pub log_level: String,
    pub max_resumes_per_request: usize,
    pub default_top_k: usize,
    /// Size of the bounded worker pool used for per-resume scoring.
    pub rank_workers: usize,
    pub model_timeout: Duration,
    pub request_timeout: Duration,
    pub max_upload_bytes: usize,
    pub models: ModelSettings,
    pub storage: StorageSettings,
}

/// Where the embedding and NER capabilities come from.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    /// Remote feature-extraction endpoint. `None` selects the local hashing embedder.
    pub embedding_url: Option<String>,
    pub embedding_dimension: usize,
    /// Remote token-classification endpoint. `None` disables NER name detection.
    pub ner_url: Option<String>,
    pub inference_api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub resume_bucket: Option<String>,
    pub s3_endpoint: Option<String>,
    pub aws_region: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let default_workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);

        Ok(Config {
            port: parse_env("PORT", 8080)?,
            log_level: optional_env("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            max_resumes_per_request: parse_env("MAX_RESUMES_PER_REQUEST", 50)?,
            default_top_k: parse_env("DEFAULT_TOP_K", 10)?,
            rank_workers: parse_env::<usize>("RANK_WORKERS", default_workers)?.max(1),
            model_timeout: Duration::from_millis(parse_env("MODEL_TIMEOUT_MS", 10_000)?),
            request_timeout: Duration::from_secs(parse_env("REQUEST_TIMEOUT_SECS", 300)?),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 50 * 1024 * 1024)?,
            models: ModelSettings {
                embedding_url: optional_env("EMBEDDING_URL"),
                embedding_dimension: parse_env("EMBEDDING_DIMENSION", 384)?,
                ner_url: optional_env("NER_URL"),
                inference_api_key: optional_env("INFERENCE_API_KEY"),
            },
            storage: StorageSettings {
                resume_bucket: optional_env("RESUME_BUCKET"),
                s3_endpoint: optional_env("S3_ENDPOINT"),
                aws_region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            },
        })
    }

    /// Local-only configuration for in-process tests: hashing embedder, no NER, no bucket.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Config {
            port: 0,
            log_level: "debug".to_string(),
            max_resumes_per_request: 50,
            default_top_k: 10,
            rank_workers: 2,
            model_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(30),
            max_upload_bytes: 10 * 1024 * 1024,
            models: ModelSettings {
                embedding_url: None,
                embedding_dimension: 256,
                ner_url: None,
                inference_api_key: None,
            },
            storage: StorageSettings {
                resume_bucket: None,
                s3_endpoint: None,
                aws_region: "us-east-1".to_string(),
            },
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        None => Ok(default),
    }
}
