//! Model capabilities consumed by the ranking engine.
//!
//! The engine only sees two black boxes: an `Embedder` ("given text, return a vector")
//! and an `EntityTagger` ("given text, return tagged spans"). Backends are picked from
//! config and loaded at most once per process through `ModelRegistry`.

pub mod embedding;
pub mod inference_client;
pub mod ner;
pub mod registry;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use embedding::{cosine_similarity, HashEmbedder, RemoteEmbedder};
pub use ner::{DisabledTagger, RemoteTagger};
pub use registry::{ConfiguredLoader, ModelLoader, ModelRegistry};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Model unavailable: {0}")]
    Unavailable(String),

    #[error("Model returned an empty vector")]
    EmptyVector,
}

/// One span returned by the NER capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedEntity {
    pub entity_type: String,
    pub text: String,
    pub confidence: f32,
}

/// Turns text into a fixed-length vector. Must tolerate concurrent calls.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn name(&self) -> &'static str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError>;
}

/// Named-entity recognition over free text. Must tolerate concurrent calls.
#[async_trait]
pub trait EntityTagger: Send + Sync {
    fn name(&self) -> &'static str;

    async fn tag(&self, text: &str) -> Result<Vec<TaggedEntity>, ModelError>;
}

/// Bounds a capability call; expiry becomes `ModelError::Timeout`.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, ModelError>
where
    F: Future<Output = Result<T, ModelError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| ModelError::Timeout(limit))?
}
