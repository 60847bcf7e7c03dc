//! Process-wide model holders with lazy, at-most-once initialisation.
//!
//! `tokio::sync::OnceCell::get_or_try_init` serialises concurrent first use: one caller
//! runs the loader, the rest await its result. A failed load leaves the cell empty so
//! a later request can try again.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::config::ModelSettings;

use super::inference_client::InferenceClient;
use super::{
    DisabledTagger, Embedder, EntityTagger, HashEmbedder, ModelError, RemoteEmbedder, RemoteTagger,
};

/// Builds the capability backends. Called at most once per successful load.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load_embedder(&self) -> Result<Arc<dyn Embedder>, ModelError>;

    async fn load_tagger(&self) -> Result<Arc<dyn EntityTagger>, ModelError>;
}

/// Picks backends from `ModelSettings`: remote endpoints when configured,
/// otherwise the local hashing embedder and no NER.
pub struct ConfiguredLoader {
    settings: ModelSettings,
    client: InferenceClient,
}

impl ConfiguredLoader {
    pub fn new(settings: ModelSettings, client: InferenceClient) -> Self {
        Self { settings, client }
    }
}

#[async_trait]
impl ModelLoader for ConfiguredLoader {
    async fn load_embedder(&self) -> Result<Arc<dyn Embedder>, ModelError> {
        match &self.settings.embedding_url {
            Some(url) => {
                let embedder = RemoteEmbedder::new(self.client.clone(), url.clone());
                // Probe once so a dead endpoint is reported at load time, not per resume.
                embedder.embed("warmup").await?;
                info!("Embedding model loaded (remote: {url})");
                Ok(Arc::new(embedder))
            }
            None => {
                info!(
                    "Embedding model loaded (hash, dimension {})",
                    self.settings.embedding_dimension
                );
                Ok(Arc::new(HashEmbedder::new(self.settings.embedding_dimension)))
            }
        }
    }

    async fn load_tagger(&self) -> Result<Arc<dyn EntityTagger>, ModelError> {
        match &self.settings.ner_url {
            Some(url) => {
                info!("NER pipeline loaded (remote: {url})");
                Ok(Arc::new(RemoteTagger::new(self.client.clone(), url.clone())))
            }
            None => {
                info!("NER pipeline disabled (NER_URL not set)");
                Ok(Arc::new(DisabledTagger))
            }
        }
    }
}

pub struct ModelRegistry {
    loader: Box<dyn ModelLoader>,
    embedder: OnceCell<Arc<dyn Embedder>>,
    tagger: OnceCell<Arc<dyn EntityTagger>>,
}

impl ModelRegistry {
    pub fn new(loader: Box<dyn ModelLoader>) -> Self {
        Self {
            loader,
            embedder: OnceCell::new(),
            tagger: OnceCell::new(),
        }
    }

    pub async fn embedder(&self) -> Result<Arc<dyn Embedder>, ModelError> {
        self.embedder
            .get_or_try_init(|| self.loader.load_embedder())
            .await
            .cloned()
    }

    pub async fn tagger(&self) -> Result<Arc<dyn EntityTagger>, ModelError> {
        self.tagger
            .get_or_try_init(|| self.loader.load_tagger())
            .await
            .cloned()
    }

    /// Loads both models ahead of the first request. Failures are logged, not fatal:
    /// the affected signal degrades until a later load succeeds.
    pub async fn warm_up(&self) {
        info!("Warming up models...");
        if let Err(e) = self.embedder().await {
            warn!("Embedding model warmup failed: {e}");
        }
        if let Err(e) = self.tagger().await {
            warn!("NER pipeline warmup failed: {e}");
        }
    }
}
