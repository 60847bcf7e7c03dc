use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use serde::Deserialize;
use siphasher::sip::SipHasher13;

use super::inference_client::InferenceClient;
use super::{Embedder, ModelError};

/// Fixed seed so the hashing embedder is stable across runs and Rust versions.
/// Changing it changes every vector.
const HASH_SEED_K0: u64 = 0x5265_7375_6d65_5261;
const HASH_SEED_K1: u64 = 0x6e6b_6572_2d76_3031;

/// Deterministic feature-hashing embedder. No model download, no network.
///
/// Each lower-cased word token is hashed into one of `dimension` buckets with a
/// hashed sign; the vector is L2-normalised so cosine similarity reduces to a dot product.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn hash(&self, token: &str, salt: u8) -> u64 {
        let mut hasher = SipHasher13::new_with_keys(HASH_SEED_K0, HASH_SEED_K1);
        salt.hash(&mut hasher);
        token.hash(&mut hasher);
        hasher.finish()
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in tokenize(text) {
            let idx = (self.hash(&token, 0) % self.dimension as u64) as usize;
            let sign = if self.hash(&token, 1) % 2 == 0 { 1.0 } else { -1.0 };
            vector[idx] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn name(&self) -> &'static str {
        "hash"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError> {
        Ok(self.embed_sync(text))
    }
}

/// Lower-cased word tokens; keeps `+`, `#` and `.` inside tokens so `c++` and `node.js` survive.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || matches!(c, '+' | '#' | '.')))
        .map(|t| t.trim_matches('.'))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Feature-extraction endpoint. Servers answer with either a pooled sentence vector
/// or one vector per token; the latter is mean-pooled here.
pub struct RemoteEmbedder {
    client: InferenceClient,
    url: String,
}

impl RemoteEmbedder {
    pub fn new(client: InferenceClient, url: String) -> Self {
        Self { client, url }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EmbeddingPayload {
    Pooled(Vec<f32>),
    PerToken(Vec<Vec<f32>>),
    Batched(Vec<Vec<Vec<f32>>>),
}

impl EmbeddingPayload {
    fn into_vector(self) -> Result<Vec<f32>, ModelError> {
        let vector = match self {
            EmbeddingPayload::Pooled(v) => v,
            EmbeddingPayload::PerToken(rows) => mean_pool(rows),
            EmbeddingPayload::Batched(mut batch) => {
                if batch.is_empty() {
                    Vec::new()
                } else {
                    mean_pool(batch.swap_remove(0))
                }
            }
        };
        if vector.is_empty() {
            return Err(ModelError::EmptyVector);
        }
        Ok(vector)
    }
}

fn mean_pool(rows: Vec<Vec<f32>>) -> Vec<f32> {
    let Some(width) = rows.first().map(Vec::len) else {
        return Vec::new();
    };
    let mut pooled = vec![0.0f32; width];
    let mut count = 0usize;
    for row in rows.iter().filter(|r| r.len() == width) {
        for (acc, v) in pooled.iter_mut().zip(row) {
            *acc += v;
        }
        count += 1;
    }
    for v in &mut pooled {
        *v /= count as f32;
    }
    pooled
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError> {
        let payload: EmbeddingPayload = self.client.infer(&self.url, text).await?;
        payload.into_vector()
    }
}

/// Raw cosine similarity in [-1, 1]. Returns 0.0 on dimension mismatch or a zero vector.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        tracing::warn!(
            a_len = a.len(),
            b_len = b.len(),
            "embedding dimension mismatch; returning zero similarity"
        );
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let norm_a: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
