//! Text Embeddings
//!
//! Turns skill descriptions and retrieval queries into vectors for the
//! similarity index. Three backends share the [`Embedder`] trait:
//!
//! - [`HashEmbedder`]: hashed bag-of-words, computed in-process (no network)
//! - [`OllamaEmbedder`]: local Ollama server, with an LRU cache for queries
//! - [`OpenAiEmbedder`]: hosted OpenAI-compatible embedding API

use anyhow::{Context, Result};
use async_trait::async_trait;
use moka::future::Cache;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::{Config, EmbeddingBackend};

/// Text → vector capability
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Build the embedder selected by configuration
pub fn embedder_from_config(config: &Config) -> Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match config.embedding_backend {
        EmbeddingBackend::Local => Arc::new(HashEmbedder::default()),
        EmbeddingBackend::Ollama => Arc::new(OllamaEmbedder::new(
            &config.ollama_url,
            config.embedding_model.as_deref().unwrap_or("nomic-embed-text"),
            config.request_timeout,
        )),
        EmbeddingBackend::OpenAi => {
            let api_key = config
                .openai_api_key
                .as_deref()
                .context("OPENAI_API_KEY not set - hosted embeddings unavailable")?;
            Arc::new(OpenAiEmbedder::new(
                &config.openai_base_url,
                api_key,
                config
                    .embedding_model
                    .as_deref()
                    .unwrap_or("text-embedding-3-small"),
                config.request_timeout,
            ))
        }
    };
    Ok(embedder)
}

/// Default dimension for hashed embeddings
pub const HASH_EMBEDDING_DIM: usize = 256;

/// Local text-vector embedder.
///
/// Each lowercase alphanumeric token is hashed (SHA-256, so vectors are stable
/// across processes and persisted indexes stay valid) into a signed bucket.
/// The result is L2-normalized.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    /// Synchronous core, exposed for tests
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let mut bucket = [0u8; 8];
            bucket.copy_from_slice(&digest[..8]);
            let idx = (u64::from_le_bytes(bucket) % self.dimension as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[idx] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in vector.iter_mut() {
                *x /= norm;
            }
        }
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(HASH_EMBEDDING_DIM)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn name(&self) -> &str {
        "local"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }
}

/// Ollama embedding response
#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

/// Ollama-backed embedder
pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    client: reqwest::Client,
    /// LRU cache for embeddings (max 1000 entries, 1 hour TTL)
    cache: Cache<String, Vec<f32>>,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(3600))
            .build();

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
            cache,
        }
    }

    async fn embed_uncached(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "model": self.model,
                "prompt": text
            }))
            .send()
            .await
            .context("Failed to send embedding request")?;

        if !response.status().is_success() {
            anyhow::bail!("Embedding request failed: {}", response.status());
        }

        let result: OllamaEmbeddingResponse = response
            .json()
            .await
            .context("Failed to parse embedding response")?;

        Ok(result.embedding)
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let cache_key = text.trim().to_string();

        if let Some(cached) = self.cache.get(&cache_key).await {
            return Ok(cached);
        }

        let embedding = self.embed_uncached(&cache_key).await?;
        self.cache.insert(cache_key, embedding.clone()).await;
        debug!(model = %self.model, dim = embedding.len(), "Computed Ollama embedding");

        Ok(embedding)
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingData {
    embedding: Vec<f32>,
}

/// Hosted embedding API (OpenAI-compatible `/embeddings`)
pub struct OpenAiEmbedder {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiEmbedder {
    pub fn new(base_url: &str, api_key: &str, model: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            client,
        }
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn name(&self) -> &str {
        "openai"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/embeddings", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.model,
                "input": text
            }))
            .send()
            .await
            .context("Failed to send embedding request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Embedding API error {}: {}", status, body);
        }

        let result: OpenAiEmbeddingResponse = response
            .json()
            .await
            .context("Failed to parse embedding response")?;

        result
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .context("Embedding response contained no data")
    }
}

/// Calculate cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Serialize embedding to bytes for SQLite BLOB storage
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Deserialize embedding from bytes
pub fn embedding_from_bytes(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
