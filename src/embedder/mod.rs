// src/embedder/mod.rs
// Batched, order-preserving embedding service over a pluggable provider

pub mod openai;

use futures_util::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::chunker::Chunk;
use crate::config::{PipelineConfig, DEFAULT_BATCH_SIZE, DEFAULT_MAX_CONCURRENCY};
use crate::error::{PipelineError, PipelineResult};

pub use openai::OpenAiProvider;

/// Embedding vector (1536-dimensional for text-embedding-3-small)
pub type EmbeddingVector = Vec<f32>;

/// Embedding provider trait - implement this to support new backends.
///
/// `embed_batch` must return exactly one vector per input, in input order.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed_batch(&self, inputs: &[&str]) -> PipelineResult<Vec<EmbeddingVector>>;
    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub batch_size: usize,
    pub max_concurrent_requests: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl From<&PipelineConfig> for EmbeddingConfig {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            max_concurrent_requests: config.max_concurrent_requests,
        }
    }
}

/// Embeds chunks in batches. Output position i always belongs to chunk i.
pub struct EmbeddingService {
    config: EmbeddingConfig,
    provider: Arc<dyn EmbeddingProvider>,
}

impl EmbeddingService {
    pub fn new(config: EmbeddingConfig, provider: Arc<dyn EmbeddingProvider>) -> PipelineResult<Self> {
        if config.batch_size == 0 || config.max_concurrent_requests == 0 {
            return Err(PipelineError::InvalidConfiguration(
                "batch_size and max_concurrent_requests must be positive".to_string(),
            ));
        }

        info!(
            model = provider.model_name(),
            batch_size = config.batch_size,
            max_concurrent_requests = config.max_concurrent_requests,
            "Initializing EmbeddingService"
        );

        Ok(Self { config, provider })
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Embed every chunk. Any failing batch aborts the whole call.
    pub async fn embed_chunks(&self, chunks: &[Chunk]) -> PipelineResult<Vec<EmbeddingVector>> {
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        self.embed_texts(&texts).await
    }

    pub async fn embed_texts(&self, texts: &[&str]) -> PipelineResult<Vec<EmbeddingVector>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let batch_count = texts.len().div_ceil(self.config.batch_size);
        info!(
            total_texts = texts.len(),
            batches = batch_count,
            batch_size = self.config.batch_size,
            "Starting batch embedding"
        );

        // `buffered` keeps results in submission order however requests complete
        let batches: Vec<Vec<EmbeddingVector>> = stream::iter(texts.chunks(self.config.batch_size).enumerate())
            .map(|(batch_no, batch)| self.embed_one_batch(batch_no, batch))
            .buffered(self.config.max_concurrent_requests)
            .try_collect()
            .await?;

        let vectors: Vec<EmbeddingVector> = batches.into_iter().flatten().collect();

        if vectors.len() != texts.len() {
            return Err(PipelineError::EmbeddingService(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        let dimensions = check_dimensions(&vectors)?;

        info!(
            total_embeddings = vectors.len(),
            dimensions,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Batch embedding completed"
        );
        Ok(vectors)
    }

    async fn embed_one_batch(
        &self,
        batch_no: usize,
        batch: &[&str],
    ) -> PipelineResult<Vec<EmbeddingVector>> {
        debug!(batch = batch_no, size = batch.len(), "Sending embedding batch");

        let vectors = self.provider.embed_batch(batch).await.map_err(|e| {
            error!(batch = batch_no, error = %e, "Embedding batch failed");
            e
        })?;

        if vectors.len() != batch.len() {
            return Err(PipelineError::EmbeddingService(format!(
                "batch {} returned {} embeddings for {} inputs",
                batch_no,
                vectors.len(),
                batch.len()
            )));
        }
        Ok(vectors)
    }
}

/// All vectors must share one non-zero dimensionality; returns it.
pub fn check_dimensions(vectors: &[EmbeddingVector]) -> PipelineResult<usize> {
    let Some(first) = vectors.first() else {
        return Ok(0);
    };
    let dimensions = first.len();
    if dimensions == 0 {
        return Err(PipelineError::EmbeddingService(
            "provider returned an empty embedding".to_string(),
        ));
    }
    if let Some((index, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dimensions) {
        return Err(PipelineError::EmbeddingService(format!(
            "embedding {} has {} dimensions, expected {}",
            index,
            v.len(),
            dimensions
        )));
    }
    Ok(dimensions)
}
