// src/pipeline.rs
// Extract -> chunk -> embed -> persist, one run per call

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::chunker::{ChunkerConfig, WordChunker};
use crate::config::{ConfigOverrides, PipelineConfig};
use crate::embedder::{EmbeddingConfig, EmbeddingProvider, EmbeddingService, OpenAiProvider};
use crate::error::{ExtractionError, PipelineError, PipelineResult};
use crate::extractor::{self, Document, ExtractedText};
use crate::serializer::{self, EmbeddingDocument};

/// Owns everything one run needs; nothing is shared between pipelines.
pub struct Pipeline {
    config: PipelineConfig,
    chunker: WordChunker,
    embedder: EmbeddingService,
}

impl Pipeline {
    /// Validates the configuration up front so bad settings never reach the network.
    pub fn new(config: PipelineConfig, provider: Arc<dyn EmbeddingProvider>) -> PipelineResult<Self> {
        config.validate()?;
        let chunker = WordChunker::new(ChunkerConfig {
            target_size: config.chunk_size,
        })?;
        let embedder = EmbeddingService::new(EmbeddingConfig::from(&config), provider)?;
        Ok(Self {
            config,
            chunker,
            embedder,
        })
    }

    /// Pipeline backed by the OpenAI-compatible provider described by `config`
    pub fn with_openai(config: PipelineConfig) -> PipelineResult<Self> {
        config.validate()?;
        let provider = OpenAiProvider::from_config(&config)?;
        Self::new(config, Arc::new(provider))
    }

    /// Where the artifact for `source` will be written
    pub fn output_path(&self, source: &Path) -> PathBuf {
        serializer::output_path_for(source, &self.config.output_directory)
    }

    /// Run the whole pipeline for one PDF and return the artifact path
    pub async fn run(&self, source: &Path) -> PipelineResult<PathBuf> {
        let span = info_span!("pipeline_run", run_id = %Uuid::new_v4(), source = %source.display());
        async {
            let started = Instant::now();
            info!("Processing PDF");

            let result = self.run_inner(source).await;
            match &result {
                Ok(path) => info!(
                    artifact = %path.display(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Pipeline run complete"
                ),
                Err(e) => error!(stage = e.stage(), error = %e, "Pipeline run failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_inner(&self, source: &Path) -> PipelineResult<PathBuf> {
        let document = Document::read(source).await?;
        let extracted = tokio::task::spawn_blocking(move || extractor::extract_text(&document))
            .await
            .map_err(|e| ExtractionError::InvalidPdf(format!("extraction aborted: {}", e)))??;

        if let Some(dir) = &self.config.extracted_text_directory {
            save_extracted_text(source, &extracted, dir).await?;
        }

        self.run_extracted(source, extracted).await
    }

    /// Chunk, embed and persist text that has already been extracted from `source`
    pub async fn run_extracted(&self, source: &Path, extracted: ExtractedText) -> PipelineResult<PathBuf> {
        let mut chunks = self.chunker.chunk(&extracted.text);
        if chunks.is_empty() {
            return Err(PipelineError::EmptyDocument);
        }
        for chunk in &mut chunks {
            chunk.pages = extracted.page_range(chunk.start_word, chunk.word_count);
        }
        info!(
            pages = extracted.page_count,
            words = extracted.word_count(),
            chunks = chunks.len(),
            chunk_size = self.chunker.target_size(),
            "Chunked document"
        );

        let vectors = self.embedder.embed_chunks(&chunks).await?;
        let document = EmbeddingDocument::assemble(
            extractor::source_name(source),
            self.embedder.model_name(),
            chunks,
            vectors,
        )?;

        let path = self.output_path(source);
        tokio::task::spawn_blocking(move || serializer::write_document(&document, &path))
            .await
            .map_err(|e| PipelineError::persistence(&self.config.output_directory, e))?
    }
}

async fn save_extracted_text(source: &Path, extracted: &ExtractedText, dir: &Path) -> PipelineResult<()> {
    let path = dir.join(format!("{}.txt", serializer::file_stem(source)));
    let text = extracted.text.clone();
    let target = path.clone();
    tokio::task::spawn_blocking(move || serializer::write_atomic(&target, text.as_bytes()))
        .await
        .map_err(|e| PipelineError::persistence(&path, e))??;
    info!(path = %path.display(), "Saved extracted text");
    Ok(())
}

/// Orchestration entry point: configuration from the environment plus
/// `overrides`, OpenAI-compatible provider, one PDF in, artifact path out.
pub async fn run_pipeline(source: impl AsRef<Path>, overrides: ConfigOverrides) -> PipelineResult<PathBuf> {
    let config = PipelineConfig::from_env()?.apply(overrides);
    Pipeline::with_openai(config)?.run(source.as_ref()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::EmbeddingVector;
    use crate::extractor::PageRange;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl EmbeddingProvider for CountingProvider {
        async fn embed_batch(&self, inputs: &[&str]) -> PipelineResult<Vec<EmbeddingVector>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(inputs.iter().map(|_| vec![0.25; 1536]).collect())
        }

        fn model_name(&self) -> &str {
            "counting"
        }
    }

    fn config_in(dir: &Path) -> PipelineConfig {
        PipelineConfig {
            output_directory: dir.join("out"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_bad_config_rejected_before_any_work() {
        let dir = tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.chunk_size = 0;
        let provider = Arc::new(CountingProvider { calls: AtomicUsize::new(0) });
        let result = Pipeline::new(config, provider.clone());
        assert!(matches!(result, Err(PipelineError::InvalidConfiguration(_))));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_file_makes_no_network_call() {
        let dir = tempdir().unwrap();
        let provider = Arc::new(CountingProvider { calls: AtomicUsize::new(0) });
        let pipeline = Pipeline::new(config_in(dir.path()), provider.clone()).unwrap();

        let err = pipeline.run(&dir.path().join("nope.pdf")).await.unwrap_err();
        assert!(matches!(err, PipelineError::Extraction(ExtractionError::Unreadable { .. })));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert!(!dir.path().join("out").exists());
    }

    #[tokio::test]
    async fn test_run_extracted_writes_artifact() {
        let dir = tempdir().unwrap();
        let provider = Arc::new(CountingProvider { calls: AtomicUsize::new(0) });
        let pipeline = Pipeline::new(config_in(dir.path()), provider).unwrap();

        // 300 words on page 1, 150 on page 3, page 2 blank
        let words: Vec<String> = (1..=450).map(|i| format!("w{}", i)).collect();
        let first = words[..300].join(" ");
        let second = words[300..].join(" ");
        let extracted = ExtractedText::from_pages([(1, first.as_str()), (2, ""), (3, second.as_str())]);
        let path = pipeline
            .run_extracted(Path::new("/docs/manual.pdf"), extracted)
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("out").join("manual_embeddings.json"));
        let doc = serializer::load_document(&path).unwrap();
        assert_eq!(doc.source, "manual.pdf");
        assert_eq!(doc.model, "counting");
        assert_eq!(doc.chunk_count, 3);
        assert!(doc.chunks.iter().all(|c| c.embedding.len() == 1536));
        let pages: Vec<_> = doc.chunks.iter().map(|c| c.pages).collect();
        assert_eq!(
            pages,
            vec![
                Some(PageRange { start: 1, end: 1 }),
                Some(PageRange { start: 1, end: 3 }),
                Some(PageRange { start: 3, end: 3 }),
            ]
        );
    }

    #[tokio::test]
    async fn test_whitespace_text_is_empty_document() {
        let dir = tempdir().unwrap();
        let provider = Arc::new(CountingProvider { calls: AtomicUsize::new(0) });
        let pipeline = Pipeline::new(config_in(dir.path()), provider.clone()).unwrap();

        let extracted = ExtractedText::from_pages([(1, "  \n ")]);
        let err = pipeline
            .run_extracted(Path::new("blank.pdf"), extracted)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::EmptyDocument));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_with_openai_requires_credential() {
        let dir = tempdir().unwrap();
        let result = Pipeline::with_openai(config_in(dir.path()));
        assert!(matches!(result, Err(PipelineError::Authentication(_))));
    }
}
