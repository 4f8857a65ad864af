// src/chunker.rs

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DEFAULT_CHUNK_SIZE;
use crate::error::{PipelineError, PipelineResult};
use crate::extractor::PageRange;

/// A run of consecutive words from the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Zero-based position in the document
    pub index: usize,
    /// The chunk's words joined by single spaces
    pub text: String,
    pub word_count: usize,
    /// Offset of the first word within the document
    pub start_word: usize,
    /// Source pages, when the text came from a paged document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<PageRange>,
}

impl Chunk {
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.text.split(' ')
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    /// Words per chunk; the last chunk holds the remainder
    pub target_size: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            target_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Fixed-size word windows, no overlap
#[derive(Debug, Clone)]
pub struct WordChunker {
    config: ChunkerConfig,
}

impl WordChunker {
    pub fn new(config: ChunkerConfig) -> PipelineResult<Self> {
        if config.target_size == 0 {
            return Err(PipelineError::InvalidConfiguration(
                "chunk_size must be a positive integer".to_string(),
            ));
        }
        Ok(Self { config })
    }

    pub fn with_default() -> Self {
        Self {
            config: ChunkerConfig::default(),
        }
    }

    pub fn target_size(&self) -> usize {
        self.config.target_size
    }

    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        let words: Vec<&str> = text.split_whitespace().collect();

        let chunks: Vec<Chunk> = words
            .chunks(self.config.target_size)
            .enumerate()
            .map(|(index, window)| Chunk {
                index,
                text: window.join(" "),
                word_count: window.len(),
                start_word: index * self.config.target_size,
                pages: None,
            })
            .collect();

        debug!(
            words = words.len(),
            chunks = chunks.len(),
            target_size = self.config.target_size,
            "Chunked text"
        );
        chunks
    }
}

/// Split `text` into chunks of `target_size` words
pub fn chunk_text(text: &str, target_size: usize) -> PipelineResult<Vec<Chunk>> {
    Ok(WordChunker::new(ChunkerConfig { target_size })?.chunk(text))
}
