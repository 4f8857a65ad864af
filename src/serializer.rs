// src/serializer.rs
// Output artifact: model, atomic write, load back

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::chunker::Chunk;
use crate::embedder::{check_dimensions, EmbeddingVector};
use crate::error::{PipelineError, PipelineResult};
use crate::extractor::PageRange;

pub const ARTIFACT_SUFFIX: &str = "_embeddings.json";

/// One chunk and its vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub index: usize,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<PageRange>,
    pub embedding: EmbeddingVector,
}

/// The JSON artifact written for one source document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingDocument {
    pub source: String,
    pub chunk_count: usize,
    pub model: String,
    pub dimensions: usize,
    pub generated_at: DateTime<Utc>,
    pub chunks: Vec<ChunkRecord>,
}

impl EmbeddingDocument {
    /// Pair chunks with their vectors. Lengths must match and dimensions must agree.
    pub fn assemble(
        source: impl Into<String>,
        model: impl Into<String>,
        chunks: Vec<Chunk>,
        vectors: Vec<EmbeddingVector>,
    ) -> PipelineResult<Self> {
        if chunks.len() != vectors.len() {
            return Err(PipelineError::EmbeddingService(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                vectors.len()
            )));
        }
        let dimensions = check_dimensions(&vectors)?;

        let records: Vec<ChunkRecord> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, embedding)| ChunkRecord {
                index: chunk.index,
                text: chunk.text,
                pages: chunk.pages,
                embedding,
            })
            .collect();

        Ok(Self {
            source: source.into(),
            chunk_count: records.len(),
            model: model.into(),
            dimensions,
            generated_at: Utc::now(),
            chunks: records,
        })
    }
}

/// `<output_directory>/<file stem>_embeddings.json`; the same source always maps to the same path.
pub fn output_path_for(source: &Path, output_directory: &Path) -> PathBuf {
    output_directory.join(format!("{}{}", file_stem(source), ARTIFACT_SUFFIX))
}

pub(crate) fn file_stem(source: &Path) -> String {
    source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

/// Serialize `document` to `path`, replacing any previous artifact atomically.
pub fn write_document(document: &EmbeddingDocument, path: &Path) -> PipelineResult<PathBuf> {
    let json = serde_json::to_vec_pretty(document)
        .map_err(|e| PipelineError::persistence(path, e))?;
    write_atomic(path, &json)?;

    info!(
        path = %path.display(),
        chunks = document.chunk_count,
        dimensions = document.dimensions,
        bytes = json.len(),
        "Embedding document saved"
    );
    Ok(path.to_path_buf())
}

/// Load an artifact written by [`write_document`]
pub fn load_document(path: &Path) -> PipelineResult<EmbeddingDocument> {
    let json = std::fs::read(path).map_err(|e| PipelineError::persistence(path, e))?;
    serde_json::from_slice(&json).map_err(|e| PipelineError::persistence(path, e))
}

/// Write to a temp file beside `path`, fsync, then rename over it.
/// The temp file is removed on every failure path.
pub fn write_atomic(path: &Path, contents: &[u8]) -> PipelineResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| PipelineError::persistence(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| PipelineError::persistence(path, e))?;
    tmp.write_all(contents)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| PipelineError::persistence(path, e))?;

    debug!(tmp = %tmp.path().display(), target = %path.display(), "Renaming temp file");
    tmp.persist(path)
        .map_err(|e| PipelineError::persistence(path, e.error))?;
    Ok(())
}
