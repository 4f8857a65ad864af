// src/error.rs
// Error taxonomy for a pipeline run

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Why a PDF could not be turned into text
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Failed to read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Not a valid PDF: {0}")]
    InvalidPdf(String),

    #[error("PDF is password-protected")]
    Encrypted,
}

/// Every way a run can fail. Each variant aborts the whole run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Document contains no extractable text")]
    EmptyDocument,

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Embedding service error: {0}")]
    EmbeddingService(String),

    #[error("Authentication with embedding provider failed: {0}")]
    Authentication(String),

    #[error("Failed to write {}: {reason}", .path.display())]
    Persistence { path: PathBuf, reason: String },
}

impl PipelineError {
    pub fn persistence(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Persistence {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Pipeline stage the error originated from
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Extraction(_) | PipelineError::EmptyDocument => "extract",
            PipelineError::InvalidConfiguration(_) => "config",
            PipelineError::EmbeddingService(_) | PipelineError::Authentication(_) => "embed",
            PipelineError::Persistence { .. } => "persist",
        }
    }

    /// Short hint suitable for showing next to the error message
    pub fn recovery_hint(&self) -> String {
        match self {
            PipelineError::Extraction(ExtractionError::Encrypted) => {
                "Remove the password protection and try again.".to_string()
            }
            PipelineError::Extraction(ExtractionError::Unreadable { path, .. }) => {
                format!("Check that {} exists and is readable.", path.display())
            }
            PipelineError::Extraction(ExtractionError::InvalidPdf(_)) => {
                "The file does not look like a PDF.".to_string()
            }
            PipelineError::EmptyDocument => {
                "The PDF has no text layer (scanned documents need OCR first).".to_string()
            }
            PipelineError::Authentication(_) => {
                "Set OPENAI_API_KEY in the environment or in a .env file.".to_string()
            }
            PipelineError::Persistence { path, .. } => {
                format!("Check permissions and free space for {}.", path.display())
            }
            _ => "Check the logs for more details.".to_string(),
        }
    }
}
