pub mod config;
pub mod error;
pub mod extractor;
pub mod chunker;
pub mod embedder;
pub mod serializer;
pub mod pipeline;
pub mod logging;

pub use config::{ConfigOverrides, PipelineConfig};
pub use error::{ExtractionError, PipelineError, PipelineResult};
pub use pipeline::{run_pipeline, Pipeline};
