// src/config.rs
//! Pipeline configuration
//!
//! Loads from environment variables (a `.env` file is honoured):
//! - PDFEMBED_CHUNK_SIZE: Words per chunk (default: 200)
//! - PDFEMBED_EMBEDDING_MODEL: Provider model identifier (default: text-embedding-3-small)
//! - PDFEMBED_OUTPUT_DIR: Where JSON artifacts are written (default: embeddings_json)
//! - OPENAI_API_KEY: Credential for the embedding provider
//! - PDFEMBED_API_BASE_URL: Provider base URL (default: https://api.openai.com/v1)
//! - PDFEMBED_BATCH_SIZE: Chunks per embedding request (default: 64)
//! - PDFEMBED_MAX_CONCURRENCY: Embedding requests in flight (default: 4)
//! - PDFEMBED_REQUEST_TIMEOUT: Per-request timeout in seconds (default: 60)
//! - PDFEMBED_EXTRACTED_TEXT_DIR: Also dump extracted text here (default: unset)

use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{PipelineError, PipelineResult};

pub const DEFAULT_CHUNK_SIZE: usize = 200;
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_OUTPUT_DIR: &str = "embeddings_json";
pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_BATCH_SIZE: usize = 64;
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Provider credential. Never printed, never serialized.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiCredential(String);

impl ApiCredential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiCredential(***)")
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Words per chunk
    pub chunk_size: usize,

    /// Embedding model identifier sent to the provider
    pub embedding_model: String,

    /// Directory for JSON artifacts
    pub output_directory: PathBuf,

    pub api_credential: Option<ApiCredential>,

    pub api_base_url: String,

    /// Chunks sent per embedding request
    pub batch_size: usize,

    /// Upper bound on embedding requests in flight
    pub max_concurrent_requests: usize,

    pub request_timeout_secs: u64,

    /// When set, extracted text is also written to `<dir>/<stem>.txt`
    pub extracted_text_directory: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            output_directory: PathBuf::from(DEFAULT_OUTPUT_DIR),
            api_credential: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENCY,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            extracted_text_directory: None,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> PipelineResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> PipelineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("PDFEMBED_CHUNK_SIZE") {
            config.chunk_size = parse_value("PDFEMBED_CHUNK_SIZE", &raw)?;
        }
        if let Some(model) = lookup("PDFEMBED_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        if let Some(dir) = lookup("PDFEMBED_OUTPUT_DIR") {
            config.output_directory = PathBuf::from(dir);
        }
        if let Some(key) = lookup(API_KEY_VAR) {
            config.api_credential = Some(ApiCredential::new(key));
        }
        if let Some(url) = lookup("PDFEMBED_API_BASE_URL") {
            config.api_base_url = url;
        }
        if let Some(raw) = lookup("PDFEMBED_BATCH_SIZE") {
            config.batch_size = parse_value("PDFEMBED_BATCH_SIZE", &raw)?;
        }
        if let Some(raw) = lookup("PDFEMBED_MAX_CONCURRENCY") {
            config.max_concurrent_requests = parse_value("PDFEMBED_MAX_CONCURRENCY", &raw)?;
        }
        if let Some(raw) = lookup("PDFEMBED_REQUEST_TIMEOUT") {
            config.request_timeout_secs = parse_value("PDFEMBED_REQUEST_TIMEOUT", &raw)?;
        }
        if let Some(dir) = lookup("PDFEMBED_EXTRACTED_TEXT_DIR") {
            config.extracted_text_directory = Some(PathBuf::from(dir));
        }

        Ok(config)
    }

    /// Apply caller overrides on top of this configuration
    pub fn apply(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(size) = overrides.chunk_size {
            self.chunk_size = size;
        }
        if let Some(model) = overrides.embedding_model {
            self.embedding_model = model;
        }
        if let Some(dir) = overrides.output_directory {
            self.output_directory = dir;
        }
        if let Some(url) = overrides.api_base_url {
            self.api_base_url = url;
        }
        if let Some(size) = overrides.batch_size {
            self.batch_size = size;
        }
        if let Some(n) = overrides.max_concurrent_requests {
            self.max_concurrent_requests = n;
        }
        if let Some(secs) = overrides.request_timeout_secs {
            self.request_timeout_secs = secs;
        }
        if let Some(dir) = overrides.extracted_text_directory {
            self.extracted_text_directory = Some(dir);
        }
        self
    }

    /// Reject values no run could succeed with
    pub fn validate(&self) -> PipelineResult<()> {
        if self.chunk_size == 0 {
            return Err(invalid("chunk_size must be a positive integer"));
        }
        if self.embedding_model.trim().is_empty() {
            return Err(invalid("embedding_model must not be empty"));
        }
        if self.output_directory.as_os_str().is_empty() {
            return Err(invalid("output_directory must not be empty"));
        }
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://") {
            return Err(invalid(format!(
                "api_base_url must be an http(s) URL, got '{}'",
                self.api_base_url
            )));
        }
        if self.batch_size == 0 {
            return Err(invalid("batch_size must be a positive integer"));
        }
        if self.max_concurrent_requests == 0 {
            return Err(invalid("max_concurrent_requests must be a positive integer"));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs must be a positive integer"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Caller-supplied overrides. Unknown keys are rejected.
///
/// The credential is deliberately absent: it only ever comes from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverrides {
    pub chunk_size: Option<usize>,
    pub embedding_model: Option<String>,
    pub output_directory: Option<PathBuf>,
    pub api_base_url: Option<String>,
    pub batch_size: Option<usize>,
    pub max_concurrent_requests: Option<usize>,
    pub request_timeout_secs: Option<u64>,
    pub extracted_text_directory: Option<PathBuf>,
}

impl ConfigOverrides {
    /// Parse overrides from a JSON object
    pub fn from_json_str(json: &str) -> PipelineResult<Self> {
        serde_json::from_str(json).map_err(|e| invalid(e.to_string()))
    }

    /// Parse overrides from `key=value` strings, e.g. from `--set` flags
    pub fn from_pairs<I, S>(pairs: I) -> PipelineResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = Self::default();
        for pair in pairs {
            let pair = pair.as_ref();
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| invalid(format!("expected key=value, got '{}'", pair)))?;
            let (key, value) = (key.trim(), value.trim());

            match key {
                "chunk_size" => overrides.chunk_size = Some(parse_value(key, value)?),
                "embedding_model" => overrides.embedding_model = Some(value.to_string()),
                "output_directory" => overrides.output_directory = Some(PathBuf::from(value)),
                "api_base_url" => overrides.api_base_url = Some(value.to_string()),
                "batch_size" => overrides.batch_size = Some(parse_value(key, value)?),
                "max_concurrent_requests" => {
                    overrides.max_concurrent_requests = Some(parse_value(key, value)?)
                }
                "request_timeout_secs" => {
                    overrides.request_timeout_secs = Some(parse_value(key, value)?)
                }
                "extracted_text_directory" => {
                    overrides.extracted_text_directory = Some(PathBuf::from(value))
                }
                other => return Err(invalid(format!("unknown option '{}'", other))),
            }
        }
        Ok(overrides)
    }
}

fn parse_value<T>(key: &str, raw: &str) -> PipelineResult<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| invalid(format!("{} = '{}': {}", key, raw, e)))
}

fn invalid(msg: impl Into<String>) -> PipelineError {
    PipelineError::InvalidConfiguration(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.chunk_size, 200);
        assert_eq!(config.embedding_model, "text-embedding-3-small");
        assert_eq!(config.output_directory, PathBuf::from("embeddings_json"));
        assert!(config.api_credential.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_reads_values() {
        let config = PipelineConfig::from_lookup(lookup_from(&[
            ("PDFEMBED_CHUNK_SIZE", "150"),
            ("PDFEMBED_OUTPUT_DIR", "/tmp/out"),
            ("OPENAI_API_KEY", "sk-test"),
            ("PDFEMBED_BATCH_SIZE", "8"),
        ]))
        .unwrap();

        assert_eq!(config.chunk_size, 150);
        assert_eq!(config.output_directory, PathBuf::from("/tmp/out"));
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.api_credential.unwrap().expose(), "sk-test");
    }

    #[test]
    fn test_unparseable_env_value_is_rejected() {
        let err = PipelineConfig::from_lookup(lookup_from(&[("PDFEMBED_CHUNK_SIZE", "lots")]))
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_zero_chunk_size_fails_validation() {
        let config = PipelineConfig::default().apply(ConfigOverrides {
            chunk_size: Some(0),
            ..Default::default()
        });
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_overrides_from_pairs() {
        let overrides =
            ConfigOverrides::from_pairs(["chunk_size=50", "embedding_model = custom-model"]).unwrap();
        assert_eq!(overrides.chunk_size, Some(50));
        assert_eq!(overrides.embedding_model.as_deref(), Some("custom-model"));

        let config = PipelineConfig::default().apply(overrides);
        assert_eq!(config.chunk_size, 50);
        assert_eq!(config.embedding_model, "custom-model");
    }

    #[test]
    fn test_unknown_override_rejected() {
        let err = ConfigOverrides::from_pairs(["colour=blue"]).unwrap_err();
        assert!(err.to_string().contains("unknown option 'colour'"));

        let err = ConfigOverrides::from_pairs(["api_credential=sk-leak"]).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfiguration(_)));

        let err = ConfigOverrides::from_json_str(r#"{"chunk_size": 10, "verbose": true}"#)
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_overrides_from_json() {
        let overrides =
            ConfigOverrides::from_json_str(r#"{"chunk_size": 10, "batch_size": 2}"#).unwrap();
        assert_eq!(overrides.chunk_size, Some(10));
        assert_eq!(overrides.batch_size, Some(2));
    }

    #[test]
    fn test_credential_is_redacted() {
        let mut config = PipelineConfig::default();
        config.api_credential = Some(ApiCredential::new("sk-very-secret"));
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-very-secret"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn test_base_url_must_be_http() {
        let config = PipelineConfig::default().apply(ConfigOverrides {
            api_base_url: Some("ftp://example.com".into()),
            ..Default::default()
        });
        assert!(config.validate().is_err());
    }
}
