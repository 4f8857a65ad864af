//! OpenAI-compatible embeddings provider.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::{EmbeddingProvider, EmbeddingVector};
use crate::config::{ApiCredential, PipelineConfig};
use crate::error::{PipelineError, PipelineResult};

/// Async client for `POST {base_url}/embeddings`. One attempt per batch.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    endpoint: String,
    model: String,
}

impl OpenAiProvider {
    /// Builds the client. A missing or blank credential fails here, before any request.
    pub fn new(
        credential: Option<&ApiCredential>,
        base_url: &str,
        model: &str,
        timeout: Duration,
    ) -> PipelineResult<Self> {
        let credential = credential
            .filter(|c| !c.is_blank())
            .ok_or_else(|| PipelineError::Authentication("missing API credential".to_string()))?;
        if model.trim().is_empty() {
            return Err(PipelineError::InvalidConfiguration(
                "missing embedding model name".to_string(),
            ));
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", credential.expose().trim()))
            .map_err(|_| {
                PipelineError::Authentication("credential contains invalid characters".to_string())
            })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| {
                PipelineError::EmbeddingService(format!("failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.to_string(),
        })
    }

    pub fn from_config(config: &PipelineConfig) -> PipelineResult<Self> {
        Self::new(
            config.api_credential.as_ref(),
            &config.api_base_url,
            &config.embedding_model,
            config.request_timeout(),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed_batch(&self, inputs: &[&str]) -> PipelineResult<Vec<EmbeddingVector>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input: inputs,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let kind = if e.is_timeout() { "timed out" } else { "failed" };
                PipelineError::EmbeddingService(format!("request to {} {}: {}", self.endpoint, kind, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            warn!(status = status.as_u16(), "Embedding request rejected");
            return Err(classify_status(status, &body));
        }

        let mut parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            PipelineError::EmbeddingService(format!("malformed embedding response: {}", e))
        })?;
        parsed.data.sort_by_key(|entry| entry.index);

        if parsed.data.len() != inputs.len() {
            return Err(PipelineError::EmbeddingService(format!(
                "provider returned {} embeddings for {} inputs",
                parsed.data.len(),
                inputs.len()
            )));
        }
        if parsed.data.iter().enumerate().any(|(i, entry)| entry.index != i) {
            return Err(PipelineError::EmbeddingService(
                "provider returned non-contiguous embedding indices".to_string(),
            ));
        }

        debug!(inputs = inputs.len(), model = %self.model, "Embedding batch complete");
        Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn classify_status(status: StatusCode, body: &str) -> PipelineError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            PipelineError::Authentication(format!("provider rejected credential ({})", status))
        }
        _ => PipelineError::EmbeddingService(format!("request failed ({}): {}", status, body)),
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
