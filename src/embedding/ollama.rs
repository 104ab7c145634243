//! Ollama embedding backend.
//!
//! Talks to a local Ollama server over HTTP (`POST /api/embeddings`) with a
//! bounded timeout and L2-normalizes the returned vector. Any transport or
//! model failure is reported as a dependency error so callers can fall back
//! to keyword search.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

pub struct OllamaProvider {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    dimension: usize,
}

impl OllamaProvider {
    pub fn new(config: &crate::config::EmbeddingConfig) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/embeddings", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            dimension: config.dimension,
        })
    }
}

impl super::EmbeddingProvider for OllamaProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .map_err(|e| Error::DependencyUnavailable(format!("embedding request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::DependencyUnavailable(format!(
                "embedding backend returned HTTP {}",
                response.status()
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .map_err(|e| Error::DependencyUnavailable(format!("bad embedding response: {e}")))?;

        if body.embedding.len() != self.dimension {
            return Err(Error::DependencyUnavailable(format!(
                "embedding dimension mismatch: expected {}, got {}",
                self.dimension,
                body.embedding.len()
            )));
        }

        Ok(l2_normalize(body.embedding))
    }

    fn dimensions(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

/// Normalize to unit length so KNN distances convert cleanly to cosine
/// similarity. Zero vectors pass through unchanged.
fn l2_normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}
