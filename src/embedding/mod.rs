//! Text-to-vector embedding adapter.
//!
//! Provides the [`EmbeddingProvider`] trait, the Ollama HTTP implementation,
//! and a [`DisabledProvider`] used when no backend is configured. The engine
//! never branches on "is AI enabled" beyond the [`EmbeddingProvider::available`]
//! capability check at this boundary; an unavailable provider surfaces
//! [`crate::error::Error::DependencyUnavailable`] from `embed`.

pub mod ollama;

use crate::error::{Error, Result};

/// Trait for embedding text into vectors.
///
/// Implementations produce L2-normalized vectors of exactly `dimensions()`
/// entries. All methods are synchronous — callers in async contexts should
/// use `tokio::task::spawn_blocking`.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Number of dimensions this provider produces.
    fn dimensions(&self) -> usize;

    /// Identifier of the underlying model, for vector_metadata rows.
    fn model_id(&self) -> &str;

    /// Whether the backend is configured at all. Unavailable providers fail
    /// `embed` with a dependency error instead of returning vectors.
    fn available(&self) -> bool {
        true
    }
}

/// Stand-in used when no embedding backend is configured. Keyword, tag, and
/// date search keep working; semantic search and discovery report
/// "AI unavailable".
pub struct DisabledProvider;

impl EmbeddingProvider for DisabledProvider {
    fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(Error::DependencyUnavailable(
            "no embedding provider configured".into(),
        ))
    }

    fn dimensions(&self) -> usize {
        0
    }

    fn model_id(&self) -> &str {
        "disabled"
    }

    fn available(&self) -> bool {
        false
    }
}

/// Create an embedding provider from config.
///
/// `provider = "ollama"` talks to a local Ollama server; `provider =
/// "disabled"` turns semantic features off without breaking the rest of the
/// engine.
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> anyhow::Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "ollama" => {
            let provider = ollama::OllamaProvider::new(config)?;
            Ok(Box::new(provider))
        }
        "disabled" => Ok(Box::new(DisabledProvider)),
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: ollama, disabled"),
    }
}
