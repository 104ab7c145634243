#![allow(dead_code)]

use hypha::embedding::EmbeddingProvider;
use hypha::memory::store::{create_memory, CreateMemoryRequest};
use hypha::memory::types::{AccessScope, AgentType, Memory};
use rusqlite::Connection;
use std::collections::HashMap;

/// Vector width used across the integration suites; small on purpose.
pub const DIM: usize = 8;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    hypha::db::open_memory_database(DIM).unwrap()
}

/// Deterministic embedder for tests: explicit vectors per text, with a
/// length-derived spike as the fallback.
pub struct StubEmbedder {
    map: HashMap<String, Vec<f32>>,
}

impl StubEmbedder {
    pub fn new() -> Self {
        Self { map: HashMap::new() }
    }

    pub fn with(entries: &[(&str, Vec<f32>)]) -> Self {
        Self {
            map: entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }
}

impl Default for StubEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingProvider for StubEmbedder {
    fn embed(&self, text: &str) -> hypha::error::Result<Vec<f32>> {
        Ok(self
            .map
            .get(text)
            .cloned()
            .unwrap_or_else(|| spike(text.len() % DIM)))
    }

    fn dimensions(&self) -> usize {
        DIM
    }

    fn model_id(&self) -> &str {
        "stub-model"
    }
}

/// Unit vector along one dimension.
pub fn spike(dim: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; DIM];
    v[dim % DIM] = 1.0;
    v
}

/// L2-normalized vector very close to `spike(dim)` (cosine ≈ 0.999).
pub fn near_spike(dim: usize) -> Vec<f32> {
    let mut v = vec![0.02f32; DIM];
    v[dim % DIM] = 1.0;
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    v.iter_mut().for_each(|x| *x /= norm);
    v
}

/// Builder-ish request with sensible test defaults.
pub fn request(content: &str) -> CreateMemoryRequest {
    CreateMemoryRequest {
        content: content.to_string(),
        importance: None,
        tags: vec![],
        domain: None,
        source: None,
        session_id: "test-session".to_string(),
        agent_type: AgentType::Unknown,
        access_scope: AccessScope::Session,
        slug: None,
    }
}

/// Insert a memory through the real write path. Returns the stored record.
pub fn insert_memory(
    conn: &mut Connection,
    embedder: &dyn EmbeddingProvider,
    req: &CreateMemoryRequest,
) -> Memory {
    create_memory(conn, embedder, req).unwrap()
}
