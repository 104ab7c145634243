//! Thin CLI commands. Parsing lives in `main.rs`; each command opens the
//! engine, calls into [`crate::memory`], and prints JSON.

pub mod reindex;
pub mod search;
pub mod stats;

use anyhow::Result;
use std::sync::Arc;

use crate::config::HyphaConfig;
use crate::embedding::EmbeddingProvider;

/// Open the database and embedding provider for a one-shot CLI command.
pub(crate) fn open_engine(
    config: &HyphaConfig,
) -> Result<(rusqlite::Connection, Arc<dyn EmbeddingProvider>)> {
    let db_path = config.resolved_db_path();
    let conn = crate::db::open_database(&db_path, config.embedding.dimension)?;
    let provider = crate::embedding::create_provider(&config.embedding)?;
    Ok((conn, Arc::from(provider)))
}
