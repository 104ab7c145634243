//! Memory write and read paths.
//!
//! [`create_memory`], [`update_memory`], and [`delete_memory`] each run their
//! database work inside a single transaction; the FTS5 triggers keep the
//! full-text index synchronized within that same transaction. Embeddings are
//! computed *before* the transaction opens (embed-then-write) and a failed
//! embed never fails the memory write — the record is stored without vector
//! metadata.

use rusqlite::{params, Connection, OptionalExtension};

use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::memory::types::{
    normalize_tags, tags_from_json, tags_to_json, AccessScope, AgentType, Memory,
};
use crate::memory::{session, taxonomy};

/// Inputs for creating a memory. Timestamps and id are server-assigned.
#[derive(Debug, Clone)]
pub struct CreateMemoryRequest {
    pub content: String,
    /// Defaults to 5; values outside [1, 10] are rejected.
    pub importance: Option<i64>,
    pub tags: Vec<String>,
    pub domain: Option<String>,
    pub source: Option<String>,
    pub session_id: String,
    pub agent_type: AgentType,
    pub access_scope: AccessScope,
    pub slug: Option<String>,
}

/// Partial update; `None` fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct MemoryUpdate {
    pub content: Option<String>,
    pub importance: Option<i64>,
    pub tags: Option<Vec<String>>,
    pub source: Option<String>,
    pub domain: Option<String>,
}

/// Filters for [`list_memories`].
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub domain: Option<String>,
    pub session_id: Option<String>,
    /// 0 means the default of 50.
    pub limit: usize,
    pub offset: usize,
}

/// Validated importance, defaulting to 5.
fn check_importance(importance: Option<i64>) -> Result<i64> {
    match importance {
        None => Ok(5),
        Some(i) if (1..=10).contains(&i) => Ok(i),
        Some(i) => Err(Error::validation(format!(
            "importance must be between 1 and 10, got {i}"
        ))),
    }
}

/// Embed content if a backend is configured and its dimension matches the
/// database. Any failure degrades to `None` with a warning.
fn try_embed(conn: &Connection, embedder: &dyn EmbeddingProvider, content: &str) -> Option<Vec<f32>> {
    if !embedder.available() {
        return None;
    }
    let expected = crate::db::schema::vector_dimension(conn).unwrap_or(0);
    if expected != 0 && expected != embedder.dimensions() {
        tracing::warn!(
            db_dimension = expected,
            provider_dimension = embedder.dimensions(),
            "embedding dimension mismatch, storing memory without vector"
        );
        return None;
    }
    match embedder.embed(content) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(error = %e, "embedding failed, storing memory without vector");
            None
        }
    }
}

/// Create a memory: validate, embed, then insert the row, its vector, and the
/// bookkeeping side effects (domain auto-create, session upsert) in one
/// transaction.
pub fn create_memory(
    conn: &mut Connection,
    embedder: &dyn EmbeddingProvider,
    req: &CreateMemoryRequest,
) -> Result<Memory> {
    // 1. Validate
    let content = req.content.trim();
    if content.is_empty() {
        return Err(Error::validation("content must not be empty"));
    }
    let importance = check_importance(req.importance)?;
    let tags = normalize_tags(&req.tags);
    let slug = req.slug.as_deref().map(str::trim).filter(|s| !s.is_empty());

    // 2. Embed outside the transaction (never hold a transaction across a
    //    network call)
    let embedding = try_embed(conn, embedder, content);
    let model_id = embedder.model_id().to_string();

    // 3. Transactional write
    let tx = conn.transaction().map_err(Error::from)?;

    if let Some(domain) = req.domain.as_deref() {
        taxonomy::ensure_domain(&tx, domain)?;
    }
    session::touch_session(&tx, &req.session_id, req.agent_type)?;

    let id = uuid::Uuid::now_v7().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let embedding_bytes = embedding.as_deref().map(super::embedding_to_bytes);

    tx.execute(
        "INSERT INTO memories (id, content, source, importance, tags, session_id, domain, \
         embedding, created_at, updated_at, agent_type, access_scope, slug) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9, ?10, ?11, ?12)",
        params![
            id,
            content,
            req.source,
            importance,
            tags_to_json(&tags),
            req.session_id,
            req.domain,
            embedding_bytes,
            now,
            req.agent_type.as_str(),
            req.access_scope.as_str(),
            slug,
        ],
    )?;
    let rowid = tx.last_insert_rowid();

    if let Some(vector) = embedding.as_deref() {
        insert_vector(&tx, &id, rowid, vector, &model_id, &now)?;
    }

    tx.commit().map_err(Error::from)?;

    tracing::info!(
        id = %id,
        session = %req.session_id,
        embedded = embedding.is_some(),
        "memory stored"
    );

    Ok(Memory {
        id,
        content: content.to_string(),
        source: req.source.clone(),
        importance,
        tags,
        session_id: req.session_id.clone(),
        domain: req.domain.clone(),
        created_at: now.clone(),
        updated_at: now,
        agent_type: req.agent_type,
        access_scope: req.access_scope,
        slug: slug.map(str::to_string),
        has_embedding: embedding.is_some(),
    })
}

/// Fetch a memory by id. Reads are retried once on storage failure.
pub fn get_memory(conn: &Connection, id: &str) -> Result<Memory> {
    crate::db::with_read_retry(|| {
        conn.query_row(
            &format!("SELECT {MEMORY_COLUMNS} FROM memories WHERE id = ?1"),
            params![id],
            memory_from_row,
        )
        .optional()
        .map_err(Error::from)?
        .ok_or_else(|| Error::not_found("memory", id))
    })
}

/// Apply a partial update. Content changes re-embed (or drop the stale
/// vector when embedding is unavailable).
pub fn update_memory(
    conn: &mut Connection,
    embedder: &dyn EmbeddingProvider,
    id: &str,
    update: &MemoryUpdate,
) -> Result<Memory> {
    // 1. Validate incoming fields
    if let Some(content) = update.content.as_deref() {
        if content.trim().is_empty() {
            return Err(Error::validation("content must not be empty"));
        }
    }
    if let Some(i) = update.importance {
        check_importance(Some(i))?;
    }

    // 2. Fetch-merge
    let existing = get_memory(conn, id)?;
    let content = update
        .content
        .as_deref()
        .map(str::trim)
        .unwrap_or(&existing.content)
        .to_string();
    let importance = update.importance.unwrap_or(existing.importance);
    let tags = update
        .tags
        .as_deref()
        .map(normalize_tags)
        .unwrap_or_else(|| existing.tags.clone());
    let source = update.source.clone().or_else(|| existing.source.clone());
    let domain = update.domain.clone().or_else(|| existing.domain.clone());

    let content_changed = content != existing.content;

    // 3. Re-embed changed content before the transaction
    let embedding = if content_changed {
        try_embed(conn, embedder, &content)
    } else {
        None
    };
    let model_id = embedder.model_id().to_string();

    // 4. Transactional rewrite
    let tx = conn.transaction().map_err(Error::from)?;

    if let Some(domain) = domain.as_deref() {
        taxonomy::ensure_domain(&tx, domain)?;
    }
    session::touch_session(&tx, &existing.session_id, existing.agent_type)?;

    let now = chrono::Utc::now().to_rfc3339();
    tx.execute(
        "UPDATE memories SET content = ?1, source = ?2, importance = ?3, tags = ?4, \
         domain = ?5, updated_at = ?6 WHERE id = ?7",
        params![content, source, importance, tags_to_json(&tags), domain, now, id],
    )?;

    if content_changed {
        // The old vector describes the old content either way
        tx.execute("DELETE FROM memories_vec WHERE id = ?1", params![id])?;
        tx.execute("DELETE FROM vector_metadata WHERE memory_id = ?1", params![id])?;
        match embedding.as_deref() {
            Some(vector) => {
                let rowid: i64 = tx.query_row(
                    "SELECT rowid FROM memories WHERE id = ?1",
                    params![id],
                    |r| r.get(0),
                )?;
                tx.execute(
                    "UPDATE memories SET embedding = ?1 WHERE id = ?2",
                    params![super::embedding_to_bytes(vector), id],
                )?;
                insert_vector(&tx, id, rowid, vector, &model_id, &now)?;
            }
            None => {
                tx.execute("UPDATE memories SET embedding = NULL WHERE id = ?1", params![id])?;
            }
        }
    }

    tx.commit().map_err(Error::from)?;
    tracing::info!(id = %id, content_changed, "memory updated");

    get_memory(conn, id)
}

/// Delete a memory. Cascades remove its relationships, categorizations, and
/// vector metadata; the FTS trigger removes the index entry; the vec0 row is
/// deleted explicitly (virtual tables have no foreign keys).
pub fn delete_memory(conn: &mut Connection, id: &str) -> Result<()> {
    let tx = conn.transaction().map_err(Error::from)?;

    let exists: bool = tx.query_row(
        "SELECT COUNT(*) > 0 FROM memories WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    if !exists {
        return Err(Error::not_found("memory", id));
    }

    tx.execute("DELETE FROM memories_vec WHERE id = ?1", params![id])?;
    tx.execute("DELETE FROM memories WHERE id = ?1", params![id])?;

    tx.commit().map_err(Error::from)?;
    tracing::info!(id = %id, "memory deleted");
    Ok(())
}

/// List memories by recency with optional domain/session filters.
pub fn list_memories(conn: &Connection, filter: &ListFilter) -> Result<Vec<Memory>> {
    crate::db::with_read_retry(|| {
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<&dyn rusqlite::types::ToSql> = Vec::new();

        if let Some(domain) = filter.domain.as_ref() {
            clauses.push("domain = ?");
            args.push(domain as &dyn rusqlite::types::ToSql);
        }
        if let Some(session_id) = filter.session_id.as_ref() {
            clauses.push("session_id = ?");
            args.push(session_id as &dyn rusqlite::types::ToSql);
        }

        let mut sql = format!("SELECT {MEMORY_COLUMNS} FROM memories");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        let limit = if filter.limit == 0 { 50 } else { filter.limit };
        sql.push_str(&format!(
            " ORDER BY created_at DESC, rowid DESC LIMIT {limit} OFFSET {}",
            filter.offset
        ));

        let mut stmt = conn.prepare(&sql).map_err(Error::from)?;
        let rows = stmt
            .query_map(args.as_slice(), memory_from_row)
            .map_err(Error::from)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)?;
        Ok(rows)
    })
}

/// Column list shared by every memory SELECT.
pub(crate) const MEMORY_COLUMNS: &str = "id, content, source, importance, tags, session_id, \
     domain, created_at, updated_at, agent_type, access_scope, slug, embedding IS NOT NULL";

/// Map a row selected with [`MEMORY_COLUMNS`] into a [`Memory`].
pub(crate) fn memory_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Memory> {
    let tags_json: Option<String> = row.get(4)?;
    let agent_type: String = row.get(9)?;
    let access_scope: String = row.get(10)?;
    Ok(Memory {
        id: row.get(0)?,
        content: row.get(1)?,
        source: row.get(2)?,
        importance: row.get(3)?,
        tags: tags_from_json(tags_json.as_deref()),
        session_id: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        domain: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
        // CHECK constraints keep these columns inside the closed sets
        agent_type: agent_type.parse().unwrap_or_default(),
        access_scope: access_scope.parse().unwrap_or_default(),
        slug: row.get(11)?,
        has_embedding: row.get(12)?,
    })
}

/// Re-embed every memory with the configured provider, rebuilding the vec0
/// table when the vector dimension changed. Used after an embedding model
/// switch. `on_progress(done, total)` fires after each memory.
pub fn reindex_all(
    conn: &mut Connection,
    embedder: &dyn EmbeddingProvider,
    mut on_progress: impl FnMut(usize, usize),
) -> Result<usize> {
    if !embedder.available() {
        return Err(Error::DependencyUnavailable(
            "reindex requires an embedding provider".into(),
        ));
    }

    let dim = embedder.dimensions();
    let stored_dim = crate::db::schema::vector_dimension(conn).unwrap_or(0);
    if stored_dim != dim {
        tracing::info!(from = stored_dim, to = dim, "rebuilding vector table for new dimension");
        conn.execute_batch(&format!(
            "DROP TABLE IF EXISTS memories_vec;\n\
             CREATE VIRTUAL TABLE memories_vec USING vec0(id TEXT PRIMARY KEY, embedding FLOAT[{dim}]);"
        ))?;
        conn.execute(
            "INSERT OR REPLACE INTO schema_meta (key, value) VALUES ('vector_dimension', ?1)",
            params![dim.to_string()],
        )?;
    }

    let rows: Vec<(String, String, i64)> = {
        let mut stmt = conn.prepare("SELECT id, content, rowid FROM memories ORDER BY rowid")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows
    };
    let total = rows.len();
    let model_id = embedder.model_id().to_string();

    for (done, (id, content, rowid)) in rows.into_iter().enumerate() {
        // Embed outside the transaction; a reindex is explicit, so a backend
        // failure aborts instead of degrading
        let vector = embedder.embed(&content)?;
        let now = chrono::Utc::now().to_rfc3339();

        let tx = conn.transaction().map_err(Error::from)?;
        tx.execute("DELETE FROM memories_vec WHERE id = ?1", params![id])?;
        tx.execute(
            "UPDATE memories SET embedding = ?1 WHERE id = ?2",
            params![super::embedding_to_bytes(&vector), id],
        )?;
        insert_vector(&tx, &id, rowid, &vector, &model_id, &now)?;
        tx.commit().map_err(Error::from)?;

        on_progress(done + 1, total);
    }

    crate::db::migrations::set_embedding_model(conn, &model_id)?;
    tracing::info!(count = total, model = %model_id, "reindex complete");
    Ok(total)
}

/// Insert the vec0 row and its vector_metadata bookkeeping.
fn insert_vector(
    conn: &Connection,
    id: &str,
    rowid: i64,
    vector: &[f32],
    model_id: &str,
    now: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO memories_vec (id, embedding) VALUES (?1, ?2)",
        params![id, super::embedding_to_bytes(vector)],
    )?;
    conn.execute(
        "INSERT OR REPLACE INTO vector_metadata \
         (memory_id, vector_index, embedding_model, embedding_dimension, last_updated) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, rowid, model_id, vector.len() as i64, now],
    )?;
    Ok(())
}
