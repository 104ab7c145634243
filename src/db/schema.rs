//! SQL DDL for all hypha tables.
//!
//! Defines the `memories`, `memory_relationships`, `categories`,
//! `memory_categorizations`, `domains`, `vector_metadata`, `agent_sessions`,
//! `memories_fts` (FTS5), and `memories_vec` (vec0) tables plus the
//! `schema_migrations` ledger and `schema_meta` key/value store. All DDL uses
//! `IF NOT EXISTS` for idempotent initialization.
//!
//! The FTS5 index is kept in lockstep with `memories` by AFTER triggers, so
//! every insert/update/delete syncs the index inside the same transaction as
//! the base-table write. The update trigger deletes and reinserts the FTS row
//! rather than updating it in place.

use rusqlite::Connection;

/// All schema DDL statements for hypha's relational tables.
const SCHEMA_SQL: &str = r#"
-- Core memory storage
CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    source TEXT,
    importance INTEGER NOT NULL DEFAULT 5 CHECK(importance >= 1 AND importance <= 10),
    tags TEXT,
    session_id TEXT,
    domain TEXT,
    embedding BLOB,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    agent_type TEXT NOT NULL DEFAULT 'unknown'
        CHECK(agent_type IN ('desktop-agent','code-agent','api-caller','unknown')),
    access_scope TEXT NOT NULL DEFAULT 'session'
        CHECK(access_scope IN ('session','shared','global')),
    slug TEXT
);

CREATE INDEX IF NOT EXISTS idx_memories_session_id ON memories(session_id);
CREATE INDEX IF NOT EXISTS idx_memories_domain ON memories(domain);
CREATE INDEX IF NOT EXISTS idx_memories_created_at ON memories(created_at);
CREATE INDEX IF NOT EXISTS idx_memories_importance ON memories(importance);
CREATE INDEX IF NOT EXISTS idx_memories_access_scope ON memories(access_scope);
CREATE UNIQUE INDEX IF NOT EXISTS idx_memories_slug_unique ON memories(slug) WHERE slug IS NOT NULL;

-- Typed, weighted relationship graph
CREATE TABLE IF NOT EXISTS memory_relationships (
    id TEXT PRIMARY KEY,
    source_memory_id TEXT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
    target_memory_id TEXT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
    relationship_type TEXT NOT NULL CHECK(
        relationship_type IN ('references','contradicts','expands','similar','sequential','causes','enables')
    ),
    strength REAL NOT NULL CHECK(strength >= 0.0 AND strength <= 1.0),
    context TEXT,
    auto_generated INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_relationships_source ON memory_relationships(source_memory_id);
CREATE INDEX IF NOT EXISTS idx_relationships_target ON memory_relationships(target_memory_id);
CREATE INDEX IF NOT EXISTS idx_relationships_type ON memory_relationships(relationship_type);
CREATE INDEX IF NOT EXISTS idx_relationships_strength ON memory_relationships(strength);

-- Hierarchical categories; deleting a parent orphans children
CREATE TABLE IF NOT EXISTS categories (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL,
    parent_category_id TEXT REFERENCES categories(id) ON DELETE SET NULL,
    confidence_threshold REAL NOT NULL DEFAULT 0.7
        CHECK(confidence_threshold >= 0.0 AND confidence_threshold <= 1.0),
    auto_generated INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

-- Memory <-> category join with confidence scoring
CREATE TABLE IF NOT EXISTS memory_categorizations (
    memory_id TEXT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
    category_id TEXT NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
    confidence REAL NOT NULL CHECK(confidence >= 0.0 AND confidence <= 1.0),
    reasoning TEXT,
    created_at TEXT NOT NULL,
    PRIMARY KEY (memory_id, category_id)
);

-- Flat knowledge partitions, auto-created on first use
CREATE TABLE IF NOT EXISTS domains (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    description TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- One row per embedded memory
CREATE TABLE IF NOT EXISTS vector_metadata (
    memory_id TEXT PRIMARY KEY REFERENCES memories(id) ON DELETE CASCADE,
    vector_index INTEGER NOT NULL,
    embedding_model TEXT NOT NULL,
    embedding_dimension INTEGER NOT NULL,
    last_updated TEXT NOT NULL
);

-- Session tracking, upserted on first reference
CREATE TABLE IF NOT EXISTS agent_sessions (
    session_id TEXT PRIMARY KEY,
    agent_type TEXT NOT NULL
        CHECK(agent_type IN ('desktop-agent','code-agent','api-caller','unknown')),
    created_at TEXT NOT NULL,
    last_accessed TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1
);

-- Migration ledger
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    description TEXT NOT NULL,
    applied_at TEXT NOT NULL
);

-- Engine metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Standalone FTS5 table plus synchronization triggers.
///
/// Indexed fields: content, source, tags. Fields used only for filtering
/// (session_id, domain, slug) stay out of the index — cross-cutting filters
/// are applied over the base table.
const FTS_SQL: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS memories_fts USING fts5(
    id UNINDEXED,
    content,
    source,
    tags
);

CREATE TRIGGER IF NOT EXISTS memories_fts_insert AFTER INSERT ON memories BEGIN
    INSERT INTO memories_fts(id, content, source, tags)
    VALUES (new.id, new.content, new.source, new.tags);
END;

CREATE TRIGGER IF NOT EXISTS memories_fts_delete AFTER DELETE ON memories BEGIN
    DELETE FROM memories_fts WHERE id = old.id;
END;

-- Delete-then-reinsert: a rename is not assumed safe for indexed fields
CREATE TRIGGER IF NOT EXISTS memories_fts_update AFTER UPDATE ON memories BEGIN
    DELETE FROM memories_fts WHERE id = old.id;
    INSERT INTO memories_fts(id, content, source, tags)
    VALUES (new.id, new.content, new.source, new.tags);
END;
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
///
/// `vector_dim` fixes the width of the vec0 table and is recorded in
/// `schema_meta` so later opens can detect a mismatch.
pub fn init_schema(conn: &Connection, vector_dim: usize) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute_batch(FTS_SQL)?;

    // vec0 virtual table must be created separately (sqlite-vec syntax)
    conn.execute_batch(&format!(
        "CREATE VIRTUAL TABLE IF NOT EXISTS memories_vec USING vec0(\n\
         id TEXT PRIMARY KEY,\n\
         embedding FLOAT[{vector_dim}]\n\
         );"
    ))?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('vector_dimension', ?1)",
        [vector_dim.to_string()],
    )?;

    Ok(())
}

/// The vector dimension this database was initialized with.
pub fn vector_dimension(conn: &Connection) -> rusqlite::Result<usize> {
    conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'vector_dimension'",
        [],
        |row| {
            let val: String = row.get(0)?;
            Ok(val.parse::<usize>().unwrap_or(0))
        },
    )
}
