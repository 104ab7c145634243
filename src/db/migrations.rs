//! Forward-only schema migrations with a ledger.
//!
//! Applied versions are recorded in `schema_migrations`; [`run_migrations`]
//! applies anything newer than the highest recorded version, in order, each
//! inside its own transaction together with its ledger row. A re-run is a
//! no-op.

use rusqlite::Connection;

/// The schema version that the current binary expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Highest version recorded in the migration ledger (0 for a fresh ledger).
pub fn schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )
}

/// All applied migrations, oldest first.
pub fn migration_ledger(conn: &Connection) -> rusqlite::Result<Vec<(u32, String, String)>> {
    let mut stmt = conn.prepare(
        "SELECT version, description, applied_at FROM schema_migrations ORDER BY version",
    )?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Get the stored embedding model identifier, if any.
pub fn get_embedding_model(conn: &Connection) -> rusqlite::Result<Option<String>> {
    match conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'embedding_model'",
        [],
        |row| row.get::<_, String>(0),
    ) {
        Ok(val) => Ok(Some(val)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Set the stored embedding model identifier.
pub fn set_embedding_model(conn: &Connection, model: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_meta (key, value) VALUES ('embedding_model', ?1)",
        [model],
    )?;
    Ok(())
}

/// Run any pending forward-only migrations.
pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    let mut version = schema_version(conn)?;
    tracing::debug!(schema_version = version, target = CURRENT_SCHEMA_VERSION, "checking migrations");

    while version < CURRENT_SCHEMA_VERSION {
        let next = version + 1;
        let description = match next {
            1 => "baseline schema",
            2 => "compound relationship indexes for graph traversal",
            _ => {
                tracing::error!(version = next, "unknown migration target");
                break;
            }
        };

        tracing::info!(from = version, to = next, "running migration");
        apply_migration(conn, next, description)?;
        version = next;
    }

    Ok(())
}

/// Apply one migration and its ledger row inside a single transaction.
fn apply_migration(conn: &Connection, version: u32, description: &str) -> rusqlite::Result<()> {
    conn.execute_batch("BEGIN")?;
    let result = (|| {
        match version {
            1 => {} // tables created by init_schema; the ledger row marks the baseline
            2 => migrate_v1_to_v2(conn)?,
            _ => unreachable!("unknown migration {version}"),
        }
        conn.execute(
            "INSERT INTO schema_migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![version, description, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    })();

    match result {
        Ok(()) => conn.execute_batch("COMMIT"),
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK");
            Err(e)
        }
    }
}

/// Migration v1 → v2: compound indexes so undirected graph expansion avoids
/// full scans of memory_relationships.
fn migrate_v1_to_v2(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_relationships_source_target
             ON memory_relationships(source_memory_id, target_memory_id);
         CREATE INDEX IF NOT EXISTS idx_relationships_target_source
             ON memory_relationships(target_memory_id, source_memory_id);
         CREATE INDEX IF NOT EXISTS idx_relationships_source_strength
             ON memory_relationships(source_memory_id, strength);
         CREATE INDEX IF NOT EXISTS idx_relationships_target_strength
             ON memory_relationships(target_memory_id, strength);",
    )
}
