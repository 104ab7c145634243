pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use sqlite_vec::sqlite3_vec_init;
use std::path::Path;
use std::sync::Once;

static SQLITE_VEC_INIT: Once = Once::new();

/// Register the sqlite-vec extension globally. Safe to call multiple times.
pub fn load_sqlite_vec() {
    SQLITE_VEC_INIT.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite3_vec_init as *const (),
        )));
    });
}

/// Open (or create) the hypha database at the given path, with all extensions
/// loaded, schema initialized, and pending migrations applied.
pub fn open_database(path: impl AsRef<Path>, vector_dim: usize) -> Result<Connection> {
    let path = path.as_ref();

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    load_sqlite_vec();

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    // WAL for concurrent readers; foreign keys for cascade semantics
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    schema::init_schema(&conn, vector_dim).context("failed to initialize schema")?;
    migrations::run_migrations(&conn).context("failed to run migrations")?;

    let stored_dim = schema::vector_dimension(&conn).unwrap_or(0);
    if stored_dim != 0 && stored_dim != vector_dim {
        tracing::warn!(
            stored = stored_dim,
            configured = vector_dim,
            "vector dimension changed — run `hypha reindex` to rebuild embeddings"
        );
    }

    tracing::info!(path = %path.display(), "database initialized");
    Ok(conn)
}

/// Open an in-memory database with schema and migrations applied. Used by
/// tests and available to integration suites through the library crate.
pub fn open_memory_database(vector_dim: usize) -> Result<Connection> {
    load_sqlite_vec();
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    schema::init_schema(&conn, vector_dim).context("failed to initialize schema")?;
    migrations::run_migrations(&conn).context("failed to run migrations")?;
    Ok(conn)
}

/// Run a read closure, retrying once on a storage failure before surfacing.
///
/// Validation and not-found outcomes are returned immediately; only
/// [`crate::error::Error::Internal`] triggers the single retry.
pub fn with_read_retry<T>(
    mut op: impl FnMut() -> crate::error::Result<T>,
) -> crate::error::Result<T> {
    match op() {
        Err(crate::error::Error::Internal(first)) => {
            tracing::debug!(error = %first, "read failed, retrying once");
            op()
        }
        other => other,
    }
}
