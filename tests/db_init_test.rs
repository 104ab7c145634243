mod helpers;

use helpers::DIM;

#[test]
fn open_database_creates_schema_and_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memory.db");

    let conn = hypha::db::open_database(&path, DIM).unwrap();
    assert!(path.exists());

    // All core tables exist
    let tables: Vec<String> = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    for expected in [
        "memories",
        "memory_relationships",
        "categories",
        "memory_categorizations",
        "domains",
        "vector_metadata",
        "agent_sessions",
        "schema_migrations",
    ] {
        assert!(tables.contains(&expected.to_string()), "missing {expected}");
    }

    // Migration ledger is at the current version
    assert_eq!(
        hypha::db::migrations::schema_version(&conn).unwrap(),
        hypha::db::migrations::CURRENT_SCHEMA_VERSION
    );

    // WAL mode is on for file-backed databases
    let mode: String = conn
        .query_row("PRAGMA journal_mode", [], |r| r.get(0))
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");

    // Foreign keys are enforced
    let fk: i64 = conn.query_row("PRAGMA foreign_keys", [], |r| r.get(0)).unwrap();
    assert_eq!(fk, 1);
}

#[test]
fn reopening_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memory.db");

    drop(hypha::db::open_database(&path, DIM).unwrap());
    let conn = hypha::db::open_database(&path, DIM).unwrap();

    // Ledger did not grow on the second open
    assert_eq!(
        hypha::db::migrations::migration_ledger(&conn).unwrap().len(),
        hypha::db::migrations::CURRENT_SCHEMA_VERSION as usize
    );
}

#[test]
fn vec_extension_is_loaded() {
    let conn = helpers::test_db();
    let version: String = conn
        .query_row("SELECT vec_version()", [], |r| r.get(0))
        .unwrap();
    assert!(!version.is_empty());
}
