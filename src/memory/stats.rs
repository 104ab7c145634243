use rusqlite::{params, Connection};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Error, Result};

/// Read-only rollups over the whole store, computed fresh on every call.
#[derive(Debug, Serialize)]
pub struct StatsReport {
    pub total_memories: u64,
    pub average_importance: f64,
    /// Every distinct tag in use, sorted.
    pub distinct_tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_memory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_memory: Option<String>,
    pub relationship_count: u64,
    pub session_count: u64,
    pub by_domain: BTreeMap<String, u64>,
    pub by_category: BTreeMap<String, u64>,
    pub db_size_bytes: u64,
}

/// Per-domain rollup.
#[derive(Debug, Serialize)]
pub struct DomainStats {
    pub memory_count: u64,
    pub average_importance: f64,
}

/// Compute store-wide statistics.
///
/// `db_path` is used for file size; pass None for in-memory databases.
pub fn collect_stats(conn: &Connection, db_path: Option<&Path>) -> Result<StatsReport> {
    crate::db::with_read_retry(|| {
        let (total, average_importance): (i64, Option<f64>) = conn.query_row(
            "SELECT COUNT(*), AVG(importance) FROM memories",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let (oldest, newest): (Option<String>, Option<String>) = conn.query_row(
            "SELECT MIN(created_at), MAX(created_at) FROM memories",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let relationship_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM memory_relationships", [], |r| r.get(0))?;
        let session_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM agent_sessions", [], |r| r.get(0))?;

        let db_size_bytes = db_path
            .and_then(|p| std::fs::metadata(p).ok())
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(StatsReport {
            total_memories: total as u64,
            average_importance: average_importance.unwrap_or(0.0),
            distinct_tags: distinct_tags(conn)?,
            oldest_memory: oldest,
            newest_memory: newest,
            relationship_count: relationship_count as u64,
            session_count: session_count as u64,
            by_domain: count_by_domain(conn)?,
            by_category: count_by_category(conn)?,
            db_size_bytes,
        })
    })
}

/// Count and average importance for one domain.
pub fn domain_stats(conn: &Connection, domain: &str) -> Result<DomainStats> {
    crate::db::with_read_retry(|| {
        let (count, avg): (i64, Option<f64>) = conn.query_row(
            "SELECT COUNT(*), AVG(importance) FROM memories WHERE domain = ?1",
            params![domain],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(DomainStats {
            memory_count: count as u64,
            average_importance: avg.unwrap_or(0.0),
        })
    })
}

/// Union of every memory's tag set, sorted.
fn distinct_tags(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT tags FROM memories WHERE tags IS NOT NULL")
        .map_err(Error::from)?;
    let rows: Vec<Option<String>> = stmt
        .query_map([], |row| row.get(0))
        .map_err(Error::from)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)?;

    let mut set = std::collections::BTreeSet::new();
    for tags_json in rows {
        for tag in crate::memory::types::tags_from_json(tags_json.as_deref()) {
            set.insert(tag);
        }
    }
    Ok(set.into_iter().collect())
}

fn count_by_domain(conn: &Connection) -> Result<BTreeMap<String, u64>> {
    let mut stmt = conn
        .prepare(
            "SELECT domain, COUNT(*) FROM memories WHERE domain IS NOT NULL GROUP BY domain",
        )
        .map_err(Error::from)?;
    let rows: Vec<(String, i64)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(Error::from)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)?;
    Ok(rows.into_iter().map(|(d, c)| (d, c as u64)).collect())
}

fn count_by_category(conn: &Connection) -> Result<BTreeMap<String, u64>> {
    let mut stmt = conn
        .prepare(
            "SELECT c.name, COUNT(mc.memory_id) \
             FROM categories c \
             LEFT JOIN memory_categorizations mc ON mc.category_id = c.id \
             GROUP BY c.id",
        )
        .map_err(Error::from)?;
    let rows: Vec<(String, i64)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(Error::from)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)?;
    Ok(rows.into_iter().map(|(c, n)| (c, n as u64)).collect())
}
