//! Agent session tracking.
//!
//! Sessions are implicitly created: the first memory write naming a session
//! id upserts the row, and every later write bumps `last_accessed`. Callers
//! never need an explicit session-creation API.

use rusqlite::{params, Connection};

use crate::error::{Error, Result};
use crate::memory::types::{AgentType, SessionRecord};

/// Upsert a session row and bump its `last_accessed`.
pub fn touch_session(conn: &Connection, session_id: &str, agent_type: AgentType) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();

    let updated = conn.execute(
        "UPDATE agent_sessions SET last_accessed = ?1, is_active = 1 WHERE session_id = ?2",
        params![now, session_id],
    )?;

    if updated == 0 {
        conn.execute(
            "INSERT INTO agent_sessions (session_id, agent_type, created_at, last_accessed, is_active) \
             VALUES (?1, ?2, ?3, ?3, 1)",
            params![session_id, agent_type.as_str(), now],
        )?;
    }

    Ok(())
}

/// All known sessions, most recently accessed first.
pub fn list_sessions(conn: &Connection) -> Result<Vec<SessionRecord>> {
    crate::db::with_read_retry(|| {
        let mut stmt = conn
            .prepare(
                "SELECT session_id, agent_type, created_at, last_accessed, is_active \
                 FROM agent_sessions ORDER BY last_accessed DESC",
            )
            .map_err(Error::from)?;
        let rows = stmt
            .query_map([], |row| {
                let agent_type: String = row.get(1)?;
                Ok(SessionRecord {
                    session_id: row.get(0)?,
                    agent_type: agent_type.parse().unwrap_or_default(),
                    created_at: row.get(2)?,
                    last_accessed: row.get(3)?,
                    is_active: row.get(4)?,
                })
            })
            .map_err(Error::from)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)?;
        Ok(rows)
    })
}
