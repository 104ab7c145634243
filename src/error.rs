//! Error kinds for the memory engine.
//!
//! Every engine operation returns [`Result`]. The variants are deliberately
//! coarse so front ends can route on them: validation and not-found errors go
//! straight back to the caller, [`Error::DependencyUnavailable`] tells a
//! caller it may fall back to keyword search, and [`Error::Internal`] wraps
//! storage failures.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Bad input rejected before any write (importance/strength out of range,
    /// empty content, malformed dates).
    #[error("validation error: {0}")]
    Validation(String),

    /// An id referenced by the operation does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Unique-key collision or a value outside a closed enum.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// The embedding adapter is absent or unreachable. Distinguished from
    /// "no results" so callers can fall back to keyword search.
    #[error("AI unavailable: {0}")]
    DependencyUnavailable(String),

    /// Storage engine failure. Writes abort their transaction; reads are
    /// retried once before this surfaces.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl Error {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(f, msg)
                if f.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::Constraint(msg.clone().unwrap_or_else(|| f.to_string()))
            }
            _ => Self::Internal(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_kind() {
        let err = Error::not_found("source memory", "abc-123");
        assert_eq!(err.to_string(), "source memory not found: abc-123");
    }

    #[test]
    fn constraint_violations_map_from_rusqlite() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (name TEXT UNIQUE)").unwrap();
        conn.execute("INSERT INTO t (name) VALUES ('a')", []).unwrap();
        let raw = conn
            .execute("INSERT INTO t (name) VALUES ('a')", [])
            .unwrap_err();
        let err: Error = raw.into();
        assert!(matches!(err, Error::Constraint(_)));
    }

    #[test]
    fn other_sqlite_errors_map_to_internal() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let raw = conn.execute("SELECT * FROM missing", []).unwrap_err();
        let err: Error = raw.into();
        assert!(matches!(err, Error::Internal(_)));
    }
}
