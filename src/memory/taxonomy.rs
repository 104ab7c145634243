//! Categories, categorizations, and domains.
//!
//! Categories are hierarchical labels; deleting a parent orphans its children
//! (FK SET NULL) rather than cascading. Categorizations join memories to
//! categories with a confidence score — the engine records assignments, it
//! never chooses them. Domains are flat partitions auto-created on first use,
//! so [`ensure_domain`] is idempotent by name.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};
use crate::memory::types::{Categorization, Category, Domain};

/// Inputs for creating a category.
#[derive(Debug, Clone)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub description: String,
    pub parent_category_id: Option<String>,
    /// Defaults to 0.7 when absent.
    pub confidence_threshold: Option<f64>,
    pub auto_generated: bool,
}

pub fn create_category(conn: &Connection, req: &CreateCategoryRequest) -> Result<Category> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(Error::validation("category name must not be empty"));
    }
    let threshold = req.confidence_threshold.unwrap_or(0.7);
    if !(0.0..=1.0).contains(&threshold) {
        return Err(Error::validation(format!(
            "confidence_threshold must be between 0.0 and 1.0, got {threshold}"
        )));
    }

    if let Some(parent_id) = req.parent_category_id.as_deref() {
        let exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM categories WHERE id = ?1",
            params![parent_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(Error::not_found("parent category", parent_id));
        }
    }

    let id = uuid::Uuid::now_v7().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO categories \
         (id, name, description, parent_category_id, confidence_threshold, auto_generated, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            id,
            name,
            req.description,
            req.parent_category_id,
            threshold,
            req.auto_generated,
            now
        ],
    )?;

    Ok(Category {
        id,
        name: name.to_string(),
        description: req.description.clone(),
        parent_category_id: req.parent_category_id.clone(),
        confidence_threshold: threshold,
        auto_generated: req.auto_generated,
        created_at: now,
    })
}

/// All categories ordered by name, optionally restricted to one parent.
pub fn list_categories(conn: &Connection, parent_id: Option<&str>) -> Result<Vec<Category>> {
    crate::db::with_read_retry(|| {
        let sql = match parent_id {
            Some(_) => {
                "SELECT id, name, description, parent_category_id, confidence_threshold, \
                 auto_generated, created_at FROM categories WHERE parent_category_id = ?1 \
                 ORDER BY name"
            }
            None => {
                "SELECT id, name, description, parent_category_id, confidence_threshold, \
                 auto_generated, created_at FROM categories ORDER BY name"
            }
        };

        let mut stmt = conn.prepare(sql).map_err(Error::from)?;
        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<Category> {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                parent_category_id: row.get(3)?,
                confidence_threshold: row.get(4)?,
                auto_generated: row.get(5)?,
                created_at: row.get(6)?,
            })
        };
        let rows = match parent_id {
            Some(p) => stmt.query_map(params![p], map_row),
            None => stmt.query_map([], map_row),
        }
        .map_err(Error::from)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)?;
        Ok(rows)
    })
}

/// Delete a category. Children are orphaned (parent set NULL), assignments
/// cascade away.
pub fn delete_category(conn: &Connection, id: &str) -> Result<()> {
    let deleted = conn.execute("DELETE FROM categories WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(Error::not_found("category", id));
    }
    Ok(())
}

/// Record a memory-to-category assignment. Upserts on the composite key, so
/// re-categorizing replaces the previous confidence and reasoning.
pub fn categorize(
    conn: &Connection,
    memory_id: &str,
    category_id: &str,
    confidence: f64,
    reasoning: Option<&str>,
) -> Result<Categorization> {
    if !(0.0..=1.0).contains(&confidence) {
        return Err(Error::validation(format!(
            "confidence must be between 0.0 and 1.0, got {confidence}"
        )));
    }

    let memory_exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM memories WHERE id = ?1",
        params![memory_id],
        |row| row.get(0),
    )?;
    if !memory_exists {
        return Err(Error::not_found("memory", memory_id));
    }
    let category_exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM categories WHERE id = ?1",
        params![category_id],
        |row| row.get(0),
    )?;
    if !category_exists {
        return Err(Error::not_found("category", category_id));
    }

    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT OR REPLACE INTO memory_categorizations \
         (memory_id, category_id, confidence, reasoning, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![memory_id, category_id, confidence, reasoning, now],
    )?;

    Ok(Categorization {
        memory_id: memory_id.to_string(),
        category_id: category_id.to_string(),
        confidence,
        reasoning: reasoning.map(str::to_string),
        created_at: now,
    })
}

/// Create a domain, or return the existing row when the name is taken.
/// Idempotent because domains are auto-created as a side effect of memory
/// writes.
pub fn create_domain(conn: &Connection, name: &str, description: Option<&str>) -> Result<Domain> {
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        return Err(Error::validation("domain name must not be empty"));
    }

    if let Some(existing) = find_domain(conn, &name)? {
        return Ok(existing);
    }

    let id = uuid::Uuid::now_v7().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO domains (id, name, description, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![id, name, description, now],
    )?;

    Ok(Domain {
        id,
        name,
        description: description.map(str::to_string),
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Auto-create hook used by the memory write path.
pub fn ensure_domain(conn: &Connection, name: &str) -> Result<()> {
    create_domain(conn, name, None).map(|_| ())
}

fn find_domain(conn: &Connection, name: &str) -> Result<Option<Domain>> {
    conn.query_row(
        "SELECT id, name, description, created_at, updated_at FROM domains WHERE name = ?1",
        params![name],
        |row| {
            Ok(Domain {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                created_at: row.get(3)?,
                updated_at: row.get(4)?,
            })
        },
    )
    .optional()
    .map_err(Error::from)
}

/// All domains ordered by name.
pub fn list_domains(conn: &Connection) -> Result<Vec<Domain>> {
    crate::db::with_read_retry(|| {
        let mut stmt = conn
            .prepare(
                "SELECT id, name, description, created_at, updated_at FROM domains ORDER BY name",
            )
            .map_err(Error::from)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Domain {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            })
            .map_err(Error::from)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)?;
        Ok(rows)
    })
}
