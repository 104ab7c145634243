//! Multi-mode search dispatcher.
//!
//! [`search`] routes a [`SearchMode`] to one handler per mode — keyword
//! (FTS5/bm25), tag (exact AND/OR matching), date range, semantic (vec0 KNN),
//! or hybrid (weighted keyword + semantic fusion). Every handler produces
//! scored candidate ids; cross-cutting filters (domain, session, access
//! scope) are applied as a final pass over hydrated rows, never pushed into
//! the index queries.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::collections::HashMap;

use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::memory::store::{memory_from_row, MEMORY_COLUMNS};
use crate::memory::types::{normalize_tags, AccessScope, Memory};

// ── Public types ──────────────────────────────────────────────────────────────

/// How multiple tags combine in tag mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagMatch {
    /// Every requested tag must be present (AND).
    All,
    /// Any requested tag may match (OR).
    Any,
}

impl std::str::FromStr for TagMatch {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "and" | "all" => Ok(Self::All),
            "or" | "any" => Ok(Self::Any),
            _ => Err(format!("unknown tag operator: {s} (expected AND or OR)")),
        }
    }
}

/// The closed set of search modes, one handler each.
#[derive(Debug, Clone)]
pub enum SearchMode {
    Keyword {
        query: String,
    },
    Tag {
        tags: Vec<String>,
        match_mode: TagMatch,
    },
    DateRange {
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    },
    Semantic {
        query: String,
        min_similarity: f64,
    },
    Hybrid {
        query: String,
        min_similarity: f64,
    },
}

/// Cross-cutting filters applied after candidate generation.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub domain: Option<String>,
    pub session_id: Option<String>,
    pub access_scope: Option<AccessScope>,
}

/// Hybrid fusion weights. A memory found by both searches collects both
/// weighted terms, which is the boost.
#[derive(Debug, Clone, Copy)]
pub struct FusionWeights {
    pub keyword: f64,
    pub semantic: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            keyword: 0.4,
            semantic: 0.6,
        }
    }
}

/// Which index produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Keyword,
    Tag,
    Date,
    Semantic,
    Hybrid,
}

/// A memory with its relevance score.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub memory: Memory,
    pub score: f64,
    pub match_type: MatchKind,
}

// ── Dispatcher ────────────────────────────────────────────────────────────────

/// Route one search request to its mode handler, then hydrate, filter, and
/// truncate.
pub fn search(
    conn: &Connection,
    embedder: &dyn EmbeddingProvider,
    mode: &SearchMode,
    filter: &SearchFilter,
    limit: usize,
    fusion: FusionWeights,
) -> Result<Vec<SearchResult>> {
    let limit = if limit == 0 { 10 } else { limit };
    // Over-fetch so the final filter pass can't starve the result set
    let candidate_limit = limit * 3;

    let (candidates, kind) = match mode {
        SearchMode::Keyword { query } => {
            (keyword_candidates(conn, query, candidate_limit)?, MatchKind::Keyword)
        }
        SearchMode::Tag { tags, match_mode } => (
            tag_candidates(conn, tags, *match_mode, candidate_limit)?,
            MatchKind::Tag,
        ),
        SearchMode::DateRange { start, end } => (
            date_candidates(conn, *start, *end, candidate_limit)?,
            MatchKind::Date,
        ),
        SearchMode::Semantic {
            query,
            min_similarity,
        } => (
            semantic_candidates(conn, embedder, query, *min_similarity, candidate_limit)?,
            MatchKind::Semantic,
        ),
        SearchMode::Hybrid {
            query,
            min_similarity,
        } => (
            hybrid_candidates(conn, embedder, query, *min_similarity, candidate_limit, fusion)?,
            MatchKind::Hybrid,
        ),
    };

    finalize(conn, candidates, filter, limit, kind)
}

// ── Mode handlers ─────────────────────────────────────────────────────────────

/// FTS5 keyword search. Native query syntax (phrases, boolean operators) is
/// passed straight through; a syntax error retries once with every term
/// quoted instead of reimplementing the operators.
fn keyword_candidates(
    conn: &Connection,
    query: &str,
    candidate_limit: usize,
) -> Result<Vec<(String, f64)>> {
    if query.trim().is_empty() {
        return Err(Error::validation("query is required for keyword search"));
    }

    match fts_query(conn, query, candidate_limit) {
        Ok(rows) => Ok(rows),
        Err(_) => {
            let escaped = escape_fts_query(query);
            if escaped.is_empty() {
                return Ok(Vec::new());
            }
            tracing::debug!(query, "FTS5 rejected query syntax, retrying sanitized");
            fts_query(conn, &escaped, candidate_limit).map_err(Error::from)
        }
    }
}

fn fts_query(
    conn: &Connection,
    match_expr: &str,
    candidate_limit: usize,
) -> rusqlite::Result<Vec<(String, f64)>> {
    let mut stmt = conn.prepare(
        "SELECT id, rank FROM memories_fts WHERE memories_fts MATCH ?1 \
         ORDER BY rank LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(params![match_expr, candidate_limit as i64], |row| {
            let rank: f64 = row.get(1)?;
            Ok((row.get::<_, String>(0)?, normalize_bm25(rank)))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// FTS5 `rank` is bm25: negative, more negative = better. Map roughly
/// [-10, 0] onto [1.0, 0.0].
fn normalize_bm25(rank: f64) -> f64 {
    (-rank / 10.0).clamp(0.0, 1.0)
}

/// Escape a user query for FTS5 MATCH syntax: each whitespace-delimited word
/// quoted, joined with spaces (implicit AND).
fn escape_fts_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|word| {
            let clean = word.replace('"', "");
            format!("\"{clean}\"")
        })
        .filter(|w| w != "\"\"")
        .collect::<Vec<_>>()
        .join(" ")
}

/// Exact tag matching. SQL LIKE prefilters on the serialized tag column; the
/// exact-set check happens over the parsed tags. Score is the matched
/// fraction of the requested tags.
fn tag_candidates(
    conn: &Connection,
    tags: &[String],
    match_mode: TagMatch,
    candidate_limit: usize,
) -> Result<Vec<(String, f64)>> {
    let wanted = normalize_tags(tags);
    if wanted.is_empty() {
        return Err(Error::validation("tags are required for tag search"));
    }

    let patterns: Vec<String> = wanted.iter().map(|t| format!("%\"{t}\"%")).collect();
    let joiner = match match_mode {
        TagMatch::All => " AND ",
        TagMatch::Any => " OR ",
    };
    let clause = patterns
        .iter()
        .map(|_| "tags LIKE ?")
        .collect::<Vec<_>>()
        .join(joiner);
    let sql = format!(
        "SELECT id, tags FROM memories WHERE {clause} \
         ORDER BY created_at DESC, rowid DESC LIMIT {candidate_limit}"
    );

    let args: Vec<&dyn rusqlite::types::ToSql> = patterns
        .iter()
        .map(|p| p as &dyn rusqlite::types::ToSql)
        .collect();

    let mut stmt = conn.prepare(&sql).map_err(Error::from)?;
    let rows: Vec<(String, Option<String>)> = stmt
        .query_map(args.as_slice(), |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(Error::from)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)?;

    let mut candidates = Vec::new();
    for (id, tags_json) in rows {
        let memory_tags = crate::memory::types::tags_from_json(tags_json.as_deref());
        let matched = wanted
            .iter()
            .filter(|t| memory_tags.iter().any(|m| m == *t))
            .count();
        let qualifies = match match_mode {
            TagMatch::All => matched == wanted.len(),
            TagMatch::Any => matched > 0,
        };
        if qualifies {
            candidates.push((id, matched as f64 / wanted.len() as f64));
        }
    }

    // Highest match fraction first; the SQL already ordered ties by recency
    candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    Ok(candidates)
}

/// Inclusive [start, end] window over created_at, newest first. No relevance
/// scoring — date matches are binary.
fn date_candidates(
    conn: &Connection,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    candidate_limit: usize,
) -> Result<Vec<(String, f64)>> {
    if start.is_none() && end.is_none() {
        return Err(Error::validation(
            "start or end is required for date range search",
        ));
    }

    let mut clauses: Vec<&str> = Vec::new();
    let mut bounds: Vec<String> = Vec::new();
    if let Some(start) = start {
        clauses.push("created_at >= ?");
        bounds.push(start.to_rfc3339());
    }
    if let Some(end) = end {
        clauses.push("created_at <= ?");
        bounds.push(end.to_rfc3339());
    }

    let sql = format!(
        "SELECT id FROM memories WHERE {} ORDER BY created_at DESC, rowid DESC LIMIT {candidate_limit}",
        clauses.join(" AND ")
    );
    let args: Vec<&dyn rusqlite::types::ToSql> = bounds
        .iter()
        .map(|b| b as &dyn rusqlite::types::ToSql)
        .collect();

    let mut stmt = conn.prepare(&sql).map_err(Error::from)?;
    let rows = stmt
        .query_map(args.as_slice(), |row| {
            Ok((row.get::<_, String>(0)?, 1.0))
        })
        .map_err(Error::from)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)?;
    Ok(rows)
}

/// Vector KNN over the vec0 index. Requires the embedding adapter; an absent
/// or failing adapter surfaces as a dependency error, distinguishable from
/// "nothing found".
fn semantic_candidates(
    conn: &Connection,
    embedder: &dyn EmbeddingProvider,
    query: &str,
    min_similarity: f64,
    candidate_limit: usize,
) -> Result<Vec<(String, f64)>> {
    if query.trim().is_empty() {
        return Err(Error::validation("query is required for semantic search"));
    }
    if !(0.0..=1.0).contains(&min_similarity) {
        return Err(Error::validation(format!(
            "min_similarity must be between 0.0 and 1.0, got {min_similarity}"
        )));
    }

    let query_vec = embedder.embed(query)?;
    let query_bytes = super::embedding_to_bytes(&query_vec);

    let mut stmt = conn
        .prepare(
            "SELECT id, distance FROM memories_vec WHERE embedding MATCH ?1 \
             ORDER BY distance LIMIT ?2",
        )
        .map_err(Error::from)?;
    let rows: Vec<(String, f64)> = stmt
        .query_map(params![query_bytes, candidate_limit as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })
        .map_err(Error::from)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)?;

    Ok(rows
        .into_iter()
        .map(|(id, distance)| (id, super::l2_distance_to_cosine(distance)))
        .filter(|(_, similarity)| *similarity >= min_similarity)
        .collect())
}

/// Weighted fusion of keyword and semantic candidates. Requires the adapter;
/// the caller decides whether to fall back to plain keyword search.
fn hybrid_candidates(
    conn: &Connection,
    embedder: &dyn EmbeddingProvider,
    query: &str,
    min_similarity: f64,
    candidate_limit: usize,
    fusion: FusionWeights,
) -> Result<Vec<(String, f64)>> {
    let keyword = keyword_candidates(conn, query, candidate_limit)?;
    let semantic = semantic_candidates(conn, embedder, query, min_similarity, candidate_limit)?;

    let mut fused: HashMap<String, f64> = HashMap::new();
    for (id, score) in &keyword {
        *fused.entry(id.clone()).or_insert(0.0) += fusion.keyword * score;
    }
    for (id, score) in &semantic {
        *fused.entry(id.clone()).or_insert(0.0) += fusion.semantic * score;
    }

    let mut merged: Vec<(String, f64)> = fused.into_iter().collect();
    // Deterministic order: score descending, id as tiebreak
    merged.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    Ok(merged)
}

// ── Final pass ────────────────────────────────────────────────────────────────

/// Hydrate candidate ids, apply cross-cutting filters, keep candidate order,
/// truncate to the requested limit.
fn finalize(
    conn: &Connection,
    candidates: Vec<(String, f64)>,
    filter: &SearchFilter,
    limit: usize,
    kind: MatchKind,
) -> Result<Vec<SearchResult>> {
    let ids: Vec<&str> = candidates.iter().map(|(id, _)| id.as_str()).collect();
    let memories = fetch_memories(conn, &ids)?;

    let mut results = Vec::new();
    for (id, score) in candidates {
        let Some(memory) = memories.get(id.as_str()) else {
            continue;
        };
        if let Some(domain) = filter.domain.as_deref() {
            if memory.domain.as_deref() != Some(domain) {
                continue;
            }
        }
        if let Some(session_id) = filter.session_id.as_deref() {
            if memory.session_id != session_id {
                continue;
            }
        }
        if let Some(scope) = filter.access_scope {
            if memory.access_scope != scope {
                continue;
            }
        }
        results.push(SearchResult {
            memory: memory.clone(),
            score,
            match_type: kind,
        });
        if results.len() >= limit {
            break;
        }
    }
    Ok(results)
}

/// Batch-fetch memory records by id.
fn fetch_memories(conn: &Connection, ids: &[&str]) -> Result<HashMap<String, Memory>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "SELECT {MEMORY_COLUMNS} FROM memories WHERE id IN ({})",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql).map_err(Error::from)?;
    let args: Vec<&dyn rusqlite::types::ToSql> = ids
        .iter()
        .map(|id| id as &dyn rusqlite::types::ToSql)
        .collect();
    let rows = stmt
        .query_map(args.as_slice(), memory_from_row)
        .map_err(Error::from)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)?;

    Ok(rows.into_iter().map(|m| (m.id.clone(), m)).collect())
}
