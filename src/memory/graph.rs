//! Relationship graph engine.
//!
//! Stores directed, typed, strength-weighted edges between memories and walks
//! them: [`find_related`] follows edges in either direction, [`map_graph`]
//! runs an iterative BFS with hop-count distances, and
//! [`discover_relationships`] turns pairwise embedding similarity into
//! auto-generated `similar` edges.

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Instant;

use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::memory::types::{Memory, Relationship, RelationshipType};

/// Traversal depth is clamped here to bound cost on dense graphs.
pub const MAX_GRAPH_DEPTH: usize = 5;

/// A node in a [`MemoryGraph`]: hop distance from the root plus enough of the
/// memory to render it.
#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub id: String,
    /// BFS hop count from the root (0 for the root itself).
    pub distance: usize,
    pub importance: i64,
    pub content: String,
}

/// An edge in a [`MemoryGraph`], kept directional as stored.
#[derive(Debug, Clone, Serialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub relationship_type: RelationshipType,
    pub strength: f64,
}

/// Result of a [`map_graph`] traversal.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Create an edge between two existing memories. Repeated calls create
/// additional edges — there is deliberately no dedup here.
pub fn create_relationship(
    conn: &Connection,
    source_id: &str,
    target_id: &str,
    relationship_type: RelationshipType,
    strength: f64,
    context: Option<&str>,
    auto_generated: bool,
) -> Result<Relationship> {
    if !(0.0..=1.0).contains(&strength) {
        return Err(Error::validation(format!(
            "strength must be between 0.0 and 1.0, got {strength}"
        )));
    }
    ensure_memory_exists(conn, source_id, "source memory")?;
    ensure_memory_exists(conn, target_id, "target memory")?;

    let id = uuid::Uuid::now_v7().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO memory_relationships \
         (id, source_memory_id, target_memory_id, relationship_type, strength, context, \
          auto_generated, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            id,
            source_id,
            target_id,
            relationship_type.as_str(),
            strength,
            context,
            auto_generated,
            now
        ],
    )?;

    tracing::debug!(
        source = %source_id,
        target = %target_id,
        relationship_type = %relationship_type,
        auto_generated,
        "relationship created"
    );

    Ok(Relationship {
        id,
        source_memory_id: source_id.to_string(),
        target_memory_id: target_id.to_string(),
        relationship_type,
        strength,
        context: context.map(str::to_string),
        auto_generated,
        created_at: now,
    })
}

/// Memories connected to `memory_id` by an explicit edge in either direction,
/// strongest connection first.
pub fn find_related(
    conn: &Connection,
    memory_id: &str,
    min_strength: Option<f64>,
    relationship_type: Option<RelationshipType>,
    limit: usize,
) -> Result<Vec<Memory>> {
    ensure_memory_exists(conn, memory_id, "memory")?;
    let limit = if limit == 0 { 10 } else { limit };

    let mut clauses: Vec<String> = Vec::new();
    if relationship_type.is_some() {
        clauses.push("r.relationship_type = ?2".into());
    }
    if min_strength.is_some() {
        let idx = 2 + usize::from(relationship_type.is_some());
        clauses.push(format!("r.strength >= ?{idx}"));
    }
    let where_extra = if clauses.is_empty() {
        String::new()
    } else {
        format!(" AND {}", clauses.join(" AND "))
    };

    let sql = format!(
        "SELECT m.id, m.content, m.source, m.importance, m.tags, m.session_id, m.domain, \
         m.created_at, m.updated_at, m.agent_type, m.access_scope, m.slug, \
         m.embedding IS NOT NULL, MAX(r.strength) AS best_strength \
         FROM memories m \
         JOIN memory_relationships r ON ( \
             (r.source_memory_id = ?1 AND r.target_memory_id = m.id) OR \
             (r.target_memory_id = ?1 AND r.source_memory_id = m.id)) \
         WHERE 1 = 1{where_extra} \
         GROUP BY m.id \
         ORDER BY best_strength DESC, m.id \
         LIMIT {limit}"
    );

    let mut args: Vec<&dyn rusqlite::types::ToSql> = vec![&memory_id];
    let type_str = relationship_type.map(|t| t.as_str().to_string());
    if let Some(t) = type_str.as_ref() {
        args.push(t);
    }
    if let Some(s) = min_strength.as_ref() {
        args.push(s);
    }

    let mut stmt = conn.prepare(&sql).map_err(Error::from)?;
    let rows = stmt
        .query_map(args.as_slice(), crate::memory::store::memory_from_row)
        .map_err(Error::from)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)?;
    Ok(rows)
}

/// Breadth-first traversal from `root_id`, treating edges as undirected,
/// bounded by `depth` hops (clamped to [`MAX_GRAPH_DEPTH`]).
///
/// The frontier is an explicit queue of (id, distance) pairs; each node is
/// visited once at its first-discovered (shortest) distance. A deadline in
/// the past yields a truncated but consistent graph.
pub fn map_graph(
    conn: &Connection,
    root_id: &str,
    depth: usize,
    deadline: Option<Instant>,
) -> Result<MemoryGraph> {
    ensure_memory_exists(conn, root_id, "memory")?;
    let depth = depth.min(MAX_GRAPH_DEPTH);

    let mut visited: HashMap<String, usize> = HashMap::new();
    let mut queue: VecDeque<(String, usize)> = VecDeque::new();
    let mut edges: Vec<GraphEdge> = Vec::new();
    let mut seen_edges: HashSet<String> = HashSet::new();

    visited.insert(root_id.to_string(), 0);
    queue.push_back((root_id.to_string(), 0));

    let mut stmt = conn
        .prepare(
            "SELECT id, source_memory_id, target_memory_id, relationship_type, strength \
             FROM memory_relationships \
             WHERE source_memory_id = ?1 OR target_memory_id = ?1 \
             ORDER BY created_at, id",
        )
        .map_err(Error::from)?;

    while let Some((current, dist)) = queue.pop_front() {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            tracing::warn!(root = %root_id, visited = visited.len(), "graph traversal hit deadline");
            break;
        }
        if dist >= depth {
            continue;
        }

        let rows: Vec<(String, String, String, String, f64)> = stmt
            .query_map(params![current], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
            })
            .map_err(Error::from)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)?;

        for (rel_id, source, target, rel_type, strength) in rows {
            if seen_edges.insert(rel_id) {
                edges.push(GraphEdge {
                    source: source.clone(),
                    target: target.clone(),
                    relationship_type: rel_type.parse().unwrap_or(RelationshipType::References),
                    strength,
                });
            }

            let other = if source == current { target } else { source };
            if !visited.contains_key(&other) {
                visited.insert(other.clone(), dist + 1);
                queue.push_back((other, dist + 1));
            }
        }
    }

    // Hydrate nodes; a memory deleted mid-walk is simply skipped
    let mut nodes = Vec::with_capacity(visited.len());
    for (id, distance) in &visited {
        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT content, importance FROM memories WHERE id = ?1",
                params![id],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()
            .map_err(Error::from)?;
        if let Some((content, importance)) = row {
            nodes.push(GraphNode {
                id: id.clone(),
                distance: *distance,
                importance,
                content,
            });
        }
    }
    nodes.sort_by(|a, b| a.distance.cmp(&b.distance).then_with(|| a.id.cmp(&b.id)));

    Ok(MemoryGraph { nodes, edges })
}

/// Similarity-based discovery: pair recent embedded memories, skip pairs that
/// are already connected, and insert `similar` edges for pairs at or above
/// `min_strength`. Running it again over an unchanged corpus creates nothing
/// new.
pub fn discover_relationships(
    conn: &Connection,
    embedder: &dyn EmbeddingProvider,
    limit: usize,
    min_strength: f64,
    candidate_limit: usize,
    deadline: Option<Instant>,
) -> Result<Vec<Relationship>> {
    if !embedder.available() {
        return Err(Error::DependencyUnavailable(
            "relationship discovery requires an embedding provider".into(),
        ));
    }
    if !(0.0..=1.0).contains(&min_strength) {
        return Err(Error::validation(format!(
            "min_strength must be between 0.0 and 1.0, got {min_strength}"
        )));
    }
    let limit = if limit == 0 { 10 } else { limit };
    let candidate_limit = if candidate_limit == 0 { 50 } else { candidate_limit };

    // Most recent embedded memories are the candidate pool
    let mut stmt = conn
        .prepare(
            "SELECT id, embedding FROM memories WHERE embedding IS NOT NULL \
             ORDER BY created_at DESC, rowid DESC LIMIT ?1",
        )
        .map_err(Error::from)?;
    let candidates: Vec<(String, Vec<u8>)> = stmt
        .query_map(params![candidate_limit as i64], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .map_err(Error::from)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)?;

    let vectors: Vec<(String, Vec<f32>)> = candidates
        .into_iter()
        .map(|(id, blob)| (id, super::embedding_from_bytes(&blob)))
        .collect();

    let mut created = Vec::new();
    'outer: for i in 0..vectors.len() {
        for j in (i + 1)..vectors.len() {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                tracing::warn!(created = created.len(), "discovery hit deadline");
                break 'outer;
            }
            if created.len() >= limit {
                break 'outer;
            }

            let (id_a, vec_a) = &vectors[i];
            let (id_b, vec_b) = &vectors[j];
            if has_edge_between(conn, id_a, id_b)? {
                continue;
            }

            let similarity = super::cosine_similarity(vec_a, vec_b).clamp(0.0, 1.0);
            if similarity < min_strength {
                continue;
            }

            let context = format!("embedding similarity {similarity:.3}");
            let rel = create_relationship(
                conn,
                id_a,
                id_b,
                RelationshipType::Similar,
                similarity,
                Some(&context),
                true,
            )?;
            created.push(rel);
        }
    }

    tracing::info!(count = created.len(), "relationship discovery finished");
    Ok(created)
}

/// Whether any edge connects the pair, in either direction.
fn has_edge_between(conn: &Connection, a: &str, b: &str) -> Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM memory_relationships \
         WHERE (source_memory_id = ?1 AND target_memory_id = ?2) \
            OR (source_memory_id = ?2 AND target_memory_id = ?1)",
        params![a, b],
        |row| row.get(0),
    )
    .map_err(Error::from)
}

fn ensure_memory_exists(conn: &Connection, id: &str, kind: &'static str) -> Result<()> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM memories WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    if exists {
        Ok(())
    } else {
        Err(Error::not_found(kind, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::DisabledProvider;
    use crate::memory::store::{create_memory, delete_memory, CreateMemoryRequest};

    const DIM: usize = 8;

    fn test_db() -> Connection {
        crate::db::open_memory_database(DIM).unwrap()
    }

    /// Embedder with explicit per-text vectors.
    struct MapEmbedder {
        map: std::collections::HashMap<String, Vec<f32>>,
    }

    impl MapEmbedder {
        fn new(entries: &[(&str, Vec<f32>)]) -> Self {
            Self {
                map: entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
            }
        }
    }

    impl EmbeddingProvider for MapEmbedder {
        fn embed(&self, text: &str) -> crate::error::Result<Vec<f32>> {
            Ok(self.map.get(text).cloned().unwrap_or_else(|| {
                let mut v = vec![0.0f32; DIM];
                v[text.len() % DIM] = 1.0;
                v
            }))
        }

        fn dimensions(&self) -> usize {
            DIM
        }

        fn model_id(&self) -> &str {
            "map-embedder"
        }
    }

    fn spike(dim: usize) -> Vec<f32> {
        let mut v = vec![0.0f32; DIM];
        v[dim] = 1.0;
        v
    }

    fn near_spike(dim: usize) -> Vec<f32> {
        let mut v = vec![0.02f32; DIM];
        v[dim] = 1.0;
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        v.iter_mut().for_each(|x| *x /= norm);
        v
    }

    fn insert(conn: &mut Connection, embedder: &dyn EmbeddingProvider, content: &str) -> String {
        create_memory(
            conn,
            embedder,
            &CreateMemoryRequest {
                content: content.to_string(),
                importance: None,
                tags: vec![],
                domain: None,
                source: None,
                session_id: "graph-session".to_string(),
                agent_type: Default::default(),
                access_scope: Default::default(),
                slug: None,
            },
        )
        .unwrap()
        .id
    }

    #[test]
    fn create_relationship_round_trip() {
        let mut conn = test_db();
        let a = insert(&mut conn, &DisabledProvider, "memory a");
        let b = insert(&mut conn, &DisabledProvider, "memory b");

        let rel = create_relationship(
            &conn,
            &a,
            &b,
            RelationshipType::Enables,
            0.8,
            Some("a unlocks b"),
            false,
        )
        .unwrap();

        assert_eq!(rel.source_memory_id, a);
        assert_eq!(rel.target_memory_id, b);
        assert_eq!(rel.relationship_type, RelationshipType::Enables);
        assert!((rel.strength - 0.8).abs() < 1e-9);
        assert!(!rel.auto_generated);
        assert!(chrono::DateTime::parse_from_rfc3339(&rel.created_at).is_ok());
    }

    #[test]
    fn all_relationship_types_are_accepted() {
        let mut conn = test_db();
        let a = insert(&mut conn, &DisabledProvider, "memory a");
        let b = insert(&mut conn, &DisabledProvider, "memory b");

        for t in RelationshipType::ALL {
            create_relationship(&conn, &a, &b, t, 0.5, None, false).unwrap();
        }
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM memory_relationships", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 7);
    }

    #[test]
    fn out_of_range_strength_is_rejected() {
        let mut conn = test_db();
        let a = insert(&mut conn, &DisabledProvider, "memory a");
        let b = insert(&mut conn, &DisabledProvider, "memory b");

        for bad in [-0.1, 1.1] {
            let err = create_relationship(
                &conn,
                &a,
                &b,
                RelationshipType::References,
                bad,
                None,
                false,
            )
            .unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "strength {bad}");
        }
    }

    #[test]
    fn missing_endpoints_name_their_role() {
        let mut conn = test_db();
        let a = insert(&mut conn, &DisabledProvider, "memory a");

        let err = create_relationship(
            &conn,
            "ghost",
            &a,
            RelationshipType::References,
            0.5,
            None,
            false,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "source memory not found: ghost");

        let err = create_relationship(
            &conn,
            &a,
            "ghost",
            RelationshipType::References,
            0.5,
            None,
            false,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "target memory not found: ghost");
    }

    #[test]
    fn repeated_edges_are_allowed() {
        let mut conn = test_db();
        let a = insert(&mut conn, &DisabledProvider, "memory a");
        let b = insert(&mut conn, &DisabledProvider, "memory b");

        let r1 =
            create_relationship(&conn, &a, &b, RelationshipType::Similar, 0.4, None, false).unwrap();
        let r2 =
            create_relationship(&conn, &a, &b, RelationshipType::Similar, 0.9, None, false).unwrap();
        assert_ne!(r1.id, r2.id);
    }

    #[test]
    fn find_related_follows_both_directions_strongest_first() {
        let mut conn = test_db();
        let hub = insert(&mut conn, &DisabledProvider, "hub");
        let outgoing = insert(&mut conn, &DisabledProvider, "outgoing neighbor");
        let incoming = insert(&mut conn, &DisabledProvider, "incoming neighbor");
        let stranger = insert(&mut conn, &DisabledProvider, "stranger");

        create_relationship(&conn, &hub, &outgoing, RelationshipType::References, 0.4, None, false)
            .unwrap();
        create_relationship(&conn, &incoming, &hub, RelationshipType::Expands, 0.9, None, false)
            .unwrap();

        let related = find_related(&conn, &hub, None, None, 0).unwrap();
        let ids: Vec<&str> = related.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec![incoming.as_str(), outgoing.as_str()]);
        assert!(!ids.contains(&stranger.as_str()));
    }

    #[test]
    fn find_related_filters_by_strength_and_type() {
        let mut conn = test_db();
        let hub = insert(&mut conn, &DisabledProvider, "hub");
        let weak = insert(&mut conn, &DisabledProvider, "weak link");
        let strong = insert(&mut conn, &DisabledProvider, "strong link");

        create_relationship(&conn, &hub, &weak, RelationshipType::Similar, 0.2, None, false)
            .unwrap();
        create_relationship(&conn, &hub, &strong, RelationshipType::Causes, 0.9, None, false)
            .unwrap();

        let related = find_related(&conn, &hub, Some(0.5), None, 0).unwrap();
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].id, strong);

        let related =
            find_related(&conn, &hub, None, Some(RelationshipType::Similar), 0).unwrap();
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].id, weak);

        let related =
            find_related(&conn, &hub, Some(0.5), Some(RelationshipType::Similar), 0).unwrap();
        assert!(related.is_empty());
    }

    #[test]
    fn find_related_unknown_root_is_not_found() {
        let conn = test_db();
        let err = find_related(&conn, "ghost", None, None, 0).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn deleting_an_endpoint_cascades_the_edge() {
        let mut conn = test_db();
        let a = insert(&mut conn, &DisabledProvider, "memory a");
        let b = insert(&mut conn, &DisabledProvider, "memory b");
        create_relationship(&conn, &a, &b, RelationshipType::References, 0.7, None, false)
            .unwrap();

        delete_memory(&mut conn, &a).unwrap();

        assert!(find_related(&conn, &b, None, None, 0).unwrap().is_empty());
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM memory_relationships", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn map_graph_chain_distances() {
        let mut conn = test_db();
        let a = insert(&mut conn, &DisabledProvider, "node a");
        let b = insert(&mut conn, &DisabledProvider, "node b");
        let c = insert(&mut conn, &DisabledProvider, "node c");
        let d = insert(&mut conn, &DisabledProvider, "node d");
        create_relationship(&conn, &a, &b, RelationshipType::Sequential, 0.9, None, false).unwrap();
        create_relationship(&conn, &b, &c, RelationshipType::Sequential, 0.9, None, false).unwrap();
        create_relationship(&conn, &c, &d, RelationshipType::Sequential, 0.9, None, false).unwrap();

        let graph = map_graph(&conn, &a, 3, None).unwrap();
        let by_id: std::collections::HashMap<&str, usize> =
            graph.nodes.iter().map(|n| (n.id.as_str(), n.distance)).collect();
        assert_eq!(by_id[a.as_str()], 0);
        assert_eq!(by_id[b.as_str()], 1);
        assert_eq!(by_id[c.as_str()], 2);
        assert_eq!(by_id[d.as_str()], 3);
        assert_eq!(graph.edges.len(), 3);

        // Nodes come back sorted by distance
        let distances: Vec<usize> = graph.nodes.iter().map(|n| n.distance).collect();
        let mut sorted = distances.clone();
        sorted.sort_unstable();
        assert_eq!(distances, sorted);
    }

    #[test]
    fn map_graph_depth_limits_expansion() {
        let mut conn = test_db();
        let a = insert(&mut conn, &DisabledProvider, "node a");
        let b = insert(&mut conn, &DisabledProvider, "node b");
        let c = insert(&mut conn, &DisabledProvider, "node c");
        create_relationship(&conn, &a, &b, RelationshipType::Sequential, 0.9, None, false).unwrap();
        create_relationship(&conn, &b, &c, RelationshipType::Sequential, 0.9, None, false).unwrap();

        let graph = map_graph(&conn, &a, 1, None).unwrap();
        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&a.as_str()));
        assert!(ids.contains(&b.as_str()));
        assert_eq!(graph.edges.len(), 1);
    }

    #[test]
    fn map_graph_traverses_incoming_edges() {
        let mut conn = test_db();
        let a = insert(&mut conn, &DisabledProvider, "node a");
        let b = insert(&mut conn, &DisabledProvider, "node b");
        // Edge points INTO the root; traversal is undirected
        create_relationship(&conn, &b, &a, RelationshipType::Causes, 0.8, None, false).unwrap();

        let graph = map_graph(&conn, &a, 2, None).unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].source, b);
        assert_eq!(graph.edges[0].target, a);
    }

    #[test]
    fn map_graph_handles_cycles_with_shortest_distance() {
        let mut conn = test_db();
        let a = insert(&mut conn, &DisabledProvider, "node a");
        let b = insert(&mut conn, &DisabledProvider, "node b");
        let c = insert(&mut conn, &DisabledProvider, "node c");
        create_relationship(&conn, &a, &b, RelationshipType::References, 0.9, None, false).unwrap();
        create_relationship(&conn, &b, &c, RelationshipType::References, 0.9, None, false).unwrap();
        create_relationship(&conn, &c, &a, RelationshipType::References, 0.9, None, false).unwrap();

        let graph = map_graph(&conn, &a, 5, None).unwrap();
        let by_id: std::collections::HashMap<&str, usize> =
            graph.nodes.iter().map(|n| (n.id.as_str(), n.distance)).collect();
        assert_eq!(by_id[a.as_str()], 0);
        assert_eq!(by_id[b.as_str()], 1);
        assert_eq!(by_id[c.as_str()], 1); // via the incoming c→a edge, not through b
        assert_eq!(graph.edges.len(), 3);
    }

    #[test]
    fn map_graph_keeps_parallel_edges() {
        let mut conn = test_db();
        let a = insert(&mut conn, &DisabledProvider, "node a");
        let b = insert(&mut conn, &DisabledProvider, "node b");
        create_relationship(&conn, &a, &b, RelationshipType::References, 0.5, None, false).unwrap();
        create_relationship(&conn, &a, &b, RelationshipType::Contradicts, 0.9, None, false)
            .unwrap();

        let graph = map_graph(&conn, &a, 1, None).unwrap();
        assert_eq!(graph.edges.len(), 2);
    }

    #[test]
    fn map_graph_clamps_depth() {
        let mut conn = test_db();
        let mut prev = insert(&mut conn, &DisabledProvider, "chain node 0");
        let root = prev.clone();
        for i in 1..8 {
            let next = insert(&mut conn, &DisabledProvider, &format!("chain node {i}"));
            create_relationship(&conn, &prev, &next, RelationshipType::Sequential, 0.9, None, false)
                .unwrap();
            prev = next;
        }

        // Requested depth 100 clamps to 5 → root plus 5 hops
        let graph = map_graph(&conn, &root, 100, None).unwrap();
        assert_eq!(graph.nodes.len(), 6);
        assert_eq!(
            graph.nodes.iter().map(|n| n.distance).max().unwrap(),
            MAX_GRAPH_DEPTH
        );
    }

    #[test]
    fn map_graph_unknown_root_is_not_found() {
        let conn = test_db();
        let err = map_graph(&conn, "ghost", 2, None).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn map_graph_expired_deadline_returns_partial() {
        let mut conn = test_db();
        let a = insert(&mut conn, &DisabledProvider, "node a");
        let b = insert(&mut conn, &DisabledProvider, "node b");
        create_relationship(&conn, &a, &b, RelationshipType::References, 0.9, None, false).unwrap();

        let expired = Instant::now() - std::time::Duration::from_secs(1);
        let graph = map_graph(&conn, &a, 3, Some(expired)).unwrap();
        // Root only — traversal stopped before expanding
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].id, a);
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn discovery_creates_similar_edges_and_is_idempotent() {
        let mut conn = test_db();
        let embedder = MapEmbedder::new(&[
            ("goroutines handle concurrency", spike(0)),
            ("go channels coordinate concurrency", near_spike(0)),
            ("sourdough starter care", spike(5)),
        ]);
        let a = insert(&mut conn, &embedder, "goroutines handle concurrency");
        let b = insert(&mut conn, &embedder, "go channels coordinate concurrency");
        insert(&mut conn, &embedder, "sourdough starter care");

        let created = discover_relationships(&conn, &embedder, 10, 0.7, 0, None).unwrap();
        assert_eq!(created.len(), 1);
        let rel = &created[0];
        assert_eq!(rel.relationship_type, RelationshipType::Similar);
        assert!(rel.auto_generated);
        assert!(rel.strength > 0.9);
        let pair = (rel.source_memory_id.as_str(), rel.target_memory_id.as_str());
        assert!(pair == (a.as_str(), b.as_str()) || pair == (b.as_str(), a.as_str()));

        // Unchanged corpus → second run discovers nothing
        let again = discover_relationships(&conn, &embedder, 10, 0.7, 0, None).unwrap();
        assert!(again.is_empty());
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM memory_relationships", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn discovery_skips_pairs_with_existing_manual_edges() {
        let mut conn = test_db();
        let embedder = MapEmbedder::new(&[
            ("fact one", spike(0)),
            ("fact one restated", near_spike(0)),
        ]);
        let a = insert(&mut conn, &embedder, "fact one");
        let b = insert(&mut conn, &embedder, "fact one restated");
        create_relationship(&conn, &a, &b, RelationshipType::Expands, 0.5, None, false).unwrap();

        let created = discover_relationships(&conn, &embedder, 10, 0.7, 0, None).unwrap();
        assert!(created.is_empty());
    }

    #[test]
    fn discovery_respects_min_strength_and_limit() {
        let mut conn = test_db();
        let embedder = MapEmbedder::new(&[
            ("cluster a one", spike(0)),
            ("cluster a two", near_spike(0)),
            ("cluster b one", spike(4)),
            ("cluster b two", near_spike(4)),
        ]);
        for content in ["cluster a one", "cluster a two", "cluster b one", "cluster b two"] {
            insert(&mut conn, &embedder, content);
        }

        // min_strength above every pairwise similarity → nothing
        let created = discover_relationships(&conn, &embedder, 10, 0.9999, 0, None).unwrap();
        assert!(created.is_empty());

        // Two qualifying pairs exist, but limit 1 stops after the first
        let created = discover_relationships(&conn, &embedder, 1, 0.7, 0, None).unwrap();
        assert_eq!(created.len(), 1);
    }

    #[test]
    fn discovery_without_adapter_is_dependency_unavailable() {
        let conn = test_db();
        let err = discover_relationships(&conn, &DisabledProvider, 10, 0.7, 0, None).unwrap_err();
        assert!(matches!(err, Error::DependencyUnavailable(_)));
    }

    #[test]
    fn discovery_expired_deadline_returns_partial() {
        let mut conn = test_db();
        let embedder = MapEmbedder::new(&[
            ("pair one a", spike(0)),
            ("pair one b", near_spike(0)),
        ]);
        insert(&mut conn, &embedder, "pair one a");
        insert(&mut conn, &embedder, "pair one b");

        let expired = Instant::now() - std::time::Duration::from_secs(1);
        let created = discover_relationships(&conn, &embedder, 10, 0.7, 0, Some(expired)).unwrap();
        assert!(created.is_empty());
    }

    #[test]
    fn discovery_validates_min_strength() {
        let conn = test_db();
        let embedder = MapEmbedder::new(&[]);
        let err = discover_relationships(&conn, &embedder, 10, 1.5, 0, None).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
