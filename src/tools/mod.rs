//! MCP tool surface.
//!
//! Thin handlers only: each tool parses its parameters, hops onto a blocking
//! thread for the synchronous engine call, and serializes the result. All
//! material logic lives in [`crate::memory`].

pub mod graph_params;
pub mod memory_params;
pub mod search_params;
pub mod taxonomy_params;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::config::HyphaConfig;
use crate::embedding::EmbeddingProvider;
use crate::memory::search::{FusionWeights, SearchFilter, SearchMode, TagMatch};
use crate::memory::store::{CreateMemoryRequest, ListFilter, MemoryUpdate};
use crate::memory::types::{AccessScope, AgentType, RelationshipType};
use crate::memory::{graph, search, session, stats, store, taxonomy};

use graph_params::*;
use memory_params::*;
use search_params::*;
use taxonomy_params::*;

/// Upper bound on graph traversal / discovery wall time per tool call.
const LONG_OP_BUDGET: Duration = Duration::from_secs(30);

/// The hypha MCP tool handler. Holds shared state (db connection, embedding
/// provider, config) and exposes all tools via the `#[tool_router]` macro.
#[derive(Clone)]
pub struct HyphaTools {
    tool_router: ToolRouter<Self>,
    db: Arc<Mutex<Connection>>,
    embedding: Arc<dyn EmbeddingProvider>,
    config: Arc<HyphaConfig>,
}

impl HyphaTools {
    pub fn new(
        db: Arc<Mutex<Connection>>,
        embedding: Arc<dyn EmbeddingProvider>,
        config: Arc<HyphaConfig>,
    ) -> Self {
        Self {
            tool_router: Self::tool_router(),
            db,
            embedding,
            config,
        }
    }

    /// Run a synchronous engine call on a blocking thread with the shared
    /// connection.
    async fn run_blocking<T, F>(&self, f: F) -> Result<T, String>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> crate::error::Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let mut conn = db.lock().map_err(|e| {
                crate::error::Error::Internal(anyhow::anyhow!("db lock poisoned: {e}"))
            })?;
            f(&mut conn)
        })
        .await
        .map_err(|e| format!("engine task failed: {e}"))?
        .map_err(|e| e.to_string())
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("serialization failed: {e}"))
}

fn parse_rfc3339(value: &str) -> Result<chrono::DateTime<chrono::Utc>, String> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| format!("invalid RFC 3339 timestamp '{value}': {e}"))
}

#[tool_router]
impl HyphaTools {
    /// Store a new memory.
    #[tool(
        description = "Store a text memory with importance, tags, domain, and session metadata. Returns the stored memory including its id."
    )]
    async fn store_memory(
        &self,
        Parameters(params): Parameters<StoreMemoryParams>,
    ) -> Result<String, String> {
        let agent_type: AgentType = match params.agent_type.as_deref() {
            Some(s) => s.parse()?,
            None => AgentType::Unknown,
        };
        let access_scope: AccessScope = match params.access_scope.as_deref() {
            Some(s) => s.parse()?,
            None => AccessScope::Session,
        };
        let session_id = params
            .session_id
            .unwrap_or_else(|| self.config.storage.default_session.clone());

        let req = CreateMemoryRequest {
            content: params.content,
            importance: params.importance,
            tags: params.tags.unwrap_or_default(),
            domain: params.domain,
            source: params.source,
            session_id,
            agent_type,
            access_scope,
            slug: params.slug,
        };

        let embedding = Arc::clone(&self.embedding);
        let memory = self
            .run_blocking(move |conn| store::create_memory(conn, embedding.as_ref(), &req))
            .await?;
        to_json(&memory)
    }

    /// Fetch one memory by id.
    #[tool(description = "Get a memory by id.")]
    async fn get_memory(
        &self,
        Parameters(params): Parameters<GetMemoryParams>,
    ) -> Result<String, String> {
        let memory = self
            .run_blocking(move |conn| store::get_memory(conn, &params.id))
            .await?;
        to_json(&memory)
    }

    /// Update fields of an existing memory.
    #[tool(
        description = "Update a memory's content, importance, tags, source, or domain. Content changes re-embed the memory."
    )]
    async fn update_memory(
        &self,
        Parameters(params): Parameters<UpdateMemoryParams>,
    ) -> Result<String, String> {
        let update = MemoryUpdate {
            content: params.content,
            importance: params.importance,
            tags: params.tags,
            source: params.source,
            domain: params.domain,
        };
        let embedding = Arc::clone(&self.embedding);
        let memory = self
            .run_blocking(move |conn| {
                store::update_memory(conn, embedding.as_ref(), &params.id, &update)
            })
            .await?;
        to_json(&memory)
    }

    /// Delete a memory and everything hanging off it.
    #[tool(
        description = "Delete a memory. Its relationships, categorizations, and vectors are removed with it."
    )]
    async fn delete_memory(
        &self,
        Parameters(params): Parameters<DeleteMemoryParams>,
    ) -> Result<String, String> {
        let id = params.id;
        let engine_id = id.clone();
        self.run_blocking(move |conn| store::delete_memory(conn, &engine_id))
            .await?;
        to_json(&serde_json::json!({ "deleted": id }))
    }

    /// List memories by recency.
    #[tool(description = "List memories, newest first, optionally filtered by domain or session.")]
    async fn list_memories(
        &self,
        Parameters(params): Parameters<ListMemoriesParams>,
    ) -> Result<String, String> {
        let filter = ListFilter {
            domain: params.domain,
            session_id: params.session_id,
            limit: params.limit.unwrap_or(0),
            offset: params.offset.unwrap_or(0),
        };
        let memories = self
            .run_blocking(move |conn| store::list_memories(conn, &filter))
            .await?;
        to_json(&memories)
    }

    /// Multi-mode search.
    #[tool(
        description = "Search memories. Modes: keyword (full text), tag (exact AND/OR), date_range (inclusive window), semantic (vector similarity), hybrid (keyword + semantic fused). Semantic and hybrid need the embedding backend."
    )]
    async fn search_memory(
        &self,
        Parameters(params): Parameters<SearchMemoryParams>,
    ) -> Result<String, String> {
        let min_similarity = params
            .min_similarity
            .unwrap_or(self.config.search.min_similarity);

        let mode = match params.mode.as_str() {
            "keyword" => SearchMode::Keyword {
                query: params.query.ok_or("query is required for keyword search")?,
            },
            "tag" => {
                let match_mode: TagMatch = params
                    .tag_operator
                    .as_deref()
                    .unwrap_or("or")
                    .parse()?;
                SearchMode::Tag {
                    tags: params.tags.ok_or("tags are required for tag search")?,
                    match_mode,
                }
            }
            "date_range" => SearchMode::DateRange {
                start: params.start.as_deref().map(parse_rfc3339).transpose()?,
                end: params.end.as_deref().map(parse_rfc3339).transpose()?,
            },
            "semantic" => SearchMode::Semantic {
                query: params.query.ok_or("query is required for semantic search")?,
                min_similarity,
            },
            "hybrid" => SearchMode::Hybrid {
                query: params.query.ok_or("query is required for hybrid search")?,
                min_similarity,
            },
            other => {
                return Err(format!(
                    "unknown search mode: {other} (expected keyword, tag, date_range, semantic, or hybrid)"
                ))
            }
        };

        let access_scope = params
            .access_scope
            .as_deref()
            .map(str::parse::<AccessScope>)
            .transpose()?;
        let filter = SearchFilter {
            domain: params.domain,
            session_id: params.session_id,
            access_scope,
        };
        let limit = params.limit.unwrap_or(self.config.search.default_limit);
        let fusion = FusionWeights {
            keyword: self.config.search.keyword_weight,
            semantic: self.config.search.semantic_weight,
        };

        let embedding = Arc::clone(&self.embedding);
        let results = self
            .run_blocking(move |conn| {
                search::search(conn, embedding.as_ref(), &mode, &filter, limit, fusion)
            })
            .await?;
        to_json(&results)
    }

    /// Create a typed edge between two memories.
    #[tool(
        description = "Create a directed, typed, strength-weighted relationship between two memories."
    )]
    async fn relate_memories(
        &self,
        Parameters(params): Parameters<RelateMemoriesParams>,
    ) -> Result<String, String> {
        let relationship_type: RelationshipType = params.relationship_type.parse()?;
        let relationship = self
            .run_blocking(move |conn| {
                graph::create_relationship(
                    conn,
                    &params.source_id,
                    &params.target_id,
                    relationship_type,
                    params.strength,
                    params.context.as_deref(),
                    false,
                )
            })
            .await?;
        to_json(&relationship)
    }

    /// Neighbors of a memory in the relationship graph.
    #[tool(
        description = "Find memories connected to the given one by an explicit relationship (either direction), strongest first."
    )]
    async fn find_related(
        &self,
        Parameters(params): Parameters<FindRelatedParams>,
    ) -> Result<String, String> {
        let relationship_type = params
            .relationship_type
            .as_deref()
            .map(str::parse::<RelationshipType>)
            .transpose()?;
        let related = self
            .run_blocking(move |conn| {
                graph::find_related(
                    conn,
                    &params.memory_id,
                    params.min_strength,
                    relationship_type,
                    params.limit.unwrap_or(0),
                )
            })
            .await?;
        to_json(&related)
    }

    /// BFS over the relationship graph.
    #[tool(
        description = "Map the relationship graph around a memory: BFS with hop distances, depth clamped to 5."
    )]
    async fn map_graph(
        &self,
        Parameters(params): Parameters<MapGraphParams>,
    ) -> Result<String, String> {
        let depth = params.depth.unwrap_or(2);
        let graph = self
            .run_blocking(move |conn| {
                graph::map_graph(
                    conn,
                    &params.memory_id,
                    depth,
                    Some(Instant::now() + LONG_OP_BUDGET),
                )
            })
            .await?;
        to_json(&graph)
    }

    /// Similarity-based relationship discovery.
    #[tool(
        description = "Discover relationships: connect semantically similar memory pairs with auto-generated 'similar' edges. Needs the embedding backend."
    )]
    async fn discover_relations(
        &self,
        Parameters(params): Parameters<DiscoverRelationsParams>,
    ) -> Result<String, String> {
        let min_strength = params
            .min_strength
            .unwrap_or(self.config.discovery.min_strength);
        let candidate_limit = self.config.discovery.candidate_limit;
        let embedding = Arc::clone(&self.embedding);
        let created = self
            .run_blocking(move |conn| {
                graph::discover_relationships(
                    conn,
                    embedding.as_ref(),
                    params.limit.unwrap_or(0),
                    min_strength,
                    candidate_limit,
                    Some(Instant::now() + LONG_OP_BUDGET),
                )
            })
            .await?;
        to_json(&created)
    }

    /// Create a category.
    #[tool(description = "Create a category, optionally under a parent category.")]
    async fn create_category(
        &self,
        Parameters(params): Parameters<CreateCategoryParams>,
    ) -> Result<String, String> {
        let req = taxonomy::CreateCategoryRequest {
            name: params.name,
            description: params.description.unwrap_or_default(),
            parent_category_id: params.parent_category_id,
            confidence_threshold: params.confidence_threshold,
            auto_generated: false,
        };
        let category = self
            .run_blocking(move |conn| taxonomy::create_category(conn, &req))
            .await?;
        to_json(&category)
    }

    /// Assign a memory to a category.
    #[tool(
        description = "Record a memory-to-category assignment with a confidence score. Re-assigning replaces the previous confidence."
    )]
    async fn categorize_memory(
        &self,
        Parameters(params): Parameters<CategorizeMemoryParams>,
    ) -> Result<String, String> {
        let categorization = self
            .run_blocking(move |conn| {
                taxonomy::categorize(
                    conn,
                    &params.memory_id,
                    &params.category_id,
                    params.confidence,
                    params.reasoning.as_deref(),
                )
            })
            .await?;
        to_json(&categorization)
    }

    /// List categories.
    #[tool(description = "List categories by name, optionally only the children of one parent.")]
    async fn list_categories(
        &self,
        Parameters(params): Parameters<ListCategoriesParams>,
    ) -> Result<String, String> {
        let categories = self
            .run_blocking(move |conn| {
                taxonomy::list_categories(conn, params.parent_category_id.as_deref())
            })
            .await?;
        to_json(&categories)
    }

    /// Create (or fetch) a domain.
    #[tool(description = "Create a domain. Idempotent: an existing name returns the existing domain.")]
    async fn create_domain(
        &self,
        Parameters(params): Parameters<CreateDomainParams>,
    ) -> Result<String, String> {
        let domain = self
            .run_blocking(move |conn| {
                taxonomy::create_domain(conn, &params.name, params.description.as_deref())
            })
            .await?;
        to_json(&domain)
    }

    /// List domains.
    #[tool(description = "List all domains by name.")]
    async fn list_domains(
        &self,
        Parameters(_params): Parameters<ListDomainsParams>,
    ) -> Result<String, String> {
        let domains = self
            .run_blocking(move |conn| taxonomy::list_domains(conn))
            .await?;
        to_json(&domains)
    }

    /// List sessions.
    #[tool(description = "List agent sessions, most recently active first.")]
    async fn list_sessions(
        &self,
        Parameters(_params): Parameters<ListSessionsParams>,
    ) -> Result<String, String> {
        let sessions = self
            .run_blocking(move |conn| session::list_sessions(conn))
            .await?;
        to_json(&sessions)
    }

    /// Store-wide statistics.
    #[tool(
        description = "Memory store statistics: counts, average importance, tag set, date range, per-domain and per-category counts."
    )]
    async fn memory_stats(
        &self,
        Parameters(_params): Parameters<MemoryStatsParams>,
    ) -> Result<String, String> {
        let db_path = self.config.resolved_db_path();
        let report = self
            .run_blocking(move |conn| stats::collect_stats(conn, Some(&db_path)))
            .await?;
        to_json(&report)
    }
}

#[tool_handler]
impl ServerHandler for HyphaTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "hypha is a persistent memory store. Use store_memory to save facts, \
                 search_memory to retrieve them (keyword/tag/date_range/semantic/hybrid), \
                 relate_memories and map_graph to work with the relationship graph."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
