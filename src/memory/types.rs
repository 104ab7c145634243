//! Core record and enum definitions.
//!
//! Defines [`Memory`] (a stored unit of knowledge), [`Relationship`] (a typed
//! weighted edge), the taxonomy records ([`Category`], [`Categorization`],
//! [`Domain`]), [`SessionRecord`], [`VectorMetadata`], and the closed enums
//! [`AgentType`], [`AccessScope`], and [`RelationshipType`].

use serde::{Deserialize, Serialize};

/// The closed set of agent kinds a session can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentType {
    /// Desktop assistant client.
    DesktopAgent,
    /// Coding-agent CLI.
    CodeAgent,
    /// Direct API access.
    ApiCaller,
    /// Unknown/default agent.
    Unknown,
}

impl AgentType {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DesktopAgent => "desktop-agent",
            Self::CodeAgent => "code-agent",
            Self::ApiCaller => "api-caller",
            Self::Unknown => "unknown",
        }
    }
}

impl Default for AgentType {
    fn default() -> Self {
        Self::Unknown
    }
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "desktop-agent" => Ok(Self::DesktopAgent),
            "code-agent" => Ok(Self::CodeAgent),
            "api-caller" => Ok(Self::ApiCaller),
            "unknown" => Ok(Self::Unknown),
            _ => Err(format!("unknown agent type: {s}")),
        }
    }
}

/// Visibility class of a memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessScope {
    /// Visible within the owning session only.
    Session,
    /// Shared across sessions of the same agent.
    Shared,
    /// Visible to everyone.
    Global,
}

impl AccessScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Shared => "shared",
            Self::Global => "global",
        }
    }
}

impl Default for AccessScope {
    fn default() -> Self {
        Self::Session
    }
}

impl std::fmt::Display for AccessScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccessScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "session" => Ok(Self::Session),
            "shared" => Ok(Self::Shared),
            "global" => Ok(Self::Global),
            _ => Err(format!("unknown access scope: {s}")),
        }
    }
}

/// The seven relationship kinds an edge can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    /// Memory references another.
    References,
    /// Memory contradicts another.
    Contradicts,
    /// Memory expands on another.
    Expands,
    /// Memory is similar to another (the discovery type).
    Similar,
    /// Memory follows another in sequence.
    Sequential,
    /// Memory causes another.
    Causes,
    /// Memory enables another.
    Enables,
}

impl RelationshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::References => "references",
            Self::Contradicts => "contradicts",
            Self::Expands => "expands",
            Self::Similar => "similar",
            Self::Sequential => "sequential",
            Self::Causes => "causes",
            Self::Enables => "enables",
        }
    }

    /// All valid relationship types, in display order.
    pub const ALL: [RelationshipType; 7] = [
        Self::References,
        Self::Contradicts,
        Self::Expands,
        Self::Similar,
        Self::Sequential,
        Self::Causes,
        Self::Enables,
    ];
}

impl std::fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RelationshipType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "references" => Ok(Self::References),
            "contradicts" => Ok(Self::Contradicts),
            "expands" => Ok(Self::Expands),
            "similar" => Ok(Self::Similar),
            "sequential" => Ok(Self::Sequential),
            "causes" => Ok(Self::Causes),
            "enables" => Ok(Self::Enables),
            _ => Err(format!("unknown relationship type: {s}")),
        }
    }
}

/// A memory record, matching the `memories` table schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    /// UUID v7 (time-sortable) primary key.
    pub id: String,
    /// The full text content of the memory.
    pub content: String,
    /// Free-text provenance (e.g. a URL or document name).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Importance in `[1, 10]`, default 5.
    pub importance: i64,
    /// Normalized tag set (lowercased, deduplicated, insertion order kept).
    pub tags: Vec<String>,
    /// Session this memory was created in.
    pub session_id: String,
    /// Optional domain label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// ISO 8601 creation timestamp, server-assigned.
    pub created_at: String,
    /// ISO 8601 last-modification timestamp, server-assigned.
    pub updated_at: String,
    /// Kind of agent that stored this memory.
    pub agent_type: AgentType,
    /// Visibility class.
    pub access_scope: AccessScope,
    /// Optional human-readable unique key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    /// Whether a vector is stored for this memory.
    pub has_embedding: bool,
}

/// A directed, typed, weighted edge between two memories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    /// UUID v7 primary key.
    pub id: String,
    pub source_memory_id: String,
    pub target_memory_id: String,
    pub relationship_type: RelationshipType,
    /// Edge weight in `[0.0, 1.0]`.
    pub strength: f64,
    /// Optional explanation of why the edge exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// `true` when created by similarity discovery rather than a caller.
    pub auto_generated: bool,
    pub created_at: String,
}

/// A hierarchical label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_category_id: Option<String>,
    /// Minimum confidence for auto-assignment, default 0.7.
    pub confidence_threshold: f64,
    pub auto_generated: bool,
    pub created_at: String,
}

/// A memory-to-category assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Categorization {
    pub memory_id: String,
    pub category_id: String,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    pub created_at: String,
}

/// A flat named partition of memories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Domain {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Metadata for a session grouping key. The session row is bookkeeping only;
/// memories reference sessions by string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub agent_type: AgentType,
    pub created_at: String,
    pub last_accessed: String,
    pub is_active: bool,
}

/// Vector bookkeeping for an embedded memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorMetadata {
    pub memory_id: String,
    pub vector_index: i64,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub last_updated: String,
}

/// Normalize tags: lowercase, trim, drop empties, deduplicate keeping first
/// occurrence. Matching is order-insensitive, so insertion order is cosmetic.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}

/// Serialize a tag set as the JSON array stored in the `tags` column.
pub fn tags_to_json(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

/// Parse the stored JSON tag column back into a tag set.
pub fn tags_from_json(raw: Option<&str>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(s).ok()).unwrap_or_default()
}
