use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StoreMemoryParams {
    #[schemars(description = "The text content of the memory")]
    pub content: String,

    #[schemars(description = "Importance 1-10. Defaults to 5.")]
    pub importance: Option<i64>,

    #[schemars(description = "Tags for exact-match retrieval (normalized to lowercase)")]
    pub tags: Option<Vec<String>>,

    #[schemars(description = "Domain partition, auto-created on first use")]
    pub domain: Option<String>,

    #[schemars(description = "Free-text provenance, e.g. a URL or document name")]
    pub source: Option<String>,

    #[schemars(description = "Session grouping key. Defaults to the configured session.")]
    pub session_id: Option<String>,

    #[schemars(
        description = "Agent kind: 'desktop-agent', 'code-agent', 'api-caller', or 'unknown'"
    )]
    pub agent_type: Option<String>,

    #[schemars(description = "Visibility: 'session' (default), 'shared', or 'global'")]
    pub access_scope: Option<String>,

    #[schemars(description = "Optional unique human-readable key")]
    pub slug: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GetMemoryParams {
    #[schemars(description = "Memory id")]
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct UpdateMemoryParams {
    #[schemars(description = "Memory id")]
    pub id: String,

    #[schemars(description = "Replacement content (re-embeds the memory)")]
    pub content: Option<String>,

    #[schemars(description = "Replacement importance 1-10")]
    pub importance: Option<i64>,

    #[schemars(description = "Replacement tag set")]
    pub tags: Option<Vec<String>>,

    #[schemars(description = "Replacement source")]
    pub source: Option<String>,

    #[schemars(description = "Replacement domain, auto-created on first use")]
    pub domain: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DeleteMemoryParams {
    #[schemars(description = "Memory id. Deleting cascades relationships and categorizations.")]
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListMemoriesParams {
    #[schemars(description = "Only memories in this domain")]
    pub domain: Option<String>,

    #[schemars(description = "Only memories in this session")]
    pub session_id: Option<String>,

    #[schemars(description = "Page size. Defaults to 50.")]
    pub limit: Option<usize>,

    #[schemars(description = "Page offset. Defaults to 0.")]
    pub offset: Option<usize>,
}
