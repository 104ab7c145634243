use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchMemoryParams {
    #[schemars(
        description = "Search mode: 'keyword', 'tag', 'date_range', 'semantic', or 'hybrid'"
    )]
    pub mode: String,

    #[schemars(description = "Query text (keyword/semantic/hybrid modes)")]
    pub query: Option<String>,

    #[schemars(description = "Tags to match (tag mode)")]
    pub tags: Option<Vec<String>>,

    #[schemars(description = "Tag combination: 'and' (all must match) or 'or' (any). Default 'or'.")]
    pub tag_operator: Option<String>,

    #[schemars(description = "Inclusive window start, RFC 3339 (date_range mode)")]
    pub start: Option<String>,

    #[schemars(description = "Inclusive window end, RFC 3339 (date_range mode)")]
    pub end: Option<String>,

    #[schemars(description = "Similarity floor 0.0-1.0 for semantic/hybrid. Defaults from config.")]
    pub min_similarity: Option<f64>,

    #[schemars(description = "Restrict results to this domain")]
    pub domain: Option<String>,

    #[schemars(description = "Restrict results to this session")]
    pub session_id: Option<String>,

    #[schemars(description = "Restrict results to this access scope")]
    pub access_scope: Option<String>,

    #[schemars(description = "Maximum results. Defaults from config.")]
    pub limit: Option<usize>,
}
