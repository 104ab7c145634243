use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RelateMemoriesParams {
    #[schemars(description = "Id of the source memory")]
    pub source_id: String,

    #[schemars(description = "Id of the target memory")]
    pub target_id: String,

    #[schemars(
        description = "Edge type: 'references', 'contradicts', 'expands', 'similar', 'sequential', 'causes', or 'enables'"
    )]
    pub relationship_type: String,

    #[schemars(description = "Edge strength 0.0-1.0")]
    pub strength: f64,

    #[schemars(description = "Optional explanation of the connection")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct FindRelatedParams {
    #[schemars(description = "Memory whose neighbors to return")]
    pub memory_id: String,

    #[schemars(description = "Minimum edge strength")]
    pub min_strength: Option<f64>,

    #[schemars(description = "Restrict to one relationship type")]
    pub relationship_type: Option<String>,

    #[schemars(description = "Maximum results. Defaults to 10.")]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MapGraphParams {
    #[schemars(description = "Root memory of the traversal")]
    pub memory_id: String,

    #[schemars(description = "Traversal depth in hops, clamped to 5. Defaults to 2.")]
    pub depth: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DiscoverRelationsParams {
    #[schemars(description = "Maximum new relationships to create. Defaults to 10.")]
    pub limit: Option<usize>,

    #[schemars(description = "Similarity floor for new edges. Defaults from config.")]
    pub min_strength: Option<f64>,
}
