use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreateCategoryParams {
    #[schemars(description = "Unique category name")]
    pub name: String,

    #[schemars(description = "What belongs in this category")]
    pub description: Option<String>,

    #[schemars(description = "Optional parent category id")]
    pub parent_category_id: Option<String>,

    #[schemars(description = "Auto-assignment confidence floor 0.0-1.0. Defaults to 0.7.")]
    pub confidence_threshold: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CategorizeMemoryParams {
    #[schemars(description = "Memory to categorize")]
    pub memory_id: String,

    #[schemars(description = "Category to assign")]
    pub category_id: String,

    #[schemars(description = "Assignment confidence 0.0-1.0")]
    pub confidence: f64,

    #[schemars(description = "Why this category applies")]
    pub reasoning: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListCategoriesParams {
    #[schemars(description = "Only children of this category")]
    pub parent_category_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreateDomainParams {
    #[schemars(description = "Domain name. Creating an existing name returns the existing domain.")]
    pub name: String,

    #[schemars(description = "What this domain covers")]
    pub description: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListDomainsParams {}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListSessionsParams {}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct MemoryStatsParams {}
