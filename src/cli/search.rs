use anyhow::{Context, Result};

use crate::config::HyphaConfig;
use crate::memory::search::{FusionWeights, SearchFilter, SearchMode, TagMatch};

/// `hypha search` — run one search and print the results as JSON.
pub async fn run(
    config: HyphaConfig,
    query: String,
    mode: String,
    limit: Option<usize>,
    domain: Option<String>,
    session: Option<String>,
) -> Result<()> {
    let min_similarity = config.search.min_similarity;
    let mode = match mode.as_str() {
        "keyword" => SearchMode::Keyword { query },
        // For tag mode the positional argument is a comma-separated tag list
        "tag" => SearchMode::Tag {
            tags: query.split(',').map(str::to_string).collect(),
            match_mode: TagMatch::Any,
        },
        "semantic" => SearchMode::Semantic {
            query,
            min_similarity,
        },
        "hybrid" => SearchMode::Hybrid {
            query,
            min_similarity,
        },
        other => anyhow::bail!("unknown search mode: {other}"),
    };

    let filter = SearchFilter {
        domain,
        session_id: session,
        access_scope: None,
    };
    let limit = limit.unwrap_or(config.search.default_limit);
    let fusion = FusionWeights {
        keyword: config.search.keyword_weight,
        semantic: config.search.semantic_weight,
    };

    let results = tokio::task::spawn_blocking(move || -> Result<_> {
        let (conn, embedder) = super::open_engine(&config)?;
        crate::memory::search::search(&conn, embedder.as_ref(), &mode, &filter, limit, fusion)
            .map_err(Into::into)
    })
    .await
    .context("search task failed")??;

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
