use anyhow::{Context, Result};

use crate::config::HyphaConfig;

/// `hypha stats` — print store-wide (or per-domain) statistics as JSON.
pub async fn run(config: HyphaConfig, domain: Option<String>) -> Result<()> {
    let output = tokio::task::spawn_blocking(move || -> Result<String> {
        let db_path = config.resolved_db_path();
        let (conn, _embedder) = super::open_engine(&config)?;
        let json = match domain {
            Some(name) => {
                let report = crate::memory::stats::domain_stats(&conn, &name)?;
                serde_json::to_string_pretty(&report)?
            }
            None => {
                let report = crate::memory::stats::collect_stats(&conn, Some(&db_path))?;
                serde_json::to_string_pretty(&report)?
            }
        };
        Ok(json)
    })
    .await
    .context("stats task failed")??;

    println!("{output}");
    Ok(())
}
