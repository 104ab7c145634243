use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::HyphaConfig;

/// `hypha reindex` — re-embed every memory with the configured model.
pub async fn run(config: HyphaConfig) -> Result<()> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} {pos}/{len} memories")
            .expect("valid template")
            .progress_chars("##-"),
    );

    let bar = pb.clone();
    let count = tokio::task::spawn_blocking(move || -> Result<usize> {
        let (mut conn, embedder) = super::open_engine(&config)?;
        crate::memory::store::reindex_all(&mut conn, embedder.as_ref(), |done, total| {
            if bar.length() == Some(0) {
                bar.set_length(total as u64);
            }
            bar.set_position(done as u64);
        })
        .map_err(Into::into)
    })
    .await
    .context("reindex task failed")??;

    pb.finish_and_clear();
    println!("Re-embedded {count} memories.");
    Ok(())
}
