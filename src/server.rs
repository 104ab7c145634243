//! MCP server initialization for stdio and streamable-HTTP transports.
//!
//! Provides [`serve_stdio`] and [`serve_http`] entry points that wire up the
//! database, embedding provider, and MCP tool handler into a running server.

use crate::config::HyphaConfig;
use crate::db;
use crate::embedding;
use crate::tools::HyphaTools;
use anyhow::Result;
use rmcp::ServiceExt;
use std::sync::{Arc, Mutex};

/// Shared setup: open DB, create embedding provider, check model version.
/// Returns (db, embedding, config) wrapped in Arc for sharing.
fn setup_shared_state(
    config: HyphaConfig,
) -> Result<(
    Arc<Mutex<rusqlite::Connection>>,
    Arc<dyn embedding::EmbeddingProvider>,
    Arc<HyphaConfig>,
)> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path, config.embedding.dimension)?;
    tracing::info!(db = %db_path.display(), "database ready");

    let provider = embedding::create_provider(&config.embedding)?;
    let embedding: Arc<dyn embedding::EmbeddingProvider> = Arc::from(provider);

    // Warn when the stored corpus was embedded with a different model
    if embedding.available() {
        if let Ok(Some(stored_model)) = db::migrations::get_embedding_model(&conn) {
            if stored_model != config.embedding.model {
                tracing::warn!(
                    stored = %stored_model,
                    configured = %config.embedding.model,
                    "embedding model changed — run `hypha reindex` to rebuild vectors"
                );
            }
        }
        tracing::info!(model = %embedding.model_id(), "embedding provider ready");
    } else {
        tracing::info!("embedding disabled — semantic search and discovery unavailable");
    }

    let db = Arc::new(Mutex::new(conn));
    let config = Arc::new(config);

    Ok((db, embedding, config))
}

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: HyphaConfig) -> Result<()> {
    tracing::info!("starting hypha MCP server on stdio");

    let (db, embedding, config) = setup_shared_state(config)?;

    let tools = HyphaTools::new(db, embedding, config);
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running — waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}

/// Start the MCP server over Streamable HTTP.
pub async fn serve_http(config: HyphaConfig) -> Result<()> {
    let host = config.server.host.clone();
    let port = config.server.port;
    let bind_addr = format!("{host}:{port}");

    tracing::info!(addr = %bind_addr, "starting hypha MCP server on HTTP");

    let (db, embedding, config) = setup_shared_state(config)?;

    let service = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || Ok(HyphaTools::new(db.clone(), embedding.clone(), config.clone())),
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    let router = axum::Router::new().nest_service("/mcp", service);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "MCP server listening at http://{bind_addr}/mcp");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to listen for ctrl-c");
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}
