mod cli;
mod config;
mod db;
mod embedding;
mod error;
mod memory;
mod server;
mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hypha", version, about = "Persistent memory engine for AI agents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server (stdio transport by default)
    Serve {
        /// Serve over Streamable HTTP instead of stdio
        #[arg(long)]
        http: bool,
    },
    /// Search memories from the command line
    Search {
        /// Query text (keyword/semantic/hybrid) — or tags for --mode tag
        query: String,
        /// keyword, tag, semantic, or hybrid
        #[arg(long, default_value = "keyword")]
        mode: String,
        /// Maximum results
        #[arg(long)]
        limit: Option<usize>,
        /// Restrict to a domain
        #[arg(long)]
        domain: Option<String>,
        /// Restrict to a session
        #[arg(long)]
        session: Option<String>,
    },
    /// Print store-wide statistics
    Stats {
        /// Stats for one domain instead of the whole store
        #[arg(long)]
        domain: Option<String>,
    },
    /// Re-embed every memory with the configured model
    Reindex,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::HyphaConfig::load()?;

    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve { http } => {
            if http {
                server::serve_http(config).await?;
            } else {
                server::serve_stdio(config).await?;
            }
        }
        Command::Search {
            query,
            mode,
            limit,
            domain,
            session,
        } => {
            cli::search::run(config, query, mode, limit, domain, session).await?;
        }
        Command::Stats { domain } => {
            cli::stats::run(config, domain).await?;
        }
        Command::Reindex => {
            cli::reindex::run(config).await?;
        }
    }

    Ok(())
}
