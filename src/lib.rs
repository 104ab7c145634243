//! Persistent, queryable memory for AI agents.
//!
//! hypha durably records short text facts ("memories") with metadata, retrieves
//! them by keyword, tag, date range, or semantic similarity, and maintains a
//! typed relationship graph between them with strength-weighted BFS traversal
//! and similarity-based discovery.
//!
//! # Architecture
//!
//! - **Storage**: SQLite with FTS5 for keyword search (trigger-synchronized
//!   with the base table) and [sqlite-vec](https://github.com/asg017/sqlite-vec)
//!   for vector search
//! - **Embeddings**: optional Ollama backend (nomic-embed-text, 768
//!   dimensions); everything except semantic search and relationship discovery
//!   works without it
//! - **Search**: one dispatcher over five modes — keyword, tag, date range,
//!   semantic, and weighted hybrid fusion
//! - **Transport**: MCP over stdio (primary) or Streamable HTTP
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`db`] — SQLite initialization, schema, FTS triggers, and migrations
//! - [`embedding`] — The embedding adapter boundary and its implementations
//! - [`error`] — Typed error kinds shared by every engine operation
//! - [`memory`] — The engine: store, search, relationship graph, taxonomy,
//!   sessions, and stats

pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod memory;
