//! Shared infrastructure for the style-guide documentation server.
//!
//! Everything here is independent of the corpus layout: caching, embeddings,
//! the vector store and the wire types exchanged over MCP.
pub mod embedding;
pub mod error;
pub mod mcp_api;
pub mod redis;
pub mod vectordb;
