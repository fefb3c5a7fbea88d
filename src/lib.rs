//! # shop-rag
//!
//! Tenant-scoped document retrieval for shop knowledge bases.
//!
//! Documents are chunked, embedded and stored per tenant ("shop") in
//! PostgreSQL with pgvector. Queries are answered either by vector
//! similarity search or, when no index is available, by an expanded
//! keyword search over the raw document tree. Both paths can end with an
//! answer synthesized by the first text-generation backend that responds.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌─────────────────┐
//! │ doc/*.md │──▶│ Chunk+Embed  │──▶│ Postgres+vector │
//! └────┬─────┘   │ worker pool  │   └───────┬─────────┘
//!      │         └──────────────┘           │ similarity
//!      │ keyword search                     ▼
//!      │                            ┌──────────────┐
//!      └───────────────────────────▶│ fallback     │──▶ answer
//!        (query expansion)          │ chain        │
//!                                   └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! shoprag init                       # create extension, tables, indexes
//! shoprag index shop1 doc1.md        # chunk, embed and store doc/doc1.md
//! shoprag search shop1 "roof tile"   # similarity search + answer
//! shoprag grep "กระเบื้อง"            # expanded keyword search
//! shoprag serve                      # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Error taxonomy |
//! | [`models`] | Core data types |
//! | [`chunk`] | Sanitizing and word-boundary chunking |
//! | [`embedding`] | Embedding backend abstraction |
//! | [`store`] | Datastore abstraction (PostgreSQL, in-memory) |
//! | [`ingest`] | Concurrent indexing pipeline |
//! | [`search`] | Similarity and keyword query answering |
//! | [`generate`] | Text-generation backends |
//! | [`fallback`] | Ordered provider fallback chain |
//! | [`expand`] | Query expansion |
//! | [`textsearch`] | Concurrent keyword search engine |
//! | [`tokenize`] | Thai-aware tokenizer |
//! | [`context`] | Shared application context |
//! | [`server`] | HTTP server |
//! | [`stats`] | Index statistics |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod chunk;
pub mod config;
pub mod context;
pub mod db;
pub mod embedding;
pub mod error;
pub mod expand;
pub mod fallback;
pub mod generate;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod search;
pub mod server;
pub mod stats;
pub mod store;
pub mod textsearch;
pub mod tokenize;
