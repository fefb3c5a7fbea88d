//! # shop-rag CLI (`shoprag`)
//!
//! ## Usage
//!
//! ```bash
//! shoprag --config ./config/shoprag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `shoprag init` | Create the vector extension, tables and indexes |
//! | `shoprag index <tenant> <file>` | Chunk, embed and store a document |
//! | `shoprag search <tenant> "<query>"` | Similarity search with synthesized answer |
//! | `shoprag grep "<query>"` | Expanded keyword search over the document tree |
//! | `shoprag stats` | Unit counts by tenant and document |
//! | `shoprag clean <tenant>` | Delete every unit of a tenant |
//! | `shoprag serve` | Start the HTTP server |

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use shop_rag::config;
use shop_rag::context::AppContext;
use shop_rag::{ingest, migrate, search, server, stats};

/// shop-rag — tenant-scoped document retrieval with answer synthesis.
#[derive(Parser)]
#[command(name = "shoprag", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/shoprag.toml")]
    config: PathBuf,

    /// Keep the index in memory instead of PostgreSQL (lost on exit).
    #[arg(long, global = true)]
    memory: bool,

    /// More log output (-v debug, -vv trace). `RUST_LOG` overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the vector extension, tables and indexes. Idempotent.
    Init,

    /// Index one document from the documents directory.
    ///
    /// Existing units of the same tenant and document are deleted first.
    Index {
        /// Tenant (shop) the document belongs to.
        tenant: String,
        /// File name relative to `[server].docs_root`.
        file: String,
        /// Recorded in the document history.
        #[arg(long)]
        updated_by: Option<String>,
    },

    /// Similarity search within one tenant.
    Search {
        tenant: String,
        query: String,
        /// Maximum results (default: `[retrieval].default_limit`).
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Keyword search over the document tree with query expansion.
    Grep { query: String },

    /// Show unit counts.
    Stats,

    /// Delete every unit of a tenant.
    Clean { tenant: String },

    /// Start the HTTP server.
    Serve,
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("info"),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    if let Commands::Init = cli.command {
        if cli.memory {
            println!("Nothing to initialize for an in-memory index.");
        } else {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        return Ok(());
    }

    let ctx = if cli.memory {
        AppContext::in_memory(cfg)?
    } else {
        AppContext::connect(cfg).await?
    };

    match cli.command {
        Commands::Init => {}
        Commands::Index {
            tenant,
            file,
            updated_by,
        } => {
            let updated_by = updated_by.unwrap_or_else(|| ctx.config.indexing.updated_by.clone());
            let report = ingest::build_document(&ctx, &tenant, &file, &updated_by)
                .await
                .with_context(|| format!("Failed to index {}", file))?;
            println!("index {} / {}", tenant, file);
            println!("  chunks:    {}", report.total);
            println!("  persisted: {}", report.persisted);
            if !report.is_complete() {
                println!("  failed:    {}", report.failed());
                report.into_result()?;
            }
        }
        Commands::Search {
            tenant,
            query,
            limit,
        } => {
            let limit = limit.unwrap_or(ctx.config.retrieval.default_limit);
            search::run_search(&ctx, &tenant, &query, limit).await?;
        }
        Commands::Grep { query } => {
            search::run_grep(&ctx, &query).await?;
        }
        Commands::Stats => {
            stats::run_stats(&ctx).await?;
        }
        Commands::Clean { tenant } => {
            let removed = ingest::purge_tenant(&ctx, &tenant).await?;
            println!("Deleted {} units for tenant {}.", removed, tenant);
        }
        Commands::Serve => {
            server::run_server(Arc::new(ctx)).await?;
        }
    }

    Ok(())
}
