//! TallySync CLI
//!
//! Command-line tools for a TallySync SQLite database.
//!
//! # Commands
//!
//! - `push` - Apply a batch of operations from a JSON file
//! - `pull` - Print the changes after a watermark
//! - `ledger` - Dump the idempotency ledger of a tenant
//! - `inspect` - Count live and tombstoned rows per kind

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tallysync_core::TenantId;
use tallysync_storage::SqliteStore;
use tallysync_sync_server::{ServerConfig, SyncContext, SyncServer};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// TallySync command-line tools.
#[derive(Parser)]
#[command(name = "tallysync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the SQLite database
    #[arg(global = true, long, env = "TALLYSYNC_DB")]
    db: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a push batch and print the results
    Push {
        /// Tenant owning the data
        #[arg(short, long)]
        tenant: Uuid,

        /// JSON file holding the list of operations
        #[arg(short, long)]
        file: PathBuf,

        /// Identity recorded as the last writer
        #[arg(short, long, default_value = "cli")]
        actor: String,
    },

    /// Print the changes after a watermark
    Pull {
        /// Tenant owning the data
        #[arg(short, long)]
        tenant: Uuid,

        /// RFC 3339 watermark; everything when omitted
        #[arg(short, long)]
        since: Option<String>,
    },

    /// Dump ledger entries
    Ledger {
        /// Tenant owning the data
        #[arg(short, long)]
        tenant: Uuid,

        /// Maximum number of entries to dump
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Count rows per entity kind
    Inspect {
        /// Tenant owning the data
        #[arg(short, long)]
        tenant: Uuid,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn open_server(db: Option<PathBuf>) -> Result<SyncServer, Box<dyn std::error::Error>> {
    let path = db.ok_or("Database path required (--db or TALLYSYNC_DB)")?;
    let store = SqliteStore::open(&path)?;
    tracing::debug!(path = %path.display(), "opened database");
    Ok(SyncServer::new(Arc::new(store), ServerConfig::from_env()?))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Push {
            tenant,
            file,
            actor,
        } => {
            let server = open_server(cli.db)?;
            let ctx = SyncContext::new(TenantId::new(tenant), actor);
            commands::push::run(&server, &ctx, &file).await?;
        }
        Commands::Pull { tenant, since } => {
            let server = open_server(cli.db)?;
            let ctx = SyncContext::new(TenantId::new(tenant), "cli");
            commands::pull::run(&server, &ctx, since.as_deref()).await?;
        }
        Commands::Ledger {
            tenant,
            limit,
            format,
        } => {
            let server = open_server(cli.db)?;
            commands::ledger::run(&server, TenantId::new(tenant), limit, &format)?;
        }
        Commands::Inspect { tenant, format } => {
            let server = open_server(cli.db)?;
            commands::inspect::run(&server, TenantId::new(tenant), &format)?;
        }
        Commands::Version => {
            println!("TallySync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("TallySync Core v{}", tallysync_core::VERSION);
            println!("Schema version {}", tallysync_storage::SCHEMA_VERSION);
        }
    }

    Ok(())
}
