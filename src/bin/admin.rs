//! CLI administration tool for shortlink-core.
//!
//! Works directly against the configured storage, without the HTTP server.
//!
//! # Usage
//!
//! ```bash
//! # Shorten a URL
//! cargo run --bin admin -- shorten https://example.com/some/page
//!
//! # Resolve a short id
//! cargo run --bin admin -- resolve 6Yzk1XqLbX2
//!
//! # Decode the timestamp, node and sequence of a short id
//! cargo run --bin admin -- inspect 6Yzk1XqLbX2
//!
//! # Check storage health
//! cargo run --bin admin -- check
//! ```
//!
//! # Environment Variables
//!
//! Same as the server (`STORAGE_TYPE`, `DATABASE_URL`, `REDIS_URL`, `NODE_ID`,
//! `BASE_URL`, ...). `inspect` needs none of them.

use shortlink_core::application::services::LinkService;
use shortlink_core::config::{self, Config};
use shortlink_core::domain::UrlStorage;
use shortlink_core::infrastructure::connect_storage;
use shortlink_core::utils::id_generator::{IdParts, SnowflakeGenerator, decode_base62};

use anyhow::{Context, Result};
use chrono::DateTime;
use clap::{Parser, Subcommand};
use colored::*;
use std::sync::Arc;

/// CLI tool for managing shortlink-core.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Shorten a URL (reuses the existing id if already shortened)
    Shorten {
        /// Absolute http(s) URL
        url: String,
    },

    /// Print the original URL of a short id
    Resolve { short_id: String },

    /// Decode a short id into timestamp, node id and sequence
    Inspect { short_id: String },

    /// Check storage connectivity
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Commands::Inspect { short_id } = &cli.command {
        return inspect(short_id);
    }

    let config = config::load_from_env().context("Invalid configuration")?;
    let storage = connect_storage(&config).await?;

    let result = match cli.command {
        Commands::Shorten { url } => shorten(&config, storage.clone(), &url).await,
        Commands::Resolve { short_id } => resolve(&config, storage.clone(), &short_id).await,
        Commands::Check => check(storage.as_ref()).await,
        Commands::Inspect { .. } => Ok(()),
    };

    if let Err(e) = storage.close().await {
        eprintln!("{} {}", "Failed to close storage:".yellow(), e);
    }

    result
}

fn link_service(config: &Config, storage: Arc<dyn UrlStorage>) -> LinkService {
    LinkService::new(
        storage,
        Arc::new(SnowflakeGenerator::new(config.node_id)),
        config.base_url.clone(),
        config.storage_timeout(),
    )
}

async fn shorten(config: &Config, storage: Arc<dyn UrlStorage>, url: &str) -> Result<()> {
    let service = link_service(config, storage);

    let outcome = service.shorten(url).await?;

    if outcome.created {
        println!("{}", "✅ Short link created".green().bold());
    } else {
        println!("{}", "ℹ️  URL was already shortened".yellow());
    }
    println!();
    println!("  Short id:  {}", outcome.link.short_id.cyan());
    println!(
        "  Short URL: {}",
        service.short_url(&outcome.link).bright_yellow().bold()
    );
    println!("  Target:    {}", outcome.link.original_url);

    Ok(())
}

async fn resolve(config: &Config, storage: Arc<dyn UrlStorage>, short_id: &str) -> Result<()> {
    let service = link_service(config, storage);

    match service.expand(short_id).await {
        Ok(link) => {
            println!("{} -> {}", link.short_id.cyan(), link.original_url);
            Ok(())
        }
        Err(e) => {
            println!("{} {}", "❌".red(), e);
            anyhow::bail!("could not resolve '{}'", short_id)
        }
    }
}

fn inspect(short_id: &str) -> Result<()> {
    let id = decode_base62(short_id)
        .with_context(|| format!("'{}' is not a base-62 short id", short_id))?;
    let parts = IdParts::from_id(id);

    let issued = i64::try_from(parts.unix_millis)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "out of range".to_string());

    println!("{}", format!("🔎 {}", short_id).bright_blue().bold());
    println!();
    println!("  Numeric id: {}", id);
    println!("  Issued at:  {}", issued.cyan());
    println!("  Node id:    {}", parts.node_id);
    println!("  Sequence:   {}", parts.sequence);

    Ok(())
}

async fn check(storage: &dyn UrlStorage) -> Result<()> {
    let kind = storage.kind();

    if storage.health_check().await {
        println!(
            "{} {} storage is healthy",
            "✅".green(),
            kind.to_string().bold()
        );
        Ok(())
    } else {
        println!(
            "{} {} storage failed its health check",
            "❌".red(),
            kind.to_string().bold()
        );
        anyhow::bail!("{} storage unhealthy", kind)
    }
}
