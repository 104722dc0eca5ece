//! # Main — CLI Entry Point
//!
//! Subcommands:
//!
//! - `serve` — run the HTTP API.
//! - `migrate` — apply the embedded schema (idempotent).
//! - `seed` — load the task catalog from a TOML seed file.
//! - `check-config` — validate the configuration file and exit.
//!
//! Global options: `--database-url` / `DATABASE_URL`, `--config` /
//! `ADVENTIDE_CONFIG`. The server refuses to start without a valid
//! configuration: a broken calendar window or empty reward tables is a
//! startup failure, not a runtime surprise.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use adventide::config::AppConfig;
use adventide::db::{tasks, Database};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "adventide", about = "Advent-calendar points and rewards platform")]
struct Cli {
    /// PostgreSQL connection URL (or set DATABASE_URL env var)
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Path to the season configuration file
    #[arg(long, env = "ADVENTIDE_CONFIG", default_value = "adventide.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Address to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Port to listen on
        #[arg(long, env = "PORT", default_value_t = 7300)]
        port: u16,
    },
    /// Apply the embedded database schema
    Migrate,
    /// Seed the task catalog from a TOML file
    Seed {
        /// Path to the task seed file
        #[arg(long, default_value = "tasks.toml")]
        tasks: PathBuf,
    },
    /// Validate the configuration file and exit
    CheckConfig,
}

fn require_database_url(cli: &Cli) -> Result<&str> {
    cli.database_url.as_deref().ok_or_else(|| {
        anyhow::anyhow!("DATABASE_URL is required (set via --database-url or env)")
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adventide=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { host, port } => {
            let config = AppConfig::load(&cli.config)?;
            let database_url = require_database_url(&cli)?;
            info!(
                season_start = %config.season.start,
                season_end = %config.season.end,
                days = config.season.days,
                "configuration loaded"
            );
            adventide::server::run(host, *port, database_url, config).await
        }
        Commands::Migrate => {
            let database_url = require_database_url(&cli)?;
            let db = Database::connect(database_url).await?;
            db.migrate().await?;
            info!("schema applied");
            Ok(())
        }
        Commands::Seed { tasks: seed_path } => {
            let database_url = require_database_url(&cli)?;
            let seeds = tasks::load_seed_file(seed_path)?;
            let db = Database::connect(database_url).await?;
            let count = db.seed_tasks(&seeds).await?;
            info!(count, "task catalog seeded");
            Ok(())
        }
        Commands::CheckConfig => {
            let config = AppConfig::load(&cli.config)?;
            println!(
                "ok: season {}..{} ({} days), caps {}/{}/{}, {} personal + {} global reward targets",
                config.season.start,
                config.season.end,
                config.season.days,
                config.points.free_cap,
                config.points.paid_cap,
                config.points.global_cap,
                config.rewards.personal.len(),
                config.rewards.global.len(),
            );
            Ok(())
        }
    }
}
