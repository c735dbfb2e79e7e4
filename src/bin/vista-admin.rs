use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use vista::config::{Config, DatabaseBackend};
use vista::storage::{PostgresStorage, SqliteStorage, Storage};

#[derive(Parser)]
#[command(name = "vista-admin")]
#[command(about = "Vista operator CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the lifetime view count of a profile
    Views {
        /// Profile handle
        handle: String,
    },
    /// Show the most recent counted views of a profile
    Recent {
        /// Profile handle
        handle: String,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// List the newest profiles
    Profiles {
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let storage: Arc<dyn Storage> = match config.database.backend {
        DatabaseBackend::Sqlite => Arc::new(
            SqliteStorage::new(&config.database.url, config.database.max_connections).await?,
        ),
        DatabaseBackend::Postgres => Arc::new(
            PostgresStorage::new(&config.database.url, config.database.max_connections).await?,
        ),
    };

    storage.init().await?;

    match cli.command {
        Commands::Views { handle } => {
            let user = find_profile(storage.as_ref(), &handle).await?;
            let views = storage.count_views(user).await?;
            println!("{handle}: {views} views");
        }
        Commands::Recent { handle, limit } => {
            let user = find_profile(storage.as_ref(), &handle).await?;
            let records = storage.list_views(user, limit.max(1)).await?;
            if records.is_empty() {
                println!("No views recorded for '{handle}'.");
            } else {
                println!("{:<12} {:<22} {}", "Day", "Recorded at", "Fingerprint");
                println!("{}", "-".repeat(100));
                for record in records {
                    let recorded_at = Utc
                        .timestamp_opt(record.created_at, 0)
                        .single()
                        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_else(|| record.created_at.to_string());
                    println!("{:<12} {:<22} {}", record.day, recorded_at, record.fingerprint);
                }
            }
        }
        Commands::Profiles { limit } => {
            let profiles = storage.list_profiles(limit.clamp(1, 1000), None).await?;
            if profiles.is_empty() {
                println!("No profiles found.");
            } else {
                println!("{:<8} {:<24} {}", "ID", "Handle", "Name");
                println!("{}", "-".repeat(60));
                for profile in profiles {
                    println!("{:<8} {:<24} {}", profile.id, profile.handle, profile.name);
                }
            }
        }
    }

    Ok(())
}

async fn find_profile(storage: &dyn Storage, handle: &str) -> Result<i64> {
    let user = storage
        .find_user_by_handle(handle)
        .await?
        .with_context(|| format!("no profile with handle '{handle}'"))?;
    Ok(user.id)
}
