//! Roscoe operator CLI
//!
//! Usage:
//!   roscoe sync
//!   roscoe add-key "<description>"
//!   roscoe remove-key <key>
//!   roscoe list-keys
//!
//! The remote store comes from `ROSCOE_CF_*` (or `--sqlite <path>`), the
//! primary store from `DATABASE_URL`. A `.env` file is loaded when present.

use clap::{Parser, Subcommand};
use roscoe_api::telemetry::{init_tracing, LogTarget, TelemetryConfig};
use roscoe_api::{ApiKeyService, StoreTarget, SyncService};
use roscoe_core::{ConfigError, RoscoeError, SyncConfig};
use roscoe_storage::{PostgresSource, RemoteExecutor};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "roscoe")]
#[command(about = "Roscoe flag sync and API key management", long_about = None)]
struct Cli {
    /// Use a local SQLite database instead of D1
    #[arg(long, env = "ROSCOE_SQLITE_PATH", global = true)]
    sqlite: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replicate flags from the primary store into the remote store
    Sync {
        /// Primary store connection string
        #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
        database_url: Option<String>,
    },
    /// Register a new API key
    AddKey { description: String },
    /// Revoke an API key
    RemoveKey { key: String },
    /// List API keys, newest first
    ListKeys,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let telemetry = TelemetryConfig::from_env("roscoe").with_target(LogTarget::Stderr);
    if let Err(e) = init_tracing(&telemetry) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, kind = ?e.kind(), "Command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), RoscoeError> {
    let executor = StoreTarget::from_env(cli.sqlite)?.connect()?;

    match cli.command {
        Command::Sync { database_url } => sync(executor, database_url).await,
        Command::AddKey { description } => {
            let key = ApiKeyService::new(executor).add(&description).await?;
            println!("Added API key: {}", key);
            Ok(())
        }
        Command::RemoveKey { key } => {
            ApiKeyService::new(executor).remove(&key).await?;
            println!("Removed API key: {}", key);
            Ok(())
        }
        Command::ListKeys => {
            let keys = ApiKeyService::new(executor).list().await?;
            if keys.is_empty() {
                println!("No API keys found");
            }
            for record in keys {
                let created = record
                    .created_at_utc()
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| record.created_at.to_string());
                println!("• {} - {} (created: {})", record.key, record.description, created);
            }
            Ok(())
        }
    }
}

async fn sync(
    executor: Arc<dyn RemoteExecutor>,
    database_url: Option<String>,
) -> Result<(), RoscoeError> {
    let database_url = database_url.ok_or_else(|| ConfigError::MissingRequired {
        var: "DATABASE_URL".to_string(),
    })?;
    let source = PostgresSource::from_url(&database_url)?;
    source.ping().await?;
    tracing::info!("Connected to primary store");
    let service = SyncService::new(executor, SyncConfig::from_env()?)?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling sync");
            on_signal.cancel();
        }
    });

    let report = service.run(&source, &cancel).await?;
    if report.swapped {
        println!(
            "Synced {} flags in {} batches ({:.1}s)",
            report.records,
            report.batches,
            report.elapsed.as_secs_f64()
        );
    } else {
        println!("No flags to sync");
    }
    Ok(())
}
