// ABOUTME: Stride sync CLI - runs migrations, backups, and status checks from the command line
// ABOUTME: Wires the sqlite local store and REST remote store from environment configuration
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Stride Fitness

//! Usage:
//! ```bash
//! # Show migration status for this device
//! stride-sync status
//!
//! # Count local and remote records per entity type
//! stride-sync summary
//!
//! # Run the migration (retry-safe; already-migrated records are skipped)
//! stride-sync migrate
//!
//! # Snapshot local data without migrating
//! stride-sync backup create
//!
//! # List stored snapshots
//! stride-sync backup list
//! ```

#![allow(clippy::print_stdout)]

use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;

use stride_sync::config::SyncConfig;
use stride_sync::errors::AppResult;
use stride_sync::migration::MigrationService;
use stride_sync::remote::{RestRemoteStore, RestRemoteStoreConfig};
use stride_sync::store::SqliteStore;

#[derive(Parser)]
#[command(
    name = "stride-sync",
    about = "Stride local-to-cloud migration tool",
    long_about = "Moves on-device Stride fitness records (workouts, achievements, measurements, photos, social posts) into the hosted backend."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Local store URL override (defaults to STRIDE_DATABASE_URL)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Show migration status for this device
    Status,

    /// Count local and remote records per entity type
    Summary,

    /// Run the migration sequence
    Migrate,

    /// Backup management commands
    Backup {
        #[command(subcommand)]
        action: BackupCommand,
    },
}

#[derive(Subcommand)]
enum BackupCommand {
    /// Snapshot local data without migrating
    Create,
    /// List stored snapshots, oldest first
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }
    stride_sync::logging::init_from_env()?;

    let mut config = SyncConfig::from_env()?;
    if let Some(database_url) = cli.database_url {
        config.database_url = database_url;
    }

    let service = build_service(&config).await?;

    match cli.command {
        Command::Status => run_status(&service).await?,
        Command::Summary => run_summary(&service).await?,
        Command::Migrate => run_migrate(&service).await?,
        Command::Backup { action } => match action {
            BackupCommand::Create => run_backup_create(&service).await?,
            BackupCommand::List => run_backup_list(&service).await?,
        },
    }

    Ok(())
}

async fn build_service(config: &SyncConfig) -> AppResult<MigrationService> {
    let local = Arc::new(SqliteStore::connect(&config.database_url).await?);
    let remote = Arc::new(RestRemoteStore::new(RestRemoteStoreConfig::from(config))?);

    Ok(MigrationService::new(
        local,
        remote,
        config.device_id.clone(),
        config.backup_retention,
    ))
}

async fn run_status(service: &MigrationService) -> AppResult<()> {
    let view = service.refresh_status().await?;
    println!("{}", serde_json::to_string_pretty(&view).unwrap_or_default());
    Ok(())
}

async fn run_summary(service: &MigrationService) -> AppResult<()> {
    let summary = service.data_summary().await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).unwrap_or_default()
    );
    println!(
        "total: {} local, {} remote",
        summary.total_local(),
        summary.total_remote()
    );
    Ok(())
}

async fn run_migrate(service: &MigrationService) -> AppResult<()> {
    info!(device.id = %service.device_id(), "Starting migration");
    let result = service.perform_migration().await?;

    for outcome in &result.outcomes {
        match &outcome.error {
            Some(error) => println!("{}: FAILED ({error})", outcome.entity),
            None => println!(
                "{}: {} migrated, {} skipped",
                outcome.entity, outcome.migrated, outcome.skipped
            ),
        }
    }

    if result.success {
        println!("migration completed: {} records", result.total_migrated());
    } else {
        println!(
            "migration finished with {} failed entity type(s); re-run to retry",
            result.errors.len()
        );
    }
    Ok(())
}

async fn run_backup_create(service: &MigrationService) -> AppResult<()> {
    let info = service.create_backup().await?;
    println!(
        "backup {} created ({} records)",
        info.key, info.record_count
    );
    Ok(())
}

async fn run_backup_list(service: &MigrationService) -> AppResult<()> {
    let backups = service.backups().list_backups(service.device_id()).await?;
    if backups.is_empty() {
        println!("no backups stored");
        return Ok(());
    }
    for backup in backups {
        println!(
            "{}  {}  {} records",
            backup.created_at.to_rfc3339(),
            backup.key,
            backup.record_count
        );
    }
    Ok(())
}
