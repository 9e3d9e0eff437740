//! neuroflex-store - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use neuroflex_store::{
    cli::{Args, Commands},
    config::StoreConfig,
    records::RecordFilter,
    stats::format_bytes,
    sync::{HttpRemote, SessionState},
    StorageContext,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const ACCESS_TOKEN_ENV: &str = "NEUROFLEX_ACCESS_TOKEN";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(args.verbosity().log_level().into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = StoreConfig::load(args.config.clone()).context("Failed to load config")?;
    if let Some(dir) = &args.data_dir {
        config.backend.data_dir = dir.display().to_string();
    }

    let ctx = StorageContext::open(&config)
        .await
        .context("Failed to open storage")?;

    match &args.command {
        Commands::Probe => probe(&ctx),
        Commands::List { module, limit, .. } => {
            list(&ctx, module.clone(), args.synced_filter(), *limit).await
        }
        Commands::Stats => show_stats(&ctx).await,
        Commands::Usage => show_usage(&ctx).await,
        Commands::Export { out } => {
            let json = ctx.export_json().await?;
            match out {
                Some(path) => {
                    std::fs::write(path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("{} {}", "Exported to".green(), path.display());
                }
                None => println!("{}", json),
            }
            Ok(())
        }
        Commands::Import { file } => {
            let text = std::fs::read_to_string(file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let summary = ctx.import_json(&text).await?;
            println!(
                "{} {} new record(s), {} total",
                "Imported".green(),
                summary.imported,
                summary.total
            );
            Ok(())
        }
        Commands::Clean { days } => {
            let days = days.unwrap_or(config.storage.default_clean_days);
            let removed = ctx.records().clean_older_than(days).await?;
            println!("Removed {} record(s) older than {} day(s)", removed, days);
            Ok(())
        }
        Commands::Delete { id } => {
            if ctx.records().delete(id).await? {
                println!("{} {}", "Deleted".green(), id);
            } else {
                println!("{}: no record with id {}", "Warning".yellow(), id);
            }
            Ok(())
        }
        Commands::Clear { yes } => {
            if !yes {
                anyhow::bail!("Refusing to clear all data without --yes");
            }
            let removed = ctx.clear_all().await?;
            println!("{} {} key(s)", "Cleared".green(), removed);
            Ok(())
        }
        Commands::Sync { user } => sync(&ctx, &config, user).await,
    }
}

fn probe(ctx: &StorageContext) -> Result<()> {
    let status = if ctx.is_available() {
        "available".green()
    } else {
        "unavailable".red()
    };
    println!("Backend: {:?} ({})", ctx.backend_kind(), status);
    println!("Namespace: {}", ctx.kv().namespace());
    Ok(())
}

async fn list(
    ctx: &StorageContext,
    module: Option<String>,
    synced: Option<bool>,
    limit: Option<usize>,
) -> Result<()> {
    let mut filter = RecordFilter::new();
    if let Some(module) = module {
        filter = filter.module(module);
    }
    if let Some(synced) = synced {
        filter = filter.synced(synced);
    }

    let records = ctx.records().list(&filter).await;
    if records.is_empty() {
        println!("No records");
        return Ok(());
    }

    for record in records.iter().take(limit.unwrap_or(usize::MAX)) {
        let state = if record.synced {
            "synced".green()
        } else {
            "local".yellow()
        };
        println!(
            "{}  {:<12} {:<8} score {:>6.1}  acc {:>5.1}%  {}  {}",
            record.completed_at.format("%Y-%m-%d %H:%M"),
            record.module_name,
            record.difficulty,
            record.score,
            record.accuracy,
            state,
            record.id.dimmed()
        );
    }
    Ok(())
}

async fn show_stats(ctx: &StorageContext) -> Result<()> {
    let stats = ctx.stats().compute_stats().await;
    let summary = ctx.stats().training_summary().await;

    println!("{}", "Records".bold());
    println!("  Total:     {}", stats.total_records);
    println!("  Synced:    {}", stats.synced_records);
    println!("  Unsynced:  {}", stats.unsynced_records);
    println!("  Size:      {}", format_bytes(stats.estimated_size as u64));
    if let Some(last) = stats.last_record {
        println!("  Latest:    {}", last.format("%Y-%m-%d %H:%M"));
    }

    if !stats.module_stats.is_empty() {
        println!("\n{}", "Modules".bold());
        for (module, m) in &stats.module_stats {
            println!(
                "  {:<12} {} total, {} synced, {} unsynced",
                module, m.total, m.synced, m.unsynced
            );
        }
    }

    println!("\n{}", "Training".bold());
    println!("  Sessions:      {}", summary.sessions);
    println!("  Time:          {} min", summary.total_duration_ms / 60_000);
    println!("  Average score: {}", summary.average_score);
    Ok(())
}

async fn show_usage(ctx: &StorageContext) -> Result<()> {
    let usage = ctx.stats().storage_usage().await?;
    println!(
        "{} in {} key(s) under '{}'",
        usage.formatted_size,
        usage.item_count,
        ctx.kv().namespace()
    );
    Ok(())
}

async fn sync(ctx: &StorageContext, config: &StoreConfig, user: &str) -> Result<()> {
    if !config.remote.is_configured() {
        anyhow::bail!("Remote sync is not configured; set [remote] base_url and api_key");
    }

    let mut remote = HttpRemote::from_config(&config.remote)?;
    match std::env::var(ACCESS_TOKEN_ENV) {
        Ok(token) if !token.is_empty() => remote = remote.with_access_token(token),
        _ => anyhow::bail!("{} is not set; sign in first", ACCESS_TOKEN_ENV),
    }

    let session = Arc::new(SessionState::signed_in(user));
    let orchestrator = ctx.orchestrator(session, Arc::new(remote))?;

    let pending = orchestrator.pending().await.len();
    if pending == 0 {
        println!("Nothing to sync");
        return Ok(());
    }

    let report = orchestrator.sync_all().await?;
    println!(
        "{} {}/{} record(s)",
        "Synced".green(),
        report.synced,
        report.total
    );
    Ok(())
}
