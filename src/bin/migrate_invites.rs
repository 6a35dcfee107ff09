//! Migration script to assign invite ids to wishlists and events that have
//! none.
//!
//! Invite links were added after launch, so older documents carry no
//! `inviteId` field (or an explicit null). Each such document gets a fresh
//! random UUID. Documents that already have an invite id keep it, so links
//! people have shared stay valid across re-runs.
//!
//! Usage:
//!   MONGO_DB_NAME=santa MONGO_DB_USER=admin MONGO_DB_PASS=... \
//!   MONGO_DB_REST_URL=@cluster0.example.mongodb.net/ cargo run --bin migrate-invites
//!
//! Credentials may also be supplied via a .env file. Add --dry-run to list
//! the documents that would be updated without writing anything.

use anyhow::Result;
use santa_migrations::config::Config;
use santa_migrations::invites::backfill_invites;
use santa_migrations::storage::{MongoStorage, Storage};
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("info".parse().unwrap()),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let dry_run = args.iter().any(|a| a == "--dry-run");

    let config = Config::from_env()?;

    println!("Migration: Assigning invite ids to wishlists and events");
    println!("Database: {}", config.db_name);
    println!("Mode: {}", if dry_run { "DRY RUN" } else { "LIVE" });
    println!();

    let storage = MongoStorage::connect(&config).await?;

    if dry_run {
        let wishlists = storage.fetch_wishlists_missing_invite().await?;
        let events = storage.fetch_events_missing_invite().await?;
        for wishlist in &wishlists {
            println!("  [DRY RUN] Would assign invite id to wishlist {}", wishlist.id);
        }
        for event in &events {
            println!("  [DRY RUN] Would assign invite id to event {}", event.id);
        }
        println!();
        println!(
            "Total documents to update: {}",
            wishlists.len() + events.len()
        );
        return Ok(());
    }

    let summary = backfill_invites(&storage).await?;

    println!("Migration complete!");
    println!("Wishlists updated: {}", summary.wishlists_updated);
    println!("Events updated: {}", summary.events_updated);

    if !summary.failures.is_empty() {
        println!();
        println!("{} document(s) failed:", summary.failures.len());
        for failure in &summary.failures {
            println!("  {}", failure);
        }
    }

    Ok(())
}
