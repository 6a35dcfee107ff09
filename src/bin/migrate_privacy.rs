//! Migration script to give every wishlist an explicit privacy flag.
//!
//! The `isPublic` flag was added after launch. Wishlists created before it
//! existed were always visible, so documents without the flag are stamped
//! `isPublic: true`. Wishlists that already carry a value, public or
//! private, are never touched.
//!
//! Usage:
//!   MONGO_DB_NAME=santa MONGO_DB_USER=admin MONGO_DB_PASS=... \
//!   MONGO_DB_REST_URL=@cluster0.example.mongodb.net/ cargo run --bin migrate-privacy
//!
//! Credentials may also be supplied via a .env file. Add --dry-run to list
//! the wishlists that would be updated without writing anything.

use anyhow::Result;
use santa_migrations::config::Config;
use santa_migrations::privacy::backfill_privacy;
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

    println!("Migration: Defaulting wishlist privacy to public");
    println!("Database: {}", config.db_name);
    println!("Mode: {}", if dry_run { "DRY RUN" } else { "LIVE" });
    println!();

    let storage = MongoStorage::connect(&config).await?;

    if dry_run {
        let wishlists = storage.fetch_wishlists_missing_privacy().await?;
        for wishlist in &wishlists {
            println!("  [DRY RUN] Would mark wishlist {} public", wishlist.id);
        }
        println!();
        println!("Total wishlists to update: {}", wishlists.len());
        return Ok(());
    }

    let summary = backfill_privacy(&storage).await?;

    println!("Migration complete!");
    println!("Wishlists updated: {}", summary.wishlists_updated);
    println!("Public wishlists: {}", summary.public_total);
    println!("Private wishlists: {}", summary.private_total);

    if !summary.failures.is_empty() {
        println!();
        println!("{} wishlist(s) failed:", summary.failures.len());
        for failure in &summary.failures {
            println!("  {}", failure);
        }
    }

    Ok(())
}
