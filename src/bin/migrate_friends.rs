//! Migration script to backfill mutual friend relationships from existing
//! group membership.
//!
//! Every wishlist and event names an owner and a set of members. Everyone
//! involved in the same group becomes a friend of everyone else in it: each
//! participant's id is added to the other participants' `friends` sets, in
//! both directions. Additions use set semantics, so the script is safe to
//! re-run.
//!
//! Usage:
//!   MONGO_DB_NAME=santa MONGO_DB_USER=admin MONGO_DB_PASS=... \
//!   MONGO_DB_REST_URL=@cluster0.example.mongodb.net/ cargo run --bin migrate-friends
//!
//! Credentials may also be supplied via a .env file. Add --dry-run to print
//! the edges without writing anything, and --verify to re-scan the users
//! collection afterwards and check that every friend edge is reciprocated.

use anyhow::Result;
use santa_migrations::config::Config;
use santa_migrations::friend_graph::{backfill_friend_graph, clique_edges, verify_friend_symmetry};
use santa_migrations::storage::{MongoStorage, Storage};
use santa_migrations::types::Group;
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
    let verify = args.iter().any(|a| a == "--verify");

    let config = Config::from_env()?;

    println!("Migration: Backfilling friend relationships from group membership");
    println!("Database: {}", config.db_name);
    println!("Mode: {}", if dry_run { "DRY RUN" } else { "LIVE" });
    println!();

    let storage = MongoStorage::connect(&config).await?;

    println!("Fetching wishlists...");
    let wishlists = storage.fetch_wishlists().await?;
    println!("Found {} wishlist(s)", wishlists.len());

    println!("Fetching events...");
    let events = storage.fetch_events().await?;
    println!("Found {} event(s)", events.len());
    println!();

    let wishlist_groups: Vec<Group> = wishlists.iter().map(|w| w.to_group()).collect();
    let event_groups: Vec<Group> = events.iter().map(|e| e.to_group()).collect();

    if dry_run {
        let mut total = 0;
        total += preview(&wishlist_groups);
        total += preview(&event_groups);
        println!();
        println!("Total edges to apply or confirm: {}", total);
    } else {
        println!("Processing wishlists...");
        let mut summary = backfill_friend_graph(&storage, &wishlist_groups).await;
        println!("  Edges applied: {}", summary.edges_applied);

        println!("Processing events...");
        let event_summary = backfill_friend_graph(&storage, &event_groups).await;
        println!("  Edges applied: {}", event_summary.edges_applied);
        summary.absorb(event_summary);

        println!();
        println!("Migration complete!");
        println!("Groups processed: {}", summary.groups_processed);
        println!("Groups skipped: {}", summary.groups_skipped);
        println!("Friend edges applied: {}", summary.edges_applied);
        println!("Friend edges already in place: {}", summary.edges_unchanged);

        if !summary.failures.is_empty() {
            println!();
            println!("{} edge(s) failed:", summary.failures.len());
            for failure in &summary.failures {
                println!(
                    "  {} <-> {}: {}",
                    failure.user_a, failure.user_b, failure.reason
                );
            }
        }
    }

    if verify {
        println!();
        println!("Verifying friend graph symmetry...");
        let report = verify_friend_symmetry(&storage).await?;
        println!("Users checked: {}", report.users_checked);
        if report.is_clean() {
            println!("Friend graph is symmetric.");
        } else {
            for (a, b) in &report.missing_reciprocal {
                println!("  MISSING: {} lists {} but {} does not list {}", a, b, b, a);
            }
            for id in &report.self_references {
                println!("  SELF: {} lists itself as a friend", id);
            }
            for (a, b) in &report.dangling_friends {
                println!("  DANGLING: {} lists unknown user {}", a, b);
            }
        }
    }

    Ok(())
}

fn preview(groups: &[Group]) -> usize {
    let mut total = 0;
    for group in groups {
        let edges = clique_edges(group);
        if edges.is_empty() {
            continue;
        }
        println!("Group: {}", group.label);
        for (a, b) in &edges {
            println!("  [DRY RUN] Would link: {} <-> {}", a, b);
        }
        total += edges.len();
    }
    total
}
