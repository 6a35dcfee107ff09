//! One-time setup script to enforce unique emails in the users collection.
//!
//! Creates a unique index named `unique_email_index` on `users.email`.
//! Running it again once the index exists reports that and exits cleanly.
//! Creation fails if the collection already holds duplicate emails; those
//! have to be merged or removed by hand first.
//!
//! Usage:
//!   MONGO_DB_NAME=santa MONGO_DB_USER=admin MONGO_DB_PASS=... \
//!   MONGO_DB_REST_URL=@cluster0.example.mongodb.net/ cargo run --bin setup-email-index

use anyhow::Result;
use santa_migrations::config::Config;
use santa_migrations::storage::MongoStorage;
use santa_migrations::storage::mongo::IndexOutcome;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("info".parse().unwrap()),
        )
        .init();

    let config = Config::from_env()?;

    println!("Setup: Unique index on users.email");
    println!("Database: {}", config.db_name);
    println!();

    let storage = MongoStorage::connect(&config).await?;

    match storage.ensure_email_index().await? {
        IndexOutcome::Created(name) => {
            println!("Created unique index '{}' on the email field.", name);
        }
        IndexOutcome::AlreadyExists => {
            println!("Index already exists. No changes made.");
        }
    }

    Ok(())
}
