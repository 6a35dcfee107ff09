use super::{SetInsert, Storage};
use crate::config::Config;
use crate::types::{Event, User, Wishlist};
use anyhow::{Context, Result};
use futures::TryStreamExt;
use mongodb::bson::{Bson, Document, doc, from_document, oid::ObjectId};
use mongodb::error::ErrorKind;
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};
use serde::de::DeserializeOwned;
use tracing::warn;

const USERS: &str = "users";
const WISHLISTS: &str = "wishlists";
const EVENTS: &str = "events";
const EMAIL_INDEX: &str = "unique_email_index";

// ============================================================================
// MongoStorage
// ============================================================================

pub struct MongoStorage {
    db: Database,
}

/// Result of creating the unique email index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOutcome {
    Created(String),
    AlreadyExists,
}

impl MongoStorage {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Build a client from credentials and ping the server, so that a bad
    /// connection fails here and not in the middle of a scan.
    pub async fn connect(config: &Config) -> Result<Self> {
        let client = Client::with_uri_str(config.connection_uri())
            .await
            .context("Failed to initialize MongoDB client")?;
        let db = client.database(&config.db_name);
        db.run_command(doc! { "ping": 1 })
            .await
            .context("Failed to reach MongoDB")?;
        Ok(Self { db })
    }

    /// Create the unique index on `users.email`. Creating an index that is
    /// already in place is reported as `AlreadyExists`, not an error.
    pub async fn ensure_email_index(&self) -> Result<IndexOutcome> {
        let model = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name(EMAIL_INDEX.to_string())
                    .build(),
            )
            .build();

        match self.collection::<Document>(USERS).create_index(model).await {
            Ok(result) => Ok(IndexOutcome::Created(result.index_name)),
            Err(e) if index_conflict(&e) => Ok(IndexOutcome::AlreadyExists),
            Err(e) => Err(e).context("Failed to create unique email index"),
        }
    }

    fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    /// Run a find and deserialize each document, logging and skipping the
    /// malformed ones instead of aborting the whole scan.
    async fn collect_documents<T: DeserializeOwned>(
        &self,
        name: &str,
        filter: Document,
    ) -> Result<Vec<T>> {
        let mut cursor = self
            .collection::<Document>(name)
            .find(filter)
            .await
            .with_context(|| format!("Failed to query {}", name))?;

        let mut records = Vec::new();
        while let Some(document) = cursor
            .try_next()
            .await
            .with_context(|| format!("Failed to read {} cursor", name))?
        {
            match from_document::<T>(document) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(collection = name, error = %e, "Skipping malformed document");
                }
            }
        }
        Ok(records)
    }

    async fn set_field(
        &self,
        name: &str,
        id: ObjectId,
        field: &str,
        value: impl Into<Bson>,
    ) -> Result<bool> {
        let mut fields = Document::new();
        fields.insert(field, value);
        let result = self
            .collection::<Document>(name)
            .update_one(doc! { "_id": id }, doc! { "$set": fields })
            .await
            .with_context(|| format!("Failed to set {} on {} {}", field, name, id))?;
        Ok(result.modified_count > 0)
    }
}

impl Storage for MongoStorage {
    async fn fetch_wishlists(&self) -> Result<Vec<Wishlist>> {
        self.collect_documents(WISHLISTS, doc! {}).await
    }

    async fn fetch_events(&self) -> Result<Vec<Event>> {
        self.collect_documents(EVENTS, doc! {}).await
    }

    async fn fetch_users(&self) -> Result<Vec<User>> {
        self.collect_documents(USERS, doc! {}).await
    }

    async fn add_friend(&self, user_id: &str, friend_id: &str) -> Result<SetInsert> {
        // Users are keyed by ObjectId, but the application stores the string
        // form everywhere else: the filter needs the ObjectId, the array
        // entry stays a string.
        let oid = ObjectId::parse_str(user_id)
            .with_context(|| format!("Invalid user id '{}'", user_id))?;

        let result = self
            .collection::<Document>(USERS)
            .update_one(
                doc! { "_id": oid },
                doc! { "$addToSet": { "friends": friend_id } },
            )
            .await
            .with_context(|| format!("Failed to add friend {} to user {}", friend_id, user_id))?;

        Ok(if result.matched_count == 0 {
            SetInsert::NoMatch
        } else if result.modified_count > 0 {
            SetInsert::Inserted
        } else {
            SetInsert::AlreadyPresent
        })
    }

    async fn fetch_wishlists_missing_invite(&self) -> Result<Vec<Wishlist>> {
        self.collect_documents(WISHLISTS, missing_invite_filter())
            .await
    }

    async fn fetch_events_missing_invite(&self) -> Result<Vec<Event>> {
        self.collect_documents(EVENTS, missing_invite_filter()).await
    }

    async fn set_wishlist_invite_id(&self, id: ObjectId, invite_id: &str) -> Result<bool> {
        self.set_field(WISHLISTS, id, "inviteId", invite_id).await
    }

    async fn set_event_invite_id(&self, id: ObjectId, invite_id: &str) -> Result<bool> {
        self.set_field(EVENTS, id, "inviteId", invite_id).await
    }

    async fn fetch_wishlists_missing_privacy(&self) -> Result<Vec<Wishlist>> {
        self.collect_documents(WISHLISTS, doc! { "isPublic": { "$exists": false } })
            .await
    }

    async fn set_wishlist_privacy(&self, id: ObjectId, is_public: bool) -> Result<bool> {
        self.set_field(WISHLISTS, id, "isPublic", is_public).await
    }

    async fn count_wishlists_by_privacy(&self, is_public: bool) -> Result<u64> {
        self.collection::<Document>(WISHLISTS)
            .count_documents(doc! { "isPublic": is_public })
            .await
            .context("Failed to count wishlists by privacy")
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Matches documents whose `inviteId` is absent or an explicit null.
fn missing_invite_filter() -> Document {
    doc! {
        "$or": [
            { "inviteId": { "$exists": false } },
            { "inviteId": Bson::Null },
        ]
    }
}

/// Index creation against an equivalent existing index comes back as command
/// error 85 rather than a no-op. Code 86 (the same name over different keys)
/// stays an error: that index does not constrain emails.
fn index_conflict(error: &mongodb::error::Error) -> bool {
    match error.kind.as_ref() {
        ErrorKind::Command(command_error) => index_already_exists(command_error.code),
        _ => false,
    }
}

fn index_already_exists(code: i32) -> bool {
    code == 85
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wishlist_from_full_document() {
        let id = ObjectId::new();
        let document = doc! {
            "_id": id,
            "name": "Secret Santa 2024",
            "ownerId": "64b0c0ffee0ddba11ca550aa",
            "ownerName": "Alice",
            "subscribers": ["a", "b"],
            "inviteId": "9e7a2f1c-aaaa-bbbb-cccc-000000000000",
            "isPublic": false,
            "items": [],
        };
        let wishlist: Wishlist = from_document(document).unwrap();
        assert_eq!(wishlist.id, id);
        assert_eq!(wishlist.name.as_deref(), Some("Secret Santa 2024"));
        assert_eq!(wishlist.owner_id.as_deref(), Some("64b0c0ffee0ddba11ca550aa"));
        assert_eq!(wishlist.subscribers, vec!["a", "b"]);
        assert_eq!(
            wishlist.invite_id.as_deref(),
            Some("9e7a2f1c-aaaa-bbbb-cccc-000000000000")
        );
        assert_eq!(wishlist.is_public, Some(false));
    }

    #[test]
    fn wishlist_missing_optional_fields_defaults() {
        let document = doc! { "_id": ObjectId::new() };
        let wishlist: Wishlist = from_document(document).unwrap();
        assert!(wishlist.name.is_none());
        assert!(wishlist.owner_id.is_none());
        assert!(wishlist.subscribers.is_empty());
        assert!(wishlist.invite_id.is_none());
        assert!(wishlist.is_public.is_none());
    }

    #[test]
    fn wishlist_without_id_is_rejected() {
        let document = doc! { "name": "No id" };
        assert!(from_document::<Wishlist>(document).is_err());
    }

    #[test]
    fn event_participants_keep_entries_without_user_id() {
        let document = doc! {
            "_id": ObjectId::new(),
            "name": "Team party",
            "ownerId": "owner",
            "participants": [
                { "userId": "p1", "wishlist": [] },
                { "wishlist": [] },
            ],
        };
        let event: Event = from_document(document).unwrap();
        assert_eq!(event.participants.len(), 2);
        assert_eq!(event.participants[0].user_id.as_deref(), Some("p1"));
        assert!(event.participants[1].user_id.is_none());
    }

    #[test]
    fn user_id_deserializes_to_hex_string() {
        let id = ObjectId::new();
        let document = doc! {
            "_id": id,
            "email": "alice@example.com",
            "friends": ["f1", "f2"],
        };
        let user: User = from_document(document).unwrap();
        assert_eq!(user.id, id.to_hex());
        assert_eq!(user.friends, vec!["f1", "f2"]);
    }

    #[test]
    fn user_without_friends_field_defaults_to_empty() {
        let document = doc! { "_id": ObjectId::new() };
        let user: User = from_document(document).unwrap();
        assert!(user.friends.is_empty());
    }

    #[test]
    fn missing_invite_filter_covers_absent_and_null() {
        let filter = missing_invite_filter();
        let branches = filter.get_array("$or").unwrap();
        assert_eq!(branches.len(), 2);
    }

    #[test]
    fn only_code_85_reports_an_existing_index() {
        assert!(index_already_exists(85));
        // 86: same index name over different keys; 11000: duplicate emails.
        assert!(!index_already_exists(86));
        assert!(!index_already_exists(11000));
    }
}
