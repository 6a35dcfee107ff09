use crate::types::{Event, User, Wishlist};
use anyhow::Result;
use mongodb::bson::oid::ObjectId;

pub mod mongo;
pub use mongo::MongoStorage;

// ============================================================================
// Storage trait
// ============================================================================

/// Outcome of a friend-set insertion.
///
/// The three cases matter to the backfill: an insertion that found the value
/// already present is not a change, and an update that matched no user at all
/// is a failure of the edge, not a quiet success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetInsert {
    /// The value was absent and has been added.
    Inserted,
    /// The value was already in the set; nothing changed.
    AlreadyPresent,
    /// No document matched the given user id.
    NoMatch,
}

#[allow(async_fn_in_trait)]
pub trait Storage: Send + Sync {
    async fn fetch_wishlists(&self) -> Result<Vec<Wishlist>>;
    async fn fetch_events(&self) -> Result<Vec<Event>>;
    async fn fetch_users(&self) -> Result<Vec<User>>;

    /// Add `friend_id` to `user_id`'s friend set if absent (one direction of
    /// an edge; callers apply the reverse direction themselves).
    async fn add_friend(&self, user_id: &str, friend_id: &str) -> Result<SetInsert>;

    async fn fetch_wishlists_missing_invite(&self) -> Result<Vec<Wishlist>>;
    async fn fetch_events_missing_invite(&self) -> Result<Vec<Event>>;
    async fn set_wishlist_invite_id(&self, id: ObjectId, invite_id: &str) -> Result<bool>;
    async fn set_event_invite_id(&self, id: ObjectId, invite_id: &str) -> Result<bool>;

    async fn fetch_wishlists_missing_privacy(&self) -> Result<Vec<Wishlist>>;
    async fn set_wishlist_privacy(&self, id: ObjectId, is_public: bool) -> Result<bool>;
    async fn count_wishlists_by_privacy(&self, is_public: bool) -> Result<u64>;
}

// ============================================================================
// Test utilities
// ============================================================================
