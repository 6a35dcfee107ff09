use crate::storage::Storage;
use anyhow::Result;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InviteSummary {
    pub wishlists_updated: usize,
    pub events_updated: usize,
    pub failures: Vec<String>,
}

/// Stamp a fresh random invite id onto every wishlist and event that has
/// none (absent or null). Documents that already carry one are left alone,
/// so re-running the backfill never rotates an invite link someone may have
/// already shared.
pub async fn backfill_invites<S: Storage>(storage: &S) -> Result<InviteSummary> {
    let mut summary = InviteSummary::default();

    for wishlist in storage.fetch_wishlists_missing_invite().await? {
        let invite_id = Uuid::new_v4().to_string();
        match storage.set_wishlist_invite_id(wishlist.id, &invite_id).await {
            Ok(true) => {
                info!(wishlist = %wishlist.id, "Assigned invite id");
                summary.wishlists_updated += 1;
            }
            Ok(false) => {
                warn!(wishlist = %wishlist.id, "Wishlist disappeared before update");
                summary
                    .failures
                    .push(format!("wishlist {}: document not modified", wishlist.id));
            }
            Err(e) => {
                warn!(wishlist = %wishlist.id, error = %e, "Failed to assign invite id");
                summary
                    .failures
                    .push(format!("wishlist {}: {:#}", wishlist.id, e));
            }
        }
    }

    for event in storage.fetch_events_missing_invite().await? {
        let invite_id = Uuid::new_v4().to_string();
        match storage.set_event_invite_id(event.id, &invite_id).await {
            Ok(true) => {
                info!(event = %event.id, "Assigned invite id");
                summary.events_updated += 1;
            }
            Ok(false) => {
                warn!(event = %event.id, "Event disappeared before update");
                summary
                    .failures
                    .push(format!("event {}: document not modified", event.id));
            }
            Err(e) => {
                warn!(event = %event.id, error = %e, "Failed to assign invite id");
                summary.failures.push(format!("event {}: {:#}", event.id, e));
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_utils::FakeStorage;
    use crate::types::{Event, Wishlist};
    use mongodb::bson::oid::ObjectId;

    fn wishlist(id: ObjectId, invite_id: Option<&str>) -> Wishlist {
        Wishlist {
            id,
            name: Some("Test list".to_string()),
            owner_id: Some("owner".to_string()),
            subscribers: Vec::new(),
            invite_id: invite_id.map(str::to_string),
            is_public: Some(true),
        }
    }

    fn event(id: ObjectId, invite_id: Option<&str>) -> Event {
        Event {
            id,
            name: Some("Test event".to_string()),
            owner_id: Some("owner".to_string()),
            participants: Vec::new(),
            invite_id: invite_id.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn assigns_distinct_parseable_invite_ids() {
        let w1 = ObjectId::new();
        let w2 = ObjectId::new();
        let e1 = ObjectId::new();
        let storage = FakeStorage::new()
            .with_wishlist(wishlist(w1, None))
            .with_wishlist(wishlist(w2, None))
            .with_event(event(e1, None));

        let summary = backfill_invites(&storage).await.unwrap();

        assert_eq!(summary.wishlists_updated, 2);
        assert_eq!(summary.events_updated, 1);
        assert!(summary.failures.is_empty());

        let a = storage.wishlist(w1).unwrap().invite_id.unwrap();
        let b = storage.wishlist(w2).unwrap().invite_id.unwrap();
        let c = storage.event(e1).unwrap().invite_id.unwrap();
        for id in [&a, &b, &c] {
            assert!(Uuid::parse_str(id).is_ok(), "not a uuid: {}", id);
        }
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[tokio::test]
    async fn existing_invite_ids_are_untouched() {
        let keep = ObjectId::new();
        let fill = ObjectId::new();
        let storage = FakeStorage::new()
            .with_wishlist(wishlist(keep, Some("keep-me")))
            .with_wishlist(wishlist(fill, None));

        let summary = backfill_invites(&storage).await.unwrap();

        assert_eq!(summary.wishlists_updated, 1);
        assert_eq!(
            storage.wishlist(keep).unwrap().invite_id.as_deref(),
            Some("keep-me")
        );
        assert!(storage.wishlist(fill).unwrap().invite_id.is_some());
    }

    #[tokio::test]
    async fn second_run_finds_nothing_to_do() {
        let storage = FakeStorage::new()
            .with_wishlist(wishlist(ObjectId::new(), None))
            .with_event(event(ObjectId::new(), None));

        let first = backfill_invites(&storage).await.unwrap();
        let second = backfill_invites(&storage).await.unwrap();

        assert_eq!(first.wishlists_updated, 1);
        assert_eq!(first.events_updated, 1);
        assert_eq!(second.wishlists_updated, 0);
        assert_eq!(second.events_updated, 0);
        assert!(second.failures.is_empty());
    }

    #[tokio::test]
    async fn update_failures_are_collected_and_the_run_continues() {
        let broken = ObjectId::new();
        let healthy = ObjectId::new();
        let storage = FakeStorage::new()
            .with_wishlist(wishlist(broken, None))
            .with_wishlist(wishlist(healthy, None))
            .with_broken_wishlist(broken);

        let summary = backfill_invites(&storage).await.unwrap();

        assert_eq!(summary.wishlists_updated, 1);
        assert_eq!(summary.failures.len(), 1);
        assert!(summary.failures[0].contains("injected storage failure"));
        assert!(storage.wishlist(healthy).unwrap().invite_id.is_some());
        assert!(storage.wishlist(broken).unwrap().invite_id.is_none());
    }

    #[tokio::test]
    async fn event_update_failures_are_collected_and_the_run_continues() {
        let broken = ObjectId::new();
        let healthy = ObjectId::new();
        let storage = FakeStorage::new()
            .with_event(event(broken, None))
            .with_event(event(healthy, None))
            .with_broken_event(broken);

        let summary = backfill_invites(&storage).await.unwrap();

        assert_eq!(summary.events_updated, 1);
        assert_eq!(summary.failures.len(), 1);
        assert!(summary.failures[0].contains("injected storage failure"));
        assert!(summary.failures[0].starts_with("event "));
        assert!(storage.event(healthy).unwrap().invite_id.is_some());
        assert!(storage.event(broken).unwrap().invite_id.is_none());
    }
}
