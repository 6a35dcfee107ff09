use crate::storage::Storage;
use anyhow::Result;
use tracing::{info, warn};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PrivacySummary {
    pub wishlists_updated: usize,
    /// Collection-wide totals after the backfill, for the operator report.
    pub public_total: u64,
    pub private_total: u64,
    pub failures: Vec<String>,
}

/// Mark every wishlist without an explicit `isPublic` flag as public, which
/// is the visibility those lists had before the flag existed. Wishlists that
/// already carry a value, public or private, are never touched.
pub async fn backfill_privacy<S: Storage>(storage: &S) -> Result<PrivacySummary> {
    let mut summary = PrivacySummary::default();

    for wishlist in storage.fetch_wishlists_missing_privacy().await? {
        match storage.set_wishlist_privacy(wishlist.id, true).await {
            Ok(true) => {
                info!(wishlist = %wishlist.id, "Marked wishlist public");
                summary.wishlists_updated += 1;
            }
            Ok(false) => {
                warn!(wishlist = %wishlist.id, "Wishlist disappeared before update");
                summary
                    .failures
                    .push(format!("wishlist {}: document not modified", wishlist.id));
            }
            Err(e) => {
                warn!(wishlist = %wishlist.id, error = %e, "Failed to set privacy flag");
                summary
                    .failures
                    .push(format!("wishlist {}: {:#}", wishlist.id, e));
            }
        }
    }

    summary.public_total = storage.count_wishlists_by_privacy(true).await?;
    summary.private_total = storage.count_wishlists_by_privacy(false).await?;

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_utils::FakeStorage;
    use crate::types::Wishlist;
    use mongodb::bson::oid::ObjectId;

    fn wishlist(id: ObjectId, is_public: Option<bool>) -> Wishlist {
        Wishlist {
            id,
            name: Some("Test list".to_string()),
            owner_id: Some("owner".to_string()),
            subscribers: Vec::new(),
            invite_id: None,
            is_public,
        }
    }

    #[tokio::test]
    async fn missing_privacy_defaults_to_public() {
        let unset_a = ObjectId::new();
        let unset_b = ObjectId::new();
        let private = ObjectId::new();
        let public = ObjectId::new();
        let storage = FakeStorage::new()
            .with_wishlist(wishlist(unset_a, None))
            .with_wishlist(wishlist(unset_b, None))
            .with_wishlist(wishlist(private, Some(false)))
            .with_wishlist(wishlist(public, Some(true)));

        let summary = backfill_privacy(&storage).await.unwrap();

        assert_eq!(summary.wishlists_updated, 2);
        assert_eq!(summary.public_total, 3);
        assert_eq!(summary.private_total, 1);
        assert!(summary.failures.is_empty());
        assert_eq!(storage.wishlist(unset_a).unwrap().is_public, Some(true));
        assert_eq!(storage.wishlist(private).unwrap().is_public, Some(false));
    }

    #[tokio::test]
    async fn second_run_changes_nothing() {
        let storage = FakeStorage::new().with_wishlist(wishlist(ObjectId::new(), None));

        let first = backfill_privacy(&storage).await.unwrap();
        let second = backfill_privacy(&storage).await.unwrap();

        assert_eq!(first.wishlists_updated, 1);
        assert_eq!(second.wishlists_updated, 0);
        assert_eq!(second.public_total, 1);
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

        let summary = backfill_privacy(&storage).await.unwrap();

        assert_eq!(summary.wishlists_updated, 1);
        assert_eq!(summary.failures.len(), 1);
        assert!(summary.failures[0].contains("injected storage failure"));
        assert_eq!(storage.wishlist(healthy).unwrap().is_public, Some(true));
        assert_eq!(storage.wishlist(broken).unwrap().is_public, None);
    }
}
