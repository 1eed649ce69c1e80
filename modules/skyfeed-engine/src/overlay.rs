use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::{debug, warn};

use skyfeed_common::{ContentItem, Engagement, SharePayload, ViewerState};

use crate::traits::EngagementService;

/// Layers viewer-specific like/bookmark state onto content items.
///
/// Lookups are batched: one call per cycle for every item that has not been
/// enriched yet.
#[derive(Clone)]
pub struct EngagementOverlay {
    service: Arc<dyn EngagementService>,
}

/// Viewer state captured before an optimistic toggle, for rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    viewer_state: ViewerState,
    engagement_count: u64,
}

impl Snapshot {
    pub fn capture(item: &ContentItem) -> Self {
        Self {
            viewer_state: item.viewer_state.clone(),
            engagement_count: item.engagement_count,
        }
    }

    pub fn restore(self, item: &mut ContentItem) {
        item.viewer_state = self.viewer_state;
        item.engagement_count = self.engagement_count;
    }
}

impl EngagementOverlay {
    pub fn new(service: Arc<dyn EngagementService>) -> Self {
        Self { service }
    }

    pub async fn viewer(&self) -> Result<Option<String>> {
        self.service.viewer().await
    }

    /// One batched lookup for `ids`.
    pub async fn lookup(&self, viewer_id: &str, ids: &[String]) -> Result<HashMap<String, Engagement>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let records = self.service.lookup(viewer_id, ids).await?;
        debug!(requested = ids.len(), returned = records.len(), "Engagement batch fetched");
        Ok(records)
    }

    /// Push a like toggle to the data service. `liked` is the new state.
    /// Returns the like record id to keep on the item.
    pub async fn sync_like(
        &self,
        viewer_id: &str,
        item_id: &str,
        liked: bool,
        prior_record: Option<&str>,
    ) -> Result<Option<String>> {
        if liked {
            let record = self.service.create_like(viewer_id, item_id).await?;
            return Ok(Some(record));
        }
        match prior_record {
            Some(record) => {
                self.service.delete_like(viewer_id, record).await?;
                Ok(None)
            }
            None => Err(anyhow!("no like record to delete for {item_id}")),
        }
    }

    pub async fn sync_bookmark(&self, viewer_id: &str, item_id: &str, bookmarked: bool) -> Result<()> {
        self.service.set_bookmark(viewer_id, item_id, bookmarked).await
    }

    pub async fn publish_share(&self, payload: &SharePayload) -> Result<()> {
        self.service.publish_share(payload).await.inspect_err(|e| {
            warn!(item_id = payload.item_id.as_str(), error = %e, "Share publish failed");
        })
    }
}

/// Apply one lookup result to an item and mark it enriched. No record means
/// the viewer has no likes or bookmarks on it.
pub fn apply_engagement(item: &mut ContentItem, record: Option<&Engagement>) {
    match record {
        Some(r) => {
            item.engagement_count = r.like_count;
            item.viewer_state = ViewerState {
                liked: r.viewer_liked,
                bookmarked: r.bookmarked,
                like_record_id: r.like_record_id.clone(),
            };
        }
        None => item.viewer_state = ViewerState::default(),
    }
    item.enriched = true;
}

/// Flip the like flag and adjust the count. Returns the prior state.
pub fn flip_like(item: &mut ContentItem) -> Snapshot {
    let snapshot = Snapshot::capture(item);
    if item.viewer_state.liked {
        item.viewer_state.liked = false;
        item.engagement_count = item.engagement_count.saturating_sub(1);
    } else {
        item.viewer_state.liked = true;
        item.engagement_count += 1;
    }
    snapshot
}

/// Flip the bookmark flag. Returns the prior state.
pub fn flip_bookmark(item: &mut ContentItem) -> Snapshot {
    let snapshot = Snapshot::capture(item);
    item.viewer_state.bookmarked = !item.viewer_state.bookmarked;
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AggregateStore;
    use crate::testing::{item, MockEngagement};
    use skyfeed_common::SortOrder;

    #[tokio::test]
    async fn empty_batch_skips_service() {
        let service = Arc::new(MockEngagement::new(Some("v")));
        let overlay = EngagementOverlay::new(service.clone());

        assert!(overlay.lookup("v", &[]).await.unwrap().is_empty());
        assert!(service.lookup_calls().is_empty());
    }

    #[tokio::test]
    async fn one_batched_lookup_enriches_pending_store_items() {
        let service = Arc::new(
            MockEngagement::new(Some("viewer-1"))
                .with_like_count("a", 5)
                .with_like("viewer-1", "b"),
        );
        let overlay = EngagementOverlay::new(service.clone());
        let mut store = AggregateStore::new(SortOrder::NewestFirst);
        store.merge(vec![item("a", "a", 1), item("b", "b", 2), item("c", "c", 3)]);
        store.get_mut("c").unwrap().enriched = true;

        let pending = store.ids_needing_enrichment();
        let records = overlay.lookup("viewer-1", &pending).await.unwrap();
        let updated = store.apply_engagement(&pending, &records);

        assert_eq!(updated, 2);
        assert_eq!(service.lookup_calls(), vec![vec!["b".to_string(), "a".to_string()]]);
        let a = store.get("a").unwrap();
        assert_eq!(a.engagement_count, 5);
        assert!(!a.viewer_state.liked);
        let b = store.get("b").unwrap();
        assert!(b.viewer_state.liked);
        assert!(b.viewer_state.like_record_id.is_some());
        assert!(store.all().iter().all(|i| i.enriched));
    }

    #[test]
    fn flip_like_and_restore() {
        let mut it = item("a", "a", 1);
        it.engagement_count = 2;

        let snap = flip_like(&mut it);
        assert!(it.viewer_state.liked);
        assert_eq!(it.engagement_count, 3);

        snap.restore(&mut it);
        assert!(!it.viewer_state.liked);
        assert_eq!(it.engagement_count, 2);
    }

    #[test]
    fn unlike_never_underflows() {
        let mut it = item("a", "a", 1);
        it.viewer_state.liked = true;
        flip_like(&mut it);
        assert_eq!(it.engagement_count, 0);
    }

    #[tokio::test]
    async fn unlike_without_record_is_error() {
        let overlay = EngagementOverlay::new(Arc::new(MockEngagement::new(Some("v"))));
        assert!(overlay.sync_like("v", "a", false, None).await.is_err());
    }
}
