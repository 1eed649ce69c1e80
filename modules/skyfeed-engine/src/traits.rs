// Trait seams for the two external collaborators.
//
// SearchProvider: one search call per partition against the content-search provider.
// EngagementService: viewer identity, batched like lookup, like/bookmark writes.
//
// Both are implemented by the real HTTP clients below and by the in-memory
// mocks in `testing`, so the engine runs without network in tests.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

use engagement_client::EngagementClient;
use media_search_client::{MediaRecord, MediaSearchClient};
use skyfeed_common::{Engagement, SharePayload};

// ---------------------------------------------------------------------------
// SearchProvider
// ---------------------------------------------------------------------------

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Fetch the first page of image results for one partition.
    async fn search(&self, partition: &str, page_size: u32) -> Result<Vec<MediaRecord>>;
}

#[async_trait]
impl SearchProvider for MediaSearchClient {
    async fn search(&self, partition: &str, page_size: u32) -> Result<Vec<MediaRecord>> {
        Ok(self.search_images(partition, page_size).await?)
    }
}

// ---------------------------------------------------------------------------
// EngagementService
// ---------------------------------------------------------------------------

#[async_trait]
pub trait EngagementService: Send + Sync {
    /// Current viewer id, `None` when nobody is signed in.
    async fn viewer(&self) -> Result<Option<String>>;

    /// Like counts and viewer state for every id in one round trip.
    /// Ids with no engagement may be absent from the map.
    async fn lookup(&self, viewer_id: &str, item_ids: &[String])
        -> Result<HashMap<String, Engagement>>;

    /// Create a like and return its record id.
    async fn create_like(&self, viewer_id: &str, item_id: &str) -> Result<String>;

    async fn delete_like(&self, viewer_id: &str, record_id: &str) -> Result<()>;

    async fn set_bookmark(&self, viewer_id: &str, item_id: &str, bookmarked: bool) -> Result<()>;

    /// Persist a "share to feed" composite record.
    async fn publish_share(&self, payload: &SharePayload) -> Result<()>;
}

#[async_trait]
impl EngagementService for EngagementClient {
    async fn viewer(&self) -> Result<Option<String>> {
        Ok(EngagementClient::viewer(self).await?)
    }

    async fn lookup(
        &self,
        viewer_id: &str,
        item_ids: &[String],
    ) -> Result<HashMap<String, Engagement>> {
        let records = EngagementClient::lookup(self, viewer_id, item_ids).await?;
        Ok(records
            .into_iter()
            .map(|(id, r)| {
                (
                    id,
                    Engagement {
                        like_count: r.like_count,
                        viewer_liked: r.viewer_liked,
                        like_record_id: r.like_record_id,
                        bookmarked: r.bookmarked,
                    },
                )
            })
            .collect())
    }

    async fn create_like(&self, viewer_id: &str, item_id: &str) -> Result<String> {
        Ok(EngagementClient::create_like(self, viewer_id, item_id).await?)
    }

    async fn delete_like(&self, _viewer_id: &str, record_id: &str) -> Result<()> {
        Ok(EngagementClient::delete_like(self, record_id).await?)
    }

    async fn set_bookmark(&self, viewer_id: &str, item_id: &str, bookmarked: bool) -> Result<()> {
        Ok(EngagementClient::set_bookmark(self, viewer_id, item_id, bookmarked).await?)
    }

    async fn publish_share(&self, payload: &SharePayload) -> Result<()> {
        Ok(EngagementClient::publish_share(self, payload).await?)
    }
}
