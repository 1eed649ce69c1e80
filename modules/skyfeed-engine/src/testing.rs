// Test mocks for the aggregation engine.
//
// Two mocks matching the two trait boundaries:
// - MockSearch (SearchProvider): HashMap-based partition→records, per-partition failures
// - MockEngagement (EngagementService): stateful in-memory likes/bookmarks
//
// Plus helpers for constructing MediaRecord and ContentItem fixtures.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;

use media_search_client::{parse_date, MediaRecord};
use skyfeed_common::{ContentItem, Engagement, SharePayload, ViewerState};

use crate::traits::{EngagementService, SearchProvider};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A provider record with an id, title and `YYYY-MM-DD` date.
pub fn record(id: &str, title: &str, date: &str) -> MediaRecord {
    MediaRecord {
        id: Some(id.to_string()),
        title: Some(title.to_string()),
        description: Some(format!("{title} description")),
        created_at: parse_date(date),
        source: Some("JPL".to_string()),
        media_url: Some(format!("https://images.test/{id}.jpg")),
        keywords: Vec::new(),
    }
}

/// A store-ready item created `secs` seconds after the epoch.
pub fn item(id: &str, title: &str, secs: i64) -> ContentItem {
    ContentItem {
        id: id.to_string(),
        title: title.to_string(),
        description: String::new(),
        media_url: format!("https://images.test/{id}.jpg"),
        created_at: DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default(),
        source_partition: "test".to_string(),
        source: "JPL".to_string(),
        tags: Vec::new(),
        engagement_count: 0,
        view_count: 0,
        viewer_state: ViewerState::default(),
        enriched: false,
    }
}

// ---------------------------------------------------------------------------
// MockSearch
// ---------------------------------------------------------------------------

/// Partition-keyed search results. Unregistered partitions return an empty
/// list unless `fail_unregistered()` is set.
#[derive(Default)]
pub struct MockSearch {
    results: HashMap<String, Vec<MediaRecord>>,
    failures: HashSet<String>,
    fail_unregistered: bool,
    fail_all: AtomicBool,
    gate: Option<Arc<Semaphore>>,
    calls: Mutex<Vec<String>>,
}

impl MockSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_search(mut self, partition: &str, records: Vec<MediaRecord>) -> Self {
        self.results.insert(partition.to_string(), records);
        self
    }

    pub fn failing(mut self, partition: &str) -> Self {
        self.failures.insert(partition.to_string());
        self
    }

    pub fn fail_unregistered(mut self) -> Self {
        self.fail_unregistered = true;
        self
    }

    /// Block every search until the returned semaphore is given a permit.
    pub fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(gate.clone());
        (self, gate)
    }

    /// Flip every partition to failing (or back) at runtime.
    pub fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Partitions searched so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for MockSearch {
    async fn search(&self, partition: &str, _page_size: u32) -> Result<Vec<MediaRecord>> {
        self.calls.lock().unwrap().push(partition.to_string());
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await?;
        }
        if self.fail_all.load(Ordering::SeqCst) || self.failures.contains(partition) {
            bail!("MockSearch: network error for {partition}");
        }
        match self.results.get(partition) {
            Some(records) => Ok(records.clone()),
            None if self.fail_unregistered => {
                bail!("MockSearch: no results registered for {partition}")
            }
            None => Ok(Vec::new()),
        }
    }
}

// ---------------------------------------------------------------------------
// MockEngagement
// ---------------------------------------------------------------------------

/// In-memory account/data service.
pub struct MockEngagement {
    viewer: Option<String>,
    base_counts: HashMap<String, u64>,
    /// record id -> (viewer, item)
    likes: Mutex<HashMap<String, (String, String)>>,
    bookmarks: Mutex<HashSet<(String, String)>>,
    shares: Mutex<Vec<SharePayload>>,
    lookups: Mutex<Vec<Vec<String>>>,
    fail_writes: AtomicBool,
    fail_lookups: AtomicBool,
    lookup_gate: Option<Arc<Semaphore>>,
    next_id: AtomicU64,
}

impl MockEngagement {
    pub fn new(viewer: Option<&str>) -> Self {
        Self {
            viewer: viewer.map(String::from),
            base_counts: HashMap::new(),
            likes: Mutex::new(HashMap::new()),
            bookmarks: Mutex::new(HashSet::new()),
            shares: Mutex::new(Vec::new()),
            lookups: Mutex::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
            fail_lookups: AtomicBool::new(false),
            lookup_gate: None,
            next_id: AtomicU64::new(1),
        }
    }

    /// Likes on `item_id` from other viewers.
    pub fn with_like_count(mut self, item_id: &str, count: u64) -> Self {
        self.base_counts.insert(item_id.to_string(), count);
        self
    }

    /// Pre-existing like by `viewer` on `item_id`.
    pub fn with_like(self, viewer: &str, item_id: &str) -> Self {
        let id = self.mint_id();
        self.likes
            .lock()
            .unwrap()
            .insert(id, (viewer.to_string(), item_id.to_string()));
        self
    }

    /// Hold every lookup response until the returned semaphore is given a
    /// permit. The response reflects service state at the time of the call.
    pub fn gated_lookups(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.lookup_gate = Some(gate.clone());
        (self, gate)
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    /// Id batches passed to `lookup`, one entry per call.
    pub fn lookup_calls(&self) -> Vec<Vec<String>> {
        self.lookups.lock().unwrap().clone()
    }

    pub fn like_count(&self, item_id: &str) -> u64 {
        let likes = self.likes.lock().unwrap();
        self.base_counts.get(item_id).copied().unwrap_or(0)
            + likes.values().filter(|(_, i)| i == item_id).count() as u64
    }

    pub fn is_bookmarked(&self, viewer: &str, item_id: &str) -> bool {
        self.bookmarks
            .lock()
            .unwrap()
            .contains(&(viewer.to_string(), item_id.to_string()))
    }

    pub fn shares(&self) -> Vec<SharePayload> {
        self.shares.lock().unwrap().clone()
    }

    fn mint_id(&self) -> String {
        format!("like-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn check_writes(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("MockEngagement: write rejected");
        }
        Ok(())
    }
}

#[async_trait]
impl EngagementService for MockEngagement {
    async fn viewer(&self) -> Result<Option<String>> {
        Ok(self.viewer.clone())
    }

    async fn lookup(
        &self,
        viewer_id: &str,
        item_ids: &[String],
    ) -> Result<HashMap<String, Engagement>> {
        self.lookups.lock().unwrap().push(item_ids.to_vec());
        let failed = self.fail_lookups.load(Ordering::SeqCst);

        let mut out = HashMap::new();
        for id in item_ids {
            let like_record_id = {
                let likes = self.likes.lock().unwrap();
                likes
                    .iter()
                    .find(|(_, (v, i))| v == viewer_id && i == id)
                    .map(|(record, _)| record.clone())
            };
            let record = Engagement {
                like_count: self.like_count(id),
                viewer_liked: like_record_id.is_some(),
                like_record_id,
                bookmarked: self.is_bookmarked(viewer_id, id),
            };
            if record != Engagement::default() {
                out.insert(id.clone(), record);
            }
        }

        if let Some(gate) = &self.lookup_gate {
            let _permit = gate.acquire().await?;
        }
        if failed {
            bail!("MockEngagement: lookup unavailable");
        }
        Ok(out)
    }

    async fn create_like(&self, viewer_id: &str, item_id: &str) -> Result<String> {
        self.check_writes()?;
        let id = self.mint_id();
        self.likes
            .lock()
            .unwrap()
            .insert(id.clone(), (viewer_id.to_string(), item_id.to_string()));
        Ok(id)
    }

    async fn delete_like(&self, _viewer_id: &str, record_id: &str) -> Result<()> {
        self.check_writes()?;
        if self.likes.lock().unwrap().remove(record_id).is_none() {
            bail!("MockEngagement: no like record {record_id}");
        }
        Ok(())
    }

    async fn set_bookmark(&self, viewer_id: &str, item_id: &str, bookmarked: bool) -> Result<()> {
        self.check_writes()?;
        let key = (viewer_id.to_string(), item_id.to_string());
        let mut bookmarks = self.bookmarks.lock().unwrap();
        if bookmarked {
            bookmarks.insert(key);
        } else {
            bookmarks.remove(&key);
        }
        Ok(())
    }

    async fn publish_share(&self, payload: &SharePayload) -> Result<()> {
        self.check_writes()?;
        self.shares.lock().unwrap().push(payload.clone());
        Ok(())
    }
}
