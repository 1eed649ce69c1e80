use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

use skyfeed_common::config::DEFAULT_FALLBACK_IMAGE_URL;
use skyfeed_common::{
    Config, ContentItem, Notice, Partition, SessionStats, SharePayload, SkyfeedError, SortOrder,
    ViewFilter,
};

use crate::fallback::featured_items;
use crate::fanout::FanOutFetcher;
use crate::overlay::{flip_bookmark, flip_like, EngagementOverlay, Snapshot};
use crate::pagination::{PaginationController, PaginationState};
use crate::projector::project;
use crate::scheduler::{PartitionScheduler, DEFAULT_PARTITIONS};
use crate::store::AggregateStore;
use crate::traits::{EngagementService, SearchProvider};
use crate::upstream::UpstreamClient;

pub type Result<T> = std::result::Result<T, SkyfeedError>;

/// Collaborators and tuning for one [`AggregateSession`].
#[derive(Clone, TypedBuilder)]
pub struct SessionDeps {
    pub search: Arc<dyn SearchProvider>,
    #[builder(default, setter(strip_option))]
    pub engagement: Option<Arc<dyn EngagementService>>,
    #[builder(default = DEFAULT_PARTITIONS.iter().map(|p| p.to_string()).collect())]
    pub partitions: Vec<String>,
    #[builder(default = 8)]
    pub initial_batch_size: usize,
    #[builder(default = 4)]
    pub page_batch_size: usize,
    #[builder(default = media_search_client::DEFAULT_PAGE_SIZE)]
    pub page_size: u32,
    /// Fixed seed for partition sampling; random when unset.
    #[builder(default, setter(strip_option))]
    pub rng_seed: Option<u64>,
    #[builder(default = DEFAULT_FALLBACK_IMAGE_URL.to_string(), setter(into))]
    pub fallback_image_url: String,
}

impl SessionDeps {
    pub fn from_config(
        config: &Config,
        search: Arc<dyn SearchProvider>,
        engagement: Option<Arc<dyn EngagementService>>,
    ) -> Self {
        Self {
            search,
            engagement,
            partitions: config
                .partitions
                .clone()
                .unwrap_or_else(|| DEFAULT_PARTITIONS.iter().map(|p| p.to_string()).collect()),
            initial_batch_size: config.initial_batch_size,
            page_batch_size: config.page_batch_size,
            page_size: config.search_page_size,
            rng_seed: config.rng_seed,
            fallback_image_url: config.fallback_image_url.clone(),
        }
    }
}

/// What one aggregation cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Partitions dispatched, in order.
    pub partitions: Vec<Partition>,
    pub failed_partitions: usize,
    /// Unique items the fan-out returned.
    pub fetched: usize,
    /// Items that were new to the store.
    pub inserted: usize,
    pub enriched: usize,
    /// The session was reset while this cycle was in flight; nothing was applied.
    pub discarded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRequest {
    /// Dropped: a cycle was already running or nothing is loaded yet.
    Ignored,
    Completed(CycleReport),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadMode {
    Replace,
    Merge,
}

struct SessionState {
    store: AggregateStore,
    scheduler: PartitionScheduler,
    filter: ViewFilter,
    viewer: Option<String>,
    rng: StdRng,
    /// Cycles applied since the last reset; 0 means the next one is the first load.
    cycles: u64,
    /// Bumped on reset and close. In-flight cycles from an older generation are discarded.
    generation: u64,
    closed: bool,
    notices: Vec<Notice>,
    /// Bumped when an engagement write starts and when it settles.
    write_seq: u64,
    /// id -> `write_seq` stamp of the latest write activity on that item.
    last_write: HashMap<String, u64>,
    /// id -> number of writes still in flight.
    pending_writes: HashMap<String, usize>,
}

impl SessionState {
    fn begin_write(&mut self, item_id: &str) {
        self.write_seq += 1;
        self.last_write.insert(item_id.to_string(), self.write_seq);
        *self.pending_writes.entry(item_id.to_string()).or_default() += 1;
    }

    fn end_write(&mut self, item_id: &str) {
        self.write_seq += 1;
        self.last_write.insert(item_id.to_string(), self.write_seq);
        if let Some(n) = self.pending_writes.get_mut(item_id) {
            *n -= 1;
            if *n == 0 {
                self.pending_writes.remove(item_id);
            }
        }
    }

    /// True if a lookup dispatched at `since` may not reflect the viewer's
    /// latest write on `item_id`.
    fn written_since(&self, item_id: &str, since: u64) -> bool {
        self.pending_writes.contains_key(item_id)
            || self.last_write.get(item_id).is_some_and(|&seq| seq > since)
    }
}

/// Session-scoped aggregate: the store, partition state and view settings,
/// plus the consumer-facing operations that drive them.
pub struct AggregateSession {
    fetcher: FanOutFetcher,
    overlay: Option<EngagementOverlay>,
    pagination: PaginationController,
    /// Never held across an `.await`.
    state: Mutex<SessionState>,
    initial_batch_size: usize,
    page_batch_size: usize,
    fallback_image_url: String,
}

impl AggregateSession {
    pub fn new(deps: SessionDeps) -> Self {
        let upstream = UpstreamClient::new(
            deps.search,
            deps.page_size,
            deps.fallback_image_url.clone(),
        );
        let rng = match deps.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let filter = ViewFilter::default();

        Self {
            fetcher: FanOutFetcher::new(upstream),
            overlay: deps.engagement.map(EngagementOverlay::new),
            pagination: PaginationController::new(),
            state: Mutex::new(SessionState {
                store: AggregateStore::new(filter.order),
                scheduler: PartitionScheduler::new(deps.partitions),
                filter,
                viewer: None,
                rng,
                cycles: 0,
                generation: 0,
                closed: false,
                notices: Vec::new(),
                write_seq: 0,
                last_write: HashMap::new(),
                pending_writes: HashMap::new(),
            }),
            initial_batch_size: deps.initial_batch_size,
            page_batch_size: deps.page_batch_size,
            fallback_image_url: deps.fallback_image_url,
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state().closed {
            return Err(SkyfeedError::SessionClosed);
        }
        Ok(())
    }

    // --- Loading ---

    /// First load: resolve the viewer, then fetch the initial batch.
    pub async fn initialize_session(&self) -> Result<CycleReport> {
        self.resolve_viewer().await?;
        self.reset_session(None).await
    }

    /// Ask the data service who is signed in. Failures leave the session anonymous.
    pub async fn resolve_viewer(&self) -> Result<Option<String>> {
        self.ensure_open()?;
        let Some(overlay) = &self.overlay else {
            return Ok(None);
        };
        let viewer = match overlay.viewer().await {
            Ok(viewer) => {
                info!(authenticated = viewer.is_some(), "Viewer resolved");
                viewer
            }
            Err(e) => {
                warn!(error = %e, "Viewer lookup failed, continuing anonymously");
                None
            }
        };
        self.state().viewer = viewer.clone();
        Ok(viewer)
    }

    /// Drop the store and consumed partitions and load afresh. Cycles still in
    /// flight from before the reset are discarded when they land.
    pub async fn reset_session(&self, explicit_query: Option<&str>) -> Result<CycleReport> {
        let generation = {
            let mut st = self.state();
            if st.closed {
                return Err(SkyfeedError::SessionClosed);
            }
            st.generation += 1;
            st.store.clear();
            st.scheduler.reset();
            st.cycles = 0;
            st.generation
        };
        info!(query = explicit_query.unwrap_or(""), "Session reset");

        let _guard = self.pagination.force_begin();
        self.run_cycle(LoadMode::Replace, explicit_query, generation)
            .await
    }

    /// Proximity signal from the consumer. Dropped while a cycle is running or
    /// before the first load has produced anything.
    pub async fn request_next_page(&self) -> Result<PageRequest> {
        let (has_items, generation) = {
            let st = self.state();
            if st.closed {
                return Err(SkyfeedError::SessionClosed);
            }
            (!st.store.is_empty(), st.generation)
        };
        let Some(_guard) = self.pagination.try_begin(has_items) else {
            return Ok(PageRequest::Ignored);
        };
        self.run_cycle(LoadMode::Merge, None, generation)
            .await
            .map(PageRequest::Completed)
    }

    /// One aggregation cycle on behalf of `generation`. Nothing is selected or
    /// applied once the session has moved past that generation.
    async fn run_cycle(
        &self,
        mode: LoadMode,
        explicit_query: Option<&str>,
        generation: u64,
    ) -> Result<CycleReport> {
        let partitions = {
            let mut st = self.state();
            if st.closed {
                return Err(SkyfeedError::SessionClosed);
            }
            if st.generation != generation {
                debug!("Session reset before dispatch, skipping cycle");
                return Ok(CycleReport {
                    discarded: true,
                    ..Default::default()
                });
            }
            let batch = if st.cycles == 0 {
                self.initial_batch_size
            } else {
                self.page_batch_size
            };
            let SessionState { scheduler, rng, .. } = &mut *st;
            scheduler.select_next(batch, explicit_query, rng)
        };
        info!(partitions = ?partitions, mode = ?mode, "Dispatching aggregation cycle");

        let outcome = self.fetcher.run_cycle(&partitions).await;

        let mut report = CycleReport {
            partitions: outcome.partitions.clone(),
            failed_partitions: outcome.failed_partitions.len(),
            fetched: outcome.items.len(),
            ..Default::default()
        };
        let total_failure = outcome.is_total_failure();

        let (pending, viewer, dispatched_at) = {
            let mut st = self.state();
            if st.closed {
                debug!("Session closed mid-cycle, dropping results");
                return Err(SkyfeedError::SessionClosed);
            }
            if st.generation != generation {
                debug!(fetched = report.fetched, "Stale cycle after reset, dropping results");
                report.discarded = true;
                return Ok(report);
            }

            let first_cycle = st.cycles == 0;
            st.cycles += 1;

            if total_failure {
                if first_cycle {
                    st.store.replace(featured_items(&self.fallback_image_url));
                }
                st.notices.push(Notice::TotalFetchFailure {
                    partitions: report.partitions.len(),
                    used_fallback: first_cycle,
                });
                warn!(
                    partitions = report.partitions.len(),
                    used_fallback = first_cycle,
                    "Every partition failed this cycle"
                );
                return Err(SkyfeedError::TotalFetchFailure(report.partitions.len()));
            }

            report.inserted = match mode {
                LoadMode::Replace => st.store.replace(outcome.items),
                LoadMode::Merge => st.store.merge(outcome.items),
            };
            (st.store.ids_needing_enrichment(), st.viewer.clone(), st.write_seq)
        };

        if let (Some(overlay), Some(viewer)) = (&self.overlay, viewer) {
            if !pending.is_empty() {
                match overlay.lookup(&viewer, &pending).await {
                    Ok(records) => {
                        let mut st = self.state();
                        if st.generation == generation && !st.closed {
                            // Items written to during the lookup keep their optimistic
                            // state and are picked up by the next cycle.
                            let fresh: Vec<String> = pending
                                .iter()
                                .filter(|id| !st.written_since(id, dispatched_at))
                                .cloned()
                                .collect();
                            if fresh.len() < pending.len() {
                                debug!(
                                    skipped = pending.len() - fresh.len(),
                                    "Deferring enrichment of items with recent writes"
                                );
                            }
                            report.enriched = st.store.apply_engagement(&fresh, &records);
                        }
                    }
                    Err(e) => warn!(
                        error = %e,
                        pending = pending.len(),
                        "Engagement lookup failed, items stay unenriched until next cycle"
                    ),
                }
            }
        }

        info!(
            fetched = report.fetched,
            inserted = report.inserted,
            enriched = report.enriched,
            failed = report.failed_partitions,
            "Cycle applied"
        );
        Ok(report)
    }

    // --- View settings ---

    pub fn set_filter(&self, category: &str) {
        self.state().filter.category = category.trim().to_string();
    }

    pub fn set_query(&self, text: &str) {
        self.state().filter.query = text.to_string();
    }

    pub fn set_sort_order(&self, order: SortOrder) {
        let mut st = self.state();
        st.filter.order = order;
        st.store.resort(order);
    }

    pub fn filter(&self) -> ViewFilter {
        self.state().filter.clone()
    }

    /// The filtered, sorted slice to render.
    pub fn current_view(&self) -> Vec<ContentItem> {
        let st = self.state();
        project(st.store.all(), &st.filter)
    }

    pub fn session_stats(&self) -> SessionStats {
        self.state().store.stats()
    }

    // --- Engagement ---

    /// Toggle the viewer's like on an item. Applied optimistically; rolled back
    /// with a notice if the data service rejects it. Returns the new state.
    pub async fn toggle_like(&self, item_id: &str) -> Result<bool> {
        let overlay = self.overlay.as_ref().ok_or(SkyfeedError::NotAuthenticated)?;

        let (viewer, generation, snapshot, liked, prior_record) = {
            let mut st = self.state();
            let (viewer, generation) = self.writable(&st)?;
            let item = st
                .store
                .get_mut(item_id)
                .ok_or_else(|| SkyfeedError::UnknownItem(item_id.to_string()))?;
            let prior_record = item.viewer_state.like_record_id.clone();
            let snapshot = flip_like(item);
            let liked = item.viewer_state.liked;
            st.begin_write(item_id);
            (viewer, generation, snapshot, liked, prior_record)
        };

        match overlay
            .sync_like(&viewer, item_id, liked, prior_record.as_deref())
            .await
        {
            Ok(record) => {
                let mut st = self.state();
                st.end_write(item_id);
                if st.generation == generation {
                    if let Some(item) = st.store.get_mut(item_id) {
                        item.viewer_state.like_record_id = record;
                    }
                }
                debug!(item_id, liked, "Like synced");
                Ok(liked)
            }
            Err(e) => Err(self.roll_back(item_id, generation, snapshot, e)),
        }
    }

    /// Toggle the viewer's bookmark on an item. Same optimistic contract as likes.
    pub async fn toggle_bookmark(&self, item_id: &str) -> Result<bool> {
        let overlay = self.overlay.as_ref().ok_or(SkyfeedError::NotAuthenticated)?;

        let (viewer, generation, snapshot, bookmarked) = {
            let mut st = self.state();
            let (viewer, generation) = self.writable(&st)?;
            let item = st
                .store
                .get_mut(item_id)
                .ok_or_else(|| SkyfeedError::UnknownItem(item_id.to_string()))?;
            let snapshot = flip_bookmark(item);
            let bookmarked = item.viewer_state.bookmarked;
            st.begin_write(item_id);
            (viewer, generation, snapshot, bookmarked)
        };

        match overlay.sync_bookmark(&viewer, item_id, bookmarked).await {
            Ok(()) => {
                self.state().end_write(item_id);
                debug!(item_id, bookmarked, "Bookmark synced");
                Ok(bookmarked)
            }
            Err(e) => Err(self.roll_back(item_id, generation, snapshot, e)),
        }
    }

    /// Viewer id and generation, if the session accepts engagement writes.
    fn writable(&self, st: &SessionState) -> Result<(String, u64)> {
        if st.closed {
            return Err(SkyfeedError::SessionClosed);
        }
        let viewer = st.viewer.clone().ok_or(SkyfeedError::NotAuthenticated)?;
        Ok((viewer, st.generation))
    }

    fn roll_back(
        &self,
        item_id: &str,
        generation: u64,
        snapshot: Snapshot,
        err: anyhow::Error,
    ) -> SkyfeedError {
        warn!(item_id, error = %err, "Engagement sync failed, rolling back");
        let mut st = self.state();
        st.end_write(item_id);
        if st.generation == generation {
            if let Some(item) = st.store.get_mut(item_id) {
                snapshot.restore(item);
            }
        }
        st.notices.push(Notice::EngagementSyncFailure {
            item_id: item_id.to_string(),
            message: err.to_string(),
        });
        SkyfeedError::EngagementSync(err.to_string())
    }

    /// Count a view of an item. Returns the new view count.
    pub fn record_view(&self, item_id: &str) -> Result<u64> {
        let mut st = self.state();
        let item = st
            .store
            .get_mut(item_id)
            .ok_or_else(|| SkyfeedError::UnknownItem(item_id.to_string()))?;
        item.view_count += 1;
        Ok(item.view_count)
    }

    // --- Sharing ---

    /// Build the composite record for sharing an item to the feed.
    pub fn compose_share(&self, item_id: &str, caption: &str) -> Result<SharePayload> {
        let st = self.state();
        let viewer = st.viewer.clone().ok_or(SkyfeedError::NotAuthenticated)?;
        let item = st
            .store
            .get(item_id)
            .ok_or_else(|| SkyfeedError::UnknownItem(item_id.to_string()))?;
        Ok(SharePayload {
            viewer_id: viewer,
            item_id: item.id.clone(),
            title: item.title.clone(),
            description: item.description.clone(),
            media_url: item.media_url.clone(),
            caption: caption.trim().to_string(),
            tags: item.tags.clone(),
            shared_at: Utc::now(),
        })
    }

    /// Compose a share and hand it to the data service.
    pub async fn share_to_feed(&self, item_id: &str, caption: &str) -> Result<SharePayload> {
        let overlay = self.overlay.as_ref().ok_or(SkyfeedError::NotAuthenticated)?;
        let payload = self.compose_share(item_id, caption)?;
        overlay.publish_share(&payload).await?;
        info!(item_id, "Shared to feed");
        Ok(payload)
    }

    // --- Session lifecycle ---

    /// Drain user-visible notices raised since the last call.
    pub fn take_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut self.state().notices)
    }

    pub fn viewer(&self) -> Option<String> {
        self.state().viewer.clone()
    }

    pub fn pagination_state(&self) -> PaginationState {
        self.pagination.state()
    }

    pub fn consumed_partitions(&self) -> usize {
        self.state().scheduler.consumed().len()
    }

    /// Tear the session down. Results of cycles still in flight are dropped.
    pub fn close(&self) {
        let mut st = self.state();
        st.closed = true;
        st.generation += 1;
        st.store.clear();
        info!("Session closed");
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }
}
