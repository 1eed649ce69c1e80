use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use media_search_client::MediaRecord;
use skyfeed_common::{ContentItem, Partition, ViewerState};

use crate::traits::SearchProvider;

pub const FALLBACK_TITLE: &str = "Untitled";
pub const FALLBACK_DESCRIPTION: &str = "No description available.";
pub const FALLBACK_SOURCE: &str = "NASA";

/// Result of one partition fetch. A failed fetch contributes no items.
#[derive(Debug, Clone)]
pub struct PartitionFetch {
    pub partition: Partition,
    pub items: Vec<ContentItem>,
    pub failure: Option<String>,
}

impl PartitionFetch {
    pub fn failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// Wraps a [`SearchProvider`] and turns every provider error into an empty
/// contribution, so one bad partition never aborts a cycle.
#[derive(Clone)]
pub struct UpstreamClient {
    provider: Arc<dyn SearchProvider>,
    page_size: u32,
    fallback_image_url: String,
}

impl UpstreamClient {
    pub fn new(provider: Arc<dyn SearchProvider>, page_size: u32, fallback_image_url: String) -> Self {
        Self {
            provider,
            page_size,
            fallback_image_url,
        }
    }

    pub async fn fetch(&self, partition: &str) -> PartitionFetch {
        match self.provider.search(partition, self.page_size).await {
            Ok(records) => {
                let today = start_of_today();
                let items: Vec<ContentItem> = records
                    .into_iter()
                    .filter_map(|r| to_content_item(r, partition, &self.fallback_image_url, today))
                    .collect();
                debug!(partition, count = items.len(), "Partition fetched");
                PartitionFetch {
                    partition: partition.to_string(),
                    items,
                    failure: None,
                }
            }
            Err(e) => {
                warn!(partition, error = %e, "Partition fetch failed, contributing nothing");
                PartitionFetch {
                    partition: partition.to_string(),
                    items: Vec::new(),
                    failure: Some(e.to_string()),
                }
            }
        }
    }
}

/// Map a provider record onto a fully populated [`ContentItem`].
///
/// Returns `None` only when the record has neither an id nor an asset link,
/// since there is nothing to deduplicate on.
pub fn to_content_item(
    record: MediaRecord,
    partition: &str,
    fallback_image_url: &str,
    today: DateTime<Utc>,
) -> Option<ContentItem> {
    let media_url = record
        .media_url
        .map(|u| u.trim().to_string())
        .filter(|u| is_usable_link(u));
    let id = match (record.id, media_url.as_ref()) {
        (Some(id), _) => id,
        (None, Some(url)) => url.clone(),
        (None, None) => {
            debug!(partition, "Dropping record with no id and no asset link");
            return None;
        }
    };

    Some(ContentItem {
        id,
        title: record.title.unwrap_or_else(|| FALLBACK_TITLE.to_string()),
        description: record
            .description
            .unwrap_or_else(|| FALLBACK_DESCRIPTION.to_string()),
        media_url: media_url.unwrap_or_else(|| fallback_image_url.to_string()),
        created_at: record.created_at.unwrap_or(today),
        source_partition: partition.to_string(),
        source: record.source.unwrap_or_else(|| FALLBACK_SOURCE.to_string()),
        tags: record.keywords,
        engagement_count: 0,
        view_count: 0,
        viewer_state: ViewerState::default(),
        enriched: false,
    })
}

fn is_usable_link(url: &str) -> bool {
    (url.starts_with("https://") || url.starts_with("http://")) && !url.contains(char::is_whitespace)
}

fn start_of_today() -> DateTime<Utc> {
    let now = Utc::now();
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{record, MockSearch};
    use chrono::TimeZone;

    const FALLBACK: &str = "https://fallback/img.jpg";

    fn today() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn missing_fields_get_fallbacks() {
        let item = to_content_item(
            MediaRecord {
                id: Some("apod-1".into()),
                ..Default::default()
            },
            "mars",
            FALLBACK,
            today(),
        )
        .unwrap();

        assert_eq!(item.title, FALLBACK_TITLE);
        assert_eq!(item.description, FALLBACK_DESCRIPTION);
        assert_eq!(item.media_url, FALLBACK);
        assert_eq!(item.created_at, today());
        assert_eq!(item.source, FALLBACK_SOURCE);
        assert_eq!(item.source_partition, "mars");
        assert!(!item.enriched);
    }

    #[test]
    fn broken_link_replaced() {
        let item = to_content_item(
            MediaRecord {
                id: Some("x".into()),
                media_url: Some("ftp://nope".into()),
                ..Default::default()
            },
            "sun",
            FALLBACK,
            today(),
        )
        .unwrap();
        assert_eq!(item.media_url, FALLBACK);
    }

    #[test]
    fn link_stands_in_for_missing_id() {
        let item = to_content_item(
            MediaRecord {
                media_url: Some("https://img/a.jpg".into()),
                ..Default::default()
            },
            "sun",
            FALLBACK,
            today(),
        )
        .unwrap();
        assert_eq!(item.id, "https://img/a.jpg");
    }

    #[test]
    fn record_without_id_or_link_is_dropped() {
        assert!(to_content_item(MediaRecord::default(), "sun", FALLBACK, today()).is_none());
    }

    #[tokio::test]
    async fn provider_error_becomes_empty_contribution() {
        let search = MockSearch::new().failing("mars");
        let client = UpstreamClient::new(Arc::new(search), 15, FALLBACK.into());

        let fetch = client.fetch("mars").await;
        assert!(fetch.failed());
        assert!(fetch.items.is_empty());
        assert_eq!(fetch.partition, "mars");
    }

    #[tokio::test]
    async fn successful_fetch_tags_partition() {
        let search = MockSearch::new().on_search(
            "galaxy",
            vec![record("g1", "Andromeda", "2020-01-01"), record("g2", "Sombrero", "2020-02-01")],
        );
        let client = UpstreamClient::new(Arc::new(search), 15, FALLBACK.into());

        let fetch = client.fetch("galaxy").await;
        assert!(!fetch.failed());
        assert_eq!(fetch.items.len(), 2);
        assert!(fetch.items.iter().all(|i| i.source_partition == "galaxy"));
    }
}
