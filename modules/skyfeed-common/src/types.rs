use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A query facet (topic keyword) used to slice the upstream search space.
pub type Partition = String;

/// Category sentinel that disables the category predicate.
pub const ALL_CATEGORIES: &str = "all";

// --- Content ---

/// One discoverable unit. `id` is the dedup key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Never empty; a fallback asset is substituted when the provider has none.
    pub media_url: String,
    pub created_at: DateTime<Utc>,
    /// Partition whose query first yielded this item.
    pub source_partition: Partition,
    /// Publishing agency or center.
    pub source: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub engagement_count: u64,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub viewer_state: ViewerState,
    /// Set once the engagement overlay has been applied in this session.
    #[serde(skip)]
    pub enriched: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerState {
    pub liked: bool,
    pub bookmarked: bool,
    pub like_record_id: Option<String>,
}

/// Like/bookmark state for one item, as returned by a batched lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    pub like_count: u64,
    pub viewer_liked: bool,
    pub like_record_id: Option<String>,
    pub bookmarked: bool,
}

// --- Ordering and filters ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

impl SortOrder {
    /// Compare two timestamps under this order.
    pub fn compare(self, a: &DateTime<Utc>, b: &DateTime<Utc>) -> Ordering {
        match self {
            SortOrder::NewestFirst => b.cmp(a),
            SortOrder::OldestFirst => a.cmp(b),
        }
    }

    /// Whether `items` is ordered under this order (non-strict).
    pub fn is_sorted(self, items: &[ContentItem]) -> bool {
        items
            .windows(2)
            .all(|w| self.compare(&w[0].created_at, &w[1].created_at) != Ordering::Greater)
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::NewestFirst => write!(f, "newest"),
            SortOrder::OldestFirst => write!(f, "oldest"),
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "newest" | "desc" | "newest_first" => Ok(SortOrder::NewestFirst),
            "oldest" | "asc" | "oldest_first" => Ok(SortOrder::OldestFirst),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// Session-level view settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewFilter {
    pub category: String,
    pub query: String,
    pub order: SortOrder,
}

impl Default for ViewFilter {
    fn default() -> Self {
        Self {
            category: ALL_CATEGORIES.to_string(),
            query: String::new(),
            order: SortOrder::default(),
        }
    }
}

// --- Session outputs ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub total_items: usize,
    pub total_engagement: u64,
    pub total_views: u64,
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "items={} engagement={} views={}",
            self.total_items, self.total_engagement, self.total_views
        )
    }
}

/// User-visible notification raised by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// Every partition in a cycle failed. `used_fallback` is set when the
    /// built-in item set was substituted.
    TotalFetchFailure { partitions: usize, used_fallback: bool },
    /// A like/bookmark write was rolled back.
    EngagementSyncFailure { item_id: String, message: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::TotalFetchFailure { .. } => {
                write!(f, "Could not load new images. Please try again later.")
            }
            Notice::EngagementSyncFailure { .. } => {
                write!(f, "Could not save your change. It has been undone.")
            }
        }
    }
}

/// Composite record handed to the data service when an item is shared to the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharePayload {
    pub viewer_id: String,
    pub item_id: String,
    pub title: String,
    pub description: String,
    pub media_url: String,
    pub caption: String,
    pub tags: Vec<String>,
    pub shared_at: DateTime<Utc>,
}
