use chrono::{DateTime, Utc};

use skyfeed_common::{ContentItem, ViewerState};

/// Partition label for items that did not come from a search.
pub const FALLBACK_PARTITION: &str = "featured";

// (id, title, description, unix seconds, tags)
const FEATURED: &[(&str, &str, &str, i64, &[&str])] = &[
    (
        "featured-pillars-of-creation",
        "Pillars of Creation",
        "Towers of cold gas and dust in the Eagle Nebula.",
        1_666_656_000,
        &["nebula", "james webb"],
    ),
    (
        "featured-earthrise",
        "Earthrise",
        "Earth rising over the lunar horizon, photographed from lunar orbit.",
        -32_745_600,
        &["moon", "earth", "apollo"],
    ),
    (
        "featured-blue-marble",
        "The Blue Marble",
        "Full view of Earth taken on the way to the Moon.",
        92_188_800,
        &["earth", "apollo"],
    ),
];

/// Small built-in set shown when the very first cycle of a session fails entirely.
pub fn featured_items(media_url: &str) -> Vec<ContentItem> {
    FEATURED
        .iter()
        .map(|(id, title, description, secs, tags)| ContentItem {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            media_url: media_url.to_string(),
            created_at: DateTime::<Utc>::from_timestamp(*secs, 0).unwrap_or_default(),
            source_partition: FALLBACK_PARTITION.to_string(),
            source: "NASA".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            engagement_count: 0,
            view_count: 0,
            viewer_state: ViewerState::default(),
            enriched: false,
        })
        .collect()
}
