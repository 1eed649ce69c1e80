use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct ViewerResponse {
    pub id: String,
}

/// Batched lookup body: one request for every id in a cycle.
#[derive(Debug, Clone, Serialize)]
pub struct LookupRequest<'a> {
    pub viewer_id: &'a str,
    pub item_ids: &'a [String],
}

#[derive(Debug, Clone, Deserialize)]
pub struct LookupResponse {
    #[serde(default)]
    pub records: HashMap<String, EngagementRecord>,
}

/// Like/bookmark state for one item as seen by one viewer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementRecord {
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub viewer_liked: bool,
    pub like_record_id: Option<String>,
    #[serde(default)]
    pub bookmarked: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemRef<'a> {
    pub viewer_id: &'a str,
    pub item_id: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LikeCreated {
    pub id: String,
}
