use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

// --- Provider response envelope ---

/// Top-level search response: `{ "collection": { "items": [...] } }`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub collection: Collection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Collection {
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

/// One hit. The provider wraps metadata in a one-element `data` array and
/// asset links in a separate `links` array.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchItem {
    #[serde(default)]
    pub data: Vec<ItemData>,
    #[serde(default)]
    pub links: Vec<AssetLink>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemData {
    #[serde(alias = "nasa_id")]
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub date_created: Option<String>,
    /// Agency or center that published the asset.
    pub center: Option<String>,
    pub media_type: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetLink {
    pub href: Option<String>,
    pub rel: Option<String>,
    pub render: Option<String>,
}

// --- Flattened record ---

/// A provider hit with its metadata and preview link pulled together.
/// Every field is optional; callers decide on fallbacks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaRecord {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub source: Option<String>,
    pub media_url: Option<String>,
    pub keywords: Vec<String>,
}

impl SearchItem {
    /// Flatten the first metadata block and the preview link.
    pub fn into_record(self) -> MediaRecord {
        let media_url = preview_href(&self.links);
        let data = self.data.into_iter().next().unwrap_or_default();
        MediaRecord {
            id: non_blank(data.id),
            title: non_blank(data.title),
            description: non_blank(data.description),
            created_at: data.date_created.as_deref().and_then(parse_date),
            source: non_blank(data.center),
            media_url,
            keywords: data
                .keywords
                .into_iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }
}

/// Prefer the link marked as preview, otherwise the first link with an href.
fn preview_href(links: &[AssetLink]) -> Option<String> {
    links
        .iter()
        .find(|l| l.rel.as_deref() == Some("preview"))
        .or_else(|| links.iter().find(|l| l.href.is_some()))
        .and_then(|l| non_blank(l.href.clone()))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
