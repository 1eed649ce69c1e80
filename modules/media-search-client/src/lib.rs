pub mod error;
pub mod types;

pub use error::{Result, SearchError};
pub use types::{parse_date, MediaRecord, SearchItem, SearchResponse};

use std::time::Duration;

/// Public image search endpoint.
pub const DEFAULT_BASE_URL: &str = "https://images-api.nasa.gov";

/// Results requested per query.
pub const DEFAULT_PAGE_SIZE: u32 = 15;

pub struct MediaSearchClient {
    client: reqwest::Client,
    base_url: String,
}

impl MediaSearchClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Search image assets for one query. Returns the first page only.
    pub async fn search_images(&self, query: &str, page_size: u32) -> Result<Vec<MediaRecord>> {
        let url = format!("{}/search", self.base_url);
        let page_size = page_size.to_string();
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("query", query),
                ("mediaType", "image"),
                ("page", "1"),
                ("pageSize", page_size.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SearchError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.text().await?;
        let parsed: SearchResponse = serde_json::from_str(&body)?;
        let records: Vec<MediaRecord> = parsed
            .collection
            .items
            .into_iter()
            .map(SearchItem::into_record)
            .collect();
        tracing::debug!(query, count = records.len(), "Fetched search results");

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> MediaSearchClient {
        MediaSearchClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn sends_expected_query_and_maps_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("query", "nebula"))
            .and(query_param("mediaType", "image"))
            .and(query_param("page", "1"))
            .and(query_param("pageSize", "15"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "collection": { "items": [
                    {
                        "data": [{
                            "nasa_id": "PIA001",
                            "title": "Crab Nebula",
                            "date_created": "2020-01-02T00:00:00Z",
                            "center": "JPL",
                            "keywords": ["nebula", "crab"]
                        }],
                        "links": [{ "href": "https://img/crab.jpg", "rel": "preview" }]
                    }
                ]}
            })))
            .mount(&server)
            .await;

        let records = client(&server).search_images("nebula", 15).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id.as_deref(), Some("PIA001"));
        assert_eq!(records[0].title.as_deref(), Some("Crab Nebula"));
        assert_eq!(records[0].media_url.as_deref(), Some("https://img/crab.jpg"));
        assert_eq!(records[0].keywords.len(), 2);
    }

    #[tokio::test]
    async fn non_success_status_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let err = client(&server).search_images("mars", 15).await.unwrap_err();
        match err {
            SearchError::Api { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "down");
            }
            other => panic!("Expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&server)
            .await;

        let err = client(&server).search_images("sun", 15).await.unwrap_err();
        assert!(matches!(err, SearchError::Parse(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn empty_collection_yields_no_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "collection": { "items": [] } })),
            )
            .mount(&server)
            .await;

        let records = client(&server).search_images("void", 15).await.unwrap();
        assert!(records.is_empty());
    }
}
