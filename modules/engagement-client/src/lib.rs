pub mod error;
pub mod types;

pub use error::{EngagementError, Result};
pub use types::EngagementRecord;

use std::collections::HashMap;
use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Serialize;
use types::{ItemRef, LikeCreated, LookupRequest, LookupResponse, ViewerResponse};

pub struct EngagementClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl EngagementClient {
    pub fn new(base_url: &str, token: Option<&str>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        })
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        match self.token {
            Some(ref token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Identity of the signed-in viewer, or `None` for anonymous sessions.
    pub async fn viewer(&self) -> Result<Option<String>> {
        let url = format!("{}/viewer", self.base_url);
        let resp = self.authed(self.client.get(&url)).send().await?;
        if matches!(
            resp.status(),
            StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND
        ) {
            return Ok(None);
        }
        let resp = check(resp).await?;
        let body = resp.text().await?;
        let viewer: ViewerResponse = serde_json::from_str(&body)?;
        Ok(Some(viewer.id))
    }

    /// Like counts and viewer state for a set of items in a single round trip.
    pub async fn lookup(
        &self,
        viewer_id: &str,
        item_ids: &[String],
    ) -> Result<HashMap<String, EngagementRecord>> {
        if item_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let url = format!("{}/engagement/lookup", self.base_url);
        let body = LookupRequest { viewer_id, item_ids };
        let resp = self.authed(self.client.post(&url).json(&body)).send().await?;
        let resp = check(resp).await?;
        let text = resp.text().await?;
        let parsed: LookupResponse = serde_json::from_str(&text)?;
        tracing::debug!(
            requested = item_ids.len(),
            returned = parsed.records.len(),
            "Engagement lookup complete"
        );
        Ok(parsed.records)
    }

    /// Create a like record. Returns the record id used to delete it later.
    pub async fn create_like(&self, viewer_id: &str, item_id: &str) -> Result<String> {
        let url = format!("{}/likes", self.base_url);
        let body = ItemRef { viewer_id, item_id };
        let resp = self.authed(self.client.post(&url).json(&body)).send().await?;
        let resp = check(resp).await?;
        let text = resp.text().await?;
        let created: LikeCreated = serde_json::from_str(&text)?;
        Ok(created.id)
    }

    pub async fn delete_like(&self, record_id: &str) -> Result<()> {
        let url = format!("{}/likes/{}", self.base_url, record_id);
        let resp = self.authed(self.client.delete(&url)).send().await?;
        check(resp).await?;
        Ok(())
    }

    pub async fn set_bookmark(&self, viewer_id: &str, item_id: &str, on: bool) -> Result<()> {
        let url = format!("{}/bookmarks", self.base_url);
        let body = ItemRef { viewer_id, item_id };
        let req = if on {
            self.client.put(&url)
        } else {
            self.client.delete(&url)
        };
        let resp = self.authed(req.json(&body)).send().await?;
        check(resp).await?;
        Ok(())
    }

    /// Persist a composite "share to feed" record.
    pub async fn publish_share<T: Serialize + ?Sized>(&self, payload: &T) -> Result<()> {
        let url = format!("{}/feed/shares", self.base_url);
        let resp = self.authed(self.client.post(&url).json(payload)).send().await?;
        check(resp).await?;
        Ok(())
    }
}

async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return Err(EngagementError::Unauthorized(status.as_u16()));
    }
    if !status.is_success() {
        let message = resp.text().await.unwrap_or_default();
        return Err(EngagementError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(resp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> EngagementClient {
        EngagementClient::new(&server.uri(), Some("tok"), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn viewer_unauthorized_is_anonymous() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/viewer"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        assert_eq!(client(&server).viewer().await.unwrap(), None);
    }

    #[tokio::test]
    async fn viewer_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/viewer"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "u1" })))
            .mount(&server)
            .await;

        assert_eq!(client(&server).viewer().await.unwrap().as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn lookup_posts_all_ids_in_one_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/engagement/lookup"))
            .and(body_json(serde_json::json!({
                "viewer_id": "u1",
                "item_ids": ["a", "b"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "records": {
                    "a": { "like_count": 3, "viewer_liked": true, "like_record_id": "L1" },
                    "b": { "like_count": 0 }
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let ids = vec!["a".to_string(), "b".to_string()];
        let records = client(&server).lookup("u1", &ids).await.unwrap();
        assert_eq!(records["a"].like_count, 3);
        assert!(records["a"].viewer_liked);
        assert_eq!(records["a"].like_record_id.as_deref(), Some("L1"));
        assert!(!records["b"].viewer_liked);
    }

    #[tokio::test]
    async fn lookup_with_no_ids_skips_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let records = client(&server).lookup("u1", &[]).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn create_like_returns_record_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/likes"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({ "id": "L9" })))
            .mount(&server)
            .await;

        let id = client(&server).create_like("u1", "apod-1").await.unwrap();
        assert_eq!(id, "L9");
    }

    #[tokio::test]
    async fn write_failure_surfaces_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/bookmarks"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client(&server).set_bookmark("u1", "apod-1", true).await.unwrap_err();
        assert!(matches!(err, EngagementError::Api { status: 500, .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn rejected_token_on_write_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/likes"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = client(&server).create_like("u1", "apod-1").await.unwrap_err();
        assert!(matches!(err, EngagementError::Unauthorized(403)), "got {err:?}");
    }
}
