pub mod video_id;

pub use video_id::extract_video_id;

use embedsync_core::{endpoint_url, CoreError, MetadataFetcher, VideoApiError, VideoMetadata};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, error, info};

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub total_results: u64,
    #[serde(default)]
    pub results_per_page: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    pub published_at: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoItem {
    pub id: String,
    #[serde(default)]
    pub snippet: Option<VideoSnippet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoListResponse {
    pub page_info: PageInfo,
    #[serde(default)]
    pub items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Client for the `videos` resource of the YouTube Data API.
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    http_client: Client,
    base_url: String,
    api_key: String,
}

impl YouTubeClient {
    pub fn new(
        endpoint: &str,
        api_key: String,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self::with_client(http_client, endpoint, api_key))
    }

    pub fn with_client(http_client: Client, endpoint: &str, api_key: String) -> Self {
        Self {
            http_client,
            base_url: endpoint_url(endpoint),
            api_key,
        }
    }

    /// Fetches snippets for `ids` in a single request. The response must
    /// account for every distinct id, otherwise the whole batch is rejected.
    pub async fn get_videos(&self, ids: &[String]) -> Result<Vec<VideoMetadata>, CoreError> {
        if ids.is_empty() {
            return Err(VideoApiError::NoIdsProvided.into());
        }

        let joined = ids.join(",");
        let url = format!("{}/videos", self.base_url);
        debug!("Requesting YouTube metadata for {}", joined);

        let response = self
            .http_client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .query(&[("part", "snippet"), ("id", joined.as_str())])
            .send()
            .await
            .map_err(|e| {
                error!("Network error for GET {}: {}", url, e);
                if e.is_timeout() {
                    CoreError::VideoApi(VideoApiError::RequestTimeout)
                } else {
                    CoreError::Network(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = api_error_message(status, &body);
            error!("YouTube request failed with status {}: {}", status, message);
            return Err(VideoApiError::RequestFailed { message }.into());
        }

        let listing: VideoListResponse = response.json().await.map_err(|e| {
            error!("Failed to parse YouTube video listing: {}", e);
            CoreError::VideoApi(VideoApiError::InvalidResponse {
                details: "Failed to parse video listing".to_string(),
            })
        })?;

        let videos = validate_listing(listing, ids)?;
        info!("Retrieved metadata for {} video(s)", videos.len());
        Ok(videos)
    }
}

impl MetadataFetcher for YouTubeClient {
    fn resource_id(&self, link: &str) -> Option<String> {
        extract_video_id(link)
    }

    async fn fetch_videos(&self, ids: &[String]) -> Result<Vec<VideoMetadata>, CoreError> {
        self.get_videos(ids).await
    }
}

/// Checks the listing against the requested ids and converts its items.
pub fn validate_listing(
    listing: VideoListResponse,
    ids: &[String],
) -> Result<Vec<VideoMetadata>, VideoApiError> {
    let joined = ids.join(",");
    let requested = ids.iter().collect::<HashSet<_>>().len();
    let found = listing.page_info.total_results;

    if found == 0 {
        return Err(VideoApiError::VideosNotFound { ids: joined });
    }
    if found != requested as u64 {
        return Err(VideoApiError::CountMismatch {
            found,
            requested,
            ids: joined,
        });
    }

    listing
        .items
        .into_iter()
        .map(|item| -> Result<VideoMetadata, VideoApiError> {
            let snippet = item
                .snippet
                .ok_or_else(|| VideoApiError::MissingSnippet {
                    id: item.id.clone(),
                })?;
            Ok(VideoMetadata {
                resource_id: item.id,
                title: snippet.title,
                description: snippet.description,
                publish_time: snippet.published_at,
            })
        })
        .collect()
}

fn api_error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|parsed| parsed.error.message)
        .unwrap_or_else(|_| format!("HTTP {}", status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn listing(value: serde_json::Value) -> VideoListResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_client_normalises_endpoint() {
        let client = YouTubeClient::new(
            "www.googleapis.com/youtube/v3/",
            "key".to_string(),
            Duration::from_secs(5),
            "embedsync-test/1.0",
        )
        .unwrap();
        assert_eq!(client.base_url, "https://www.googleapis.com/youtube/v3");
        assert_eq!(
            client.resource_id("https://youtu.be/abc123XYZ_"),
            Some("abc123XYZ_".to_string())
        );
    }

    #[test]
    fn test_single_video_listing() {
        let response = listing(json!({
            "kind": "youtube#videoListResponse",
            "pageInfo": { "totalResults": 1, "resultsPerPage": 1 },
            "items": [{
                "kind": "youtube#video",
                "id": "abc123XYZ_",
                "snippet": {
                    "publishedAt": "2023-04-01T12:00:00Z",
                    "title": "Canonical title",
                    "description": "Canonical description",
                    "channelTitle": "Creator"
                }
            }]
        }));

        let videos = validate_listing(response, &ids(&["abc123XYZ_"])).unwrap();
        assert_eq!(
            videos,
            vec![VideoMetadata {
                resource_id: "abc123XYZ_".to_string(),
                title: "Canonical title".to_string(),
                description: "Canonical description".to_string(),
                publish_time: "2023-04-01T12:00:00Z".to_string(),
            }]
        );
    }

    #[test]
    fn test_zero_results_is_not_found() {
        let response = listing(json!({
            "pageInfo": { "totalResults": 0, "resultsPerPage": 0 },
            "items": []
        }));

        let result = validate_listing(response, &ids(&["gone"]));
        assert!(matches!(result, Err(VideoApiError::VideosNotFound { ids }) if ids == "gone"));
    }

    #[test]
    fn test_count_mismatch_rejects_batch() {
        let response = listing(json!({
            "pageInfo": { "totalResults": 1 },
            "items": [{
                "id": "a",
                "snippet": { "publishedAt": "2023-01-01T00:00:00Z", "title": "A", "description": "" }
            }]
        }));

        let result = validate_listing(response, &ids(&["a", "b"]));
        match result {
            Err(VideoApiError::CountMismatch {
                found,
                requested,
                ids,
            }) => {
                assert_eq!(found, 1);
                assert_eq!(requested, 2);
                assert_eq!(ids, "a,b");
            }
            other => panic!("Expected CountMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_ids_count_once() {
        let response = listing(json!({
            "pageInfo": { "totalResults": 1 },
            "items": [{
                "id": "a",
                "snippet": { "publishedAt": "2023-01-01T00:00:00Z", "title": "A", "description": "" }
            }]
        }));

        assert!(validate_listing(response, &ids(&["a", "a"])).is_ok());
    }

    #[test]
    fn test_missing_snippet_is_invalid() {
        let response = listing(json!({
            "pageInfo": { "totalResults": 1 },
            "items": [{ "id": "a" }]
        }));

        let result = validate_listing(response, &ids(&["a"]));
        assert!(matches!(result, Err(VideoApiError::MissingSnippet { id }) if id == "a"));
    }

    #[test]
    fn test_api_error_message_extraction() {
        let body = r#"{"error":{"code":403,"message":"API key not valid.","errors":[]}}"#;
        assert_eq!(
            api_error_message(StatusCode::FORBIDDEN, body),
            "API key not valid."
        );
        assert_eq!(
            api_error_message(StatusCode::BAD_GATEWAY, "<html>"),
            "HTTP 502 Bad Gateway"
        );
    }

    #[tokio::test]
    async fn test_empty_id_list_fails_before_request() {
        let client = YouTubeClient::with_client(
            Client::new(),
            "127.0.0.1:9",
            "key".to_string(),
        );
        let result = client.get_videos(&[]).await;
        assert!(matches!(
            result,
            Err(CoreError::VideoApi(VideoApiError::NoIdsProvided))
        ));
    }
}
