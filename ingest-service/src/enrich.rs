use chrono::{DateTime, SecondsFormat, Utc};
use embedsync_core::{CanonicalPost, MetadataFetcher, VideoMetadata};
use std::collections::{HashMap, HashSet};
use tracing::{debug, error, info, warn};

/// Overwrites the descriptive fields of video-host posts with the host's
/// canonical metadata. Best effort: a failed fetch leaves every post as it was.
/// Returns the number of posts enriched.
pub async fn enrich<M: MetadataFetcher>(fetcher: &M, posts: &mut [CanonicalPost]) -> usize {
    enrich_at(fetcher, posts, Utc::now()).await
}

pub async fn enrich_at<M: MetadataFetcher>(
    fetcher: &M,
    posts: &mut [CanonicalPost],
    now: DateTime<Utc>,
) -> usize {
    let mut batch = Vec::new();
    for (index, post) in posts.iter_mut().enumerate() {
        if !post.is_video_host() {
            continue;
        }
        match fetcher.resource_id(&post.link) {
            Some(id) => {
                post.resource_id = Some(id);
                batch.push(index);
            }
            None => warn!("Could not extract a video id from {}", post.link),
        }
    }

    if batch.is_empty() {
        return 0;
    }

    let ids = distinct_ids(posts, &batch);
    let videos = match fetcher.fetch_videos(&ids).await {
        Ok(videos) => videos,
        Err(e) => {
            error!(
                "Enrichment failed for video id(s) {}: {}",
                ids.join(","),
                e
            );
            return 0;
        }
    };

    let synced_at = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    let matches = correlate(posts, &batch, &videos);
    for (index, video) in &matches {
        apply(&mut posts[*index], video, &synced_at);
    }

    info!("Enriched {} of {} video post(s)", matches.len(), batch.len());
    matches.len()
}

fn distinct_ids(posts: &[CanonicalPost], batch: &[usize]) -> Vec<String> {
    let mut seen = HashSet::new();
    batch
        .iter()
        .filter_map(|&index| posts[index].resource_id.clone())
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Pairs posts with fetched videos. Index order is used when the counts agree
/// and every pair carries the same id; otherwise results are matched by id.
fn correlate<'v>(
    posts: &[CanonicalPost],
    batch: &[usize],
    videos: &'v [VideoMetadata],
) -> Vec<(usize, &'v VideoMetadata)> {
    if videos.len() == batch.len() {
        let positional: Vec<_> = batch.iter().copied().zip(videos.iter()).collect();
        let aligned = positional.iter().all(|(index, video)| {
            posts[*index].resource_id.as_deref() == Some(video.resource_id.as_str())
        });
        if aligned {
            return positional;
        }
        debug!("Video listing order differs from the request; matching by id");
    }

    let by_id: HashMap<&str, &VideoMetadata> = videos
        .iter()
        .map(|video| (video.resource_id.as_str(), video))
        .collect();

    batch
        .iter()
        .filter_map(|&index| {
            let id = posts[index].resource_id.as_deref()?;
            by_id.get(id).map(|video| (index, *video))
        })
        .collect()
}

fn apply(post: &mut CanonicalPost, video: &VideoMetadata, synced_at: &str) {
    post.title = video.title.clone();
    post.description = Some(video.description.clone());
    post.publish_time = Some(video.publish_time.clone());
    post.last_sync_time = Some(synced_at.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use embedsync_core::{CoreError, PostType, VideoApiError};
    use std::sync::Mutex;

    struct FakeFetcher {
        response: Result<Vec<VideoMetadata>, VideoApiError>,
        requests: Mutex<Vec<Vec<String>>>,
    }

    impl FakeFetcher {
        fn returning(videos: Vec<VideoMetadata>) -> Self {
            Self {
                response: Ok(videos),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing(error: VideoApiError) -> Self {
            Self {
                response: Err(error),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<Vec<String>> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl MetadataFetcher for FakeFetcher {
        fn resource_id(&self, link: &str) -> Option<String> {
            link.strip_prefix("https://youtu.be/")
                .filter(|id| !id.is_empty())
                .map(str::to_string)
        }

        async fn fetch_videos(&self, ids: &[String]) -> Result<Vec<VideoMetadata>, CoreError> {
            self.requests.lock().unwrap().push(ids.to_vec());
            self.response.clone().map_err(CoreError::from)
        }
    }

    fn post(link: &str, provider: &str, title: &str) -> CanonicalPost {
        CanonicalPost {
            link: link.to_string(),
            provider_name: Some(provider.to_string()),
            resource_id: None,
            title: title.to_string(),
            description: Some("feed description".to_string()),
            post_type: PostType::VideoEmbed,
            publish_time: None,
            last_sync_time: None,
        }
    }

    fn video(id: &str, title: &str) -> VideoMetadata {
        VideoMetadata {
            resource_id: id.to_string(),
            title: title.to_string(),
            description: format!("{} description", title),
            publish_time: "2023-04-01T12:00:00Z".to_string(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap()
    }

    #[tokio::test]
    async fn test_video_posts_take_canonical_metadata() {
        let fetcher = FakeFetcher::returning(vec![video("abc123XYZ_", "Canonical")]);
        let mut posts = vec![
            post("https://youtu.be/abc123XYZ_", "YouTube", "Feed title"),
            post("https://vimeo.com/1", "Vimeo", "Vimeo title"),
        ];

        let enriched = enrich_at(&fetcher, &mut posts, now()).await;

        assert_eq!(enriched, 1);
        assert_eq!(fetcher.requests(), vec![vec!["abc123XYZ_".to_string()]]);
        assert_eq!(posts[0].resource_id.as_deref(), Some("abc123XYZ_"));
        assert_eq!(posts[0].title, "Canonical");
        assert_eq!(posts[0].description.as_deref(), Some("Canonical description"));
        assert_eq!(posts[0].publish_time.as_deref(), Some("2023-04-01T12:00:00Z"));
        assert_eq!(
            posts[0].last_sync_time.as_deref(),
            Some("2024-05-06T07:08:09.000Z")
        );

        assert_eq!(posts[1].title, "Vimeo title");
        assert_eq!(posts[1].resource_id, None);
        assert_eq!(posts[1].last_sync_time, None);
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_posts_untouched() {
        let fetcher = FakeFetcher::failing(VideoApiError::VideosNotFound {
            ids: "gone".to_string(),
        });
        let mut posts = vec![post("https://youtu.be/gone", "YouTube", "Feed title")];
        let before = posts[0].clone();

        let enriched = enrich_at(&fetcher, &mut posts, now()).await;

        assert_eq!(enriched, 0);
        assert_eq!(posts[0].title, before.title);
        assert_eq!(posts[0].description, before.description);
        assert_eq!(posts[0].last_sync_time, None);
        assert_eq!(posts[0].resource_id.as_deref(), Some("gone"));
    }

    #[tokio::test]
    async fn test_unextractable_links_are_left_out_of_the_batch() {
        let fetcher = FakeFetcher::returning(vec![video("ok", "Canonical")]);
        let mut posts = vec![
            post("https://www.youtube.com/channel/x", "YouTube", "Channel"),
            post("https://youtu.be/ok", "YouTube", "Feed"),
        ];

        enrich_at(&fetcher, &mut posts, now()).await;

        assert_eq!(fetcher.requests(), vec![vec!["ok".to_string()]]);
        assert_eq!(posts[0].title, "Channel");
        assert_eq!(posts[0].resource_id, None);
        assert_eq!(posts[1].title, "Canonical");
    }

    #[tokio::test]
    async fn test_no_video_posts_means_no_request() {
        let fetcher = FakeFetcher::returning(Vec::new());
        let mut posts = vec![post("https://vimeo.com/1", "Vimeo", "Vimeo title")];

        assert_eq!(enrich_at(&fetcher, &mut posts, now()).await, 0);
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn test_reordered_listing_is_matched_by_id() {
        let fetcher = FakeFetcher::returning(vec![video("b", "Video B"), video("a", "Video A")]);
        let mut posts = vec![
            post("https://youtu.be/a", "YouTube", "feed a"),
            post("https://youtu.be/b", "YouTube", "feed b"),
        ];

        assert_eq!(enrich_at(&fetcher, &mut posts, now()).await, 2);
        assert_eq!(posts[0].title, "Video A");
        assert_eq!(posts[1].title, "Video B");
    }

    #[tokio::test]
    async fn test_repeated_video_enriches_every_post_with_one_id() {
        let fetcher = FakeFetcher::returning(vec![video("a", "Video A")]);
        let mut posts = vec![
            post("https://youtu.be/a", "YouTube", "first"),
            post("https://youtu.be/a", "YouTube", "second"),
        ];

        assert_eq!(enrich_at(&fetcher, &mut posts, now()).await, 2);
        assert_eq!(fetcher.requests(), vec![vec!["a".to_string()]]);
        assert!(posts.iter().all(|p| p.title == "Video A"));
    }

    #[tokio::test]
    async fn test_enrichment_is_idempotent() {
        let fetcher = FakeFetcher::returning(vec![video("a", "Video A")]);
        let mut posts = vec![post("https://youtu.be/a", "YouTube", "feed a")];

        enrich_at(&fetcher, &mut posts, now()).await;
        let first = posts[0].clone();

        let later = now() + chrono::Duration::minutes(5);
        enrich_at(&fetcher, &mut posts, later).await;

        assert_eq!(posts[0].title, first.title);
        assert_eq!(posts[0].description, first.description);
        assert_eq!(posts[0].publish_time, first.publish_time);
        assert_eq!(posts[0].resource_id, first.resource_id);
        assert_eq!(
            posts[0].last_sync_time.as_deref(),
            Some("2024-05-06T07:13:09.000Z")
        );
    }
}
