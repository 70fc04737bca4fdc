//! Seams between the ingestion stages and the outside world.
//!
//! Each external system the pipeline touches sits behind one of these traits,
//! so the driver can be exercised end to end against in-memory doubles.

use crate::error::CoreError;
use crate::types::{CanonicalPost, ExistingPost, FeedPage, SessionToken, VideoMetadata};

/// Produces an authenticated feed session for the run.
pub trait SessionProvider {
    async fn acquire_session(&self) -> Result<SessionToken, CoreError>;
}

/// Retrieves one page of the feed.
pub trait FeedSource {
    /// Cursor of the first page.
    fn first_cursor(&self) -> String;

    async fn fetch_page(
        &self,
        cursor: &str,
        session: &SessionToken,
    ) -> Result<FeedPage, CoreError>;
}

/// Looks up canonical metadata for a batch of video ids in one request.
pub trait MetadataFetcher {
    /// Pulls the resource id out of a video-host link, if it has one.
    fn resource_id(&self, link: &str) -> Option<String>;

    async fn fetch_videos(&self, ids: &[String]) -> Result<Vec<VideoMetadata>, CoreError>;
}

/// Outcome of a single liveness probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    /// The resource answered with a 2xx status.
    Alive,
    /// The resource answered, but not with a 2xx status.
    Dead { status: u16 },
    /// The probe never got a response.
    Unreachable { reason: String },
}

pub trait LinkChecker {
    async fn check(&self, link: &str) -> LinkStatus;
}

/// The durable post table.
pub trait PostStore {
    /// Rows whose link matches any candidate link, or whose provider and video
    /// id match any candidate pair. One round trip.
    async fn find_existing(&self, posts: &[CanonicalPost])
        -> Result<Vec<ExistingPost>, CoreError>;

    /// Inserts every post in one statement and returns the number written.
    async fn insert_posts(&self, posts: &[CanonicalPost]) -> Result<u64, CoreError>;
}
