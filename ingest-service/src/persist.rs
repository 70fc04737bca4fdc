use embedsync_core::{CanonicalPost, CoreError, PostStore};

/// Writes the surviving posts in one batch. An empty batch never reaches the
/// store.
pub async fn persist<S: PostStore>(store: &S, posts: &[CanonicalPost]) -> Result<u64, CoreError> {
    if posts.is_empty() {
        return Ok(0);
    }
    store.insert_posts(posts).await
}
