use embedsync_core::{
    CanonicalPost, CoreError, IdentityKey, LinkChecker, LinkStatus, PostStore, ProbeFailurePolicy,
};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct FilterOptions {
    /// Upper bound on liveness probes in flight. `None` probes the whole page
    /// at once.
    pub max_concurrent_probes: Option<usize>,
    pub probe_failure_policy: ProbeFailurePolicy,
}

/// Drops untitled posts, posts already stored or repeated within the batch,
/// and non-video-host posts whose link no longer resolves.
pub async fn filter<S, L>(
    store: &S,
    checker: &L,
    posts: Vec<CanonicalPost>,
    options: &FilterOptions,
) -> Result<Vec<CanonicalPost>, CoreError>
where
    S: PostStore,
    L: LinkChecker,
{
    let posts = title_guard(posts);
    let posts = collapse_duplicates(posts);
    if posts.is_empty() {
        return Ok(posts);
    }

    let existing = store.find_existing(&posts).await?;
    let mut known = KnownPosts::default();
    for row in &existing {
        known.insert(&row.import_link, row.identity_key());
    }

    let candidates: Vec<CanonicalPost> = posts
        .into_iter()
        .filter(|post| {
            let duplicate = known.contains(&post.link, &post.identity_key());
            if duplicate {
                debug!("Already imported: {}", post.identity_key());
            }
            !duplicate
        })
        .collect();

    Ok(check_liveness(checker, candidates, options).await)
}

fn title_guard(posts: Vec<CanonicalPost>) -> Vec<CanonicalPost> {
    let (titled, untitled): (Vec<_>, Vec<_>) = posts.into_iter().partition(|p| p.has_title());
    if !untitled.is_empty() {
        let links: Vec<&str> = untitled.iter().map(|p| p.link.as_str()).collect();
        warn!(
            "Dropping {} post(s) without a title: {}",
            untitled.len(),
            links.join(", ")
        );
    }
    titled
}

/// Keeps the first post for each link and identity key.
fn collapse_duplicates(posts: Vec<CanonicalPost>) -> Vec<CanonicalPost> {
    let mut seen = KnownPosts::default();
    posts
        .into_iter()
        .filter(|post| {
            let key = post.identity_key();
            if seen.contains(&post.link, &key) {
                debug!("Skipping repeated post {} within page", key);
                return false;
            }
            seen.insert(&post.link, key);
            true
        })
        .collect()
}

async fn check_liveness<L: LinkChecker>(
    checker: &L,
    posts: Vec<CanonicalPost>,
    options: &FilterOptions,
) -> Vec<CanonicalPost> {
    let limit = options
        .max_concurrent_probes
        .unwrap_or(posts.len())
        .max(1);
    let policy = options.probe_failure_policy;

    let verdicts: Vec<(CanonicalPost, bool)> = stream::iter(posts)
        .map(|post| async move {
            if post.is_video_host() {
                return (post, true);
            }
            let keep = match checker.check(&post.link).await {
                LinkStatus::Alive => true,
                LinkStatus::Dead { status } => {
                    info!("Dropping dead link {} (HTTP {})", post.link, status);
                    false
                }
                LinkStatus::Unreachable { reason } => match policy {
                    ProbeFailurePolicy::Drop => {
                        info!("Dropping unreachable link {}: {}", post.link, reason);
                        false
                    }
                    ProbeFailurePolicy::Keep => {
                        warn!("Keeping unverified link {}: {}", post.link, reason);
                        true
                    }
                },
            };
            (post, keep)
        })
        .buffered(limit)
        .collect()
        .await;

    verdicts
        .into_iter()
        .filter_map(|(post, keep)| keep.then_some(post))
        .collect()
}

/// Links and identity keys already claimed, by the store or earlier in the
/// batch. A post matches on either.
#[derive(Default)]
struct KnownPosts {
    links: HashSet<String>,
    keys: HashSet<IdentityKey>,
}

impl KnownPosts {
    fn insert(&mut self, link: &str, key: IdentityKey) {
        self.links.insert(link.to_string());
        self.keys.insert(key);
    }

    fn contains(&self, link: &str, key: &IdentityKey) -> bool {
        self.links.contains(link) || self.keys.contains(key)
    }
}
