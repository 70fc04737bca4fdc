use embedsync_core::{CanonicalPost, Provider, RawFeedEntry};
use tracing::debug;

/// Maps feed entries to canonical posts, keeping only entries that embed a
/// non-empty URL from a recognised provider. Order is preserved.
pub fn normalize(entries: Vec<RawFeedEntry>) -> Vec<CanonicalPost> {
    entries.into_iter().filter_map(normalize_entry).collect()
}

fn normalize_entry(entry: RawFeedEntry) -> Option<CanonicalPost> {
    let attributes = entry.attributes;
    let Some(embed) = attributes.embed else {
        debug!("Skipping feed entry without embed: {:?}", attributes.title);
        return None;
    };

    let link = embed.url.filter(|url| !url.trim().is_empty())?;
    let provider = match embed.provider.as_deref().and_then(Provider::from_name) {
        Some(provider) => provider,
        None => {
            debug!(
                "Skipping {} from unrecognised provider {:?}",
                link, embed.provider
            );
            return None;
        }
    };

    let title = embed
        .subject
        .filter(|subject| !subject.is_empty())
        .or(attributes.title)
        .unwrap_or_default();

    Some(CanonicalPost {
        link,
        provider_name: Some(provider.as_str().to_string()),
        resource_id: None,
        title,
        description: embed.description,
        post_type: attributes.post_type,
        publish_time: None,
        last_sync_time: None,
    })
}
