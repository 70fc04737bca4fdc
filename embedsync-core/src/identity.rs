use std::fmt;

/// Deduplication key for a post.
///
/// A post is identified by its hosted resource when both the provider and the
/// resource id are known, and by its raw link otherwise. The same key is built
/// for in-memory candidates and for rows read back from the store, so the two
/// compare directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    Resource {
        provider: String,
        resource_id: String,
    },
    Link(String),
}

impl IdentityKey {
    pub fn new(link: &str, provider: Option<&str>, resource_id: Option<&str>) -> Self {
        match (provider, resource_id) {
            (Some(provider), Some(resource_id))
                if !provider.is_empty() && !resource_id.is_empty() =>
            {
                IdentityKey::Resource {
                    provider: provider.to_string(),
                    resource_id: resource_id.to_string(),
                }
            }
            _ => IdentityKey::Link(link.to_string()),
        }
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKey::Resource {
                provider,
                resource_id,
            } => write!(f, "{},{}", provider, resource_id),
            IdentityKey::Link(link) => f.write_str(link),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_resource_key_when_both_parts_known() {
        let key = IdentityKey::new("https://youtu.be/abc", Some("YouTube"), Some("abc"));
        assert_eq!(
            key,
            IdentityKey::Resource {
                provider: "YouTube".to_string(),
                resource_id: "abc".to_string(),
            }
        );
        assert_eq!(key.to_string(), "YouTube,abc");
    }

    #[test]
    fn test_link_key_when_resource_unknown() {
        assert_eq!(
            IdentityKey::new("https://vimeo.com/1", Some("Vimeo"), None),
            IdentityKey::Link("https://vimeo.com/1".to_string())
        );
        assert_eq!(
            IdentityKey::new("https://youtu.be/", Some("YouTube"), Some("")),
            IdentityKey::Link("https://youtu.be/".to_string())
        );
    }

    #[test]
    fn test_different_links_same_resource_collide() {
        let short = IdentityKey::new("https://youtu.be/abc", Some("YouTube"), Some("abc"));
        let long = IdentityKey::new(
            "https://www.youtube.com/watch?v=abc",
            Some("YouTube"),
            Some("abc"),
        );

        let mut seen = HashSet::new();
        assert!(seen.insert(short));
        assert!(!seen.insert(long));
    }
}
