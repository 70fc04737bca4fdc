use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::identity::IdentityKey;

/// Hosts whose embeds are mirrored. Anything else in a feed is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    YouTube,
    Vimeo,
    BitChute,
}

impl Provider {
    /// The host whose posts are enriched through the metadata API.
    pub const VIDEO_HOST: Provider = Provider::YouTube;

    pub const ALL: [Provider; 3] = [Provider::YouTube, Provider::Vimeo, Provider::BitChute];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::YouTube => "YouTube",
            Provider::Vimeo => "Vimeo",
            Provider::BitChute => "BitChute",
        }
    }

    /// Exact, case-sensitive match against the names the feed reports.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == name)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PostType {
    VideoEmbed,
    Livestream,
    Link,
    /// Any tag the feed sends that we do not model; stored verbatim.
    Other(String),
}

impl PostType {
    pub fn as_str(&self) -> &str {
        match self {
            PostType::VideoEmbed => "video_embed",
            PostType::Livestream => "livestream_youtube",
            PostType::Link => "link",
            PostType::Other(tag) => tag,
        }
    }
}

impl From<String> for PostType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "video_embed" => PostType::VideoEmbed,
            "livestream_youtube" => PostType::Livestream,
            "link" => PostType::Link,
            _ => PostType::Other(tag),
        }
    }
}

impl From<PostType> for String {
    fn from(post_type: PostType) -> Self {
        post_type.as_str().to_string()
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawEmbed {
    pub url: Option<String>,
    pub provider: Option<String>,
    pub subject: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPostAttributes {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub embed: Option<RawEmbed>,
    pub post_type: PostType,
}

/// A post exactly as the feed returned it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFeedEntry {
    pub attributes: RawPostAttributes,
}

/// One page of the feed plus the cursor of the page after it.
#[derive(Debug, Clone, Default)]
pub struct FeedPage {
    pub entries: Vec<RawFeedEntry>,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalPost {
    pub link: String,
    pub provider_name: Option<String>,
    pub resource_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub post_type: PostType,
    pub publish_time: Option<String>,
    pub last_sync_time: Option<String>,
}

impl CanonicalPost {
    pub fn is_video_host(&self) -> bool {
        self.provider_name.as_deref() == Some(Provider::VIDEO_HOST.as_str())
    }

    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }

    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey::new(
            &self.link,
            self.provider_name.as_deref(),
            self.resource_id.as_deref(),
        )
    }
}

/// Canonical descriptive fields of a hosted video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub resource_id: String,
    pub title: String,
    pub description: String,
    pub publish_time: String,
}

/// A row already present in the store, as returned by the duplicate query.
#[derive(Debug, Clone, PartialEq)]
pub struct ExistingPost {
    pub import_link: String,
    pub provider_name: Option<String>,
    pub video_id: Option<String>,
}

impl ExistingPost {
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey::new(
            &self.import_link,
            self.provider_name.as_deref(),
            self.video_id.as_deref(),
        )
    }
}

/// How long before expiry a cached session is considered stale.
pub const SESSION_FRESHNESS_WINDOW_MINUTES: i64 = 10;

/// An authenticated feed session, kept as the raw `Set-Cookie` value so it can
/// be cached and re-parsed on the next run.
#[derive(Clone, PartialEq)]
pub struct SessionToken {
    raw_cookie: String,
    expires_at: Option<DateTime<Utc>>,
}

impl SessionToken {
    pub fn from_cookie(raw_cookie: impl Into<String>) -> Self {
        let raw_cookie = raw_cookie.into();
        let expires_at = parse_cookie_expiry(&raw_cookie);
        Self {
            raw_cookie,
            expires_at,
        }
    }

    pub fn raw_cookie(&self) -> &str {
        &self.raw_cookie
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// The `name=value` pair to send in a `Cookie` request header.
    pub fn cookie_header(&self) -> &str {
        self.raw_cookie
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
    }

    /// True when the token has no known expiry or is inside the freshness
    /// window.
    pub fn needs_renewal(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                now >= expires_at - Duration::minutes(SESSION_FRESHNESS_WINDOW_MINUTES)
            }
            None => true,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now >= expires_at,
            None => true,
        }
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("raw_cookie", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

fn parse_cookie_expiry(raw_cookie: &str) -> Option<DateTime<Utc>> {
    let value = raw_cookie
        .split(';')
        .map(str::trim)
        .find_map(|attribute| {
            let (name, value) = attribute.split_once('=')?;
            name.trim()
                .eq_ignore_ascii_case("expires")
                .then(|| value.trim())
        })?;

    if let Ok(parsed) = DateTime::parse_from_rfc2822(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    // Netscape style: "Wed, 21-Oct-2026 07:28:00 GMT"
    NaiveDateTime::parse_from_str(value, "%a, %d-%b-%Y %H:%M:%S GMT")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn post(link: &str, provider: Option<&str>, resource_id: Option<&str>) -> CanonicalPost {
        CanonicalPost {
            link: link.to_string(),
            provider_name: provider.map(str::to_string),
            resource_id: resource_id.map(str::to_string),
            title: "Title".to_string(),
            description: None,
            post_type: PostType::VideoEmbed,
            publish_time: None,
            last_sync_time: None,
        }
    }

    #[test]
    fn test_provider_names_are_exact() {
        assert_eq!(Provider::from_name("YouTube"), Some(Provider::YouTube));
        assert_eq!(Provider::from_name("BitChute"), Some(Provider::BitChute));
        assert_eq!(Provider::from_name("youtube"), None);
        assert_eq!(Provider::from_name("Twitch"), None);
    }

    #[test]
    fn test_post_type_round_trips_unknown_tags() {
        let parsed: PostType = serde_json::from_str("\"image_file\"").unwrap();
        assert_eq!(parsed, PostType::Other("image_file".to_string()));
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"image_file\"");

        let parsed: PostType = serde_json::from_str("\"livestream_youtube\"").unwrap();
        assert_eq!(parsed, PostType::Livestream);
    }

    #[test]
    fn test_video_host_detection() {
        assert!(post("https://youtu.be/x", Some("YouTube"), None).is_video_host());
        assert!(!post("https://vimeo.com/1", Some("Vimeo"), None).is_video_host());
        assert!(!post("https://example.com", None, None).is_video_host());
    }

    #[test]
    fn test_session_token_parses_rfc1123_expiry() {
        let token = SessionToken::from_cookie(
            "session_id=abc123; Domain=patreon.com; Expires=Wed, 21 Oct 2026 07:28:00 GMT; HttpOnly",
        );
        assert_eq!(
            token.expires_at(),
            Some(Utc.with_ymd_and_hms(2026, 10, 21, 7, 28, 0).unwrap())
        );
        assert_eq!(token.cookie_header(), "session_id=abc123");
    }

    #[test]
    fn test_session_token_parses_dashed_expiry() {
        let token = SessionToken::from_cookie("session_id=abc; expires=Wed, 21-Oct-2026 07:28:00 GMT");
        assert_eq!(
            token.expires_at(),
            Some(Utc.with_ymd_and_hms(2026, 10, 21, 7, 28, 0).unwrap())
        );
    }

    #[test]
    fn test_session_token_freshness_window() {
        let token =
            SessionToken::from_cookie("session_id=abc; Expires=Wed, 21 Oct 2026 07:28:00 GMT");
        let well_before = Utc.with_ymd_and_hms(2026, 10, 21, 7, 0, 0).unwrap();
        let inside_window = Utc.with_ymd_and_hms(2026, 10, 21, 7, 20, 0).unwrap();
        let at_boundary = Utc.with_ymd_and_hms(2026, 10, 21, 7, 18, 0).unwrap();

        assert!(!token.needs_renewal(well_before));
        assert!(token.needs_renewal(inside_window));
        assert!(token.needs_renewal(at_boundary));
        assert!(!token.is_expired(inside_window));
    }

    #[test]
    fn test_session_token_without_expiry_is_stale() {
        let token = SessionToken::from_cookie("session_id=abc; Path=/");
        assert_eq!(token.expires_at(), None);
        assert!(token.needs_renewal(Utc::now()));
        assert!(token.is_expired(Utc::now()));
    }

    #[test]
    fn test_session_token_debug_redacts_cookie() {
        let token = SessionToken::from_cookie("session_id=secret-value");
        assert!(!format!("{:?}", token).contains("secret-value"));
    }
}
