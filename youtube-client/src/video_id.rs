use once_cell::sync::Lazy;
use regex::Regex;

// Accepts youtu.be short links plus the watch, embed, v, live, shorts and
// user/<name> forms of youtube.com.
static VIDEO_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r".*youtu\.?be(?:\.com)?/.*?(?:live/|v/|shorts/|user/.*/|embed/|watch\?.*&?v=)?([^#&?\s]*).*",
    )
    .expect("video id pattern is valid")
});

/// Extracts the video id from a YouTube link. Returns `None` when the link is
/// not a YouTube URL or carries no id.
pub fn extract_video_id(link: &str) -> Option<String> {
    VIDEO_ID_PATTERN
        .captures(link)
        .and_then(|captures| captures.get(1))
        .map(|id| id.as_str())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_link() {
        assert_eq!(
            extract_video_id("https://youtu.be/abc123XYZ_"),
            Some("abc123XYZ_".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtu.be/abc123XYZ_?si=share"),
            Some("abc123XYZ_".to_string())
        );
    }

    #[test]
    fn test_watch_links() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=42"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_path_forms() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ?rel=0"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/live/Live_Id-1?si=x"),
            Some("Live_Id-1".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtube.com/v/dQw4w9WgXcQ#t=3"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtube.com/shorts/Short123"),
            Some("Short123".to_string())
        );
    }

    #[test]
    fn test_non_youtube_links() {
        assert_eq!(extract_video_id("https://vimeo.com/123456"), None);
        assert_eq!(extract_video_id("https://www.bitchute.com/video/abc/"), None);
        assert_eq!(extract_video_id(""), None);
    }

    #[test]
    fn test_link_without_id() {
        assert_eq!(extract_video_id("https://youtu.be/"), None);
        assert_eq!(extract_video_id("https://www.youtube.com/watch?v="), None);
    }
}
