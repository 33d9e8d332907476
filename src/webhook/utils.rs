use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static VIDEO_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"https://(?:(?:www\.|m\.)?youtube\.com/(?:watch\?v=|shorts/)|youtu\.be/)[A-Za-z0-9_\-]+",
    )
    .expect("valid video url regex")
});

/// First supported video link in `text`, if any.
pub fn extract_video_url(text: &str) -> Option<String> {
    VIDEO_URL_REGEX
        .find_iter(text)
        .map(|m| m.as_str())
        .find(|candidate| Url::parse(candidate).is_ok())
        .map(str::to_string)
}
