//! Structural URL checks for backend-supplied source links.
//!
//! These only reject links that cannot point at a single piece of content
//! (profile pages, homepages, foreign hosts). Nothing is fetched.

use crate::model::{ContentType, Platform};
use reqwest::Url;

const YOUTUBE_HOSTS: &[&str] = &["youtube.com", "youtu.be"];
const INSTAGRAM_HOSTS: &[&str] = &["instagram.com"];
const TIKTOK_HOSTS: &[&str] = &["tiktok.com"];
const LINKEDIN_HOSTS: &[&str] = &["linkedin.com"];
const TWITTER_HOSTS: &[&str] = &["twitter.com", "x.com"];

/// Returns true when `url` has the shape of a content link on `platform`.
pub fn is_valid(url: &str, platform: Platform, content_type: ContentType) -> bool {
    let Some((host, path)) = host_and_path(url) else {
        return false;
    };

    match platform {
        Platform::YouTube | Platform::YouTubeShorts => {
            if !host_matches(&host, YOUTUBE_HOSTS) {
                return false;
            }
            path.contains("/shorts/")
                || path.contains("/watch")
                || (host_matches(&host, &["youtu.be"]) && path.len() > 2)
        }
        Platform::Instagram => {
            host_matches(&host, INSTAGRAM_HOSTS) && (path.contains("/reel/") || path.contains("/p/"))
        }
        Platform::TikTok => {
            host_matches(&host, TIKTOK_HOSTS)
                && (path.contains("/video/")
                    || (content_type == ContentType::Image && path.contains("/photo/")))
        }
        Platform::LinkedIn => host_matches(&host, LINKEDIN_HOSTS),
        Platform::Twitter => host_matches(&host, TWITTER_HOSTS),
    }
}

/// Like [`is_valid`] but takes the platform name as the backend reported it.
/// Names that do not map to a known platform are accepted as long as the
/// URL itself parses.
pub fn is_valid_named(url: &str, platform: &str, content_type: ContentType) -> bool {
    match Platform::parse(platform) {
        Some(p) => is_valid(url, p, content_type),
        None => host_and_path(url).is_some(),
    }
}

fn host_and_path(url: &str) -> Option<(String, String)> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return None;
    }
    let parsed = Url::parse(trimmed).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    let host = parsed.host_str()?.trim_end_matches('.').to_ascii_lowercase();
    if host.is_empty() {
        return None;
    }
    Some((host, parsed.path().to_string()))
}

/// Whole-label domain match: `m.youtube.com` matches `youtube.com`,
/// `notyoutube.com` does not.
fn host_matches(host: &str, domains: &[&str]) -> bool {
    domains.iter().any(|d| {
        host == *d
            || host
                .strip_suffix(d)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}
