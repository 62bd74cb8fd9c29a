//! Reduces an untrusted candidate batch to accepted [`Post`]s.

use chrono::Utc;
use tracing::{debug, warn};

use crate::gemini::RawCandidate;
use crate::model::{ContentType, GenerationRequest, Metrics, Platform, Post, Source};
use crate::validate;

/// Why a candidate was left out. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    UnknownPlatform,
    PlatformNotRequested,
    InvalidLink,
    MissingText,
    MetricOutOfRange,
}

/// Keep the candidates that target a requested platform, carry a link of the
/// right shape and have every required text field. Input order is kept.
pub fn filter(raw: Vec<RawCandidate>, req: &GenerationRequest) -> Vec<Post> {
    filter_with_batch_id(raw, req, Utc::now().timestamp_millis())
}

/// Same as [`filter`] with an explicit batch prefix for ids
/// (`"{batch}-{index}"`).
pub fn filter_with_batch_id(raw: Vec<RawCandidate>, req: &GenerationRequest, batch: i64) -> Vec<Post> {
    let total = raw.len();
    let mut accepted = Vec::with_capacity(total);
    for (position, candidate) in raw.into_iter().enumerate() {
        let id = format!("{batch}-{}", accepted.len());
        match accept(candidate, req, id) {
            Ok(post) => accepted.push(post),
            Err(reason) => debug!(position, ?reason, "candidate dropped"),
        }
    }
    debug!(total, accepted = accepted.len(), "candidate batch filtered");
    accepted
}

/// Re-check posts that came from outside the filter (for example a JSON file
/// written by an earlier run). Posts whose link no longer passes the
/// validator for their platform are dropped.
pub fn retain_valid_posts(posts: Vec<Post>) -> Vec<Post> {
    let total = posts.len();
    let kept: Vec<Post> = posts
        .into_iter()
        .filter(|post| {
            let link = post.source.link.as_deref().unwrap_or_default();
            let ok = [ContentType::Video, ContentType::Image]
                .into_iter()
                .any(|ct| validate::is_valid(link, post.platform, ct));
            if !ok {
                warn!(id = %post.id, platform = %post.platform, link, "dropping post with an invalid source link");
            }
            ok
        })
        .collect();
    debug!(total, kept = kept.len(), "source posts re-validated");
    kept
}

fn required_text(value: Option<String>) -> Result<String, Rejection> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(Rejection::MissingText)
}

fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn accept(c: RawCandidate, req: &GenerationRequest, id: String) -> Result<Post, Rejection> {
    let platform = c
        .platform
        .as_deref()
        .and_then(Platform::parse)
        .ok_or(Rejection::UnknownPlatform)?;
    if !req.platforms.contains(&platform) {
        return Err(Rejection::PlatformNotRequested);
    }

    let link = c.source_link.as_deref().map(str::trim).unwrap_or_default();
    if !validate::is_valid(link, platform, req.content_type) {
        return Err(Rejection::InvalidLink);
    }
    let link = link.to_string();

    let title = required_text(c.title)?;
    let hook = required_text(c.hook)?;
    let description = required_text(c.content_description)?;

    let shares = match c.shares {
        None => 0,
        Some(v) if v.is_finite() && v >= 0.0 => v.round() as u64,
        Some(_) => return Err(Rejection::MetricOutOfRange),
    };
    let engagement_score = match c.engagement_score {
        None => 0,
        Some(v) if v.is_finite() && (0.0..=100.0).contains(&v) => v.round() as u8,
        Some(_) => return Err(Rejection::MetricOutOfRange),
    };
    let days_active = match c.days_active {
        Some(v) if v.is_finite() && v >= 0.0 => Some(v.round() as u32),
        _ => None,
    };

    Ok(Post {
        id,
        title,
        industry: optional_text(c.industry).unwrap_or_else(|| req.topic.clone()),
        region: optional_text(c.region).unwrap_or_else(|| req.region.clone()),
        language: optional_text(c.language),
        hook,
        description,
        psychological_trigger: optional_text(c.psychological_trigger),
        platform,
        days_active,
        metrics: Metrics {
            shares,
            engagement_score,
            reach: optional_text(c.estimated_reach).unwrap_or_default(),
        },
        tags: c
            .tags
            .unwrap_or_default()
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        source: Source {
            handle: optional_text(c.source_handle),
            follower_count: optional_text(c.source_followers),
            link: Some(link),
        },
        saved: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DatePeriod;
    use std::collections::{BTreeSet, HashSet};

    fn request(platforms: &[Platform]) -> GenerationRequest {
        GenerationRequest {
            topic: "Fitness".into(),
            region: "Global".into(),
            language: "English".into(),
            min_threshold: 10_000,
            platforms: platforms.iter().copied().collect::<BTreeSet<_>>(),
            content_type: ContentType::Video,
            period: DatePeriod::Last7d,
        }
    }

    fn candidate(title: &str, platform: &str, link: &str) -> RawCandidate {
        RawCandidate {
            title: Some(title.into()),
            platform: Some(platform.into()),
            hook: Some("hook".into()),
            content_description: Some("desc".into()),
            shares: Some(12_000.0),
            engagement_score: Some(91.0),
            estimated_reach: Some("2M".into()),
            tags: Some(vec!["a".into(), " ".into(), "b".into()]),
            source_link: Some(link.into()),
            ..Default::default()
        }
    }

    #[test]
    fn keeps_only_requested_platforms() {
        let raw = vec![
            candidate("t", "TikTok", "https://tiktok.com/@x/video/1"),
            candidate("i", "Instagram", "https://instagram.com/reel/abc"),
            candidate("y", "YouTube", "https://youtube.com/shorts/abc"),
        ];
        let posts = filter(raw, &request(&[Platform::TikTok, Platform::YouTube]));
        assert_eq!(posts.len(), 2);
        assert!(posts.iter().all(|p| p.platform != Platform::Instagram));
    }

    #[test]
    fn preserves_order_and_assigns_distinct_ids() {
        let raw = (0..5)
            .map(|i| candidate(&format!("post-{i}"), "TikTok", &format!("https://tiktok.com/@x/video/{i}")))
            .collect();
        let posts = filter_with_batch_id(raw, &request(&[Platform::TikTok]), 42);
        let titles: Vec<_> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["post-0", "post-1", "post-2", "post-3", "post-4"]);
        let ids: HashSet<_> = posts.iter().map(|p| p.id.clone()).collect();
        assert_eq!(ids.len(), 5);
        assert_eq!(posts[0].id, "42-0");
        assert!(posts.iter().all(|p| !p.saved));
    }

    #[test]
    fn order_is_stable_around_dropped_items() {
        let raw = vec![
            candidate("a", "TikTok", "https://tiktok.com/@x/video/1"),
            candidate("bad", "TikTok", "https://tiktok.com/@x"),
            candidate("b", "TikTok", "https://tiktok.com/@x/video/2"),
        ];
        let posts = filter_with_batch_id(raw, &request(&[Platform::TikTok]), 7);
        assert_eq!(posts.iter().map(|p| p.title.as_str()).collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(posts[1].id, "7-1");
    }

    #[test]
    fn drops_missing_link_and_unknown_platform() {
        let mut no_link = candidate("a", "TikTok", "");
        no_link.source_link = None;
        let raw = vec![no_link, candidate("b", "Snapchat", "https://snapchat.com/x")];
        assert!(filter(raw, &request(&[Platform::TikTok])).is_empty());
    }

    #[test]
    fn drops_incomplete_text() {
        let mut blank_hook = candidate("a", "TikTok", "https://tiktok.com/@x/video/1");
        blank_hook.hook = Some("   ".into());
        let mut no_title = candidate("b", "TikTok", "https://tiktok.com/@x/video/2");
        no_title.title = None;
        assert!(filter(vec![blank_hook, no_title], &request(&[Platform::TikTok])).is_empty());
    }

    #[test]
    fn rejects_out_of_range_metrics() {
        let mut high = candidate("a", "TikTok", "https://tiktok.com/@x/video/1");
        high.engagement_score = Some(140.0);
        let mut negative = candidate("b", "TikTok", "https://tiktok.com/@x/video/2");
        negative.shares = Some(-5.0);
        assert!(filter(vec![high, negative], &request(&[Platform::TikTok])).is_empty());
    }

    #[test]
    fn defaults_absent_optional_fields() {
        let mut sparse = candidate("a", "tiktok", "https://tiktok.com/@x/video/1");
        sparse.shares = None;
        sparse.engagement_score = None;
        sparse.estimated_reach = None;
        sparse.tags = None;
        let posts = filter(vec![sparse], &request(&[Platform::TikTok]));
        assert_eq!(posts.len(), 1);
        let p = &posts[0];
        assert_eq!(p.metrics.shares, 0);
        assert_eq!(p.metrics.engagement_score, 0);
        assert_eq!(p.metrics.reach, "");
        assert!(p.tags.is_empty());
        assert_eq!(p.industry, "Fitness");
        assert_eq!(p.source.link.as_deref(), Some("https://tiktok.com/@x/video/1"));
    }

    #[test]
    fn tags_keep_order_without_blanks() {
        let posts = filter(
            vec![candidate("a", "TikTok", "https://tiktok.com/@x/video/1")],
            &request(&[Platform::TikTok]),
        );
        assert_eq!(posts[0].tags, ["a", "b"]);
        assert_eq!(posts[0].metrics.engagement_score, 91);
        assert_eq!(posts[0].metrics.shares, 12_000);
    }

    #[test]
    fn retain_valid_posts_drops_bad_links() {
        let req = request(&[Platform::TikTok, Platform::Instagram]);
        let mut posts = filter_with_batch_id(
            vec![
                candidate("video", "TikTok", "https://tiktok.com/@x/video/1"),
                candidate("photo", "TikTok", "https://tiktok.com/@x/video/2"),
                candidate("reel", "Instagram", "https://instagram.com/reel/abc"),
            ],
            &req,
            1,
        );
        assert_eq!(posts.len(), 3);
        posts[1].source.link = Some("https://tiktok.com/@x/photo/2".into());
        posts[2].source.link = Some("https://instagram.com/someone".into());
        let mut unlinked = posts[0].clone();
        unlinked.id = "1-9".into();
        unlinked.source.link = None;
        posts.push(unlinked);

        let kept = retain_valid_posts(posts);
        let titles: Vec<_> = kept.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["video", "photo"]);
    }
}
