mod common;

use common::{candidate, finished, pending, ScriptedBackend};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use viral_scout::error::{BackendError, PipelineError};
use viral_scout::gemini::{InlineImage, RawProfile};
use viral_scout::model::{
    AspectRatio, ContentType, DatePeriod, GenerationRequest, GenerationType, Metrics, Persona, PersonaSpec,
    Platform, Post, Source,
};
use viral_scout::pipeline::{Pipeline, PipelineSettings, ANALYSIS_EMPTY, ANALYSIS_UNAVAILABLE};
use viral_scout::poller::PollSettings;

fn settings(media_dir: &std::path::Path) -> PipelineSettings {
    PipelineSettings {
        candidate_count: 3,
        poll: PollSettings {
            interval: Duration::from_secs(5),
            max_polls: 10,
            max_wait: Duration::from_secs(300),
        },
        video_resolution: "720p".into(),
        media_dir: media_dir.to_path_buf(),
    }
}

fn pipeline(backend: &ScriptedBackend, media_dir: &std::path::Path) -> Pipeline {
    Pipeline::new(Arc::new(backend.clone()), settings(media_dir))
}

fn fitness_tiktok() -> GenerationRequest {
    GenerationRequest {
        topic: "Fitness".into(),
        region: "Global".into(),
        language: "English".into(),
        min_threshold: 10_000,
        platforms: BTreeSet::from([Platform::TikTok]),
        content_type: ContentType::Video,
        period: DatePeriod::Last7d,
    }
}

fn source_post() -> Post {
    Post {
        id: "1-0".into(),
        title: "Morning mobility".into(),
        industry: "Fitness".into(),
        region: "Global".into(),
        language: Some("English".into()),
        hook: "You stretch wrong".into(),
        description: "Three moves".into(),
        psychological_trigger: Some("Curiosity".into()),
        platform: Platform::TikTok,
        days_active: Some(2),
        metrics: Metrics {
            shares: 40_000,
            engagement_score: 90,
            reach: "2M".into(),
        },
        tags: vec!["mobility".into()],
        source: Source {
            handle: Some("@coach".into()),
            follower_count: None,
            link: Some("https://www.tiktok.com/@coach/video/1".into()),
        },
        saved: true,
    }
}

fn saved_persona() -> Persona {
    Persona {
        id: Some(uuid::Uuid::new_v4()),
        name: "Nova Lift".into(),
        bio: "Strength coach for busy people".into(),
        strategy: "Daily 30s form fixes".into(),
        visual_description: "Athletic woman in a bright studio".into(),
        platform: "TikTok".into(),
        generation_type: GenerationType::Video16x9,
        scripts: None,
        image_ref: None,
        video_ref: None,
        created_at: chrono::Utc::now(),
    }
}

fn profile() -> RawProfile {
    RawProfile {
        name: Some("Nova Lift".into()),
        bio: Some("Strength coach for busy people".into()),
        strategy: Some("Daily 30s form fixes".into()),
        visual_description: Some("Athletic woman in a bright studio".into()),
        scripts: None,
    }
}

#[tokio::test]
async fn fitness_tiktok_scenario_keeps_one_post() {
    let backend = ScriptedBackend::new();
    backend
        .candidates(Ok(vec![
            candidate("Valid", "TikTok", "https://tiktok.com/@x/video/123"),
            candidate("Profile link", "TikTok", "https://tiktok.com/@x"),
            candidate("Wrong platform", "Instagram", "https://instagram.com/reel/abc"),
        ]))
        .await;
    backend.strategy(Ok("Lead with the hook.".into())).await;
    let dir = tempfile::tempdir().unwrap();

    let discovery = pipeline(&backend, dir.path()).discover(&fitness_tiktok()).await;

    assert_eq!(discovery.posts.len(), 1);
    let post = &discovery.posts[0];
    assert_eq!(post.title, "Valid");
    assert_eq!(post.platform, Platform::TikTok);
    assert!(!post.saved);
    assert_eq!(discovery.strategy_summary, "Lead with the hook.");
    assert_eq!(backend.count("candidates").await, 1);
    assert_eq!(backend.count("strategy").await, 1);
}

#[tokio::test]
async fn strategy_failure_keeps_posts() {
    let backend = ScriptedBackend::new();
    backend
        .candidates(Ok(vec![candidate("Valid", "TikTok", "https://www.tiktok.com/@x/video/9")]))
        .await;
    backend
        .strategy(Err(BackendError::Api {
            status: 500,
            body: "internal".into(),
        }))
        .await;
    let dir = tempfile::tempdir().unwrap();

    let discovery = pipeline(&backend, dir.path()).discover(&fitness_tiktok()).await;

    assert_eq!(discovery.posts.len(), 1);
    assert_eq!(discovery.strategy_summary, ANALYSIS_UNAVAILABLE);
}

#[tokio::test]
async fn candidate_failure_keeps_strategy() {
    let backend = ScriptedBackend::new();
    backend.candidates(Err(BackendError::EmptyResponse("nothing"))).await;
    backend.strategy(Ok("  Post at 7pm.  ".into())).await;
    let dir = tempfile::tempdir().unwrap();

    let discovery = pipeline(&backend, dir.path()).discover(&fitness_tiktok()).await;

    assert!(discovery.posts.is_empty());
    assert_eq!(discovery.strategy_summary, "Post at 7pm.");
}

#[tokio::test]
async fn empty_strategy_text_uses_placeholder() {
    let backend = ScriptedBackend::new();
    backend.strategy(Ok("   ".into())).await;
    let dir = tempfile::tempdir().unwrap();

    let discovery = pipeline(&backend, dir.path()).discover(&fitness_tiktok()).await;

    assert_eq!(discovery.strategy_summary, ANALYSIS_EMPTY);
}

#[tokio::test]
async fn discover_without_platforms_skips_backend() {
    let backend = ScriptedBackend::new();
    let dir = tempfile::tempdir().unwrap();
    let mut req = fitness_tiktok();
    req.platforms.clear();

    let discovery = pipeline(&backend, dir.path()).discover(&req).await;

    assert!(discovery.posts.is_empty());
    assert!(backend.calls().await.is_empty());
}

#[tokio::test]
async fn persona_without_posts_makes_no_calls() {
    let backend = ScriptedBackend::new();
    backend.profile(Ok(profile())).await;
    let dir = tempfile::tempdir().unwrap();

    let persona = pipeline(&backend, dir.path())
        .build_persona(&PersonaSpec::default(), &[])
        .await;

    assert!(persona.is_none());
    assert!(backend.calls().await.is_empty());
}

#[tokio::test]
async fn persona_with_image() {
    let backend = ScriptedBackend::new();
    backend.profile(Ok(profile())).await;
    backend
        .image(Ok(Some(InlineImage {
            mime_type: "image/png".into(),
            data: b"hello".to_vec(),
        })))
        .await;
    let dir = tempfile::tempdir().unwrap();

    let persona = pipeline(&backend, dir.path())
        .build_persona(&PersonaSpec::default(), &[source_post()])
        .await
        .unwrap();

    assert!(persona.id.is_none());
    assert_eq!(persona.name, "Nova Lift");
    assert_eq!(persona.platform, "TikTok");
    assert_eq!(persona.image_ref.as_deref(), Some("data:image/png;base64,aGVsbG8="));
    assert!(persona.video_ref.is_none());
    assert_eq!(backend.calls().await, vec!["profile", "image"]);
}

#[tokio::test]
async fn image_failure_still_yields_persona() {
    let backend = ScriptedBackend::new();
    backend.profile(Ok(profile())).await;
    backend
        .image(Err(BackendError::Api {
            status: 400,
            body: "blocked".into(),
        }))
        .await;
    let dir = tempfile::tempdir().unwrap();

    let persona = pipeline(&backend, dir.path())
        .build_persona(&PersonaSpec::default(), &[source_post()])
        .await
        .unwrap();

    assert!(persona.image_ref.is_none());
    assert_eq!(persona.strategy, "Daily 30s form fixes");
}

#[tokio::test]
async fn incomplete_profile_yields_none() {
    let backend = ScriptedBackend::new();
    backend
        .profile(Ok(RawProfile {
            visual_description: Some("  ".into()),
            ..profile()
        }))
        .await;
    let dir = tempfile::tempdir().unwrap();

    let persona = pipeline(&backend, dir.path())
        .build_persona(&PersonaSpec::default(), &[source_post()])
        .await;

    assert!(persona.is_none());
    assert_eq!(backend.count("image").await, 0);
}

#[tokio::test]
async fn profile_error_yields_none() {
    let backend = ScriptedBackend::new();
    backend.profile(Err(BackendError::EmptyResponse("profile text"))).await;
    let dir = tempfile::tempdir().unwrap();

    let persona = pipeline(&backend, dir.path())
        .build_persona(&PersonaSpec::default(), &[source_post()])
        .await;

    assert!(persona.is_none());
}

#[tokio::test(start_paused = true)]
async fn video_is_downloaded_and_attached() {
    let backend = ScriptedBackend::new();
    backend.submit(Ok(pending("models/veo/operations/op1"))).await;
    backend
        .poll(Ok(finished("models/veo/operations/op1", Some("https://files.test/v.mp4"))))
        .await;
    backend.download(Ok(b"mp4-bytes".to_vec())).await;
    let dir = tempfile::tempdir().unwrap();

    let pipeline = pipeline(&backend, dir.path());
    let persona = saved_persona();
    let media = pipeline
        .build_video(&persona, AspectRatio::Portrait, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(media.path, dir.path().join("op1.mp4"));
    assert_eq!(media.size_bytes, 9);
    let persona = persona.with_video(&media);
    assert_eq!(persona.video_ref.as_deref(), media.path.to_str());
}

#[tokio::test]
async fn video_submit_not_found_explains_key() {
    let backend = ScriptedBackend::new();
    backend
        .submit(Err(BackendError::Api {
            status: 404,
            body: "Requested entity was not found.".into(),
        }))
        .await;
    let dir = tempfile::tempdir().unwrap();
    let persona = saved_persona();

    let err = pipeline(&backend, dir.path())
        .build_video(&persona, AspectRatio::Landscape, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Submission(_)));
    assert!(err.user_message().contains("paid project"));
}

#[tokio::test]
async fn wide_video_persona_defaults_to_landscape() {
    let backend = ScriptedBackend::new();
    backend.profile(Ok(profile())).await;
    let dir = tempfile::tempdir().unwrap();
    let spec = PersonaSpec {
        platform: "YouTube".into(),
        generation_type: GenerationType::Video16x9,
        ..PersonaSpec::default()
    };

    let persona = pipeline(&backend, dir.path())
        .build_persona(&spec, &[source_post()])
        .await
        .unwrap();

    assert_eq!(persona.generation_type, GenerationType::Video16x9);
    assert_eq!(persona.default_aspect_ratio(), AspectRatio::Landscape);
}
