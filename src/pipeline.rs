//! Orchestration of the discover, persona and video flows.
//!
//! Single-shot failures on the discover and persona paths are logged and
//! turned into empty or placeholder values. The video path is user-triggered
//! and billable, so its failures are returned classified.

use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::error::PipelineError;
use crate::filter;
use crate::gemini::prompt;
use crate::gemini::{GenerationBackend, VideoJobRequest};
use crate::model::{AspectRatio, Discovery, GenerationRequest, MediaHandle, Persona, PersonaSpec, Post};
use crate::poller::{JobPoller, PollSettings};

pub const ANALYSIS_UNAVAILABLE: &str = "Could not generate analysis.";
pub const ANALYSIS_EMPTY: &str = "Analysis failed.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub candidate_count: u32,
    pub poll: PollSettings,
    pub video_resolution: String,
    /// Downloaded videos land here.
    pub media_dir: PathBuf,
}

impl PipelineSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            candidate_count: cfg.gemini.candidate_count,
            poll: PollSettings::from(&cfg.video),
            video_resolution: cfg.video.resolution.clone(),
            media_dir: PathBuf::from(&cfg.app.data_dir).join("media").join("videos"),
        }
    }
}

pub struct Pipeline {
    backend: Arc<dyn GenerationBackend>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(backend: Arc<dyn GenerationBackend>, settings: PipelineSettings) -> Self {
        Self { backend, settings }
    }

    /// Candidate generation and strategy analysis run concurrently; either
    /// may fail without affecting the other's result.
    #[instrument(skip_all, fields(topic = %req.topic))]
    pub async fn discover(&self, req: &GenerationRequest) -> Discovery {
        if req.topic.trim().is_empty() || req.platforms.is_empty() {
            warn!("discover called without a topic or platforms; skipping backend calls");
            return Discovery {
                posts: Vec::new(),
                strategy_summary: ANALYSIS_UNAVAILABLE.to_string(),
            };
        }

        let candidate_prompt = prompt::candidate_prompt(req, self.settings.candidate_count);
        let strategy_prompt = prompt::strategy_prompt(req);

        let (candidates, analysis) = futures::join!(
            self.backend.generate_candidates(&candidate_prompt),
            self.backend.analyze_strategy(&strategy_prompt),
        );

        let posts = match candidates {
            Ok(raw) => {
                let received = raw.len();
                let posts = filter::filter(raw, req);
                info!(received, accepted = posts.len(), "candidates filtered");
                posts
            }
            Err(err) => {
                warn!(%err, "candidate generation failed");
                Vec::new()
            }
        };

        let strategy_summary = match analysis {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => ANALYSIS_EMPTY.to_string(),
            Err(err) => {
                warn!(%err, "strategy analysis failed");
                ANALYSIS_UNAVAILABLE.to_string()
            }
        };

        Discovery {
            posts,
            strategy_summary,
        }
    }

    /// Builds an unsaved persona from `source_posts`. Returns `None` when
    /// there are no posts or the text profile is unusable; a failed image
    /// only leaves `image_ref` empty.
    #[instrument(skip_all, fields(posts = source_posts.len()))]
    pub async fn build_persona(&self, spec: &PersonaSpec, source_posts: &[Post]) -> Option<Persona> {
        if source_posts.is_empty() {
            return None;
        }

        let profile_prompt = prompt::profile_prompt(spec, source_posts);
        let raw = match self.backend.generate_profile(&profile_prompt).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(%err, "profile generation failed");
                return None;
            }
        };

        let text = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let (Some(name), Some(bio), Some(strategy), Some(visual_description)) = (
            text(raw.name),
            text(raw.bio),
            text(raw.strategy),
            text(raw.visual_description),
        ) else {
            warn!("profile response is missing required fields");
            return None;
        };

        let image_ref = match self
            .backend
            .generate_image(&prompt::image_prompt(&visual_description))
            .await
        {
            Ok(Some(image)) => Some(image.to_data_uri()),
            Ok(None) => {
                warn!("image response carried no image data");
                None
            }
            Err(err) => {
                warn!(%err, "image generation failed");
                None
            }
        };

        info!(name = %name, has_image = image_ref.is_some(), "persona generated");
        Some(Persona {
            id: None,
            name,
            bio,
            strategy,
            visual_description,
            platform: spec.platform.clone(),
            generation_type: spec.generation_type,
            scripts: text(raw.scripts),
            image_ref,
            video_ref: None,
            created_at: Utc::now(),
        })
    }

    /// Runs one video job for `persona` to completion.
    #[instrument(skip_all, fields(persona = %persona.name, aspect = aspect_ratio.as_str()))]
    pub async fn build_video(
        &self,
        persona: &Persona,
        aspect_ratio: AspectRatio,
        cancel: &CancellationToken,
    ) -> Result<MediaHandle, PipelineError> {
        let request = VideoJobRequest {
            prompt: prompt::video_prompt(persona),
            aspect_ratio,
            resolution: self.settings.video_resolution.clone(),
        };
        let poller = JobPoller::new(
            self.backend.as_ref(),
            self.settings.poll.clone(),
            self.settings.media_dir.clone(),
        );
        poller.run(&request, cancel).await
    }
}
