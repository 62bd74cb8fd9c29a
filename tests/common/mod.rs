#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use viral_scout::error::BackendError;
use viral_scout::gemini::{
    CandidatePrompt, GenerationBackend, InlineImage, JobFailure, JobHandle, JobStatus, ProfilePrompt,
    RawCandidate, RawProfile, VideoJobRequest,
};

type Queue<T> = Arc<Mutex<VecDeque<Result<T, BackendError>>>>;

/// Backend that replays scripted answers per operation and records every
/// call. An exhausted queue answers with an empty or error value.
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    candidates: Queue<Vec<RawCandidate>>,
    strategies: Queue<String>,
    profiles: Queue<RawProfile>,
    images: Queue<Option<InlineImage>>,
    submits: Queue<JobStatus>,
    polls: Queue<JobStatus>,
    downloads: Queue<Vec<u8>>,
    calls: Arc<Mutex<Vec<String>>>,
    delays: Arc<Mutex<Vec<(&'static str, Duration)>>>,
}

async fn push<T>(queue: &Queue<T>, value: Result<T, BackendError>) {
    queue.lock().await.push_back(value);
}

async fn pop<T>(queue: &Queue<T>, fallback: impl FnOnce() -> Result<T, BackendError>) -> Result<T, BackendError> {
    queue.lock().await.pop_front().unwrap_or_else(fallback)
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn candidates(&self, v: Result<Vec<RawCandidate>, BackendError>) -> &Self {
        push(&self.candidates, v).await;
        self
    }

    pub async fn strategy(&self, v: Result<String, BackendError>) -> &Self {
        push(&self.strategies, v).await;
        self
    }

    pub async fn profile(&self, v: Result<RawProfile, BackendError>) -> &Self {
        push(&self.profiles, v).await;
        self
    }

    pub async fn image(&self, v: Result<Option<InlineImage>, BackendError>) -> &Self {
        push(&self.images, v).await;
        self
    }

    pub async fn submit(&self, v: Result<JobStatus, BackendError>) -> &Self {
        push(&self.submits, v).await;
        self
    }

    pub async fn poll(&self, v: Result<JobStatus, BackendError>) -> &Self {
        push(&self.polls, v).await;
        self
    }

    pub async fn download(&self, v: Result<Vec<u8>, BackendError>) -> &Self {
        push(&self.downloads, v).await;
        self
    }

    /// Every later `op` call takes `delay` before answering.
    pub async fn slow(&self, op: &'static str, delay: Duration) -> &Self {
        self.delays.lock().await.push((op, delay));
        self
    }

    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    pub async fn count(&self, op: &str) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| c.split(':').next() == Some(op))
            .count()
    }

    async fn record(&self, call: String) {
        let op = call.split(':').next().unwrap_or_default().to_string();
        self.calls.lock().await.push(call);
        let delay = self
            .delays
            .lock()
            .await
            .iter()
            .find(|(name, _)| *name == op)
            .map(|(_, d)| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait::async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn generate_candidates(&self, _prompt: &CandidatePrompt) -> Result<Vec<RawCandidate>, BackendError> {
        self.record("candidates".into()).await;
        pop(&self.candidates, || Ok(Vec::new())).await
    }

    async fn analyze_strategy(&self, _prompt: &str) -> Result<String, BackendError> {
        self.record("strategy".into()).await;
        pop(&self.strategies, || Ok(String::new())).await
    }

    async fn generate_profile(&self, _prompt: &ProfilePrompt) -> Result<RawProfile, BackendError> {
        self.record("profile".into()).await;
        pop(&self.profiles, || Err(BackendError::EmptyResponse("no scripted profile"))).await
    }

    async fn generate_image(&self, _prompt: &str) -> Result<Option<InlineImage>, BackendError> {
        self.record("image".into()).await;
        pop(&self.images, || Ok(None)).await
    }

    async fn submit_video_job(&self, _request: &VideoJobRequest) -> Result<JobStatus, BackendError> {
        self.record("submit".into()).await;
        pop(&self.submits, || Err(BackendError::EmptyResponse("no scripted submission"))).await
    }

    async fn poll_video_job(&self, handle: &JobHandle) -> Result<JobStatus, BackendError> {
        self.record(format!("poll:{}", handle.as_str())).await;
        pop(&self.polls, || Err(BackendError::EmptyResponse("no scripted poll"))).await
    }

    async fn download_media(&self, uri: &str) -> Result<Vec<u8>, BackendError> {
        self.record(format!("download:{uri}")).await;
        pop(&self.downloads, || Err(BackendError::EmptyResponse("no scripted download"))).await
    }
}

pub fn pending(name: &str) -> JobStatus {
    JobStatus {
        handle: JobHandle(name.into()),
        done: false,
        error: None,
        result_uri: None,
    }
}

pub fn finished(name: &str, uri: Option<&str>) -> JobStatus {
    JobStatus {
        handle: JobHandle(name.into()),
        done: true,
        error: None,
        result_uri: uri.map(str::to_string),
    }
}

pub fn failed(name: &str, code: i64, message: &str) -> JobStatus {
    JobStatus {
        handle: JobHandle(name.into()),
        done: true,
        error: Some(JobFailure {
            code: Some(code),
            message: message.into(),
        }),
        result_uri: None,
    }
}

pub fn candidate(title: &str, platform: &str, link: &str) -> RawCandidate {
    RawCandidate {
        title: Some(title.into()),
        industry: Some("Fitness".into()),
        region: Some("Global".into()),
        platform: Some(platform.into()),
        shares: Some(25_000.0),
        days_active: Some(3.0),
        hook: Some(format!("{title} hook")),
        content_description: Some(format!("{title} description")),
        psychological_trigger: Some("Curiosity".into()),
        engagement_score: Some(91.0),
        estimated_reach: Some("1.2M".into()),
        tags: Some(vec!["fitness".into(), "gym".into()]),
        source_handle: Some("@coach".into()),
        source_followers: Some("450k".into()),
        source_link: Some(link.into()),
        ..Default::default()
    }
}
