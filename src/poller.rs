use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::config;
use crate::error::PipelineError;
use crate::gemini::{GenerationBackend, JobHandle, JobStatus, VideoJobRequest};
use crate::model::MediaHandle;

/// Lifecycle of one generation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Submitted,
    Polling,
    Succeeded,
    Failed,
    TimedOut,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed | JobState::TimedOut)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_polls: u32,
    pub max_wait: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::from(&config::Video::default())
    }
}

impl From<&config::Video> for PollSettings {
    fn from(v: &config::Video) -> Self {
        Self {
            interval: v.poll_interval(),
            max_polls: v.max_polls,
            max_wait: v.max_wait(),
        }
    }
}

/// Drives a video job to a terminal state, then downloads the result once.
pub struct JobPoller<'a> {
    backend: &'a dyn GenerationBackend,
    settings: PollSettings,
    media_dir: PathBuf,
}

impl<'a> JobPoller<'a> {
    pub fn new(backend: &'a dyn GenerationBackend, settings: PollSettings, media_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            settings,
            media_dir: media_dir.into(),
        }
    }

    #[instrument(skip_all)]
    pub async fn run(
        &self,
        request: &VideoJobRequest,
        cancel: &CancellationToken,
    ) -> Result<MediaHandle, PipelineError> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let mut status = tokio::select! {
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            res = self.backend.submit_video_job(request) => res.map_err(PipelineError::Submission)?,
        };
        let handle = status.handle.clone();
        info!(job = handle.as_str(), state = ?JobState::Submitted, "video job accepted");

        let started = Instant::now();
        let deadline = started + self.settings.max_wait;
        let mut polls: u32 = 0;
        loop {
            if let Some(failure) = status.error.take() {
                warn!(job = handle.as_str(), state = ?JobState::Failed, code = ?failure.code, message = %failure.message, "video job failed");
                return Err(PipelineError::JobServer {
                    code: failure.code,
                    message: failure.message,
                });
            }
            if status.done {
                break;
            }
            if polls >= self.settings.max_polls || Instant::now() >= deadline {
                return Err(self.timed_out(&handle, polls, started));
            }

            let wake = (Instant::now() + self.settings.interval).min(deadline);
            tokio::select! {
                _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
                _ = tokio::time::sleep_until(wake) => {}
            }
            if Instant::now() >= deadline {
                return Err(self.timed_out(&handle, polls, started));
            }
            polls += 1;

            // the status query itself is bounded by the same deadline
            let res = tokio::select! {
                _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
                res = tokio::time::timeout_at(deadline, self.backend.poll_video_job(&handle)) => res,
            };
            match res {
                Err(_) => return Err(self.timed_out(&handle, polls, started)),
                Ok(Ok(next)) => status = next,
                Ok(Err(err)) if err.is_transient() => {
                    warn!(job = handle.as_str(), polls, %err, "status query failed; retrying at next interval");
                }
                Ok(Err(err)) => return Err(err.into()),
            }
            info!(job = handle.as_str(), state = ?JobState::Polling, polls, done = status.done, "video job polled");
        }

        self.finish(status, polls, cancel).await
    }

    fn timed_out(&self, handle: &JobHandle, polls: u32, started: Instant) -> PipelineError {
        let elapsed = started.elapsed();
        warn!(job = handle.as_str(), state = ?JobState::TimedOut, polls, ?elapsed, "video job exceeded polling bounds");
        PipelineError::JobTimedOut { polls, elapsed }
    }

    async fn finish(
        &self,
        status: JobStatus,
        polls: u32,
        cancel: &CancellationToken,
    ) -> Result<MediaHandle, PipelineError> {
        let Some(uri) = status.result_uri else {
            warn!(job = status.handle.as_str(), state = ?JobState::Failed, "video job finished without a result");
            return Err(PipelineError::JobEmptyResult);
        };

        let bytes = tokio::select! {
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            res = self.backend.download_media(&uri) => res.map_err(|e| PipelineError::Download(e.to_string()))?,
        };

        let path = self.media_dir.join(format!("{}.mp4", file_stem(status.handle.short_id())));
        tokio::select! {
            _ = cancel.cancelled() => {
                // drop a partially written file
                let _ = tokio::fs::remove_file(&path).await;
                return Err(PipelineError::Cancelled);
            }
            res = write_media(&path, &bytes) => {
                res.map_err(|e| PipelineError::Storage(format!("{}: {e}", path.display())))?;
            }
        }

        info!(job = status.handle.as_str(), state = ?JobState::Succeeded, polls, bytes = bytes.len(), path = %path.display(), "video saved");
        Ok(MediaHandle {
            path,
            mime_type: "video/mp4".into(),
            size_bytes: bytes.len(),
            polls,
        })
    }
}

async fn write_media(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await
}

fn file_stem(id: &str) -> String {
    let cleaned: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "video".into()
    } else {
        cleaned
    }
}
