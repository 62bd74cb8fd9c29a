use std::time::Duration;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors from a single request to the generation backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-2xx status.
    #[error("provider error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The response body could not be decoded into the expected shape.
    #[error("could not decode {context}: {source}")]
    Decode {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A 2xx response that carried nothing usable.
    #[error("empty response: {0}")]
    EmptyResponse(&'static str),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl BackendError {
    /// Transport failures and 5xx responses are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            BackendError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            BackendError::Api { status, .. } => *status >= 500 || *status == 429,
            BackendError::Decode { .. }
            | BackendError::EmptyResponse(_)
            | BackendError::InvalidUrl(_) => false,
        }
    }

    fn is_not_found(&self) -> bool {
        match self {
            BackendError::Api { status, body } => {
                *status == 404 || body.contains("Requested entity was not found")
            }
            _ => false,
        }
    }
}

/// Classified failures surfaced by the video path.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// The provider refused to start the job.
    #[error("video job submission failed: {0}")]
    Submission(#[source] BackendError),

    #[error("backend request failed: {0}")]
    Backend(#[from] BackendError),

    #[error("video job failed on the server: {message}")]
    JobServer { code: Option<i64>, message: String },

    #[error("video job finished without a result; the output was most likely blocked by content-safety filtering")]
    JobEmptyResult,

    #[error("video job did not finish after {polls} polls ({elapsed:?})")]
    JobTimedOut { polls: u32, elapsed: Duration },

    #[error("video job succeeded but the download failed: {0}")]
    Download(String),

    #[error("video job cancelled")]
    Cancelled,

    #[error("storage error: {0}")]
    Storage(String),
}

impl PipelineError {
    /// Message suitable for showing to the person who triggered the job.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Configuration(ConfigError::MissingCredential(_)) => {
                "API key is missing. Set gemini.api_key or GEMINI_API_KEY and use a paid key for video generation.".into()
            }
            PipelineError::Submission(err) if err.is_not_found() => {
                "The API key may not be associated with a paid project. Select a valid paid key and try again.".into()
            }
            PipelineError::Submission(err) | PipelineError::Backend(err) if err.is_transient() => {
                format!("The provider is temporarily unavailable ({err}). Try again shortly.")
            }
            other => format!("Video generation failed: {other}"),
        }
    }
}
