use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{BackendError, PipelineError};

pub mod model;
pub mod prompt;

pub use model::{InlineImage, JobFailure, JobHandle, JobStatus, RawCandidate, RawProfile};
pub use prompt::{CandidatePrompt, ProfilePrompt, VideoJobRequest};

use model::{GenerateContentResponse, Operation};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// The hosted generation provider, as the pipeline sees it.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate_candidates(
        &self,
        prompt: &CandidatePrompt,
    ) -> Result<Vec<RawCandidate>, BackendError>;

    /// Free-text answer; may be empty.
    async fn analyze_strategy(&self, prompt: &str) -> Result<String, BackendError>;

    async fn generate_profile(&self, prompt: &ProfilePrompt) -> Result<RawProfile, BackendError>;

    /// `Ok(None)` when the model answered without image data.
    async fn generate_image(&self, prompt: &str) -> Result<Option<InlineImage>, BackendError>;

    async fn submit_video_job(&self, request: &VideoJobRequest) -> Result<JobStatus, BackendError>;

    async fn poll_video_job(&self, handle: &JobHandle) -> Result<JobStatus, BackendError>;

    async fn download_media(&self, uri: &str) -> Result<Vec<u8>, BackendError>;
}

/// Model names used by [`GeminiClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Models {
    pub text: String,
    pub image: String,
    pub video: String,
}

#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    base_url: Url,
    api_key: String,
    models: Models,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("models", &self.models)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    pub fn new(api_key: String, models: Models) -> Result<Self, BackendError> {
        let base_url =
            Url::parse(GEMINI_API_BASE).map_err(|e| BackendError::InvalidUrl(e.to_string()))?;
        Self::with_base_url(api_key, models, base_url)
    }

    pub fn with_base_url(api_key: String, models: Models, base_url: Url) -> Result<Self, BackendError> {
        let http = Client::builder()
            .user_agent(concat!("viral-scout/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: ensure_trailing_slash(base_url),
            api_key,
            models,
        })
    }

    /// Build a client from configuration. Fails with a configuration error
    /// before any request when no key can be resolved.
    pub fn from_config(cfg: &Config) -> Result<Self, PipelineError> {
        let api_key = cfg.api_key()?;
        let base_url = Url::parse(&cfg.gemini.base_url)
            .map_err(|e| BackendError::InvalidUrl(format!("{}: {e}", cfg.gemini.base_url)))?;
        let models = Models {
            text: cfg.gemini.text_model.clone(),
            image: cfg.gemini.image_model.clone(),
            video: cfg.gemini.video_model.clone(),
        };
        Ok(Self::with_base_url(api_key, models, base_url)?)
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base_url
            .join(path)
            .map_err(|e| BackendError::InvalidUrl(format!("{path}: {e}")))
    }

    pub fn build_request(&self, method: reqwest::Method, path: &str, body: Option<&Value>) -> Result<reqwest::Request, BackendError> {
        let mut builder = self
            .http
            .request(method, self.endpoint(path)?)
            .header("x-goog-api-key", &self.api_key);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        Ok(builder.build()?)
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        request: reqwest::Request,
        context: &'static str,
    ) -> Result<T, BackendError> {
        debug!(url = %request.url(), method = %request.method(), "sending provider request");
        let res = self.http.execute(request).await?;
        let status = res.status();
        if !status.is_success() {
            let body = res
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            warn!(%status, %body, "provider returned an error");
            return Err(BackendError::Api {
                status: status.as_u16(),
                body,
            });
        }
        let text = res.text().await?;
        serde_json::from_str(&text).map_err(|source| BackendError::Decode { context, source })
    }

    async fn generate_content(&self, model: &str, body: &Value) -> Result<GenerateContentResponse, BackendError> {
        let request = self.build_request(
            reqwest::Method::POST,
            &format!("v1beta/models/{model}:generateContent"),
            Some(body),
        )?;
        self.execute_json(request, "generateContent response").await
    }
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    async fn generate_candidates(
        &self,
        prompt: &CandidatePrompt,
    ) -> Result<Vec<RawCandidate>, BackendError> {
        let body = prompt::build_generate_content_body(&prompt.text, Some(&prompt.schema));
        let response = self.generate_content(&self.models.text, &body).await?;
        match response.text() {
            Some(text) => model::parse_candidates(&text),
            None => Ok(Vec::new()),
        }
    }

    async fn analyze_strategy(&self, prompt: &str) -> Result<String, BackendError> {
        let body = prompt::build_generate_content_body(prompt, None);
        let response = self.generate_content(&self.models.text, &body).await?;
        Ok(response.text().unwrap_or_default())
    }

    async fn generate_profile(&self, prompt: &ProfilePrompt) -> Result<RawProfile, BackendError> {
        let body = prompt::build_generate_content_body(&prompt.text, Some(&prompt.schema));
        let response = self.generate_content(&self.models.text, &body).await?;
        let text = response
            .text()
            .ok_or(BackendError::EmptyResponse("profile response has no text"))?;
        model::parse_profile(&text)
    }

    async fn generate_image(&self, prompt: &str) -> Result<Option<InlineImage>, BackendError> {
        let body = prompt::build_image_body(prompt);
        let response = self.generate_content(&self.models.image, &body).await?;
        response.inline_image()
    }

    async fn submit_video_job(&self, request: &VideoJobRequest) -> Result<JobStatus, BackendError> {
        let body = prompt::build_video_body(request);
        let req = self.build_request(
            reqwest::Method::POST,
            &format!("v1beta/models/{}:predictLongRunning", self.models.video),
            Some(&body),
        )?;
        let op: Operation = self.execute_json(req, "video operation").await?;
        let status = op.into_status(None)?;
        info!(job = status.handle.as_str(), done = status.done, "video job submitted");
        Ok(status)
    }

    async fn poll_video_job(&self, handle: &JobHandle) -> Result<JobStatus, BackendError> {
        let req = self.build_request(
            reqwest::Method::GET,
            &format!("v1beta/{}", handle.as_str().trim_start_matches('/')),
            None,
        )?;
        let op: Operation = self.execute_json(req, "video operation").await?;
        op.into_status(Some(handle))
    }

    async fn download_media(&self, uri: &str) -> Result<Vec<u8>, BackendError> {
        let mut url = Url::parse(uri).map_err(|e| BackendError::InvalidUrl(format!("{uri}: {e}")))?;
        debug!(url = %url, "downloading media");
        url.query_pairs_mut().append_pair("key", &self.api_key);
        let res = self.http.get(url).send().await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = res.bytes().await?;
        if bytes.is_empty() {
            return Err(BackendError::EmptyResponse("media download returned no bytes"));
        }
        Ok(bytes.to_vec())
    }
}

fn ensure_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
