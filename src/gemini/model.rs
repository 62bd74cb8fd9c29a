//! Wire shapes for the Gemini REST API and the untrusted payloads the model
//! returns inside them.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::error::BackendError;

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*\s*\n?(.*?)\s*```\s*$").unwrap());

/// Backend-proposed content idea. Every field is optional; the candidate
/// filter decides what survives.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawCandidate {
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub industry: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub language: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub platform: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub shares: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub days_active: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub hook: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub content_description: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub psychological_trigger: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub engagement_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub estimated_reach: Option<String>,
    #[serde(default, deserialize_with = "lenient_tags")]
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub source_handle: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub source_followers: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub source_link: Option<String>,
}

/// Text half of a persona as the model returned it.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RawProfile {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub bio: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub strategy: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub visual_description: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub scripts: Option<String>,
}

/// Image bytes returned inline by the image model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl InlineImage {
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.data))
    }
}

/// Opaque operation name for a long-running job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle(pub String);

impl JobHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment, usable as a file stem.
    pub fn short_id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    pub code: Option<i64>,
    pub message: String,
}

/// One observation of a job's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    pub handle: JobHandle,
    pub done: bool,
    pub error: Option<JobFailure>,
    pub result_uri: Option<String>,
}

/// Removes a surrounding Markdown code fence, if any.
pub fn strip_code_fence(text: &str) -> &str {
    match CODE_FENCE.captures(text).and_then(|c| c.get(1)) {
        Some(m) => m.as_str(),
        None => text.trim(),
    }
}

/// Decode a candidate batch. Items that are not JSON objects are skipped so
/// one malformed entry does not discard the rest.
pub fn parse_candidates(text: &str) -> Result<Vec<RawCandidate>, BackendError> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Ok(Vec::new());
    }
    let value: Value = serde_json::from_str(body).map_err(|source| BackendError::Decode {
        context: "candidate batch",
        source,
    })?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(map) if looks_like_candidate(&map) => vec![Value::Object(map)],
        // Some responses wrap the array in a single-key object.
        Value::Object(map) => match map.into_iter().find(|(_, v)| is_object_array(v)) {
            Some((_, Value::Array(items))) => items,
            _ => return Err(BackendError::EmptyResponse("candidate batch is not an array")),
        },
        _ => return Err(BackendError::EmptyResponse("candidate batch is not an array")),
    };

    let total = items.len();
    let decoded: Vec<RawCandidate> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<RawCandidate>(item) {
            Ok(c) => Some(c),
            Err(err) => {
                debug!(%err, "skipping undecodable candidate");
                None
            }
        })
        .collect();
    debug!(total, decoded = decoded.len(), "decoded candidate batch");
    Ok(decoded)
}

const CANDIDATE_KEYS: &[&str] = &["title", "hook", "platform", "contentDescription", "sourceLink"];

fn looks_like_candidate(map: &serde_json::Map<String, Value>) -> bool {
    CANDIDATE_KEYS.iter().any(|k| map.contains_key(*k))
}

fn is_object_array(v: &Value) -> bool {
    matches!(v, Value::Array(items) if items.iter().all(Value::is_object))
}

pub fn parse_profile(text: &str) -> Result<RawProfile, BackendError> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(BackendError::EmptyResponse("profile text"));
    }
    serde_json::from_str(body).map_err(|source| BackendError::Decode {
        context: "persona profile",
        source,
    })
}

fn lenient_string<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(de)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_number<'de, D>(de: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(de)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    })
}

fn lenient_tags<'de, D>(de: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(de)? {
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
        ),
        Value::String(s) => Some(
            s.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        _ => None,
    })
}

// ---- REST envelopes ----

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseCandidate {
    pub content: Option<Content>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Part {
    pub text: Option<String>,
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InlineData {
    pub mime_type: Option<String>,
    pub data: String,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    pub fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        (!text.trim().is_empty()).then_some(text)
    }

    /// First inline-data part of the first candidate, base64-decoded.
    pub fn inline_image(&self) -> Result<Option<InlineImage>, BackendError> {
        let Some(content) = self.candidates.first().and_then(|c| c.content.as_ref()) else {
            return Ok(None);
        };
        let Some(inline) = content.parts.iter().find_map(|p| p.inline_data.as_ref()) else {
            return Ok(None);
        };
        let data = STANDARD
            .decode(inline.data.trim())
            .map_err(|_| BackendError::EmptyResponse("inline image is not valid base64"))?;
        Ok(Some(InlineImage {
            mime_type: inline.mime_type.clone().unwrap_or_else(|| "image/png".into()),
            data,
        }))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Operation {
    pub name: Option<String>,
    #[serde(default)]
    pub done: bool,
    pub error: Option<OperationError>,
    pub response: Option<OperationResponse>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OperationError {
    pub code: Option<i64>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OperationResponse {
    pub generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateVideoResponse {
    #[serde(default)]
    pub generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeneratedSample {
    pub video: Option<VideoFile>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VideoFile {
    pub uri: Option<String>,
}

impl Operation {
    pub fn into_status(self, fallback: Option<&JobHandle>) -> Result<JobStatus, BackendError> {
        let handle = match (self.name, fallback) {
            (Some(name), _) if !name.is_empty() => JobHandle(name),
            (_, Some(h)) => h.clone(),
            _ => return Err(BackendError::EmptyResponse("operation has no name")),
        };
        let result_uri = self
            .response
            .and_then(|r| r.generate_video_response)
            .and_then(|r| r.generated_samples.into_iter().next())
            .and_then(|s| s.video)
            .and_then(|v| v.uri)
            .filter(|u| !u.trim().is_empty());
        let error = self.error.map(|e| JobFailure {
            code: e.code,
            message: e
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "unknown server error".into()),
        });
        Ok(JobStatus {
            handle,
            done: self.done,
            error,
            result_uri,
        })
    }
}
