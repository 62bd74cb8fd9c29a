//! Configuration loader and validator for the generation pipeline.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub gemini: Gemini,
    #[serde(default)]
    pub video: Video,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
}

/// Hosted provider settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Gemini {
    /// Empty means "read from the environment".
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub video_model: String,
    #[serde(default = "default_candidate_count")]
    pub candidate_count: u32,
}

/// Video job polling bounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Video {
    pub poll_interval_secs: u64,
    pub max_polls: u32,
    pub max_wait_secs: u64,
    pub resolution: String,
}

impl Default for Video {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            max_polls: 60,
            max_wait_secs: 300,
            resolution: "720p".into(),
        }
    }
}

impl Video {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/".into()
}

fn default_candidate_count() -> u32 {
    6
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }

    /// Resolve the provider key: config file first, then `GEMINI_API_KEY`,
    /// then `API_KEY`.
    pub fn api_key(&self) -> Result<String, ConfigError> {
        let lookup = |name: &str| std::env::var(name).ok();
        resolve_api_key(&self.gemini.api_key, lookup)
    }
}

fn resolve_api_key<F>(configured: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if !configured.trim().is_empty() {
        return Ok(configured.trim().to_string());
    }
    API_KEY_ENV_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
        .ok_or(ConfigError::MissingCredential(
            "gemini.api_key is empty and neither GEMINI_API_KEY nor API_KEY is set",
        ))
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }

    if cfg.gemini.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("gemini.base_url must be non-empty"));
    }
    if cfg.gemini.text_model.trim().is_empty() {
        return Err(ConfigError::Invalid("gemini.text_model must be non-empty"));
    }
    if cfg.gemini.image_model.trim().is_empty() {
        return Err(ConfigError::Invalid("gemini.image_model must be non-empty"));
    }
    if cfg.gemini.video_model.trim().is_empty() {
        return Err(ConfigError::Invalid("gemini.video_model must be non-empty"));
    }
    if !(1..=20).contains(&cfg.gemini.candidate_count) {
        return Err(ConfigError::Invalid("gemini.candidate_count must be within 1..=20"));
    }

    if cfg.video.poll_interval_secs == 0 {
        return Err(ConfigError::Invalid("video.poll_interval_secs must be > 0"));
    }
    if cfg.video.max_polls == 0 {
        return Err(ConfigError::Invalid("video.max_polls must be > 0"));
    }
    if cfg.video.max_wait_secs == 0 {
        return Err(ConfigError::Invalid("video.max_wait_secs must be > 0"));
    }
    if cfg.video.resolution.trim().is_empty() {
        return Err(ConfigError::Invalid("video.resolution must be non-empty"));
    }

    Ok(())
}

/// Returns the sample YAML configuration.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"

gemini:
  api_key: ""
  base_url: "https://generativelanguage.googleapis.com/"
  text_model: "gemini-3-flash-preview"
  image_model: "gemini-2.5-flash-image"
  video_model: "veo-3.1-fast-generate-preview"
  candidate_count: 6

video:
  poll_interval_secs: 5
  max_polls: 60
  max_wait_secs: 300
  resolution: "720p"
"#
}
