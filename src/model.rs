use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Target social network.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Platform {
    TikTok,
    Instagram,
    YouTube,
    #[serde(rename = "YouTube Shorts")]
    YouTubeShorts,
    LinkedIn,
    Twitter,
}

impl Platform {
    pub const ALL: [Platform; 6] = [
        Platform::Instagram,
        Platform::TikTok,
        Platform::LinkedIn,
        Platform::Twitter,
        Platform::YouTubeShorts,
        Platform::YouTube,
    ];

    /// Name used in prompts and in the response schema enum.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::TikTok => "TikTok",
            Platform::Instagram => "Instagram",
            Platform::YouTube => "YouTube",
            Platform::YouTubeShorts => "YouTube Shorts",
            Platform::LinkedIn => "LinkedIn",
            Platform::Twitter => "Twitter",
        }
    }

    /// Lenient parse of a platform name as the model tends to spell it.
    pub fn parse(name: &str) -> Option<Platform> {
        let normalized: String = name
            .trim()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "tiktok" => Some(Platform::TikTok),
            "instagram" => Some(Platform::Instagram),
            "youtube" => Some(Platform::YouTube),
            "youtubeshorts" | "shorts" => Some(Platform::YouTubeShorts),
            "linkedin" => Some(Platform::LinkedIn),
            "twitter" | "x" | "twitter/x" => Some(Platform::Twitter),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ContentType {
    #[default]
    Video,
    Image,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Video => "Video",
            ContentType::Image => "Image",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DatePeriod {
    Last24h,
    #[default]
    Last7d,
    Last30d,
    Last90d,
    AllTime,
}

impl DatePeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatePeriod::Last24h => "Last 24 hours",
            DatePeriod::Last7d => "Last 7 days",
            DatePeriod::Last30d => "Last 30 days",
            DatePeriod::Last90d => "Last 90 days",
            DatePeriod::AllTime => "All Time",
        }
    }
}

/// One "discover content" request. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub topic: String,
    pub region: String,
    pub language: String,
    pub min_threshold: u64,
    pub platforms: BTreeSet<Platform>,
    pub content_type: ContentType,
    pub period: DatePeriod,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metrics {
    pub shares: u64,
    /// 0..=100
    pub engagement_score: u8,
    pub reach: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    pub handle: Option<String>,
    pub follower_count: Option<String>,
    pub link: Option<String>,
}

/// An accepted candidate. Only the candidate filter constructs these from
/// backend output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub industry: String,
    pub region: String,
    pub language: Option<String>,
    pub hook: String,
    pub description: String,
    pub psychological_trigger: Option<String>,
    pub platform: Platform,
    pub days_active: Option<u32>,
    pub metrics: Metrics,
    pub tags: Vec<String>,
    pub source: Source,
    pub saved: bool,
}

/// Result of the discover flow.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Discovery {
    pub posts: Vec<Post>,
    pub strategy_summary: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum GenerationType {
    #[default]
    ViralReels,
    Video16x9,
    Picture,
    ScriptsAndPrompts,
}

impl GenerationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationType::ViralReels => "Viral Reels (9:16)",
            GenerationType::Video16x9 => "Video (16:9)",
            GenerationType::Picture => "Picture",
            GenerationType::ScriptsAndPrompts => "Scripts & Prompts",
        }
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        match self {
            GenerationType::Video16x9 => AspectRatio::Landscape,
            _ => AspectRatio::Portrait,
        }
    }

    pub fn wants_scripts(&self) -> bool {
        matches!(self, GenerationType::ScriptsAndPrompts)
    }

    /// Short name used on the command line and in the database.
    pub fn code(&self) -> &'static str {
        match self {
            GenerationType::ViralReels => "reels",
            GenerationType::Video16x9 => "video",
            GenerationType::Picture => "picture",
            GenerationType::ScriptsAndPrompts => "scripts",
        }
    }

    pub fn parse(s: &str) -> Option<GenerationType> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reels" => Some(GenerationType::ViralReels),
            "video" => Some(GenerationType::Video16x9),
            "picture" => Some(GenerationType::Picture),
            "scripts" => Some(GenerationType::ScriptsAndPrompts),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum AspectRatio {
    /// 9:16
    #[default]
    Portrait,
    /// 16:9
    Landscape,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Portrait => "9:16",
            AspectRatio::Landscape => "16:9",
        }
    }

    pub fn parse(s: &str) -> Option<AspectRatio> {
        match s.trim() {
            "9:16" => Some(AspectRatio::Portrait),
            "16:9" => Some(AspectRatio::Landscape),
            _ => None,
        }
    }
}

/// Desired influencer attributes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersonaSpec {
    pub age: String,
    pub sex: String,
    pub race: String,
    pub character: String,
    pub language: String,
    pub expected_reach: String,
    pub content_duration: String,
    pub platform: String,
    pub generation_type: GenerationType,
}

impl Default for PersonaSpec {
    fn default() -> Self {
        Self {
            age: "25-34".into(),
            sex: "Female".into(),
            race: "Any".into(),
            character: "Energetic and witty".into(),
            language: "English".into(),
            expected_reach: "100k+".into(),
            content_duration: "30s".into(),
            platform: Platform::TikTok.as_str().into(),
            generation_type: GenerationType::default(),
        }
    }
}

/// A generated synthetic influencer. `id` stays `None` until a repository
/// saves it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Persona {
    pub id: Option<Uuid>,
    pub name: String,
    pub bio: String,
    pub strategy: String,
    pub visual_description: String,
    pub platform: String,
    #[serde(default)]
    pub generation_type: GenerationType,
    pub scripts: Option<String>,
    /// `data:<mime>;base64,<payload>`
    pub image_ref: Option<String>,
    /// Local path of the downloaded video.
    pub video_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Local, de-referenced result of a finished media job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaHandle {
    pub path: PathBuf,
    pub mime_type: String,
    pub size_bytes: usize,
    /// Status queries issued after submission.
    pub polls: u32,
}

impl Persona {
    /// Copy of this persona pointing at a downloaded video; persist it with
    /// the repository to make the change stick.
    pub fn with_video(mut self, media: &MediaHandle) -> Self {
        self.video_ref = Some(media.path.to_string_lossy().into_owned());
        self
    }

    /// Aspect ratio used for this persona's video unless the caller picks one.
    pub fn default_aspect_ratio(&self) -> AspectRatio {
        self.generation_type.aspect_ratio()
    }
}
