use anyhow::{anyhow, bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use viral_scout::config;
use viral_scout::filter;
use viral_scout::gemini::GeminiClient;
use viral_scout::model::{
    AspectRatio, ContentType, DatePeriod, GenerationRequest, GenerationType, Platform, PersonaSpec, Post,
};
use viral_scout::pipeline::{Pipeline, PipelineSettings};
use viral_scout::store::{PersonaRepository, SqlitePersonaRepository};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate viral post ideas and a strategy summary
    Discover(DiscoverArgs),
    /// Build an influencer persona from saved posts
    Persona(PersonaArgs),
    /// Generate a short video for a saved persona
    Video(VideoArgs),
    /// Manage saved personas
    Personas {
        #[command(subcommand)]
        action: PersonasAction,
    },
    /// Print a sample configuration file
    ExampleConfig,
}

#[derive(Debug, ClapArgs)]
struct DiscoverArgs {
    #[arg(long)]
    topic: String,
    #[arg(long, default_value = "Global")]
    region: String,
    #[arg(long, default_value = "English")]
    language: String,
    #[arg(long, default_value_t = 10_000)]
    min_shares: u64,
    /// Repeat to target several platforms; defaults to all of them
    #[arg(long = "platform", value_parser = parse_platform)]
    platforms: Vec<Platform>,
    #[arg(long, value_parser = parse_content_type, default_value = "video")]
    content_type: ContentType,
    #[arg(long, value_parser = parse_period, default_value = "7d")]
    period: DatePeriod,
    /// Write accepted posts as JSON (input for `persona --posts`)
    #[arg(long)]
    out: Option<PathBuf>,
    /// Print the whole result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, ClapArgs)]
struct PersonaArgs {
    /// JSON file with the source posts
    #[arg(long)]
    posts: PathBuf,
    #[arg(long, default_value = "25-34")]
    age: String,
    #[arg(long, default_value = "Female")]
    sex: String,
    #[arg(long, default_value = "Any")]
    race: String,
    #[arg(long, default_value = "Energetic and witty")]
    character: String,
    #[arg(long, default_value = "English")]
    language: String,
    #[arg(long, default_value = "100k+")]
    expected_reach: String,
    #[arg(long, default_value = "30s")]
    duration: String,
    #[arg(long, default_value = "TikTok")]
    platform: String,
    #[arg(long, value_parser = parse_generation_type, default_value = "reels")]
    generation_type: GenerationType,
    /// Store the persona after generating it
    #[arg(long)]
    save: bool,
}

#[derive(Debug, ClapArgs)]
struct VideoArgs {
    #[arg(long)]
    persona: Uuid,
    /// 9:16 or 16:9; defaults to the persona's generation type
    #[arg(long, value_parser = parse_aspect)]
    aspect: Option<AspectRatio>,
}

#[derive(Debug, Subcommand)]
enum PersonasAction {
    List,
    Delete { id: Uuid },
}

fn parse_platform(s: &str) -> Result<Platform, String> {
    Platform::parse(s).ok_or_else(|| format!("unknown platform '{s}'"))
}

fn parse_content_type(s: &str) -> Result<ContentType, String> {
    match s.to_ascii_lowercase().as_str() {
        "video" => Ok(ContentType::Video),
        "image" => Ok(ContentType::Image),
        _ => Err(format!("unknown content type '{s}' (video|image)")),
    }
}

fn parse_period(s: &str) -> Result<DatePeriod, String> {
    match s.to_ascii_lowercase().as_str() {
        "24h" => Ok(DatePeriod::Last24h),
        "7d" => Ok(DatePeriod::Last7d),
        "30d" => Ok(DatePeriod::Last30d),
        "90d" => Ok(DatePeriod::Last90d),
        "all" => Ok(DatePeriod::AllTime),
        _ => Err(format!("unknown period '{s}' (24h|7d|30d|90d|all)")),
    }
}

fn parse_generation_type(s: &str) -> Result<GenerationType, String> {
    GenerationType::parse(s).ok_or_else(|| format!("unknown generation type '{s}' (reels|video|picture|scripts)"))
}

fn parse_aspect(s: &str) -> Result<AspectRatio, String> {
    AspectRatio::parse(s).ok_or_else(|| format!("unknown aspect ratio '{s}' (9:16|16:9)"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    if let Command::ExampleConfig = args.command {
        print!("{}", config::example());
        return Ok(());
    }

    let cfg = config::load(Some(&args.config))
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    cfg.ensure_dirs()?;

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| format!("sqlite://{}/personas.db", cfg.app.data_dir));

    match args.command {
        Command::Discover(a) => discover(&cfg, a).await,
        Command::Persona(a) => persona(&cfg, &database_url, a).await,
        Command::Video(a) => video(&cfg, &database_url, a).await,
        Command::Personas { action } => personas(&database_url, action).await,
        Command::ExampleConfig => Ok(()),
    }
}

fn pipeline(cfg: &config::Config) -> Result<Pipeline> {
    let client = GeminiClient::from_config(cfg).map_err(|e| anyhow!(e.user_message()))?;
    Ok(Pipeline::new(Arc::new(client), PipelineSettings::from_config(cfg)))
}

async fn discover(cfg: &config::Config, a: DiscoverArgs) -> Result<()> {
    let platforms: BTreeSet<Platform> = if a.platforms.is_empty() {
        Platform::ALL.into_iter().collect()
    } else {
        a.platforms.into_iter().collect()
    };
    let req = GenerationRequest {
        topic: a.topic,
        region: a.region,
        language: a.language,
        min_threshold: a.min_shares,
        platforms,
        content_type: a.content_type,
        period: a.period,
    };

    let pipeline = pipeline(cfg)?;
    info!(topic = %req.topic, content_type = req.content_type.as_str(), "discovering content");
    let discovery = pipeline.discover(&req).await;

    if let Some(out) = &a.out {
        let json = serde_json::to_string_pretty(&discovery.posts)?;
        tokio::fs::write(out, json)
            .await
            .with_context(|| format!("failed to write {}", out.display()))?;
        info!(path = %out.display(), posts = discovery.posts.len(), "posts written");
    }

    if a.json {
        println!("{}", serde_json::to_string_pretty(&discovery)?);
        return Ok(());
    }

    println!("Strategy:\n{}\n", discovery.strategy_summary);
    if discovery.posts.is_empty() {
        println!("No posts passed validation.");
    }
    for post in &discovery.posts {
        println!(
            "[{}] {} | {} shares | score {} | reach {}",
            post.platform, post.title, post.metrics.shares, post.metrics.engagement_score, post.metrics.reach
        );
        println!("    hook: {}", post.hook);
        if let Some(link) = &post.source.link {
            println!("    link: {link}");
        }
    }
    Ok(())
}

async fn persona(cfg: &config::Config, database_url: &str, a: PersonaArgs) -> Result<()> {
    let raw = tokio::fs::read_to_string(&a.posts)
        .await
        .with_context(|| format!("failed to read {}", a.posts.display()))?;
    let posts: Vec<Post> = serde_json::from_str(&raw).context("posts file is not a post list")?;
    let posts = filter::retain_valid_posts(posts);
    if posts.is_empty() {
        bail!("{} has no posts with a valid source link", a.posts.display());
    }

    let spec = PersonaSpec {
        age: a.age,
        sex: a.sex,
        race: a.race,
        character: a.character,
        language: a.language,
        expected_reach: a.expected_reach,
        content_duration: a.duration,
        platform: a.platform,
        generation_type: a.generation_type,
    };

    let pipeline = pipeline(cfg)?;
    let Some(mut persona) = pipeline.build_persona(&spec, &posts).await else {
        bail!("persona generation failed (no source posts or unusable profile)");
    };

    if a.save {
        let repo = SqlitePersonaRepository::connect(database_url).await?;
        persona = repo.save(&persona).await?;
    }

    println!("{}", serde_json::to_string_pretty(&persona)?);
    if persona.image_ref.is_none() {
        warn!("persona has no image");
    }
    Ok(())
}

async fn video(cfg: &config::Config, database_url: &str, a: VideoArgs) -> Result<()> {
    let repo = SqlitePersonaRepository::connect(database_url).await?;
    let persona = repo
        .get(a.persona)
        .await?
        .ok_or_else(|| anyhow!("no saved persona {}", a.persona))?;

    let pipeline = pipeline(cfg)?;
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let aspect = a.aspect.unwrap_or_else(|| persona.default_aspect_ratio());
    info!(persona = %persona.name, aspect = aspect.as_str(), "starting video job");
    let media = match pipeline.build_video(&persona, aspect, &cancel).await {
        Ok(media) => media,
        Err(err) => bail!(err.user_message()),
    };
    let saved = repo.save(&persona.with_video(&media)).await?;
    println!(
        "Video for {} saved to {} ({} bytes)",
        saved.name,
        media.path.display(),
        media.size_bytes
    );
    Ok(())
}

async fn personas(database_url: &str, action: PersonasAction) -> Result<()> {
    let repo = SqlitePersonaRepository::connect(database_url).await?;
    match action {
        PersonasAction::List => {
            for p in repo.list().await? {
                let id = p.id.map(|id| id.to_string()).unwrap_or_default();
                println!(
                    "{id}  {}  {}  {}{}",
                    p.created_at.format("%Y-%m-%d %H:%M"),
                    p.name,
                    p.platform,
                    if p.video_ref.is_some() { "  [video]" } else { "" }
                );
            }
        }
        PersonasAction::Delete { id } => {
            if repo.delete(id).await? {
                println!("Deleted {id}");
            } else {
                bail!("no saved persona {id}");
            }
        }
    }
    Ok(())
}
