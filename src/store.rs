//! Saved personas. The pipeline never touches this; the outer layer owns it.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::model::{GenerationType, Persona};

#[async_trait]
pub trait PersonaRepository: Send + Sync {
    /// Insert or overwrite. A persona without an id gets a fresh one; the
    /// stored value is returned.
    async fn save(&self, persona: &Persona) -> Result<Persona>;

    /// Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Newest first.
    async fn list(&self) -> Result<Vec<Persona>>;

    async fn get(&self, id: Uuid) -> Result<Option<Persona>>;
}

#[derive(Debug, Clone)]
pub struct SqlitePersonaRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct PersonaRow {
    id: String,
    name: String,
    bio: String,
    strategy: String,
    visual_description: String,
    platform: String,
    generation_type: String,
    scripts: Option<String>,
    image_ref: Option<String>,
    video_ref: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PersonaRow> for Persona {
    type Error = anyhow::Error;

    fn try_from(row: PersonaRow) -> Result<Self> {
        let id = Uuid::parse_str(&row.id).with_context(|| format!("corrupt persona id {}", row.id))?;
        let generation_type = GenerationType::parse(&row.generation_type)
            .ok_or_else(|| anyhow!("unknown generation type {} on persona {id}", row.generation_type))?;
        Ok(Persona {
            id: Some(id),
            name: row.name,
            bio: row.bio,
            strategy: row.strategy,
            visual_description: row.visual_description,
            platform: row.platform,
            generation_type,
            scripts: row.scripts,
            image_ref: row.image_ref,
            video_ref: row.video_ref,
            created_at: row.created_at,
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT id, name, bio, strategy, visual_description, platform, generation_type, scripts, image_ref, video_ref, created_at FROM personas";

impl SqlitePersonaRepository {
    /// Open (creating if needed) the database at `database_url` and apply
    /// migrations.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid database url {database_url}"))?
            .create_if_missing(true);
        if let Some(parent) = options.clone().get_filename().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let pool = SqlitePoolOptions::new()
            // one connection keeps `sqlite::memory:` databases alive and shared
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await
            .context("failed to open persona database")?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl PersonaRepository for SqlitePersonaRepository {
    #[instrument(skip_all)]
    async fn save(&self, persona: &Persona) -> Result<Persona> {
        let mut stored = persona.clone();
        let id = *stored.id.get_or_insert_with(Uuid::new_v4);
        sqlx::query(
            "INSERT INTO personas (id, name, bio, strategy, visual_description, platform, generation_type, scripts, image_ref, video_ref, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
               name = excluded.name, bio = excluded.bio, strategy = excluded.strategy, \
               visual_description = excluded.visual_description, platform = excluded.platform, \
               generation_type = excluded.generation_type, \
               scripts = excluded.scripts, image_ref = excluded.image_ref, video_ref = excluded.video_ref, \
               updated_at = CURRENT_TIMESTAMP",
        )
        .bind(id.to_string())
        .bind(&stored.name)
        .bind(&stored.bio)
        .bind(&stored.strategy)
        .bind(&stored.visual_description)
        .bind(&stored.platform)
        .bind(stored.generation_type.code())
        .bind(&stored.scripts)
        .bind(&stored.image_ref)
        .bind(&stored.video_ref)
        .bind(stored.created_at)
        .execute(&self.pool)
        .await
        .context("failed to save persona")?;
        info!(%id, name = %stored.name, "persona saved");
        Ok(stored)
    }

    #[instrument(skip_all)]
    async fn delete(&self, id: Uuid) -> Result<bool> {
        let res = sqlx::query("DELETE FROM personas WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    #[instrument(skip_all)]
    async fn list(&self) -> Result<Vec<Persona>> {
        let rows: Vec<PersonaRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} ORDER BY created_at DESC, rowid DESC"))
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(Persona::try_from).collect()
    }

    #[instrument(skip_all)]
    async fn get(&self, id: Uuid) -> Result<Option<Persona>> {
        let row: Option<PersonaRow> = sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Persona::try_from).transpose()
    }
}
