//! Task catalog — per-day task definitions, seeded once at provisioning and
//! read-only to the rest of the core. There is no edit endpoint; re-running
//! the seed refreshes title and body without disturbing live state.

use super::{Database, TaskRow};
use crate::submission::{CreditBucket, ResponseType};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// One `[[task]]` entry in a seed file.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskSeed {
    pub day: u32,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub hint: Option<String>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    #[serde(default = "default_published")]
    pub published: bool,
    #[serde(default = "default_response")]
    pub response: ResponseType,
    #[serde(default)]
    pub points_personal: i32,
    #[serde(default)]
    pub points_global: i32,
    #[serde(default = "default_bucket")]
    pub bucket: CreditBucket,
}

fn default_published() -> bool {
    true
}

fn default_response() -> ResponseType {
    ResponseType::File
}

fn default_bucket() -> CreditBucket {
    CreditBucket::Free
}

#[derive(Deserialize)]
struct SeedFile {
    #[serde(default)]
    task: Vec<TaskSeed>,
}

/// Parse a TOML seed file into task definitions.
pub fn load_seed_file(path: &Path) -> Result<Vec<TaskSeed>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read task seed file {}", path.display()))?;
    let file: SeedFile = toml::from_str(&content)
        .with_context(|| format!("failed to parse task seed file {}", path.display()))?;
    Ok(file.task)
}

const TASK_COLUMNS: &str = "day, title, body, hint, image_url, video_url, is_published, \
                            response_type, points_personal, points_global, credit_bucket";

impl Database {
    /// Look up a task by day, published or not.
    pub async fn get_task(&self, day: u32) -> Result<Option<TaskRow>> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE day = $1"
        ))
        .bind(day as i32)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Look up a task by day, visible to users only when published.
    pub async fn get_published_task(&self, day: u32) -> Result<Option<TaskRow>> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE day = $1 AND is_published"
        ))
        .bind(day as i32)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// The full catalog, ordered by day.
    pub async fn list_tasks(&self) -> Result<Vec<TaskRow>> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks ORDER BY day"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Upsert one task by day. On conflict only title and body refresh, so
    /// re-seeding cannot flip a task's yields or response type under a
    /// season already in flight.
    pub async fn upsert_task(&self, seed: &TaskSeed) -> Result<()> {
        sqlx::query(
            "INSERT INTO tasks (day, title, body, hint, image_url, video_url, is_published,
                                response_type, points_personal, points_global, credit_bucket)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             ON CONFLICT (day) DO UPDATE SET
               title = EXCLUDED.title,
               body = EXCLUDED.body",
        )
        .bind(seed.day as i32)
        .bind(&seed.title)
        .bind(&seed.body)
        .bind(&seed.hint)
        .bind(&seed.image_url)
        .bind(&seed.video_url)
        .bind(seed.published)
        .bind(seed.response.as_str())
        .bind(seed.points_personal)
        .bind(seed.points_global)
        .bind(seed.bucket.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Seed the catalog from parsed task definitions. Idempotent.
    pub async fn seed_tasks(&self, seeds: &[TaskSeed]) -> Result<usize> {
        for seed in seeds {
            self.upsert_task(seed).await?;
        }
        Ok(seeds.len())
    }
}
