//! # Database — PostgreSQL Storage Layer
//!
//! Owns every row the calendar core mutates: points ledgers, the global
//! counter singleton, submissions, opened-day progress, and reward grants.
//! The task catalog is read-mostly (seeded once); `users` is populated by the
//! auth collaborator and only joined for display names.
//!
//! ## Module Structure
//!
//! - [`points`] — per-user ledgers and the global counter, clamped writes
//! - [`rewards`] — threshold evaluation and grant-once inserts
//! - [`submissions`] — the pending → approved/rejected state machine
//! - [`progress`] — opened-day records
//! - [`tasks`] — catalog reads and one-time seeding
//!
//! ## Locking Discipline
//!
//! Every read-modify-write (ledger adds, status transitions) runs inside a
//! transaction with `SELECT ... FOR UPDATE` row locks, so concurrent
//! approvals for the same user serialize instead of losing updates. Grant
//! and uniqueness races additionally fail closed on database constraints.

pub mod points;
pub mod progress;
pub mod rewards;
pub mod submissions;
pub mod tasks;

use crate::submission::{CreditBucket, ResponseType, SubmissionStatus};
use anyhow::Result;
use serde::Serialize;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

/// Schema applied by `adventide migrate` and the test harness.
pub const SCHEMA_SQL: &str = include_str!("../../migrations/001_init.sql");

// ── Row types ───────────────────────────────────────────────────

/// A door's task definition. Immutable after seeding; read-only to the core.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TaskRow {
    pub day: i32,
    pub title: String,
    pub body: String,
    pub hint: Option<String>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub is_published: bool,
    pub response_type: String,
    pub points_personal: i32,
    pub points_global: i32,
    pub credit_bucket: String,
}

impl TaskRow {
    /// Typed view of the stored response type. The column carries a CHECK
    /// constraint; anything unexpected falls back to the column default.
    pub fn response_type(&self) -> ResponseType {
        ResponseType::parse(&self.response_type).unwrap_or(ResponseType::File)
    }

    /// Which of the submitter's buckets receives `points_personal`.
    pub fn credit_bucket(&self) -> CreditBucket {
        CreditBucket::parse(&self.credit_bucket).unwrap_or(CreditBucket::Free)
    }
}

/// A user's two ledger buckets. Absent rows read as 0/0.
#[derive(Debug, Clone, Copy, Serialize, sqlx::FromRow)]
pub struct PointsRow {
    pub user_id: i64,
    pub free_points: i32,
    pub paid_points: i32,
}

impl PointsRow {
    pub fn zero(user_id: i64) -> Self {
        PointsRow {
            user_id,
            free_points: 0,
            paid_points: 0,
        }
    }

    /// Personal total driving the personal reward thresholds.
    pub fn total(&self) -> i32 {
        self.free_points + self.paid_points
    }
}

/// One submission attempt for a (user, day).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SubmissionRow {
    pub id: i64,
    pub user_id: i64,
    pub day: i32,
    pub file_ref: Option<String>,
    pub text_body: Option<String>,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
    pub status: String,
    pub reviewed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl SubmissionRow {
    pub fn status(&self) -> SubmissionStatus {
        SubmissionStatus::parse(&self.status).unwrap_or(SubmissionStatus::Pending)
    }
}

/// Review-queue entry: submission joined with the submitter's username and
/// the task's yield metadata.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SubmissionDetailRow {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub day: i32,
    pub file_ref: Option<String>,
    pub text_body: Option<String>,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
    pub status: String,
    pub title: String,
    pub response_type: String,
    pub points_personal: i32,
    pub points_global: i32,
    pub credit_bucket: String,
}

/// A granted reward record. At most one per (user, reward_type), ever.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RewardRow {
    pub id: i64,
    pub user_id: i64,
    pub reward_type: String,
    pub scope: String,
    pub awarded_at: chrono::DateTime<chrono::Utc>,
}

/// Per-user stats line for the admin overview.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserOverviewRow {
    pub user_id: i64,
    pub username: String,
    pub opened_days: i64,
    pub free_points: i32,
    pub paid_points: i32,
}

// ── Database struct and connection ──────────────────────────────

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL using the provided database URL.
    ///
    /// Manually parses the URL to preserve the full username — sqlx's built-in
    /// parser strips suffixes some managed-Postgres poolers require.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let url = url::Url::parse(database_url)?;
        let username = urlencoding::decode(url.username())?.into_owned();
        let password = url
            .password()
            .map(|p| urlencoding::decode(p).map(|s| s.into_owned()))
            .transpose()?;
        let mut opts = PgConnectOptions::new()
            .host(url.host_str().unwrap_or("localhost"))
            .port(url.port().unwrap_or(5432))
            .database(url.path().trim_start_matches('/'))
            .username(&username)
            .statement_cache_capacity(0);
        if let Some(ref pw) = password {
            opts = opts.password(pw);
        }
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await?;
        Ok(Database { pool })
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the embedded schema. Idempotent; every statement is
    /// `IF NOT EXISTS` / `ON CONFLICT DO NOTHING`.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Health check: execute `SELECT 1` to verify database connectivity.
    /// Backs the `/readyz` readiness probe.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_row_falls_back_to_column_defaults() {
        let row = TaskRow {
            day: 1,
            title: "t".into(),
            body: String::new(),
            hint: None,
            image_url: None,
            video_url: None,
            is_published: true,
            response_type: "bogus".into(),
            points_personal: 0,
            points_global: 0,
            credit_bucket: "bogus".into(),
        };
        assert_eq!(row.response_type(), ResponseType::File);
        assert_eq!(row.credit_bucket(), CreditBucket::Free);
    }

    #[test]
    fn points_total_sums_both_buckets() {
        let row = PointsRow {
            user_id: 1,
            free_points: 600,
            paid_points: 150,
        };
        assert_eq!(row.total(), 750);
        assert_eq!(PointsRow::zero(9).total(), 0);
    }
}
