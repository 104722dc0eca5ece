//! Opened-day records — one row per (user, day), created exactly once when a
//! submission for that day reaches the approved state. Never updated or
//! deleted afterwards.

use super::{Database, UserOverviewRow};
use anyhow::Result;
use sqlx::PgConnection;
use std::collections::BTreeSet;

/// Insert the progress row if absent. Returns whether this call created it.
pub(crate) async fn mark_day_opened_on(
    conn: &mut PgConnection,
    user_id: i64,
    day: i32,
) -> Result<bool> {
    let result = sqlx::query(
        "INSERT INTO progress (user_id, day) VALUES ($1, $2)
         ON CONFLICT (user_id, day) DO NOTHING",
    )
    .bind(user_id)
    .bind(day)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

impl Database {
    /// Days this user has fully completed (submission adjudicated approved).
    pub async fn opened_days(&self, user_id: i64) -> Result<BTreeSet<u32>> {
        let days: Vec<i32> = sqlx::query_scalar("SELECT day FROM progress WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(days.into_iter().filter(|&d| d >= 0).map(|d| d as u32).collect())
    }

    /// Per-user opened-day counts and balances for the admin overview.
    /// `users` is populated by the auth collaborator; unknown ledger rows
    /// read as zero.
    pub async fn user_overview(&self) -> Result<Vec<UserOverviewRow>> {
        let rows = sqlx::query_as::<_, UserOverviewRow>(
            "SELECT u.id AS user_id,
                    u.username,
                    COUNT(p.day) AS opened_days,
                    COALESCE(pt.free_points, 0) AS free_points,
                    COALESCE(pt.paid_points, 0) AS paid_points
             FROM users u
             LEFT JOIN progress p ON p.user_id = u.id
             LEFT JOIN points pt ON pt.user_id = u.id
             GROUP BY u.id, u.username, pt.free_points, pt.paid_points
             ORDER BY u.username",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
