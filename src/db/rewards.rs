//! Reward evaluator — threshold sweep and grant-once inserts.
//!
//! Grants are a one-way ratchet tied to the historical peak of a total, not
//! its current value: an admin subtraction that drops a balance back below a
//! threshold never revokes the reward. Evaluation is idempotent and safe to
//! re-run arbitrarily often; it runs after every event that can raise a
//! user's personal total, and picks up global-threshold grants lazily at the
//! same time.

use super::{Database, PointsRow, RewardRow};
use crate::config::RewardTables;
use anyhow::Result;
use serde::Serialize;
use sqlx::PgConnection;
use std::collections::HashSet;

/// Which threshold table a grant came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardScope {
    Personal,
    Global,
}

impl RewardScope {
    pub fn as_str(self) -> &'static str {
        match self {
            RewardScope::Personal => "personal",
            RewardScope::Global => "global",
        }
    }
}

/// A reward granted by the evaluation that just ran.
#[derive(Debug, Clone, Serialize)]
pub struct GrantedReward {
    pub key: String,
    pub name: String,
    pub scope: RewardScope,
}

/// Insert a grant record, deferring to the (user_id, reward_type) unique
/// constraint: a concurrent duplicate insert is a no-op, not a double grant.
async fn try_grant(
    conn: &mut PgConnection,
    user_id: i64,
    key: &str,
    scope: RewardScope,
) -> Result<bool> {
    let result = sqlx::query(
        "INSERT INTO rewards (user_id, reward_type, scope)
         VALUES ($1, $2, $3)
         ON CONFLICT (user_id, reward_type) DO NOTHING",
    )
    .bind(user_id)
    .bind(key)
    .bind(scope.as_str())
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Evaluate both threshold tables for one user and grant everything newly
/// earned. Returns only the grants created by this call.
pub(crate) async fn evaluate_and_grant_on(
    conn: &mut PgConnection,
    user_id: i64,
    tables: &RewardTables,
) -> Result<Vec<GrantedReward>> {
    let balances = sqlx::query_as::<_, PointsRow>(
        "SELECT user_id, free_points, paid_points FROM points WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?
    .unwrap_or_else(|| PointsRow::zero(user_id));
    let personal_total = balances.total();

    let granted: HashSet<String> =
        sqlx::query_scalar("SELECT reward_type FROM rewards WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&mut *conn)
            .await?
            .into_iter()
            .collect();

    let mut newly_granted = Vec::new();

    for target in &tables.personal {
        if personal_total >= target.threshold && !granted.contains(&target.key) {
            if try_grant(conn, user_id, &target.key, RewardScope::Personal).await? {
                newly_granted.push(GrantedReward {
                    key: target.key.clone(),
                    name: target.name.clone(),
                    scope: RewardScope::Personal,
                });
            }
        }
    }

    let global_total: i32 =
        sqlx::query_scalar("SELECT total_points FROM global_progress WHERE id = 1")
            .fetch_optional(&mut *conn)
            .await?
            .unwrap_or(0);

    // Global prizes are individual even though the counter is shared, so
    // they are recorded per-user like personal ones. The granted set spans
    // both tables: a tag claimed from one table is claimed, full stop.
    for target in &tables.global {
        if global_total >= target.threshold && !granted.contains(&target.key) {
            if try_grant(conn, user_id, &target.key, RewardScope::Global).await? {
                newly_granted.push(GrantedReward {
                    key: target.key.clone(),
                    name: target.name.clone(),
                    scope: RewardScope::Global,
                });
            }
        }
    }

    Ok(newly_granted)
}

impl Database {
    /// Evaluate and grant for one user. Idempotent: a second call with no
    /// intervening balance change grants nothing.
    pub async fn evaluate_and_grant(
        &self,
        user_id: i64,
        tables: &RewardTables,
    ) -> Result<Vec<GrantedReward>> {
        let mut tx = self.pool.begin().await?;
        let newly_granted = evaluate_and_grant_on(&mut tx, user_id, tables).await?;
        tx.commit().await?;
        Ok(newly_granted)
    }

    /// Everything ever granted to a user, oldest first.
    pub async fn granted_rewards(&self, user_id: i64) -> Result<Vec<RewardRow>> {
        let rows = sqlx::query_as::<_, RewardRow>(
            "SELECT id, user_id, reward_type, scope, awarded_at
             FROM rewards WHERE user_id = $1 ORDER BY awarded_at, id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
