//! Points ledger — per-user free/paid buckets and the global counter.
//!
//! All writes clamp to `[0, cap]` and run under row locks: the ledger is the
//! only mutator of `points` and `global_progress`, and two concurrent adds
//! for the same key must serialize rather than lose an update. Negative
//! deltas (admin corrections) silently floor at 0; callers that need a
//! user-visible "cannot remove more than the current total" check use the
//! `adjust_*` operations, which pre-check before applying.

use super::{Database, PointsRow};
use crate::config::{PointsPolicy, RewardTables};
use crate::db::rewards::{self, GrantedReward};
use anyhow::Result;
use serde::Serialize;
use sqlx::PgConnection;

/// Clamped ledger arithmetic: `current + delta` bounded to `[0, cap]`.
pub fn clamp_add(current: i32, delta: i32, cap: i32) -> i32 {
    current.saturating_add(delta).clamp(0, cap)
}

/// Apply a clamped delta to both buckets of one user's ledger, under a row
/// lock on the caller's transaction. The row is created on first touch.
pub(crate) async fn add_points_on(
    conn: &mut PgConnection,
    user_id: i64,
    free_delta: i32,
    paid_delta: i32,
    policy: &PointsPolicy,
) -> Result<PointsRow> {
    sqlx::query("INSERT INTO points (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    let current = sqlx::query_as::<_, PointsRow>(
        "SELECT user_id, free_points, paid_points FROM points WHERE user_id = $1 FOR UPDATE",
    )
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;

    let new_free = clamp_add(current.free_points, free_delta, policy.free_cap);
    let new_paid = clamp_add(current.paid_points, paid_delta, policy.paid_cap);

    sqlx::query("UPDATE points SET free_points = $2, paid_points = $3 WHERE user_id = $1")
        .bind(user_id)
        .bind(new_free)
        .bind(new_paid)
        .execute(&mut *conn)
        .await?;

    Ok(PointsRow {
        user_id,
        free_points: new_free,
        paid_points: new_paid,
    })
}

/// Apply a clamped delta to the global counter singleton, under a row lock.
pub(crate) async fn add_global_on(
    conn: &mut PgConnection,
    delta: i32,
    policy: &PointsPolicy,
) -> Result<i32> {
    sqlx::query(
        "INSERT INTO global_progress (id, total_points) VALUES (1, 0) ON CONFLICT (id) DO NOTHING",
    )
    .execute(&mut *conn)
    .await?;
    let current: i32 =
        sqlx::query_scalar("SELECT total_points FROM global_progress WHERE id = 1 FOR UPDATE")
            .fetch_one(&mut *conn)
            .await?;

    let new_total = clamp_add(current, delta, policy.global_cap);

    sqlx::query("UPDATE global_progress SET total_points = $1 WHERE id = 1")
        .bind(new_total)
        .execute(&mut *conn)
        .await?;

    Ok(new_total)
}

/// Result of an admin point adjustment.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdjustOutcome {
    Applied {
        balances: PointsRow,
        newly_granted: Vec<GrantedReward>,
    },
    /// The requested subtraction exceeds the current total; nothing changed.
    InsufficientBalance { requested: i32, available: i32 },
}

/// Result of an admin adjustment to the global counter.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GlobalAdjustOutcome {
    Applied { total: i32 },
    InsufficientBalance { requested: i32, available: i32 },
}

impl Database {
    /// Add (or subtract) points on a user's ledger, then re-evaluate that
    /// user's rewards in the same transaction. Balances clamp to
    /// `[0, cap]` on both buckets regardless of delta sign.
    pub async fn add_points(
        &self,
        user_id: i64,
        free_delta: i32,
        paid_delta: i32,
        policy: &PointsPolicy,
        tables: &RewardTables,
    ) -> Result<(PointsRow, Vec<GrantedReward>)> {
        let mut tx = self.pool.begin().await?;
        let balances = add_points_on(&mut tx, user_id, free_delta, paid_delta, policy).await?;
        let newly_granted = rewards::evaluate_and_grant_on(&mut tx, user_id, tables).await?;
        tx.commit().await?;
        Ok((balances, newly_granted))
    }

    /// Add (or subtract) points on the global counter. Grants driven by the
    /// new total reach each user lazily, on that user's next evaluation.
    pub async fn add_global_points(&self, delta: i32, policy: &PointsPolicy) -> Result<i32> {
        let mut tx = self.pool.begin().await?;
        let total = add_global_on(&mut tx, delta, policy).await?;
        tx.commit().await?;
        Ok(total)
    }

    /// Current balances; 0/0 for users with no ledger row.
    pub async fn get_points(&self, user_id: i64) -> Result<PointsRow> {
        let row = sqlx::query_as::<_, PointsRow>(
            "SELECT user_id, free_points, paid_points FROM points WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.unwrap_or_else(|| PointsRow::zero(user_id)))
    }

    /// Current global total; 0 when uninitialized.
    pub async fn get_global_points(&self) -> Result<i32> {
        let total: Option<i32> =
            sqlx::query_scalar("SELECT total_points FROM global_progress WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;
        Ok(total.unwrap_or(0))
    }

    /// Admin adjustment of a user's free bucket. A subtraction larger than
    /// the user's free+paid total is refused with the amounts involved; the
    /// ledger itself would floor silently, so the check happens here, before
    /// anything is written.
    pub async fn adjust_user_points(
        &self,
        user_id: i64,
        delta: i32,
        policy: &PointsPolicy,
        tables: &RewardTables,
    ) -> Result<AdjustOutcome> {
        if delta < 0 {
            let available = self.get_points(user_id).await?.total();
            let requested = -delta;
            if requested > available {
                return Ok(AdjustOutcome::InsufficientBalance {
                    requested,
                    available,
                });
            }
        }
        let (balances, newly_granted) =
            self.add_points(user_id, delta, 0, policy, tables).await?;
        Ok(AdjustOutcome::Applied {
            balances,
            newly_granted,
        })
    }

    /// Admin adjustment of the global counter, with the same refuse-on-
    /// oversubtraction policy as [`Database::adjust_user_points`].
    pub async fn adjust_global_points(
        &self,
        delta: i32,
        policy: &PointsPolicy,
    ) -> Result<GlobalAdjustOutcome> {
        if delta < 0 {
            let available = self.get_global_points().await?;
            let requested = -delta;
            if requested > available {
                return Ok(GlobalAdjustOutcome::InsufficientBalance {
                    requested,
                    available,
                });
            }
        }
        let total = self.add_global_points(delta, policy).await?;
        Ok(GlobalAdjustOutcome::Applied { total })
    }
}
