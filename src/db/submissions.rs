//! Submission state machine — create, approve, reject.
//!
//! `submit` runs every precondition before inserting a pending row, and the
//! partial unique index on (user_id, day) backstops the duplicate check
//! against concurrent submits. `approve` is one transaction:
//! status transition, both ledger credits, reward evaluation, and the
//! opened-day record commit together or not at all.

use super::{Database, PointsRow, SubmissionDetailRow, SubmissionRow, TaskRow};
use crate::calendar;
use crate::config::{AppConfig, PointsPolicy, RewardTables};
use crate::db::rewards::GrantedReward;
use crate::db::{points, progress, rewards};
use crate::submission::{
    validate_payload, CreditBucket, SubmissionPayload, SubmissionStatus, SubmitRejection,
    ValidatedResponse,
};
use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use serde::Serialize;

const SUBMISSION_COLUMNS: &str =
    "id, user_id, day, file_ref, text_body, submitted_at, status, reviewed_at";

/// Result of a submit attempt. Rejections carry their user-facing reason and
/// guarantee no state change occurred.
#[derive(Debug)]
pub enum SubmitOutcome {
    Accepted(SubmissionRow),
    Rejected(SubmitRejection),
}

/// Everything an approval changed, for logging and the admin response.
#[derive(Debug, Serialize)]
pub struct ApprovalSummary {
    pub submission_id: i64,
    pub user_id: i64,
    pub day: i32,
    pub bucket: CreditBucket,
    pub credited_personal: i32,
    pub credited_global: i32,
    pub balances: PointsRow,
    pub global_total: i32,
    pub newly_granted: Vec<GrantedReward>,
    pub day_newly_opened: bool,
}

/// Result of an approve attempt.
#[derive(Debug)]
pub enum ApproveOutcome {
    Approved(Box<ApprovalSummary>),
    /// The submission is no longer pending; nothing changed.
    AlreadyProcessed,
    NotFound,
}

/// Result of a reject attempt.
#[derive(Debug)]
pub enum RejectOutcome {
    Rejected,
    AlreadyProcessed,
    NotFound,
}

impl Database {
    /// Submit a response for a day. Requires a published task, an open door,
    /// no existing non-rejected submission, and a payload matching the
    /// task's response type. Any violation is returned as a rejection with
    /// no state change.
    pub async fn submit(
        &self,
        user_id: i64,
        day: u32,
        payload: &SubmissionPayload,
        config: &AppConfig,
        today: NaiveDate,
    ) -> Result<SubmitOutcome> {
        if calendar::door_date(&config.season, day).is_none() {
            return Ok(SubmitOutcome::Rejected(SubmitRejection::InvalidDay(day)));
        }
        let Some(task) = self.get_published_task(day).await? else {
            return Ok(SubmitOutcome::Rejected(SubmitRejection::TaskUnpublished(day)));
        };
        if !calendar::is_day_open(&config.season, day, today) {
            return Ok(SubmitOutcome::Rejected(SubmitRejection::DayNotOpen(day)));
        }
        if self.active_submission(user_id, day).await?.is_some() {
            return Ok(SubmitOutcome::Rejected(SubmitRejection::AlreadySubmitted(day)));
        }
        let response = match validate_payload(task.response_type(), payload, &config.uploads) {
            Ok(response) => response,
            Err(rejection) => return Ok(SubmitOutcome::Rejected(rejection)),
        };

        let (file_ref, text_body) = match response {
            ValidatedResponse::Text(text) => (None, Some(text)),
            ValidatedResponse::File(file_ref) => (Some(file_ref), None),
        };
        let insert = sqlx::query_as::<_, SubmissionRow>(&format!(
            "INSERT INTO submissions (user_id, day, file_ref, text_body)
             VALUES ($1, $2, $3, $4)
             RETURNING {SUBMISSION_COLUMNS}"
        ))
        .bind(user_id)
        .bind(day as i32)
        .bind(file_ref)
        .bind(text_body)
        .fetch_one(&self.pool)
        .await;

        match insert {
            Ok(row) => Ok(SubmitOutcome::Accepted(row)),
            // Concurrent submit lost the race to the partial unique index.
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(
                SubmitOutcome::Rejected(SubmitRejection::AlreadySubmitted(day)),
            ),
            Err(e) => Err(e.into()),
        }
    }

    /// Approve a pending submission and apply its full effect as one unit:
    /// credit the personal yield into the task's bucket, credit the global
    /// counter, re-evaluate rewards, and mark the day opened. Re-approval is
    /// a no-op reporting `AlreadyProcessed`.
    pub async fn approve_submission(
        &self,
        submission_id: i64,
        policy: &PointsPolicy,
        tables: &RewardTables,
    ) -> Result<ApproveOutcome> {
        let mut tx = self.pool.begin().await?;

        let submission = sqlx::query_as::<_, SubmissionRow>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = $1 FOR UPDATE"
        ))
        .bind(submission_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(submission) = submission else {
            return Ok(ApproveOutcome::NotFound);
        };
        if submission.status() != SubmissionStatus::Pending {
            return Ok(ApproveOutcome::AlreadyProcessed);
        }

        let task = sqlx::query_as::<_, TaskRow>(
            "SELECT day, title, body, hint, image_url, video_url, is_published,
                    response_type, points_personal, points_global, credit_bucket
             FROM tasks WHERE day = $1",
        )
        .bind(submission.day)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| anyhow!("no task exists for day {}", submission.day))?;

        sqlx::query("UPDATE submissions SET status = 'approved', reviewed_at = NOW() WHERE id = $1")
            .bind(submission_id)
            .execute(&mut *tx)
            .await?;

        let bucket = task.credit_bucket();
        let (free_delta, paid_delta) = match bucket {
            CreditBucket::Free => (task.points_personal, 0),
            CreditBucket::Paid => (0, task.points_personal),
        };
        let balances =
            points::add_points_on(&mut tx, submission.user_id, free_delta, paid_delta, policy)
                .await?;
        let global_total = points::add_global_on(&mut tx, task.points_global, policy).await?;
        let newly_granted = rewards::evaluate_and_grant_on(&mut tx, submission.user_id, tables).await?;
        let day_newly_opened =
            progress::mark_day_opened_on(&mut tx, submission.user_id, submission.day).await?;

        tx.commit().await?;

        Ok(ApproveOutcome::Approved(Box::new(ApprovalSummary {
            submission_id,
            user_id: submission.user_id,
            day: submission.day,
            bucket,
            credited_personal: task.points_personal,
            credited_global: task.points_global,
            balances,
            global_total,
            newly_granted,
            day_newly_opened,
        })))
    }

    /// Reject a pending submission. Terminal, credits nothing, creates no
    /// progress row; the user may submit again for the same day.
    pub async fn reject_submission(&self, submission_id: i64) -> Result<RejectOutcome> {
        let mut tx = self.pool.begin().await?;

        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM submissions WHERE id = $1 FOR UPDATE")
                .bind(submission_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(status) = status else {
            return Ok(RejectOutcome::NotFound);
        };
        if SubmissionStatus::parse(&status) != Some(SubmissionStatus::Pending) {
            return Ok(RejectOutcome::AlreadyProcessed);
        }

        sqlx::query("UPDATE submissions SET status = 'rejected', reviewed_at = NOW() WHERE id = $1")
            .bind(submission_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(RejectOutcome::Rejected)
    }

    /// Review queue: every submission joined with username and task yields,
    /// newest first.
    pub async fn list_submissions(&self) -> Result<Vec<SubmissionDetailRow>> {
        let rows = sqlx::query_as::<_, SubmissionDetailRow>(
            "SELECT s.id, s.user_id,
                    COALESCE(u.username, 'user ' || s.user_id::text) AS username,
                    s.day, s.file_ref, s.text_body, s.submitted_at, s.status,
                    t.title, t.response_type, t.points_personal, t.points_global, t.credit_bucket
             FROM submissions s
             JOIN tasks t ON t.day = s.day
             LEFT JOIN users u ON u.id = s.user_id
             ORDER BY s.submitted_at DESC, s.id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// The user's non-rejected submission for a day, if any. This is the row
    /// the duplicate check counts.
    pub async fn active_submission(&self, user_id: i64, day: u32) -> Result<Option<SubmissionRow>> {
        let row = sqlx::query_as::<_, SubmissionRow>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions
             WHERE user_id = $1 AND day = $2 AND status <> 'rejected'"
        ))
        .bind(user_id)
        .bind(day as i32)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// The user's most recent submission for a day, rejected ones included —
    /// the day view shows a rejection so the user knows to try again.
    pub async fn latest_submission(&self, user_id: i64, day: u32) -> Result<Option<SubmissionRow>> {
        let row = sqlx::query_as::<_, SubmissionRow>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions
             WHERE user_id = $1 AND day = $2
             ORDER BY submitted_at DESC, id DESC
             LIMIT 1"
        ))
        .bind(user_id)
        .bind(day as i32)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
