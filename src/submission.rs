//! # Submission — Domain Types and Payload Validation
//!
//! A submission moves `none → pending → {approved, rejected}`. Everything a
//! submit request can be refused for is a typed [`SubmitRejection`] carrying
//! its user-facing message; refusals never mutate state. The storage layer
//! (`db::submissions`) enforces the same transitions under row locks and
//! backstops the duplicate check with a partial unique index.

use crate::config::UploadPolicy;
use serde::{Deserialize, Serialize};

/// Which response field a task requires. Authoritative per task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    Text,
    File,
}

impl ResponseType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseType::Text => "text",
            ResponseType::File => "file",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(ResponseType::Text),
            "file" => Some(ResponseType::File),
            _ => None,
        }
    }
}

/// Which of the submitter's two ledger buckets receives the personal yield
/// on approval. (Historically a boolean named `is_paid`, which gated the
/// destination bucket, not payment.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreditBucket {
    Free,
    Paid,
}

impl CreditBucket {
    pub fn as_str(self) -> &'static str {
        match self {
            CreditBucket::Free => "free",
            CreditBucket::Paid => "paid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "free" => Some(CreditBucket::Free),
            "paid" => Some(CreditBucket::Paid),
            _ => None,
        }
    }
}

/// Review state of a submission. `Approved` and `Rejected` are terminal;
/// only rejected rows may be superseded by a fresh submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SubmissionStatus::Pending),
            "approved" => Some(SubmissionStatus::Approved),
            "rejected" => Some(SubmissionStatus::Rejected),
            _ => None,
        }
    }
}

/// Raw response as received from the HTTP layer. For file tasks the upload
/// collaborator has already stored the bytes; only the opaque reference
/// reaches the core.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionPayload {
    pub text: Option<String>,
    pub file_ref: Option<String>,
}

/// Payload after validation against the task's response type. Exactly one
/// variant is stored on the submission row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatedResponse {
    Text(String),
    File(String),
}

/// Why a submit request was refused. No state change accompanies any of
/// these; the message is surfaced to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitRejection {
    #[error("day {0} is not on the calendar")]
    InvalidDay(u32),
    #[error("the task for day {0} is not published")]
    TaskUnpublished(u32),
    #[error("day {0} is not open yet")]
    DayNotOpen(u32),
    #[error("a response for day {0} was already submitted")]
    AlreadySubmitted(u32),
    #[error("this task expects a text response")]
    ExpectedText,
    #[error("this task expects a file response")]
    ExpectedFile,
    #[error("the response text is empty")]
    EmptyText,
    #[error("the file reference is empty")]
    EmptyFileRef,
    #[error("the file type is not allowed")]
    ExtensionNotAllowed,
}

/// Validate a raw payload against the task's response type and the upload
/// allow-list. Text is trimmed; file references are stored verbatim.
pub fn validate_payload(
    response_type: ResponseType,
    payload: &SubmissionPayload,
    uploads: &UploadPolicy,
) -> Result<ValidatedResponse, SubmitRejection> {
    match response_type {
        ResponseType::Text => {
            let text = payload.text.as_deref().ok_or(SubmitRejection::ExpectedText)?;
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Err(SubmitRejection::EmptyText);
            }
            Ok(ValidatedResponse::Text(trimmed.to_string()))
        }
        ResponseType::File => {
            let file_ref = payload
                .file_ref
                .as_deref()
                .ok_or(SubmitRejection::ExpectedFile)?;
            if file_ref.trim().is_empty() {
                return Err(SubmitRejection::EmptyFileRef);
            }
            let extension = file_ref
                .rsplit_once('.')
                .map(|(_, ext)| ext)
                .ok_or(SubmitRejection::ExtensionNotAllowed)?;
            if !uploads.is_allowed(extension) {
                return Err(SubmitRejection::ExtensionNotAllowed);
            }
            Ok(ValidatedResponse::File(file_ref.to_string()))
        }
    }
}
