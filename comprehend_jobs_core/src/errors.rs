//! Core error types for the job lifecycle client.
//!
//! Errors here abort an `await` outright. Conditions the caller is expected
//! to branch on (job failed, timeout, result unavailable, ...) are reported
//! as an [`Outcome`](crate::materialize::Outcome) instead.

use comprehend_jobs_types::{JobType, ServiceError, ValidationError};
use thiserror::Error;

use crate::jobs::LifecycleState;

/// Unified error enum for the lifecycle core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The service rejected or could not accept the job request
    #[error("submission failed: {0}")]
    Submission(ServiceError),

    /// Status string outside the vocabulary for the job type
    #[error("unknown status {status:?} for {job_type} job")]
    UnknownStatus { job_type: JobType, status: String },

    /// Backward or out-of-terminal move reported by the service
    #[error("illegal transition {from} -> {to} for job {job_id}")]
    Transition {
        job_id: String,
        from: LifecycleState,
        to: LifecycleState,
    },

    /// Non-retryable collaborator failure while tracking a job
    #[error("service error: {0}")]
    Service(ServiceError),

    /// Request failed local validation
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Generic internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn unknown_status(job_type: JobType, status: impl Into<String>) -> Self {
        CoreError::UnknownStatus {
            job_type,
            status: status.into(),
        }
    }

    pub fn transition(job_id: &str, from: LifecycleState, to: LifecycleState) -> Self {
        CoreError::Transition {
            job_id: job_id.to_string(),
            from,
            to,
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        CoreError::Config(message.into())
    }

    /// Check if the service reported something the client cannot interpret.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            CoreError::UnknownStatus { .. } | CoreError::Transition { .. }
        )
    }

    /// The underlying service error, if any.
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            CoreError::Submission(err) | CoreError::Service(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for CoreError {
    fn from(err: ValidationError) -> Self {
        CoreError::Validation(err.to_string())
    }
}

/// Result type alias using CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
