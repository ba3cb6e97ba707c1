//! Shared DTOs for the comprehend-jobs core and its service collaborators.

use serde::{Deserialize, Serialize};

pub mod job_type;
pub mod requests;
pub mod results;

pub use job_type::{JobType, LanguageCode};
pub use requests::{
    InputDataConfig, InputFormat, JobInput, JobInputBuilder, JobRequest, OutputDataConfig,
    PiiEntitiesDetectionMode, PiiMaskMode, RedactionConfig, ValidationError,
};
pub use results::{FlywheelMetrics, JobResult, ResultDetail};

/// Response of the submit collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub job_id: String,
    /// Fully-qualified job ARN, when the service returns one.
    pub job_arn: Option<String>,
}

/// One describe call's view of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Raw status string, e.g. `IN_PROGRESS`.
    pub status: String,
    /// Service-provided message; set for failed jobs.
    pub message: Option<String>,
}

impl StatusReport {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            message: None,
        }
    }

    pub fn with_message(status: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            message: Some(message.into()),
        }
    }
}

/// Response of the stop collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopAck {
    pub job_id: String,
    /// Status reported by the stop call (usually `STOP_REQUESTED`).
    pub status: Option<String>,
}

/// Error envelope returned by every service collaborator.
///
/// `retryable` is set by the transport layer: throttling, 5xx and connection
/// failures are retryable, request validation and missing jobs are not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceError {
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: String,
    pub retryable: bool,
}

impl ServiceError {
    /// A transient failure worth retrying.
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: None,
            message: message.into(),
            retryable: true,
        }
    }

    /// A permanent failure; retrying will not help.
    pub fn permanent(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: Some(code.into()),
            message: message.into(),
            retryable: false,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(status) = self.status {
            write!(f, "HTTP {} ", status)?;
        }
        if let Some(ref code) = self.code {
            write!(f, "{}: ", code)?;
        }
        write!(f, "{}", self.message)?;
        if self.retryable {
            write!(f, " (retryable)")?;
        }
        Ok(())
    }
}

impl std::error::Error for ServiceError {}
