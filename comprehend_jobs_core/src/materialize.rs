//! Turning terminal states into outcomes.

use comprehend_jobs_types::JobResult;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::JobService;
use crate::descriptor::JobDescriptor;
use crate::errors::{CoreError, CoreResult};
use crate::jobs::LifecycleState;

/// Why an await ended without a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// `max_total_wait` elapsed; the job is left running remotely
    Timeout,
    /// Describe kept failing with retryable errors
    TransientExhausted,
    /// The job itself ended `FAILED`
    JobFailed,
    /// The job completed but its result could not be fetched
    ResultUnavailable,
    /// The job sat in one non-terminal state past the configured ceiling
    Stalled,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::TransientExhausted => "transient_exhausted",
            FailureKind::JobFailed => "job_failed",
            FailureKind::ResultUnavailable => "result_unavailable",
            FailureKind::Stalled => "stalled",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Final result of awaiting a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Success { result: JobResult },
    Failure { kind: FailureKind, message: String },
    Cancelled,
}

impl Outcome {
    pub fn success(result: JobResult) -> Self {
        Outcome::Success { result }
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Outcome::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Outcome::Failure { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&JobResult> {
        match self {
            Outcome::Success { result } => Some(result),
            _ => None,
        }
    }

    pub fn into_result(self) -> Option<JobResult> {
        match self {
            Outcome::Success { result } => Some(result),
            _ => None,
        }
    }
}

/// Builds the [`Outcome`] for a job that reached a terminal state.
pub struct ResultMaterializer<'a> {
    service: &'a dyn JobService,
}

impl<'a> ResultMaterializer<'a> {
    pub fn new(service: &'a dyn JobService) -> Self {
        Self { service }
    }

    /// Map a terminal state to an outcome.
    ///
    /// `message` is the service's status message; for `Failed` it is passed
    /// through verbatim. Calling this with a non-terminal state is a bug in
    /// the caller.
    pub async fn materialize(
        &self,
        descriptor: &JobDescriptor,
        state: LifecycleState,
        message: Option<String>,
    ) -> CoreResult<Outcome> {
        let job_id = descriptor.job_id();
        match state {
            LifecycleState::Completed => Ok(self.fetch(descriptor).await),
            LifecycleState::Failed => {
                let message = message.unwrap_or_default();
                info!(job_id, message = %message, "job failed");
                Ok(Outcome::failure(FailureKind::JobFailed, message))
            }
            LifecycleState::Stopped => Ok(Outcome::Cancelled),
            other => Err(CoreError::Internal(format!(
                "cannot materialize job {} in non-terminal state {}",
                job_id, other
            ))),
        }
    }

    async fn fetch(&self, descriptor: &JobDescriptor) -> Outcome {
        let job_id = descriptor.job_id();
        let job_type = descriptor.job_type();
        match self.service.fetch_result(job_type, job_id).await {
            Ok(result) if result.job_type() != job_type => {
                let message = format!(
                    "result for job {} has shape {} but the job is {}",
                    job_id,
                    result.job_type(),
                    job_type
                );
                warn!(job_id, "{}", message);
                Outcome::failure(FailureKind::ResultUnavailable, message)
            }
            Ok(result) => Outcome::success(result),
            Err(err) => {
                warn!(job_id, error = %err, "job completed but result fetch failed");
                Outcome::failure(
                    FailureKind::ResultUnavailable,
                    format!("job {} completed but its result could not be fetched: {}", job_id, err),
                )
            }
        }
    }
}
