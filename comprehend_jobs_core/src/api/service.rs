//! Remote service collaborator.
//!
//! The lifecycle core never talks to the network itself. Transport,
//! signing, wire encoding and per-request retries belong to whatever
//! implements [`JobService`]; the core only distinguishes retryable from
//! permanent failures through [`ServiceError::retryable`].

use async_trait::async_trait;
use comprehend_jobs_types::{
    JobRequest, JobResult, JobType, ServiceError, StatusReport, StopAck, SubmitResponse,
};

/// Operations the lifecycle core needs from the remote service.
#[async_trait]
pub trait JobService: Send + Sync {
    /// Start a job. One remote call.
    async fn submit(&self, request: &JobRequest) -> Result<SubmitResponse, ServiceError>;

    /// Report the job's current raw status (and message, if any).
    async fn describe(&self, job_type: JobType, job_id: &str)
        -> Result<StatusReport, ServiceError>;

    /// Retrieve the result of a completed job.
    async fn fetch_result(&self, job_type: JobType, job_id: &str)
        -> Result<JobResult, ServiceError>;

    /// Ask the service to stop a running job.
    ///
    /// Only called for job types where [`JobType::supports_stop`] is true.
    async fn stop(&self, job_type: JobType, job_id: &str) -> Result<StopAck, ServiceError>;
}
