//! Submitted job descriptors.

use chrono::{DateTime, Utc};
use comprehend_jobs_types::{JobRequest, JobType, SubmitResponse};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::ClientConfig;
use crate::errors::{CoreError, CoreResult};

/// Immutable description of one submitted job.
///
/// Created once by [`JobClient::submit`](crate::api::JobClient::submit) and
/// only read afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    job_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    job_arn: Option<String>,
    job_type: JobType,
    submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    job_name: Option<String>,
}

impl JobDescriptor {
    /// Build a descriptor from the service's submit response.
    ///
    /// The ARN comes from the response when present, otherwise it is derived
    /// from the job id and the client's partition/region/account. The job is
    /// already running remotely at this point, so a missing account only
    /// leaves the ARN unset.
    pub fn from_submission(
        request: &JobRequest,
        response: SubmitResponse,
        config: &ClientConfig,
        submitted_at: DateTime<Utc>,
    ) -> CoreResult<Self> {
        if response.job_id.trim().is_empty() {
            return Err(CoreError::Internal(
                "submit response carried an empty job id".to_string(),
            ));
        }
        let job_type = request.job_type();
        let job_arn = match response.job_arn {
            Some(arn) if !arn.is_empty() => Some(arn),
            _ => match derive_job_arn(job_type, &response.job_id, request.flywheel_arn(), config)
            {
                Ok(arn) => Some(arn),
                Err(err) => {
                    warn!(job_id = %response.job_id, error = %err, "job ARN unavailable");
                    None
                }
            },
        };
        Ok(Self {
            job_id: response.job_id,
            job_arn,
            job_type,
            submitted_at,
            job_name: request.job_name().map(String::from),
        })
    }

    /// Rebuild a descriptor for a job submitted elsewhere (e.g. by another
    /// process) so it can be awaited or cancelled.
    pub fn attach(
        job_id: impl Into<String>,
        job_arn: impl Into<String>,
        job_type: JobType,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            job_arn: Some(job_arn.into()),
            job_type,
            submitted_at,
            job_name: None,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// `None` when the service returned no ARN and none could be derived.
    pub fn job_arn(&self) -> Option<&str> {
        self.job_arn.as_deref()
    }

    pub fn job_type(&self) -> JobType {
        self.job_type
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    pub fn job_name(&self) -> Option<&str> {
        self.job_name.as_deref()
    }
}

impl std::fmt::Display for JobDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} job {}", self.job_type, self.job_id)
    }
}

/// Derive a job ARN.
///
/// Flywheel iterations live under their flywheel
/// (`<flywheel arn>/iteration/<id>`); analysis jobs live directly under the
/// account (`arn:<partition>:comprehend:<region>:<account>:<segment>/<id>`).
pub fn derive_job_arn(
    job_type: JobType,
    job_id: &str,
    flywheel_arn: Option<&str>,
    config: &ClientConfig,
) -> CoreResult<String> {
    if let (JobType::FlywheelIteration, Some(flywheel)) = (job_type, flywheel_arn) {
        return Ok(format!("{}/iteration/{}", flywheel, job_id));
    }

    let account = config.account_id.as_deref().ok_or_else(|| {
        CoreError::config("account_id is required to derive job ARNs")
    })?;
    Ok(format!(
        "arn:{}:comprehend:{}:{}:{}/{}",
        config.partition,
        config.region,
        account,
        job_type.arn_resource(),
        job_id
    ))
}
