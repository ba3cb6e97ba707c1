//! Scripted [`JobService`] for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use comprehend_jobs_types::{
    JobInput, JobRequest, JobResult, JobType, LanguageCode, ResultDetail, ServiceError,
    StatusReport, StopAck, SubmitResponse,
};
use parking_lot::Mutex;

use super::service::JobService;

pub(crate) const JOB_ID: &str = "j1";

pub(crate) fn entities_request() -> JobRequest {
    JobRequest::EntitiesDetection {
        input: JobInput::builder()
            .input_s3_uri("s3://bucket/in/")
            .output_s3_uri("s3://bucket/out/")
            .data_access_role_arn("arn:aws:iam::123456789012:role/ComprehendAccess")
            .job_name("entities-run")
            .build()
            .unwrap(),
        language_code: LanguageCode::En,
        entity_recognizer_arn: None,
    }
}

pub(crate) fn entities_result(job_id: &str) -> JobResult {
    JobResult {
        job_id: job_id.to_string(),
        output_s3_uri: Some(format!("s3://bucket/out/{job_id}/output/output.tar.gz")),
        submit_time: None,
        end_time: None,
        detail: ResultDetail::EntitiesDetection {
            language_code: LanguageCode::En,
            entity_recognizer_arn: None,
        },
    }
}

/// Describe pops scripted responses in order; once the script runs dry the
/// last successful report repeats. A stop replaces whatever is left of the
/// script with the `on_stop` script.
pub(crate) struct MockService {
    script: Mutex<VecDeque<Result<StatusReport, ServiceError>>>,
    last: Mutex<StatusReport>,
    on_stop: Mutex<Option<Vec<StatusReport>>>,
    fetch: Mutex<Result<JobResult, ServiceError>>,
    submit_error: Option<ServiceError>,
    describe_calls: AtomicU32,
    stop_calls: AtomicU32,
    fetch_calls: AtomicU32,
}

impl MockService {
    pub(crate) fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            last: Mutex::new(StatusReport::new("SUBMITTED")),
            on_stop: Mutex::new(None),
            fetch: Mutex::new(Err(ServiceError::permanent(
                "ResourceNotFoundException",
                "no result scripted",
            ))),
            submit_error: None,
            describe_calls: AtomicU32::new(0),
            stop_calls: AtomicU32::new(0),
            fetch_calls: AtomicU32::new(0),
        }
    }

    pub(crate) fn statuses(self, statuses: &[&str]) -> Self {
        self.script
            .lock()
            .extend(statuses.iter().map(|s| Ok(StatusReport::new(*s))));
        self
    }

    pub(crate) fn report(self, report: StatusReport) -> Self {
        self.script.lock().push_back(Ok(report));
        self
    }

    pub(crate) fn describe_error(self, err: ServiceError) -> Self {
        self.script.lock().push_back(Err(err));
        self
    }

    pub(crate) fn on_stop(self, statuses: &[&str]) -> Self {
        *self.on_stop.lock() = Some(statuses.iter().map(|s| StatusReport::new(*s)).collect());
        self
    }

    pub(crate) fn completes_with(self, result: JobResult) -> Self {
        *self.fetch.lock() = Ok(result);
        self
    }

    pub(crate) fn completes_with_entities(self) -> Self {
        self.completes_with(entities_result(JOB_ID))
    }

    pub(crate) fn fetch_error(self, err: ServiceError) -> Self {
        *self.fetch.lock() = Err(err);
        self
    }

    pub(crate) fn submit_error(mut self, err: ServiceError) -> Self {
        self.submit_error = Some(err);
        self
    }

    pub(crate) fn describe_calls(&self) -> u32 {
        self.describe_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn stop_calls(&self) -> u32 {
        self.stop_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn fetch_calls(&self) -> u32 {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobService for MockService {
    async fn submit(&self, request: &JobRequest) -> Result<SubmitResponse, ServiceError> {
        if let Some(err) = &self.submit_error {
            return Err(err.clone());
        }
        let job_arn = match request.job_type() {
            JobType::FlywheelIteration => None,
            job_type => Some(format!(
                "arn:aws:comprehend:us-east-1:123456789012:{}/{}",
                job_type.arn_resource(),
                JOB_ID
            )),
        };
        Ok(SubmitResponse {
            job_id: JOB_ID.to_string(),
            job_arn,
        })
    }

    async fn describe(
        &self,
        _job_type: JobType,
        _job_id: &str,
    ) -> Result<StatusReport, ServiceError> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().pop_front() {
            Some(Ok(report)) => {
                *self.last.lock() = report.clone();
                Ok(report)
            }
            Some(Err(err)) => Err(err),
            None => Ok(self.last.lock().clone()),
        }
    }

    async fn fetch_result(
        &self,
        _job_type: JobType,
        _job_id: &str,
    ) -> Result<JobResult, ServiceError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.fetch.lock().clone()
    }

    async fn stop(&self, _job_type: JobType, job_id: &str) -> Result<StopAck, ServiceError> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(statuses) = self.on_stop.lock().take() {
            let mut script = self.script.lock();
            script.clear();
            script.extend(statuses.into_iter().map(Ok));
        }
        Ok(StopAck {
            job_id: job_id.to_string(),
            status: Some("STOP_REQUESTED".to_string()),
        })
    }
}
