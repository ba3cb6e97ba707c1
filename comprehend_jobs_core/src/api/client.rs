//! Job client.
//!
//! The `JobClient` is the primary entry point: submit a job, await its
//! outcome, cancel it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use comprehend_jobs_types::JobRequest;
use parking_lot::Mutex;
use tracing::info;

use crate::config::ClientConfig;
use crate::descriptor::JobDescriptor;
use crate::errors::{CoreError, CoreResult};
use crate::materialize::{Outcome, ResultMaterializer};
use crate::polling::{CancelSignal, PollAttempt, PollFinish, PollPolicy, PollingScheduler};

use super::service::JobService;

/// Outcome of an await together with the status observations behind it.
#[derive(Debug, Clone)]
pub struct AwaitReport {
    pub outcome: Outcome,
    pub attempts: Vec<PollAttempt>,
}

/// What [`JobClient::cancel`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelDisposition {
    /// An await was in flight; it will issue the stop request and wind down.
    Signalled,
    /// No await was in flight; a stop request was sent directly.
    StopRequested,
    /// No await was in flight and the job type cannot be stopped.
    Unsupported,
}

struct InFlight {
    signal: CancelSignal,
    waiters: usize,
}

type Registry = Arc<Mutex<HashMap<String, InFlight>>>;

/// Deregisters an await when it finishes or is dropped.
struct InFlightGuard {
    registry: Registry,
    job_id: String,
    signal: CancelSignal,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut map = self.registry.lock();
        if let Some(entry) = map.get_mut(&self.job_id) {
            entry.waiters = entry.waiters.saturating_sub(1);
            if entry.waiters == 0 {
                map.remove(&self.job_id);
            }
        }
    }
}

/// Client for submitting, awaiting and cancelling asynchronous jobs.
///
/// Cheap to share behind an `Arc`; concurrent awaits (of different jobs or
/// of the same job) each run their own poll loop.
///
/// # Example
///
/// ```ignore
/// let client = JobClient::new(service, ClientConfig::default());
/// let job = client.submit(request).await?;
/// match client.await_job(&job, &PollPolicy::default()).await? {
///     Outcome::Success { result } => println!("{:?}", result.output_s3_uri),
///     Outcome::Failure { kind, message } => eprintln!("{kind}: {message}"),
///     Outcome::Cancelled => {}
/// }
/// ```
pub struct JobClient {
    service: Arc<dyn JobService>,
    config: ClientConfig,
    in_flight: Registry,
}

impl JobClient {
    pub fn new(service: Arc<dyn JobService>, config: ClientConfig) -> Self {
        Self {
            service,
            config,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Submit a job.
    ///
    /// The request is validated locally first. Service-side rejection or
    /// transport failure surfaces as [`CoreError::Submission`] and is never
    /// retried here.
    pub async fn submit(&self, request: JobRequest) -> CoreResult<JobDescriptor> {
        request.validate()?;
        let submitted_at = Utc::now();
        let response = self
            .service
            .submit(&request)
            .await
            .map_err(CoreError::Submission)?;
        let descriptor =
            JobDescriptor::from_submission(&request, response, &self.config, submitted_at)?;
        info!(
            job_id = descriptor.job_id(),
            job_type = %descriptor.job_type(),
            job_arn = ?descriptor.job_arn(),
            "job submitted"
        );
        Ok(descriptor)
    }

    /// Wait for a job to finish and return its outcome.
    pub async fn await_job(
        &self,
        descriptor: &JobDescriptor,
        policy: &PollPolicy,
    ) -> CoreResult<Outcome> {
        Ok(self.await_with_history(descriptor, policy).await?.outcome)
    }

    /// [`JobClient::await_job`] with the client's configured poll policy.
    pub async fn await_default(&self, descriptor: &JobDescriptor) -> CoreResult<Outcome> {
        let policy = self.config.poll.clone();
        self.await_job(descriptor, &policy).await
    }

    /// Wait for a job and also return every status observation.
    pub async fn await_with_history(
        &self,
        descriptor: &JobDescriptor,
        policy: &PollPolicy,
    ) -> CoreResult<AwaitReport> {
        policy.validate()?;
        let guard = self.register(descriptor.job_id());

        let report = PollingScheduler::new(self.service.as_ref(), policy)
            .run(descriptor, &guard.signal)
            .await?;

        let outcome = match report.finish {
            PollFinish::Terminal { state, message } => {
                ResultMaterializer::new(self.service.as_ref())
                    .materialize(descriptor, state, message)
                    .await?
            }
            PollFinish::Interrupted(outcome) => outcome,
        };

        Ok(AwaitReport {
            outcome,
            attempts: report.attempts,
        })
    }

    /// Submit a job and wait for it.
    pub async fn submit_and_await(
        &self,
        request: JobRequest,
        policy: &PollPolicy,
    ) -> CoreResult<(JobDescriptor, Outcome)> {
        let descriptor = self.submit(request).await?;
        let outcome = self.await_job(&descriptor, policy).await?;
        Ok((descriptor, outcome))
    }

    /// Cancel a job.
    ///
    /// With an await in flight this only signals it; the await sends the
    /// stop request and returns once the stop is acknowledged or its grace
    /// period runs out. Without one, a stop request is sent directly and
    /// this returns without waiting for the job to actually stop.
    pub async fn cancel(&self, descriptor: &JobDescriptor) -> CoreResult<CancelDisposition> {
        let job_id = descriptor.job_id();
        if let Some(signal) = self.signal_for(job_id) {
            info!(job_id, "signalling in-flight await to cancel");
            signal.cancel();
            return Ok(CancelDisposition::Signalled);
        }

        let job_type = descriptor.job_type();
        if !job_type.supports_stop() {
            info!(job_id, job_type = %job_type, "job type cannot be stopped");
            return Ok(CancelDisposition::Unsupported);
        }

        self.service
            .stop(job_type, job_id)
            .await
            .map_err(CoreError::Service)?;
        info!(job_id, "stop requested");
        Ok(CancelDisposition::StopRequested)
    }

    /// Number of awaits currently in flight for `job_id`.
    pub fn in_flight(&self, job_id: &str) -> usize {
        self.in_flight
            .lock()
            .get(job_id)
            .map(|entry| entry.waiters)
            .unwrap_or(0)
    }

    fn signal_for(&self, job_id: &str) -> Option<CancelSignal> {
        self.in_flight
            .lock()
            .get(job_id)
            .map(|entry| entry.signal.clone())
    }

    fn register(&self, job_id: &str) -> InFlightGuard {
        let mut map = self.in_flight.lock();
        let entry = map.entry(job_id.to_string()).or_insert_with(|| InFlight {
            signal: CancelSignal::new(),
            waiters: 0,
        });
        entry.waiters += 1;
        InFlightGuard {
            registry: Arc::clone(&self.in_flight),
            job_id: job_id.to_string(),
            signal: entry.signal.clone(),
        }
    }
}

impl std::fmt::Debug for JobClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobClient")
            .field("region", &self.config.region)
            .field("in_flight", &self.in_flight.lock().len())
            .finish_non_exhaustive()
    }
}
