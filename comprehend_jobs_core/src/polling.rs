//! Polling policy, backoff calculation, and the status poll loop.
//!
//! Two delays are computed here:
//! - the **poll interval** between successful describe calls, which grows
//!   while the job sits in the same state and resets to `initial_delay` on
//!   every state change. It always stays within `[initial_delay, max_delay]`.
//! - the **transient backoff** after a retryable describe failure, which
//!   doubles per consecutive failure up to `max_delay` and gets full jitter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::JobService;
use crate::descriptor::JobDescriptor;
use crate::errors::{CoreError, CoreResult};
use crate::jobs::{LifecycleState, StatusTracker};
use crate::materialize::{FailureKind, Outcome};

/// Default stall ceiling: a day of polling at a five minute interval.
pub const DEFAULT_MAX_UNCHANGED_POLLS: u32 = 300;

/// Configuration for awaiting one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    /// First poll interval, and the interval right after a state change
    pub initial_delay_ms: u64,
    /// Upper bound for both poll interval and transient backoff
    pub max_delay_ms: u64,
    /// Growth factor of the poll interval while the state is unchanged
    pub backoff_multiplier: f64,
    /// Overall budget for one await
    pub max_total_wait_ms: u64,
    /// Consecutive retryable describe failures tolerated before giving up
    pub max_transient_retries: u32,
    /// How long to keep polling for a stop acknowledgement after cancel
    pub cancel_grace_period_ms: u64,
    /// Give up when the same non-terminal state is observed more than this
    /// many consecutive times (`None` = unbounded)
    pub max_unchanged_polls: Option<u32>,
    /// Randomize transient backoff over `[0, cap]`
    pub full_jitter: bool,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 5_000,
            max_delay_ms: 60_000,
            backoff_multiplier: 2.0,
            max_total_wait_ms: 3_600_000,
            max_transient_retries: 5,
            cancel_grace_period_ms: 30_000,
            max_unchanged_polls: Some(DEFAULT_MAX_UNCHANGED_POLLS),
            full_jitter: true,
        }
    }
}

impl PollPolicy {
    /// Short jobs: poll every second, give up after ten minutes.
    pub fn fast() -> Self {
        Self {
            initial_delay_ms: 1_000,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
            max_total_wait_ms: 600_000,
            max_transient_retries: 3,
            cancel_grace_period_ms: 10_000,
            ..Default::default()
        }
    }

    /// Training-sized jobs (flywheel iterations, large corpora).
    pub fn patient() -> Self {
        Self {
            initial_delay_ms: 30_000,
            max_delay_ms: 300_000,
            backoff_multiplier: 1.5,
            max_total_wait_ms: 24 * 3_600_000,
            max_transient_retries: 10,
            cancel_grace_period_ms: 60_000,
            ..Default::default()
        }
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay_ms = duration_ms(delay);
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay_ms = duration_ms(delay);
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn with_max_total_wait(mut self, wait: Duration) -> Self {
        self.max_total_wait_ms = duration_ms(wait);
        self
    }

    pub fn with_max_transient_retries(mut self, retries: u32) -> Self {
        self.max_transient_retries = retries;
        self
    }

    pub fn with_cancel_grace_period(mut self, grace: Duration) -> Self {
        self.cancel_grace_period_ms = duration_ms(grace);
        self
    }

    pub fn with_max_unchanged_polls(mut self, limit: u32) -> Self {
        self.max_unchanged_polls = Some(limit);
        self
    }

    /// Disable the stall ceiling; only `max_total_wait` bounds the await.
    pub fn without_stall_guard(mut self) -> Self {
        self.max_unchanged_polls = None;
        self
    }

    pub fn with_full_jitter(mut self, enabled: bool) -> Self {
        self.full_jitter = enabled;
        self
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn max_total_wait(&self) -> Duration {
        Duration::from_millis(self.max_total_wait_ms)
    }

    pub fn cancel_grace_period(&self) -> Duration {
        Duration::from_millis(self.cancel_grace_period_ms)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.initial_delay_ms == 0 {
            return Err(CoreError::config("poll initial_delay_ms must be > 0"));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(CoreError::config(format!(
                "poll initial_delay_ms ({}) exceeds max_delay_ms ({})",
                self.initial_delay_ms, self.max_delay_ms
            )));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(CoreError::config(format!(
                "poll backoff_multiplier must be a finite value >= 1.0, got {}",
                self.backoff_multiplier
            )));
        }
        if self.max_total_wait_ms == 0 {
            return Err(CoreError::config("poll max_total_wait_ms must be > 0"));
        }
        if self.max_unchanged_polls == Some(0) {
            return Err(CoreError::config("poll max_unchanged_polls must be > 0"));
        }
        Ok(())
    }

    /// Interval before the next poll, given how many consecutive times the
    /// current state has been observed (1 = just changed).
    ///
    /// Formula: `clamp(initial * multiplier^(observations-1), initial, max)`
    pub fn poll_interval(&self, same_state_observations: u32) -> Duration {
        let exponent = same_state_observations.saturating_sub(1).min(i32::MAX as u32) as i32;
        let raw = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        let ms = if raw.is_finite() && raw < self.max_delay_ms as f64 {
            raw as u64
        } else {
            self.max_delay_ms
        };
        let upper = self.max_delay_ms.max(self.initial_delay_ms);
        Duration::from_millis(ms.clamp(self.initial_delay_ms, upper))
    }

    /// Upper bound of the delay after `consecutive_failures` transient errors.
    ///
    /// Formula: `min(initial * 2^(consecutive-1), max)`
    pub fn transient_backoff_cap(&self, consecutive_failures: u32) -> Duration {
        let exponent = consecutive_failures.saturating_sub(1).min(63);
        let delay_ms = 2u64
            .checked_pow(exponent)
            .and_then(|m| self.initial_delay_ms.checked_mul(m))
            .unwrap_or(u64::MAX)
            .min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }

    /// Delay to actually sleep after a transient error.
    pub fn transient_backoff(&self, consecutive_failures: u32) -> Duration {
        let cap = self.transient_backoff_cap(consecutive_failures);
        if self.full_jitter {
            full_jitter(cap)
        } else {
            cap
        }
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Uniformly random delay in `[0, cap]`.
pub fn full_jitter(cap: Duration) -> Duration {
    let cap_ms = duration_ms(cap);
    if cap_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=cap_ms))
}

/// One successful status query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollAttempt {
    /// 1-indexed, counts successful describes only
    pub attempt: u32,
    pub observed_at: DateTime<Utc>,
    /// Time since the await started
    pub elapsed: Duration,
    pub raw_status: String,
    pub state: LifecycleState,
}

/// Cooperative cancellation shared by every await of one job.
///
/// The stop-issued flag makes sure at most one stop request goes out per
/// job no matter how many awaits observe the cancellation.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    token: CancellationToken,
    stop_issued: Arc<AtomicBool>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether a stop request has been sent for this job.
    pub fn stop_issued(&self) -> bool {
        self.stop_issued.load(Ordering::SeqCst)
    }

    /// Returns true for exactly one caller.
    fn claim_stop(&self) -> bool {
        !self.stop_issued.swap(true, Ordering::SeqCst)
    }

    async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

/// How a poll run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PollFinish {
    /// The job reached a terminal state; hand off to the materializer.
    Terminal {
        state: LifecycleState,
        message: Option<String>,
    },
    /// Polling stopped before a terminal state (timeout, cancellation, ...).
    Interrupted(Outcome),
}

/// Result of a poll run plus the attempts that led to it.
#[derive(Debug, Clone)]
pub struct PollReport {
    pub finish: PollFinish,
    pub attempts: Vec<PollAttempt>,
}

/// Drives describe calls for one job until a terminal state, a timeout, or
/// a cancellation.
pub struct PollingScheduler<'a> {
    service: &'a dyn JobService,
    policy: &'a PollPolicy,
}

impl<'a> PollingScheduler<'a> {
    pub fn new(service: &'a dyn JobService, policy: &'a PollPolicy) -> Self {
        Self { service, policy }
    }

    /// Poll `descriptor` until it finishes.
    ///
    /// Errors are reserved for protocol violations (unknown status, illegal
    /// transition) and non-retryable describe failures; everything else is
    /// reported through [`PollFinish`].
    pub async fn run(
        &self,
        descriptor: &JobDescriptor,
        cancel: &CancelSignal,
    ) -> CoreResult<PollReport> {
        let job_id = descriptor.job_id();
        let job_type = descriptor.job_type();
        let policy = self.policy;

        let start = Instant::now();
        let deadline = start + policy.max_total_wait();

        let mut tracker = StatusTracker::new(job_id, job_type);
        let mut attempts: Vec<PollAttempt> = Vec::new();
        let mut last_observed: Option<LifecycleState> = None;
        let mut same_state_observations = 0u32;
        let mut consecutive_transient = 0u32;
        let mut cancel_deadline: Option<Instant> = None;

        let finish = |finish: PollFinish, attempts: Vec<PollAttempt>| {
            Ok(PollReport { finish, attempts })
        };

        loop {
            if cancel_deadline.is_none() && cancel.is_cancelled() {
                if !self.begin_cancel(descriptor, cancel).await {
                    return finish(PollFinish::Interrupted(Outcome::Cancelled), attempts);
                }
                // the grace window never extends the total budget
                let grace_end = Instant::now() + policy.cancel_grace_period();
                cancel_deadline = Some(grace_end.min(deadline));
            }

            let now = Instant::now();
            if let Some(grace_end) = cancel_deadline {
                if now >= grace_end {
                    info!(job_id, "stop not acknowledged within grace period; treating as cancelled");
                    return finish(PollFinish::Interrupted(Outcome::Cancelled), attempts);
                }
            } else if now >= deadline {
                let message = format!(
                    "job {} did not reach a terminal state within {:?}",
                    job_id,
                    policy.max_total_wait()
                );
                warn!(job_id, polls = attempts.len(), "{}", message);
                return finish(
                    PollFinish::Interrupted(Outcome::failure(FailureKind::Timeout, message)),
                    attempts,
                );
            }

            let delay = match self.service.describe(job_type, job_id).await {
                Ok(report) => {
                    consecutive_transient = 0;
                    let observation = tracker.observe(&report.status)?;
                    let state = observation.state;
                    attempts.push(PollAttempt {
                        attempt: attempts.len() as u32 + 1,
                        observed_at: Utc::now(),
                        elapsed: start.elapsed(),
                        raw_status: report.status.clone(),
                        state,
                    });
                    debug!(job_id, status = %report.status, state = %state, "polled job status");

                    if observation.changed() {
                        info!(job_id, from = %observation.previous, to = %state, "job state changed");
                    }

                    if state.is_terminal() {
                        info!(
                            job_id,
                            state = %state,
                            polls = attempts.len(),
                            elapsed_ms = start.elapsed().as_millis() as u64,
                            "job reached terminal state"
                        );
                        return finish(
                            PollFinish::Terminal {
                                state,
                                message: report.message,
                            },
                            attempts,
                        );
                    }

                    if cancel_deadline.is_some() && state.is_stop_acknowledged() {
                        info!(job_id, state = %state, "stop acknowledged");
                        return finish(PollFinish::Interrupted(Outcome::Cancelled), attempts);
                    }

                    if last_observed == Some(state) {
                        same_state_observations += 1;
                    } else {
                        same_state_observations = 1;
                        last_observed = Some(state);
                    }

                    if let Some(limit) = policy.max_unchanged_polls {
                        if same_state_observations > limit {
                            let message = format!(
                                "job {} reported {} {} consecutive times without progress",
                                job_id, state, same_state_observations
                            );
                            warn!(job_id, "{}", message);
                            return finish(
                                PollFinish::Interrupted(Outcome::failure(
                                    FailureKind::Stalled,
                                    message,
                                )),
                                attempts,
                            );
                        }
                    }

                    policy.poll_interval(same_state_observations)
                }
                Err(err) if err.retryable => {
                    consecutive_transient += 1;
                    if consecutive_transient > policy.max_transient_retries {
                        let message = format!(
                            "describe for job {} failed {} consecutive times: {}",
                            job_id, consecutive_transient, err
                        );
                        warn!(job_id, "{}", message);
                        return finish(
                            PollFinish::Interrupted(Outcome::failure(
                                FailureKind::TransientExhausted,
                                message,
                            )),
                            attempts,
                        );
                    }
                    let delay = policy.transient_backoff(consecutive_transient);
                    warn!(
                        job_id,
                        error = %err,
                        retry = consecutive_transient,
                        delay_ms = delay.as_millis() as u64,
                        "transient describe failure; backing off"
                    );
                    delay
                }
                Err(err) => return Err(CoreError::Service(err)),
            };

            let limit = cancel_deadline.unwrap_or(deadline);
            let wake_at = (Instant::now() + delay).min(limit);
            if cancel_deadline.is_some() {
                tokio::time::sleep_until(wake_at).await;
            } else {
                tokio::select! {
                    _ = tokio::time::sleep_until(wake_at) => {}
                    _ = cancel.cancelled() => {
                        debug!(job_id, "cancellation observed while sleeping");
                    }
                }
            }
        }
    }

    /// Start cancelling. Returns false when there is nothing to wait for
    /// (the job type cannot be stopped).
    async fn begin_cancel(&self, descriptor: &JobDescriptor, cancel: &CancelSignal) -> bool {
        let job_id = descriptor.job_id();
        let job_type = descriptor.job_type();

        if !job_type.supports_stop() {
            info!(job_id, job_type = %job_type, "job type cannot be stopped; abandoning await");
            return false;
        }

        if cancel.claim_stop() {
            match self.service.stop(job_type, job_id).await {
                Ok(ack) => info!(job_id, status = ?ack.status, "stop requested"),
                Err(err) => warn!(job_id, error = %err, "stop request failed"),
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> PollPolicy {
        PollPolicy {
            initial_delay_ms: 1_000,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_poll_interval_grows_and_caps() {
        let p = policy();
        assert_eq!(p.poll_interval(0).as_millis(), 1_000);
        assert_eq!(p.poll_interval(1).as_millis(), 1_000);
        assert_eq!(p.poll_interval(2).as_millis(), 2_000);
        assert_eq!(p.poll_interval(3).as_millis(), 4_000);
        assert_eq!(p.poll_interval(4).as_millis(), 8_000);
        assert_eq!(p.poll_interval(5).as_millis(), 10_000);
        assert_eq!(p.poll_interval(u32::MAX).as_millis(), 10_000);
    }

    #[test]
    fn test_poll_interval_stays_within_bounds() {
        for multiplier in [1.0, 1.1, 1.5, 2.0, 3.0, 1e9] {
            let p = policy().with_backoff_multiplier(multiplier);
            for n in 0..200 {
                let d = p.poll_interval(n);
                assert!(d >= p.initial_delay(), "{multiplier} {n}");
                assert!(d <= p.max_delay(), "{multiplier} {n}");
            }
        }
    }

    #[test]
    fn test_transient_backoff_cap() {
        let p = policy();
        assert_eq!(p.transient_backoff_cap(1).as_millis(), 1_000);
        assert_eq!(p.transient_backoff_cap(2).as_millis(), 2_000);
        assert_eq!(p.transient_backoff_cap(3).as_millis(), 4_000);
        assert_eq!(p.transient_backoff_cap(5).as_millis(), 10_000);
        assert_eq!(p.transient_backoff_cap(100).as_millis(), 10_000);
    }

    #[test]
    fn test_full_jitter_within_cap() {
        let p = policy();
        for n in 1..10 {
            let cap = p.transient_backoff_cap(n);
            for _ in 0..50 {
                assert!(p.transient_backoff(n) <= cap);
            }
        }
        assert_eq!(full_jitter(Duration::ZERO), Duration::ZERO);

        let fixed = policy().with_full_jitter(false);
        assert_eq!(fixed.transient_backoff(3), fixed.transient_backoff_cap(3));
    }

    #[test]
    fn test_policy_validation() {
        assert!(PollPolicy::default().validate().is_ok());
        assert!(PollPolicy::fast().validate().is_ok());
        assert!(PollPolicy::patient().validate().is_ok());
        assert!(policy().with_initial_delay(Duration::ZERO).validate().is_err());
        assert!(policy().with_backoff_multiplier(0.5).validate().is_err());
        assert!(policy().with_backoff_multiplier(f64::NAN).validate().is_err());
        assert!(policy().with_max_total_wait(Duration::ZERO).validate().is_err());
        assert!(policy().with_max_unchanged_polls(0).validate().is_err());
        assert!(policy().without_stall_guard().validate().is_ok());
        assert!(policy()
            .with_initial_delay(Duration::from_secs(20))
            .validate()
            .is_err());
    }

    #[test]
    fn test_cancel_signal_claims_stop_once() {
        let signal = CancelSignal::new();
        let other = signal.clone();
        assert!(!signal.is_cancelled());
        other.cancel();
        assert!(signal.is_cancelled());
        assert!(signal.claim_stop());
        assert!(!other.claim_stop());
        assert!(signal.stop_issued());
    }

    mod scheduler {
        use super::*;
        use crate::api::mock::MockService;
        use comprehend_jobs_types::{JobType, ServiceError, StatusReport};

        fn descriptor(job_type: JobType) -> JobDescriptor {
            JobDescriptor::attach(
                "j1",
                format!("arn:aws:comprehend:us-east-1:123456789012:{}/j1", job_type.arn_resource()),
                job_type,
                Utc::now(),
            )
        }

        fn policy() -> PollPolicy {
            PollPolicy::default()
                .with_initial_delay(Duration::from_secs(1))
                .with_max_delay(Duration::from_secs(8))
                .with_max_total_wait(Duration::from_secs(120))
                .with_cancel_grace_period(Duration::from_secs(10))
                .with_full_jitter(false)
        }

        async fn run(
            service: &MockService,
            policy: &PollPolicy,
            job_type: JobType,
        ) -> CoreResult<PollReport> {
            PollingScheduler::new(service, policy)
                .run(&descriptor(job_type), &CancelSignal::new())
                .await
        }

        fn interrupted_kind(report: &PollReport) -> Option<FailureKind> {
            match &report.finish {
                PollFinish::Interrupted(outcome) => outcome.failure_kind(),
                PollFinish::Terminal { .. } => None,
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_reaches_completed() {
            let service = MockService::new().statuses(&["SUBMITTED", "IN_PROGRESS", "COMPLETED"]);
            let report = run(&service, &policy(), JobType::EntitiesDetection).await.unwrap();

            assert_eq!(
                report.finish,
                PollFinish::Terminal {
                    state: LifecycleState::Completed,
                    message: None
                }
            );
            let numbers: Vec<u32> = report.attempts.iter().map(|a| a.attempt).collect();
            assert_eq!(numbers, vec![1, 2, 3]);
            assert!(report
                .attempts
                .windows(2)
                .all(|w| w[0].elapsed <= w[1].elapsed && w[0].observed_at <= w[1].observed_at));
            assert_eq!(report.attempts[2].elapsed, Duration::from_secs(2));
        }

        #[tokio::test(start_paused = true)]
        async fn test_failed_status_keeps_message() {
            let service = MockService::new()
                .statuses(&["IN_PROGRESS"])
                .report(StatusReport::with_message("FAILED", "bad input"));
            let report = run(&service, &policy(), JobType::EntitiesDetection).await.unwrap();
            assert_eq!(
                report.finish,
                PollFinish::Terminal {
                    state: LifecycleState::Failed,
                    message: Some("bad input".to_string())
                }
            );
        }

        #[tokio::test(start_paused = true)]
        async fn test_interval_grows_then_resets_on_state_change() {
            let service = MockService::new().statuses(&[
                "SUBMITTED",
                "SUBMITTED",
                "SUBMITTED",
                "IN_PROGRESS",
                "COMPLETED",
            ]);
            let report = run(&service, &policy(), JobType::EntitiesDetection).await.unwrap();
            let elapsed: Vec<u64> = report.attempts.iter().map(|a| a.elapsed.as_secs()).collect();
            // 1s, 2s, 4s while SUBMITTED; back to 1s after IN_PROGRESS
            assert_eq!(elapsed, vec![0, 1, 3, 7, 8]);
        }

        #[tokio::test(start_paused = true)]
        async fn test_times_out_at_deadline() {
            let service = MockService::new().statuses(&["IN_PROGRESS"]);
            let policy = policy().with_max_total_wait(Duration::from_secs(5));

            let start = Instant::now();
            let report = run(&service, &policy, JobType::EntitiesDetection).await.unwrap();

            assert_eq!(interrupted_kind(&report), Some(FailureKind::Timeout));
            assert_eq!(start.elapsed(), Duration::from_secs(5));
            // polls at 0s, 1s, 3s; the 7s poll is clamped to the deadline
            assert_eq!(service.describe_calls(), 3);
        }

        #[tokio::test(start_paused = true)]
        async fn test_unknown_status_is_not_retried() {
            let service = MockService::new().statuses(&["WEIRD", "COMPLETED"]);
            let err = run(&service, &policy(), JobType::EntitiesDetection).await.unwrap_err();
            assert!(matches!(err, CoreError::UnknownStatus { ref status, .. } if status == "WEIRD"));
            assert_eq!(service.describe_calls(), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_backwards_transition_is_an_error() {
            let service = MockService::new().statuses(&["IN_PROGRESS", "SUBMITTED"]);
            let err = run(&service, &policy(), JobType::EntitiesDetection).await.unwrap_err();
            assert!(matches!(
                err,
                CoreError::Transition {
                    from: LifecycleState::InProgress,
                    to: LifecycleState::Submitted,
                    ..
                }
            ));
        }

        #[tokio::test(start_paused = true)]
        async fn test_transient_errors_are_retried() {
            let service = MockService::new()
                .describe_error(ServiceError::transient("throttled").with_status(429))
                .describe_error(ServiceError::transient("connection reset"))
                .statuses(&["COMPLETED"]);

            let start = Instant::now();
            let report = run(&service, &policy(), JobType::EntitiesDetection).await.unwrap();

            assert!(matches!(report.finish, PollFinish::Terminal { state: LifecycleState::Completed, .. }));
            assert_eq!(service.describe_calls(), 3);
            assert_eq!(report.attempts.len(), 1);
            assert_eq!(report.attempts[0].attempt, 1);
            // 1s then 2s of backoff without jitter
            assert_eq!(start.elapsed(), Duration::from_secs(3));
        }

        #[tokio::test(start_paused = true)]
        async fn test_transient_retries_exhaust() {
            let service = MockService::new()
                .describe_error(ServiceError::transient("throttled"))
                .describe_error(ServiceError::transient("throttled"))
                .describe_error(ServiceError::transient("throttled"))
                .statuses(&["COMPLETED"]);
            let policy = policy().with_max_transient_retries(2);

            let report = run(&service, &policy, JobType::EntitiesDetection).await.unwrap();
            assert_eq!(interrupted_kind(&report), Some(FailureKind::TransientExhausted));
            assert_eq!(service.describe_calls(), 3);
        }

        #[tokio::test(start_paused = true)]
        async fn test_jittered_backoff_stays_under_cap() {
            let service = MockService::new()
                .describe_error(ServiceError::transient("throttled"))
                .statuses(&["COMPLETED"]);
            let policy = policy().with_full_jitter(true);

            let start = Instant::now();
            run(&service, &policy, JobType::EntitiesDetection).await.unwrap();
            assert!(start.elapsed() <= Duration::from_secs(1));
        }

        #[tokio::test(start_paused = true)]
        async fn test_permanent_describe_error_propagates() {
            let service = MockService::new().describe_error(
                ServiceError::permanent("JobNotFoundException", "no such job").with_status(400),
            );
            let err = run(&service, &policy(), JobType::EntitiesDetection).await.unwrap_err();
            assert!(matches!(err, CoreError::Service(ref e) if !e.retryable));
            assert_eq!(service.describe_calls(), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_stalls_after_unchanged_polls() {
            let service = MockService::new().statuses(&["IN_PROGRESS"]);
            let policy = policy().with_max_unchanged_polls(2);

            let report = run(&service, &policy, JobType::EntitiesDetection).await.unwrap();
            assert_eq!(interrupted_kind(&report), Some(FailureKind::Stalled));
            assert_eq!(service.describe_calls(), 3);
        }

        #[tokio::test(start_paused = true)]
        async fn test_unstoppable_job_cancels_without_stop() {
            let service = MockService::new().statuses(&["IN_PROGRESS"]);
            let policy = policy();
            let signal = CancelSignal::new();
            signal.cancel();

            let report = PollingScheduler::new(&service, &policy)
                .run(&descriptor(JobType::TopicsDetection), &signal)
                .await
                .unwrap();
            assert_eq!(report.finish, PollFinish::Interrupted(Outcome::Cancelled));
            assert_eq!(service.describe_calls(), 0);
            assert_eq!(service.stop_calls(), 0);
            assert!(!signal.stop_issued());
        }

        #[tokio::test(start_paused = true)]
        async fn test_cancel_waits_for_stop_acknowledgement() {
            let service = MockService::new()
                .statuses(&["IN_PROGRESS"])
                .on_stop(&["STOP_REQUESTED"]);
            let policy = policy();
            let signal = CancelSignal::new();
            let descriptor = descriptor(JobType::EntitiesDetection);

            let scheduler = PollingScheduler::new(&service, &policy);
            let start = Instant::now();
            let (report, _) = tokio::join!(
                scheduler.run(&descriptor, &signal),
                async {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    signal.cancel();
                }
            );

            let report = report.unwrap();
            assert_eq!(report.finish, PollFinish::Interrupted(Outcome::Cancelled));
            assert_eq!(report.attempts.last().unwrap().state, LifecycleState::StopRequested);
            assert_eq!(service.stop_calls(), 1);
            assert!(signal.stop_issued());
            // woken by the cancel, not by the 3s poll
            assert_eq!(start.elapsed(), Duration::from_secs(2));
        }

        #[tokio::test(start_paused = true)]
        async fn test_cancel_gives_up_after_grace_period() {
            let service = MockService::new()
                .statuses(&["IN_PROGRESS"])
                .on_stop(&["IN_PROGRESS"]);
            let policy = policy();
            let signal = CancelSignal::new();
            let descriptor = descriptor(JobType::SentimentDetection);

            let scheduler = PollingScheduler::new(&service, &policy);
            let start = Instant::now();
            let (report, _) = tokio::join!(
                scheduler.run(&descriptor, &signal),
                async {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    signal.cancel();
                }
            );

            assert_eq!(report.unwrap().finish, PollFinish::Interrupted(Outcome::Cancelled));
            assert_eq!(start.elapsed(), Duration::from_secs(12));
            assert_eq!(service.stop_calls(), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_grace_period_stays_within_total_wait() {
            let service = MockService::new()
                .statuses(&["IN_PROGRESS"])
                .on_stop(&["IN_PROGRESS"]);
            let policy = policy().with_max_total_wait(Duration::from_secs(5));
            let signal = CancelSignal::new();
            let descriptor = descriptor(JobType::SentimentDetection);

            let scheduler = PollingScheduler::new(&service, &policy);
            let start = Instant::now();
            let (report, _) = tokio::join!(
                scheduler.run(&descriptor, &signal),
                async {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    signal.cancel();
                }
            );

            assert_eq!(report.unwrap().finish, PollFinish::Interrupted(Outcome::Cancelled));
            assert_eq!(start.elapsed(), Duration::from_secs(5));
            assert_eq!(service.stop_calls(), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_default_policy_stalls_without_progress() {
            let service = MockService::new().statuses(&["IN_PROGRESS"]);
            let policy = PollPolicy::default()
                .with_max_total_wait(Duration::from_secs(30 * 24 * 3600))
                .with_full_jitter(false);

            let report = run(&service, &policy, JobType::EntitiesDetection).await.unwrap();
            assert_eq!(interrupted_kind(&report), Some(FailureKind::Stalled));
            assert_eq!(service.describe_calls(), DEFAULT_MAX_UNCHANGED_POLLS + 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_completion_during_grace_wins() {
            let service = MockService::new()
                .statuses(&["IN_PROGRESS"])
                .on_stop(&["STOP_REQUESTED", "COMPLETED"]);
            let policy = policy();
            let signal = CancelSignal::new();
            signal.cancel();

            let report = PollingScheduler::new(&service, &policy)
                .run(&descriptor(JobType::KeyPhrasesDetection), &signal)
                .await
                .unwrap();
            // STOP_REQUESTED ends the grace wait before COMPLETED is seen
            assert_eq!(report.finish, PollFinish::Interrupted(Outcome::Cancelled));

            let service = MockService::new()
                .statuses(&["IN_PROGRESS"])
                .on_stop(&["COMPLETED"]);
            let signal = CancelSignal::new();
            signal.cancel();
            let report = PollingScheduler::new(&service, &policy)
                .run(&descriptor(JobType::KeyPhrasesDetection), &signal)
                .await
                .unwrap();
            assert!(matches!(report.finish, PollFinish::Terminal { state: LifecycleState::Completed, .. }));
        }

        #[tokio::test(start_paused = true)]
        async fn test_shared_signal_sends_one_stop() {
            let service = MockService::new()
                .statuses(&["IN_PROGRESS"])
                .on_stop(&["STOP_REQUESTED"]);
            let policy = policy();
            let signal = CancelSignal::new();
            let descriptor = descriptor(JobType::EntitiesDetection);
            let scheduler = PollingScheduler::new(&service, &policy);

            let (a, b, _) = tokio::join!(
                scheduler.run(&descriptor, &signal),
                scheduler.run(&descriptor, &signal),
                async {
                    tokio::time::sleep(Duration::from_secs(4)).await;
                    signal.cancel();
                }
            );

            assert_eq!(a.unwrap().finish, PollFinish::Interrupted(Outcome::Cancelled));
            assert_eq!(b.unwrap().finish, PollFinish::Interrupted(Outcome::Cancelled));
            assert_eq!(service.stop_calls(), 1);
        }
    }
}
