//! Job lifecycle states and status tracking.
//!
//! Every job type reports its own raw status vocabulary. This module maps
//! those strings onto one normalized [`LifecycleState`] and checks that the
//! sequence of observed states only moves forward:
//!
//! ```text
//! Submitted -> InProgress -> Completed
//!                         -> Failed
//!                         -> StopRequested -> Stopped
//! ```
//!
//! Polling can miss intermediate states, so any forward move is accepted
//! (e.g. `Submitted -> Completed`). `StopRequested -> Completed` is also
//! accepted: a job that finishes before the stop takes effect ends up
//! `COMPLETED`.

use comprehend_jobs_types::JobType;
use serde::{Deserialize, Serialize};

use crate::errors::{CoreError, CoreResult};

/// Normalized, job-type-agnostic lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Submitted,
    InProgress,
    StopRequested,
    Completed,
    Failed,
    Stopped,
}

impl LifecycleState {
    /// Check if this is a terminal (final) state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LifecycleState::Completed | LifecycleState::Failed | LifecycleState::Stopped
        )
    }

    pub fn is_success(&self) -> bool {
        *self == LifecycleState::Completed
    }

    /// Whether the service has acknowledged a stop for the job.
    pub fn is_stop_acknowledged(&self) -> bool {
        matches!(self, LifecycleState::StopRequested | LifecycleState::Stopped)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Submitted => "SUBMITTED",
            LifecycleState::InProgress => "IN_PROGRESS",
            LifecycleState::StopRequested => "STOP_REQUESTED",
            LifecycleState::Completed => "COMPLETED",
            LifecycleState::Failed => "FAILED",
            LifecycleState::Stopped => "STOPPED",
        }
    }

    /// Whether `next` may follow `self` in a sequence of observations.
    pub fn can_transition_to(&self, next: LifecycleState) -> bool {
        use LifecycleState::*;

        if self.is_terminal() {
            return false;
        }
        if *self == next {
            return true;
        }
        match self {
            Submitted => true,
            InProgress => next != Submitted,
            StopRequested => matches!(next, Stopped | Completed),
            Completed | Failed | Stopped => false,
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for LifecycleState {
    fn default() -> Self {
        LifecycleState::Submitted
    }
}

/// Raw status table for analysis jobs (entities, PII, events, ...).
const ANALYSIS_JOB_STATUSES: &[(&str, LifecycleState)] = &[
    ("SUBMITTED", LifecycleState::Submitted),
    ("IN_PROGRESS", LifecycleState::InProgress),
    ("COMPLETED", LifecycleState::Completed),
    ("FAILED", LifecycleState::Failed),
    ("STOP_REQUESTED", LifecycleState::StopRequested),
    ("STOPPED", LifecycleState::Stopped),
];

/// Raw status table for flywheel iterations.
const FLYWHEEL_ITERATION_STATUSES: &[(&str, LifecycleState)] = &[
    ("TRAINING", LifecycleState::InProgress),
    ("EVALUATING", LifecycleState::InProgress),
    ("COMPLETED", LifecycleState::Completed),
    ("FAILED", LifecycleState::Failed),
    ("STOP_REQUESTED", LifecycleState::StopRequested),
    ("STOPPED", LifecycleState::Stopped),
];

/// Result of feeding one raw status into a [`StatusTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub previous: LifecycleState,
    pub state: LifecycleState,
}

impl Observation {
    pub fn changed(&self) -> bool {
        self.previous != self.state
    }
}

/// Status normalization and transition checking for one job.
///
/// The associated functions are pure; an instance additionally remembers the
/// last accepted state so a poll loop can feed it raw strings one by one.
#[derive(Debug, Clone)]
pub struct StatusTracker {
    job_id: String,
    job_type: JobType,
    current: LifecycleState,
}

impl StatusTracker {
    /// Create a tracker for a freshly submitted job.
    pub fn new(job_id: &str, job_type: JobType) -> Self {
        Self {
            job_id: job_id.to_string(),
            job_type,
            current: LifecycleState::Submitted,
        }
    }

    /// The raw status vocabulary for a job type.
    pub fn vocabulary(job_type: JobType) -> &'static [(&'static str, LifecycleState)] {
        if job_type.is_flywheel() {
            FLYWHEEL_ITERATION_STATUSES
        } else {
            ANALYSIS_JOB_STATUSES
        }
    }

    /// Map a raw service status onto the normalized lifecycle.
    ///
    /// Matching is exact; anything outside the job type's table is an error.
    pub fn normalize(job_type: JobType, raw_status: &str) -> CoreResult<LifecycleState> {
        Self::vocabulary(job_type)
            .iter()
            .find(|(raw, _)| *raw == raw_status)
            .map(|(_, state)| *state)
            .ok_or_else(|| CoreError::unknown_status(job_type, raw_status))
    }

    /// Check that `next` may follow `previous`.
    pub fn validate_transition(
        job_id: &str,
        previous: LifecycleState,
        next: LifecycleState,
    ) -> CoreResult<()> {
        if previous.can_transition_to(next) {
            Ok(())
        } else {
            Err(CoreError::transition(job_id, previous, next))
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn job_type(&self) -> JobType {
        self.job_type
    }

    /// Get the last accepted state.
    pub fn current(&self) -> LifecycleState {
        self.current
    }

    /// Normalize and validate one raw status, then record it.
    ///
    /// On error the tracker keeps its previous state.
    pub fn observe(&mut self, raw_status: &str) -> CoreResult<Observation> {
        let state = Self::normalize(self.job_type, raw_status)?;
        Self::validate_transition(&self.job_id, self.current, state)?;
        let previous = std::mem::replace(&mut self.current, state);
        Ok(Observation { previous, state })
    }
}
