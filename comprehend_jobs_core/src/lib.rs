//! Comprehend jobs core library.
//!
//! Lifecycle management for long-running asynchronous NLP jobs:
//! - Job descriptors and ARN derivation
//! - Status normalization and transition checking
//! - Polling with backoff, transient retries, timeouts and cancellation
//! - Result materialization into a single `Outcome`
//! - Client configuration and log setup
//!
//! Transport is left to an implementation of [`JobService`].

pub mod api;
pub mod config;
pub mod descriptor;
pub mod errors;
pub mod jobs;
pub mod logging;
pub mod materialize;
pub mod polling;

pub use comprehend_jobs_types as types;

// Re-export core types at crate root for convenience
pub use api::{AwaitReport, CancelDisposition, JobClient, JobService};
pub use config::ClientConfig;
pub use descriptor::JobDescriptor;
pub use errors::{CoreError, CoreResult};
pub use jobs::{LifecycleState, Observation, StatusTracker};
pub use materialize::{FailureKind, Outcome, ResultMaterializer};
pub use polling::{
    CancelSignal, PollAttempt, PollFinish, PollPolicy, PollReport, PollingScheduler,
};
