//! Public job client API.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use comprehend_jobs_core::api::JobClient;
//! use comprehend_jobs_core::{ClientConfig, PollPolicy};
//!
//! let client = JobClient::new(Arc::new(my_service), ClientConfig::default());
//! let job = client.submit(request).await?;
//! let outcome = client.await_job(&job, &PollPolicy::fast()).await?;
//! if let Some(result) = outcome.result() {
//!     println!("output written to {:?}", result.output_s3_uri);
//! }
//! ```

pub mod client;
pub mod service;

#[cfg(test)]
pub(crate) mod mock;

pub use client::{AwaitReport, CancelDisposition, JobClient};
pub use service::JobService;
