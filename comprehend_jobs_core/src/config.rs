//! Client configuration.
//!
//! This module provides:
//! - `ClientConfig` (region/account used for ARN derivation, default poll policy)
//! - TOML file loading
//! - Environment variable overrides

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::errors::{CoreError, CoreResult};
use crate::polling::PollPolicy;

/// Default AWS region when neither config nor environment provide one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default ARN partition.
pub const DEFAULT_PARTITION: &str = "aws";

/// Configuration shared by every job handled through one client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub region: String,
    /// Twelve-digit account id; only needed when the service omits job ARNs.
    pub account_id: Option<String>,
    pub partition: String,
    /// Poll policy used when the caller does not pass one explicitly.
    pub poll: PollPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let region = std::env::var("AWS_REGION")
            .ok()
            .or_else(|| std::env::var("AWS_DEFAULT_REGION").ok())
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        let account_id = std::env::var("COMPREHEND_ACCOUNT_ID")
            .ok()
            .filter(|v| !v.trim().is_empty());
        ClientConfig {
            region,
            account_id,
            partition: DEFAULT_PARTITION.to_string(),
            poll: PollPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Load from a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let mut config = load_toml(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> CoreResult<Self> {
        let config: ClientConfig = toml::from_str(content)
            .map_err(|e| CoreError::config(format!("failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `COMPREHEND_POLL_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> CoreResult<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> CoreResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let poll = &mut self.poll;
        if let Some(v) = parse_var(&lookup, "COMPREHEND_POLL_INITIAL_DELAY_MS")? {
            poll.initial_delay_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "COMPREHEND_POLL_MAX_DELAY_MS")? {
            poll.max_delay_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "COMPREHEND_POLL_BACKOFF_MULTIPLIER")? {
            poll.backoff_multiplier = v;
        }
        if let Some(v) = parse_var(&lookup, "COMPREHEND_POLL_MAX_TOTAL_WAIT_MS")? {
            poll.max_total_wait_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "COMPREHEND_POLL_MAX_TRANSIENT_RETRIES")? {
            poll.max_transient_retries = v;
        }
        if let Some(v) = parse_var(&lookup, "COMPREHEND_POLL_CANCEL_GRACE_MS")? {
            poll.cancel_grace_period_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "COMPREHEND_POLL_MAX_UNCHANGED_POLLS")? {
            poll.max_unchanged_polls = Some(v);
        }
        if let Some(v) = parse_var(&lookup, "COMPREHEND_POLL_FULL_JITTER")? {
            poll.full_jitter = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.region.trim().is_empty() {
            return Err(CoreError::config("region must not be empty"));
        }
        if let Some(ref account) = self.account_id {
            if account.len() != 12 || !account.chars().all(|c| c.is_ascii_digit()) {
                return Err(CoreError::config(format!(
                    "account_id must be 12 digits, got {:?}",
                    account
                )));
            }
        }
        self.poll.validate()
    }
}

/// Load a TOML file into a [`ClientConfig`] without env overrides.
pub fn load_toml(path: &Path) -> CoreResult<ClientConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| CoreError::config(format!("failed to read TOML file: {}", e)))?;
    ClientConfig::from_toml_str(&content)
}

fn parse_var<F, T>(lookup: &F, key: &str) -> CoreResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| CoreError::config(format!("invalid {}={:?}: {}", key, raw, e))),
        _ => Ok(None),
    }
}
