//! Job submission requests.
//!
//! Requests are immutable once built. Analysis jobs share a [`JobInput`]
//! (input/output locations, IAM role, naming) built through
//! [`JobInputBuilder`], which validates at the boundary so the rest of the
//! client never handles a malformed location or ARN.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::job_type::{JobType, LanguageCode};

const MAX_JOB_NAME_LEN: usize = 256;
const MAX_TOPICS: u32 = 100;

static ROLE_ARN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^arn:aws(-[^:]+)?:iam::[0-9]{12}:role/.+$").expect("valid role ARN pattern")
});

static COMPREHEND_ARN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^arn:aws(-[^:]+)?:comprehend:[a-zA-Z0-9-]*:[0-9]{12}:[a-zA-Z0-9-]+/.+$")
        .expect("valid comprehend ARN pattern")
});

static JOB_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}\p{Z}\p{N}_.:/=+\-%@]*$").expect("valid job name pattern"));

/// Request validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    Missing(&'static str),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ValidationError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ValidationError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// How documents are laid out in the input location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InputFormat {
    #[default]
    OneDocPerFile,
    OneDocPerLine,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDataConfig {
    pub s3_uri: String,
    pub input_format: InputFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDataConfig {
    pub s3_uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kms_key_id: Option<String>,
}

/// Fields common to every analysis job request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobInput {
    input_data_config: InputDataConfig,
    output_data_config: OutputDataConfig,
    data_access_role_arn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    job_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_request_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    volume_kms_key_id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    tags: BTreeMap<String, String>,
}

impl JobInput {
    pub fn builder() -> JobInputBuilder {
        JobInputBuilder::default()
    }

    pub fn input_data_config(&self) -> &InputDataConfig {
        &self.input_data_config
    }

    pub fn output_data_config(&self) -> &OutputDataConfig {
        &self.output_data_config
    }

    pub fn data_access_role_arn(&self) -> &str {
        &self.data_access_role_arn
    }

    pub fn job_name(&self) -> Option<&str> {
        self.job_name.as_deref()
    }

    pub fn client_request_token(&self) -> Option<&str> {
        self.client_request_token.as_deref()
    }

    pub fn volume_kms_key_id(&self) -> Option<&str> {
        self.volume_kms_key_id.as_deref()
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }
}

/// Builder for [`JobInput`].
///
/// # Example
///
/// ```
/// use comprehend_jobs_types::{InputFormat, JobInput};
///
/// let input = JobInput::builder()
///     .input_s3_uri("s3://bucket/in/")
///     .input_format(InputFormat::OneDocPerLine)
///     .output_s3_uri("s3://bucket/out/")
///     .data_access_role_arn("arn:aws:iam::123456789012:role/ComprehendAccess")
///     .job_name("nightly-entities")
///     .build()
///     .unwrap();
/// assert_eq!(input.job_name(), Some("nightly-entities"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct JobInputBuilder {
    input_s3_uri: Option<String>,
    input_format: InputFormat,
    output_s3_uri: Option<String>,
    output_kms_key_id: Option<String>,
    data_access_role_arn: Option<String>,
    job_name: Option<String>,
    client_request_token: Option<String>,
    volume_kms_key_id: Option<String>,
    tags: BTreeMap<String, String>,
}

impl JobInputBuilder {
    pub fn input_s3_uri(mut self, uri: impl Into<String>) -> Self {
        self.input_s3_uri = Some(uri.into());
        self
    }

    pub fn input_format(mut self, format: InputFormat) -> Self {
        self.input_format = format;
        self
    }

    pub fn output_s3_uri(mut self, uri: impl Into<String>) -> Self {
        self.output_s3_uri = Some(uri.into());
        self
    }

    pub fn output_kms_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.output_kms_key_id = Some(key_id.into());
        self
    }

    pub fn data_access_role_arn(mut self, arn: impl Into<String>) -> Self {
        self.data_access_role_arn = Some(arn.into());
        self
    }

    pub fn job_name(mut self, name: impl Into<String>) -> Self {
        self.job_name = Some(name.into());
        self
    }

    pub fn client_request_token(mut self, token: impl Into<String>) -> Self {
        self.client_request_token = Some(token.into());
        self
    }

    pub fn volume_kms_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.volume_kms_key_id = Some(key_id.into());
        self
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Result<JobInput, ValidationError> {
        let input_s3_uri = self
            .input_s3_uri
            .ok_or(ValidationError::Missing("input_s3_uri"))?;
        validate_s3_uri("input_s3_uri", &input_s3_uri)?;

        let output_s3_uri = self
            .output_s3_uri
            .ok_or(ValidationError::Missing("output_s3_uri"))?;
        validate_s3_uri("output_s3_uri", &output_s3_uri)?;

        let role = self
            .data_access_role_arn
            .ok_or(ValidationError::Missing("data_access_role_arn"))?;
        if !ROLE_ARN_RE.is_match(&role) {
            return Err(ValidationError::invalid(
                "data_access_role_arn",
                format!("not an IAM role ARN: {}", role),
            ));
        }

        if let Some(ref name) = self.job_name {
            if name.is_empty() || name.chars().count() > MAX_JOB_NAME_LEN {
                return Err(ValidationError::invalid(
                    "job_name",
                    format!("length must be 1..={}", MAX_JOB_NAME_LEN),
                ));
            }
            if !JOB_NAME_RE.is_match(name) {
                return Err(ValidationError::invalid(
                    "job_name",
                    format!("contains unsupported characters: {}", name),
                ));
            }
        }

        if let Some(ref token) = self.client_request_token {
            if token.is_empty() || token.len() > 64 {
                return Err(ValidationError::invalid(
                    "client_request_token",
                    "length must be 1..=64",
                ));
            }
        }

        Ok(JobInput {
            input_data_config: InputDataConfig {
                s3_uri: input_s3_uri,
                input_format: self.input_format,
            },
            output_data_config: OutputDataConfig {
                s3_uri: output_s3_uri,
                kms_key_id: self.output_kms_key_id,
            },
            data_access_role_arn: role,
            job_name: self.job_name,
            client_request_token: self.client_request_token,
            volume_kms_key_id: self.volume_kms_key_id,
            tags: self.tags,
        })
    }
}

fn validate_s3_uri(field: &'static str, uri: &str) -> Result<(), ValidationError> {
    match uri.strip_prefix("s3://") {
        Some(rest) if !rest.is_empty() && !rest.starts_with('/') => Ok(()),
        _ => Err(ValidationError::invalid(
            field,
            format!("expected s3://bucket/prefix, got {}", uri),
        )),
    }
}

fn validate_comprehend_arn(field: &'static str, arn: &str) -> Result<(), ValidationError> {
    if COMPREHEND_ARN_RE.is_match(arn) {
        Ok(())
    } else {
        Err(ValidationError::invalid(
            field,
            format!("not a comprehend resource ARN: {}", arn),
        ))
    }
}

/// PII job output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PiiEntitiesDetectionMode {
    OnlyOffsets,
    OnlyRedaction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PiiMaskMode {
    Mask,
    ReplaceWithPiiEntityType,
}

/// Redaction settings, only meaningful with [`PiiEntitiesDetectionMode::OnlyRedaction`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionConfig {
    pub pii_entity_types: Vec<String>,
    pub mask_mode: PiiMaskMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask_character: Option<char>,
}

/// A request to start one asynchronous job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "job_type", rename_all = "snake_case")]
pub enum JobRequest {
    DocumentClassification {
        input: JobInput,
        document_classifier_arn: String,
    },
    EntitiesDetection {
        input: JobInput,
        language_code: LanguageCode,
        #[serde(skip_serializing_if = "Option::is_none")]
        entity_recognizer_arn: Option<String>,
    },
    PiiEntitiesDetection {
        input: JobInput,
        language_code: LanguageCode,
        mode: PiiEntitiesDetectionMode,
        #[serde(skip_serializing_if = "Option::is_none")]
        redaction_config: Option<RedactionConfig>,
    },
    EventsDetection {
        input: JobInput,
        language_code: LanguageCode,
        target_event_types: Vec<String>,
    },
    DominantLanguageDetection {
        input: JobInput,
    },
    KeyPhrasesDetection {
        input: JobInput,
        language_code: LanguageCode,
    },
    SentimentDetection {
        input: JobInput,
        language_code: LanguageCode,
    },
    TopicsDetection {
        input: JobInput,
        #[serde(skip_serializing_if = "Option::is_none")]
        number_of_topics: Option<u32>,
    },
    FlywheelIteration {
        flywheel_arn: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        client_request_token: Option<String>,
    },
}

impl JobRequest {
    /// The job type this request starts.
    pub fn job_type(&self) -> JobType {
        match self {
            JobRequest::DocumentClassification { .. } => JobType::DocumentClassification,
            JobRequest::EntitiesDetection { .. } => JobType::EntitiesDetection,
            JobRequest::PiiEntitiesDetection { .. } => JobType::PiiEntitiesDetection,
            JobRequest::EventsDetection { .. } => JobType::EventsDetection,
            JobRequest::DominantLanguageDetection { .. } => JobType::DominantLanguageDetection,
            JobRequest::KeyPhrasesDetection { .. } => JobType::KeyPhrasesDetection,
            JobRequest::SentimentDetection { .. } => JobType::SentimentDetection,
            JobRequest::TopicsDetection { .. } => JobType::TopicsDetection,
            JobRequest::FlywheelIteration { .. } => JobType::FlywheelIteration,
        }
    }

    /// The shared input block, absent for flywheel iterations.
    pub fn input(&self) -> Option<&JobInput> {
        match self {
            JobRequest::DocumentClassification { input, .. }
            | JobRequest::EntitiesDetection { input, .. }
            | JobRequest::PiiEntitiesDetection { input, .. }
            | JobRequest::EventsDetection { input, .. }
            | JobRequest::DominantLanguageDetection { input }
            | JobRequest::KeyPhrasesDetection { input, .. }
            | JobRequest::SentimentDetection { input, .. }
            | JobRequest::TopicsDetection { input, .. } => Some(input),
            JobRequest::FlywheelIteration { .. } => None,
        }
    }

    pub fn job_name(&self) -> Option<&str> {
        self.input().and_then(JobInput::job_name)
    }

    /// Flywheel the iteration belongs to, if this is a flywheel request.
    pub fn flywheel_arn(&self) -> Option<&str> {
        match self {
            JobRequest::FlywheelIteration { flywheel_arn, .. } => Some(flywheel_arn),
            _ => None,
        }
    }

    /// Check the type-specific fields.
    ///
    /// [`JobInput`] is already validated by its builder; this covers what a
    /// struct literal of the enum variant can still get wrong.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            JobRequest::DocumentClassification {
                document_classifier_arn,
                ..
            } => validate_comprehend_arn("document_classifier_arn", document_classifier_arn),
            JobRequest::EntitiesDetection {
                entity_recognizer_arn: Some(arn),
                ..
            } => validate_comprehend_arn("entity_recognizer_arn", arn),
            JobRequest::PiiEntitiesDetection {
                mode,
                redaction_config,
                ..
            } => match (mode, redaction_config) {
                (PiiEntitiesDetectionMode::OnlyOffsets, Some(_)) => Err(ValidationError::invalid(
                    "redaction_config",
                    "only allowed with ONLY_REDACTION mode",
                )),
                (_, Some(cfg)) if cfg.pii_entity_types.is_empty() => Err(
                    ValidationError::invalid("redaction_config", "pii_entity_types is empty"),
                ),
                _ => Ok(()),
            },
            JobRequest::EventsDetection {
                target_event_types,
                ..
            } => {
                if target_event_types.is_empty() {
                    Err(ValidationError::Missing("target_event_types"))
                } else {
                    Ok(())
                }
            }
            JobRequest::TopicsDetection {
                number_of_topics: Some(n),
                ..
            } => {
                if (1..=MAX_TOPICS).contains(n) {
                    Ok(())
                } else {
                    Err(ValidationError::invalid(
                        "number_of_topics",
                        format!("must be 1..={}, got {}", MAX_TOPICS, n),
                    ))
                }
            }
            JobRequest::FlywheelIteration { flywheel_arn, .. } => {
                validate_comprehend_arn("flywheel_arn", flywheel_arn)
            }
            _ => Ok(()),
        }
    }
}
