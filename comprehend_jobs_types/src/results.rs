//! Result shapes returned by the fetch-result collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job_type::{JobType, LanguageCode};
use crate::requests::PiiEntitiesDetectionMode;

/// Model quality metrics reported for a flywheel iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct FlywheelMetrics {
    pub f1_score: Option<f64>,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub accuracy: Option<f64>,
}

/// Job-type specific part of a completed job's properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "job_type", rename_all = "snake_case")]
pub enum ResultDetail {
    DocumentClassification {
        document_classifier_arn: String,
    },
    EntitiesDetection {
        language_code: LanguageCode,
        entity_recognizer_arn: Option<String>,
    },
    PiiEntitiesDetection {
        language_code: LanguageCode,
        mode: PiiEntitiesDetectionMode,
    },
    EventsDetection {
        language_code: LanguageCode,
        target_event_types: Vec<String>,
    },
    DominantLanguageDetection,
    KeyPhrasesDetection {
        language_code: LanguageCode,
    },
    SentimentDetection {
        language_code: LanguageCode,
    },
    TopicsDetection {
        number_of_topics: Option<u32>,
    },
    FlywheelIteration {
        flywheel_arn: String,
        evaluated_model_arn: Option<String>,
        trained_model_arn: Option<String>,
        evaluated_metrics: Option<FlywheelMetrics>,
        trained_metrics: Option<FlywheelMetrics>,
    },
}

impl ResultDetail {
    pub fn job_type(&self) -> JobType {
        match self {
            ResultDetail::DocumentClassification { .. } => JobType::DocumentClassification,
            ResultDetail::EntitiesDetection { .. } => JobType::EntitiesDetection,
            ResultDetail::PiiEntitiesDetection { .. } => JobType::PiiEntitiesDetection,
            ResultDetail::EventsDetection { .. } => JobType::EventsDetection,
            ResultDetail::DominantLanguageDetection => JobType::DominantLanguageDetection,
            ResultDetail::KeyPhrasesDetection { .. } => JobType::KeyPhrasesDetection,
            ResultDetail::SentimentDetection { .. } => JobType::SentimentDetection,
            ResultDetail::TopicsDetection { .. } => JobType::TopicsDetection,
            ResultDetail::FlywheelIteration { .. } => JobType::FlywheelIteration,
        }
    }
}

/// Materialized result of a completed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: String,
    /// Where the service wrote the job output, if it produces any.
    pub output_s3_uri: Option<String>,
    pub submit_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub detail: ResultDetail,
}

impl JobResult {
    pub fn job_type(&self) -> JobType {
        self.detail.job_type()
    }
}
