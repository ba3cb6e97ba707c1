//! Job type tag and language codes.

use serde::{Deserialize, Serialize};

/// Kind of asynchronous job accepted by the service.
///
/// The job type decides which status vocabulary the describe call reports,
/// which result shape the fetch call returns, and whether the job can be
/// stopped once started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    DocumentClassification,
    EntitiesDetection,
    PiiEntitiesDetection,
    EventsDetection,
    DominantLanguageDetection,
    KeyPhrasesDetection,
    SentimentDetection,
    TopicsDetection,
    FlywheelIteration,
}

impl JobType {
    pub const ALL: [JobType; 9] = [
        JobType::DocumentClassification,
        JobType::EntitiesDetection,
        JobType::PiiEntitiesDetection,
        JobType::EventsDetection,
        JobType::DominantLanguageDetection,
        JobType::KeyPhrasesDetection,
        JobType::SentimentDetection,
        JobType::TopicsDetection,
        JobType::FlywheelIteration,
    ];

    /// Convert to string.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::DocumentClassification => "document_classification",
            JobType::EntitiesDetection => "entities_detection",
            JobType::PiiEntitiesDetection => "pii_entities_detection",
            JobType::EventsDetection => "events_detection",
            JobType::DominantLanguageDetection => "dominant_language_detection",
            JobType::KeyPhrasesDetection => "key_phrases_detection",
            JobType::SentimentDetection => "sentiment_detection",
            JobType::TopicsDetection => "topics_detection",
            JobType::FlywheelIteration => "flywheel_iteration",
        }
    }

    /// Resource segment used when building the job ARN
    /// (`arn:aws:comprehend:<region>:<account>:<segment>/<job id>`).
    pub fn arn_resource(&self) -> &'static str {
        match self {
            JobType::DocumentClassification => "document-classification-job",
            JobType::EntitiesDetection => "entities-detection-job",
            JobType::PiiEntitiesDetection => "pii-entities-detection-job",
            JobType::EventsDetection => "events-detection-job",
            JobType::DominantLanguageDetection => "dominant-language-detection-job",
            JobType::KeyPhrasesDetection => "key-phrases-detection-job",
            JobType::SentimentDetection => "sentiment-detection-job",
            JobType::TopicsDetection => "topics-detection-job",
            JobType::FlywheelIteration => "flywheel-iteration",
        }
    }

    /// Whether the service exposes a stop operation for this job type.
    pub fn supports_stop(&self) -> bool {
        !matches!(
            self,
            JobType::DocumentClassification
                | JobType::TopicsDetection
                | JobType::FlywheelIteration
        )
    }

    /// Whether jobs of this type report flywheel iteration statuses
    /// (`TRAINING`, `EVALUATING`, ...) instead of the analysis-job vocabulary.
    pub fn is_flywheel(&self) -> bool {
        matches!(self, JobType::FlywheelIteration)
    }

    /// Parse the snake_case form produced by [`JobType::as_str`].
    pub fn parse(s: &str) -> Option<Self> {
        JobType::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Language of the input documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LanguageCode {
    #[serde(rename = "en")]
    En,
    #[serde(rename = "es")]
    Es,
    #[serde(rename = "fr")]
    Fr,
    #[serde(rename = "de")]
    De,
    #[serde(rename = "it")]
    It,
    #[serde(rename = "pt")]
    Pt,
    #[serde(rename = "ar")]
    Ar,
    #[serde(rename = "hi")]
    Hi,
    #[serde(rename = "ja")]
    Ja,
    #[serde(rename = "ko")]
    Ko,
    #[serde(rename = "zh")]
    Zh,
    #[serde(rename = "zh-TW")]
    ZhTw,
}

impl LanguageCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageCode::En => "en",
            LanguageCode::Es => "es",
            LanguageCode::Fr => "fr",
            LanguageCode::De => "de",
            LanguageCode::It => "it",
            LanguageCode::Pt => "pt",
            LanguageCode::Ar => "ar",
            LanguageCode::Hi => "hi",
            LanguageCode::Ja => "ja",
            LanguageCode::Ko => "ko",
            LanguageCode::Zh => "zh",
            LanguageCode::ZhTw => "zh-TW",
        }
    }
}

impl std::fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
