//! Lesson types for Gleaner.
//!
//! A [`CandidateRecord`] is what the model proposes and the filter admits;
//! a [`LessonEntry`] is what lands in the lesson store; an
//! [`ExtractionResult`] is what the pipeline hands back to the host.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::turn::Turn;

/// Metadata `type` tag identifying lessons among other memory kinds.
pub const LESSON_MEMORY_TYPE: &str = "lesson";

/// Outcome recorded when the model omits one.
pub const DEFAULT_OUTCOME: &str = "partial";

/// Lowest confidence a lesson can be admitted with. Configuration may raise
/// the threshold but never lower it below this.
pub const MIN_CONFIDENCE: f64 = 0.5;

/// Suggested lesson categories offered to the model.
///
/// Categories outside this set are still stored verbatim; this enum only
/// drives prompt wording and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LessonCategory {
    TaskEstimation,
    ProjectSelection,
    ErrorHandling,
    UserPreference,
    ToolSelection,
}

impl LessonCategory {
    /// All suggested categories, in prompt order.
    pub const ALL: [LessonCategory; 5] = [
        LessonCategory::TaskEstimation,
        LessonCategory::ProjectSelection,
        LessonCategory::ErrorHandling,
        LessonCategory::UserPreference,
        LessonCategory::ToolSelection,
    ];

    /// Short description used in the extraction prompt.
    pub fn description(&self) -> &'static str {
        match self {
            LessonCategory::TaskEstimation => "how long or how hard work turned out to be",
            LessonCategory::ProjectSelection => "which projects or tasks were worth taking on",
            LessonCategory::ErrorHandling => "what went wrong and how it was recovered",
            LessonCategory::UserPreference => "how the user likes things done",
            LessonCategory::ToolSelection => "which tools worked or did not for a job",
        }
    }
}

impl fmt::Display for LessonCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LessonCategory::TaskEstimation => write!(f, "task-estimation"),
            LessonCategory::ProjectSelection => write!(f, "project-selection"),
            LessonCategory::ErrorHandling => write!(f, "error-handling"),
            LessonCategory::UserPreference => write!(f, "user-preference"),
            LessonCategory::ToolSelection => write!(f, "tool-selection"),
        }
    }
}

impl FromStr for LessonCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "task-estimation" => Ok(LessonCategory::TaskEstimation),
            "project-selection" => Ok(LessonCategory::ProjectSelection),
            "error-handling" => Ok(LessonCategory::ErrorHandling),
            "user-preference" => Ok(LessonCategory::UserPreference),
            "tool-selection" => Ok(LessonCategory::ToolSelection),
            other => Err(format!("invalid lesson category: '{other}'")),
        }
    }
}

/// A model-proposed lesson that passed admission filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// The distilled statement.
    pub text: String,
    /// Open vocabulary; see [`LessonCategory`] for the suggested values.
    pub category: String,
    pub confidence: f64,
    /// Usually `success`, `failure` or `partial`; not enforced.
    pub outcome: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

/// Provenance metadata attached to a persisted lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonMetadata {
    /// Extraction kind tag, always [`LESSON_MEMORY_TYPE`] for this pipeline.
    #[serde(rename = "type")]
    pub kind: String,
    pub category: String,
    pub confidence: f64,
    pub outcome: String,
    pub extracted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

/// A lesson as stored in the lesson repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonEntry {
    pub id: Uuid,
    /// The lesson text (the candidate's `text`).
    pub content: String,
    pub metadata: LessonMetadata,
    /// Room of the turn the lesson was extracted from.
    pub room_id: Uuid,
    /// Entity that sent the turn.
    pub entity_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl LessonEntry {
    /// Build the persisted form of an admitted candidate for the given turn.
    pub fn from_candidate(record: &CandidateRecord, turn: &Turn, extracted_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            content: record.text.clone(),
            metadata: LessonMetadata {
                kind: LESSON_MEMORY_TYPE.to_string(),
                category: record.category.clone(),
                confidence: record.confidence,
                outcome: record.outcome.clone(),
                extracted_at,
                task_id: record.task_id.clone(),
            },
            room_id: turn.room_id,
            entity_id: turn.entity_id,
            created_at: extracted_at,
        }
    }
}

/// Where an extraction run ended up.
///
/// Every returned [`ExtractionResult`] carries one of these; the same value is
/// recorded on the `extract_lessons` span as `stage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStage {
    /// No trigger signal; the model was not called.
    Skipped,
    ModelFailed,
    FailedParse,
    Cancelled,
    Done,
}

impl fmt::Display for ExtractionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExtractionStage::Skipped => "skipped",
            ExtractionStage::ModelFailed => "model_failed",
            ExtractionStage::FailedParse => "failed_parse",
            ExtractionStage::Cancelled => "cancelled",
            ExtractionStage::Done => "done",
        };
        write!(f, "{s}")
    }
}

/// The records actually persisted for one turn, in candidate order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub records: Vec<CandidateRecord>,
    pub stage: ExtractionStage,
}

impl ExtractionResult {
    /// An empty result ending in `stage`.
    pub fn empty(stage: ExtractionStage) -> Self {
        Self {
            records: Vec::new(),
            stage,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
