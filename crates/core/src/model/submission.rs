use serde::{Deserialize, Serialize};

use crate::model::ids::{QuestionId, SectionId, TestResultId};

/// Wire representation of one question's answer.
///
/// Serializes as a single-key object naming the answer kind, e.g.
/// `{"fill_blank_answers": ""}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserAnswer {
    #[serde(rename = "multiple_choice_answers")]
    MultipleChoice(Vec<String>),
    #[serde(rename = "fill_blank_answers")]
    FillBlank(String),
    #[serde(rename = "true_false_answers")]
    TrueFalse(String),
    #[serde(rename = "matching_answers")]
    Matching(String),
    #[serde(rename = "text_answers")]
    Text(String),
}

impl UserAnswer {
    /// True when the record carries no answer at all.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::MultipleChoice(ids) => ids.is_empty(),
            Self::FillBlank(s) | Self::TrueFalse(s) | Self::Matching(s) | Self::Text(s) => {
                s.is_empty()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub question_id: QuestionId,
    pub user_answer: UserAnswer,
}

/// Body of the `SubmitSection` remote operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitSectionRequest {
    pub test_result_id: TestResultId,
    pub test_section_id: SectionId,
    pub time_taken_seconds: u64,
    pub answers: Vec<AnswerRecord>,
}

/// Grading outcome produced by the backend. Never computed locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    pub band_score: f64,
    pub correct_answers: u32,
    pub total_questions: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detailed_answers: Option<serde_json::Value>,
}
