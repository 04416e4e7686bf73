//! Maps the answer store onto the `SubmitSection` wire format.
//!
//! Every question of the test produces exactly one record, answered or not,
//! so the grader can count skipped questions. Missing answers never fail.

use crate::answers::{AnswerStore, AnswerValue};
use crate::model::{AnswerRecord, QuestionType, Test, UserAnswer};

/// Serialize one answer according to the question's type tag.
#[must_use]
pub fn serialize_answer(question_type: &QuestionType, value: Option<&AnswerValue>) -> UserAnswer {
    match question_type {
        QuestionType::MultipleChoice => UserAnswer::MultipleChoice(option_list(value)),
        QuestionType::FillBlank => UserAnswer::FillBlank(joined_text(value)),
        QuestionType::TrueFalse => UserAnswer::TrueFalse(joined_text(value)),
        QuestionType::Matching => UserAnswer::Matching(joined_text(value)),
        QuestionType::Essay | QuestionType::Speaking | QuestionType::Other(_) => {
            UserAnswer::Text(joined_text(value))
        }
    }
}

/// One record per question, in flat test order.
#[must_use]
pub fn build_answer_records(test: &Test, answers: &AnswerStore) -> Vec<AnswerRecord> {
    test.questions()
        .map(|question| AnswerRecord {
            question_id: question.id().clone(),
            user_answer: serialize_answer(question.question_type(), answers.get(question.id())),
        })
        .collect()
}

fn option_list(value: Option<&AnswerValue>) -> Vec<String> {
    match value {
        Some(AnswerValue::Single(id) | AnswerValue::Text(id)) if !id.is_empty() => {
            vec![id.clone()]
        }
        Some(AnswerValue::Multi(ids)) => ids.iter().filter(|id| !id.is_empty()).cloned().collect(),
        _ => Vec::new(),
    }
}

fn joined_text(value: Option<&AnswerValue>) -> String {
    match value {
        Some(AnswerValue::Single(text) | AnswerValue::Text(text)) => text.clone(),
        Some(AnswerValue::Multi(tokens)) => tokens.join(" "),
        Some(AnswerValue::Absent) | None => String::new(),
    }
}
