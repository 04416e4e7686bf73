use std::collections::HashMap;

use crate::model::QuestionId;

/// A student's current answer to one question.
///
/// The store accepts any variant for any question; shape is only checked when
/// the serializer maps it to the question's wire record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerValue {
    /// A single option id, token, or short value.
    Single(String),
    /// Several tokens or option ids.
    Multi(Vec<String>),
    /// Free text.
    Text(String),
    /// Explicitly unanswered. Writing it clears the entry.
    Absent,
}

impl AnswerValue {
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_owned())
    }
}

/// Mutable map from question id to the latest answer. Last write wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerStore {
    answers: HashMap<QuestionId, AnswerValue>,
}

impl AnswerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert an answer, or remove it when `value` is `AnswerValue::Absent`.
    pub fn set(&mut self, question_id: QuestionId, value: AnswerValue) {
        if value.is_absent() {
            self.answers.remove(&question_id);
        } else {
            self.answers.insert(question_id, value);
        }
    }

    #[must_use]
    pub fn get(&self, question_id: &QuestionId) -> Option<&AnswerValue> {
        self.answers.get(question_id)
    }

    #[must_use]
    pub fn is_answered(&self, question_id: &QuestionId) -> bool {
        self.answers.contains_key(question_id)
    }

    /// Number of distinct answered questions.
    #[must_use]
    pub fn count(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn clear(&mut self) {
        self.answers.clear();
    }
}
