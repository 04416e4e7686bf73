use std::fmt;

use crate::model::ids::{OptionId, QuestionId};

//
// ─── QUESTION TYPE ─────────────────────────────────────────────────────────────
//

/// Type tag carried by every question and question group.
///
/// Unknown tags are preserved in `Other` so they still serialize as free text
/// at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QuestionType {
    MultipleChoice,
    FillBlank,
    TrueFalse,
    Matching,
    Essay,
    Speaking,
    Other(String),
}

impl QuestionType {
    /// Parses a backend type tag. Matching is case-insensitive and accepts
    /// `-` in place of `_`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "multiple_choice" => Self::MultipleChoice,
            "fill_blank" | "fill_in_blank" => Self::FillBlank,
            "true_false" | "true_false_not_given" => Self::TrueFalse,
            "matching" => Self::Matching,
            "essay" => Self::Essay,
            "speaking" => Self::Speaking,
            _ => Self::Other(raw.trim().to_owned()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::MultipleChoice => "multiple_choice",
            Self::FillBlank => "fill_blank",
            Self::TrueFalse => "true_false",
            Self::Matching => "matching",
            Self::Essay => "essay",
            Self::Speaking => "speaking",
            Self::Other(raw) => raw,
        }
    }

    /// Closed-form types answer by picking from an option list.
    #[must_use]
    pub fn is_closed_form(&self) -> bool {
        matches!(self, Self::MultipleChoice | Self::Matching)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// One selectable option of a closed-form question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOption {
    pub id: OptionId,
    pub text: String,
}

/// Immutable view of a single question.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    id: QuestionId,
    question_type: QuestionType,
    prompt: String,
    audio_url: Option<String>,
    image_url: Option<String>,
    passage: Option<String>,
    points: f64,
    options: Vec<AnswerOption>,
}

impl Question {
    #[must_use]
    pub fn new(id: QuestionId, question_type: QuestionType, prompt: impl Into<String>) -> Self {
        Self {
            id,
            question_type,
            prompt: prompt.into(),
            audio_url: None,
            image_url: None,
            passage: None,
            points: 1.0,
            options: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: Vec<AnswerOption>) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_points(mut self, points: f64) -> Self {
        self.points = points;
        self
    }

    #[must_use]
    pub fn with_media(
        mut self,
        audio_url: Option<String>,
        image_url: Option<String>,
        passage: Option<String>,
    ) -> Self {
        self.audio_url = audio_url;
        self.image_url = image_url;
        self.passage = passage;
        self
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn question_type(&self) -> &QuestionType {
        &self.question_type
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn audio_url(&self) -> Option<&str> {
        self.audio_url.as_deref()
    }

    #[must_use]
    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    #[must_use]
    pub fn passage(&self) -> Option<&str> {
        self.passage.as_deref()
    }

    #[must_use]
    pub fn points(&self) -> f64 {
        self.points
    }

    #[must_use]
    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    #[must_use]
    pub fn option(&self, id: &OptionId) -> Option<&AnswerOption> {
        self.options.iter().find(|opt| &opt.id == id)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
