use chrono::{DateTime, Utc};

use exam_core::model::{QuestionId, SectionId, SubmissionResult, TestId, TestResultId};
use exam_core::NavQuestionRef;

use super::state::SessionState;

/// Answered/total counts for one section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionProgress {
    pub section_id: SectionId,
    pub name: String,
    pub answered: usize,
    pub total: usize,
}

/// Read model the presentation layer renders.
///
/// Presentation-agnostic: raw counts and seconds, no formatted strings.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub test_id: Option<TestId>,
    pub test_result_id: Option<TestResultId>,
    pub active_section: Option<SectionId>,
    pub started_at: Option<DateTime<Utc>>,
    /// `None` until a test is loaded.
    pub remaining_seconds: Option<u64>,
    pub answered: usize,
    pub total: usize,
    pub sections: Vec<SectionProgress>,
    pub flagged: Vec<QuestionId>,
    pub current: Option<NavQuestionRef>,
    pub last_error: Option<String>,
    pub result: Option<SubmissionResult>,
}

impl SessionSnapshot {
    pub(crate) fn idle() -> Self {
        Self {
            state: SessionState::Idle,
            test_id: None,
            test_result_id: None,
            active_section: None,
            started_at: None,
            remaining_seconds: None,
            answered: 0,
            total: 0,
            sections: Vec::new(),
            flagged: Vec::new(),
            current: None,
            last_error: None,
            result: None,
        }
    }

    #[must_use]
    pub fn unanswered(&self) -> usize {
        self.total.saturating_sub(self.answered)
    }
}
