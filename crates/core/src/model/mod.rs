mod ids;
pub mod payload;
mod question;
mod submission;
mod test;

pub use ids::{GroupId, OptionId, QuestionId, SectionId, TestId, TestResultId};
pub use payload::{
    GroupPayload, OptionPayload, QuestionPayload, SectionPayload, StartTestPayload, TestPayload,
};

pub use question::{AnswerOption, Question, QuestionType};
pub use submission::{AnswerRecord, SubmissionResult, SubmitSectionRequest, UserAnswer};
pub use test::{
    LoadedTest, ModelAnomaly, QuestionGroup, SectionKind, Test, TestModelError, TestSection,
};
