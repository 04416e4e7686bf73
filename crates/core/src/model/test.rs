use std::collections::{HashMap, HashSet};
use std::fmt;

use thiserror::Error;

use crate::model::ids::{GroupId, OptionId, QuestionId, SectionId, TestId};
use crate::model::payload::{GroupPayload, QuestionPayload, SectionPayload, TestPayload};
use crate::model::question::{AnswerOption, Question, QuestionType};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Fatal structural problems: the payload cannot be turned into a runnable test.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TestModelError {
    #[error("test {0} has no sections")]
    NoSections(TestId),

    #[error("test {0} has no questions")]
    NoQuestions(TestId),
}

/// Non-fatal authoring anomalies the loader normalized or skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ModelAnomaly {
    UnknownSectionKind { section_id: SectionId, raw: String },
    OrphanQuestion { question_id: QuestionId, group_id: Option<GroupId> },
    DuplicateQuestion { question_id: QuestionId },
    EmptyQuestionId { group_id: GroupId },
    MissingOptions { question_id: QuestionId },
    TypeMismatch { question_id: QuestionId, group_type: QuestionType, question_type: QuestionType },
}

impl fmt::Display for ModelAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSectionKind { section_id, raw } => {
                write!(f, "section {section_id} has unknown type {raw:?}")
            }
            Self::OrphanQuestion { question_id, group_id: Some(group_id) } => {
                write!(f, "question {question_id} references missing group {group_id}")
            }
            Self::OrphanQuestion { question_id, group_id: None } => {
                write!(f, "question {question_id} has no group")
            }
            Self::DuplicateQuestion { question_id } => {
                write!(f, "question {question_id} appears more than once")
            }
            Self::EmptyQuestionId { group_id } => {
                write!(f, "group {group_id} contains a question without id")
            }
            Self::MissingOptions { question_id } => {
                write!(f, "closed-form question {question_id} has no options")
            }
            Self::TypeMismatch { question_id, group_type, question_type } => write!(
                f,
                "question {question_id} is {question_type} inside a {group_type} group"
            ),
        }
    }
}

//
// ─── SECTION KIND ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Reading,
    Listening,
    Writing,
    Speaking,
}

impl SectionKind {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "reading" => Some(Self::Reading),
            "listening" => Some(Self::Listening),
            "writing" => Some(Self::Writing),
            "speaking" => Some(Self::Speaking),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reading => "reading",
            Self::Listening => "listening",
            Self::Writing => "writing",
            Self::Speaking => "speaking",
        }
    }
}

//
// ─── MODEL ─────────────────────────────────────────────────────────────────────
//

/// A cluster of questions sharing a passage, instruction or image.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionGroup {
    pub id: GroupId,
    pub title: Option<String>,
    pub instruction: Option<String>,
    pub passage: Option<String>,
    pub image_url: Option<String>,
    /// `None` for mixed groups.
    pub question_type: Option<QuestionType>,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestSection {
    pub id: SectionId,
    pub name: String,
    /// `None` when the backend sent a type outside the four known kinds.
    pub kind: Option<SectionKind>,
    pub duration_minutes: u32,
    pub description: Option<String>,
    pub groups: Vec<QuestionGroup>,
}

impl TestSection {
    #[must_use]
    pub fn question_count(&self) -> usize {
        self.groups.iter().map(|g| g.questions.len()).sum()
    }

    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.groups.iter().flat_map(|g| g.questions.iter())
    }
}

/// Immutable, normalized view of a test: ordered sections, groups, questions.
#[derive(Debug, Clone, PartialEq)]
pub struct Test {
    id: TestId,
    title: String,
    description: Option<String>,
    instructions: Option<String>,
    sections: Vec<TestSection>,
}

/// A loaded test together with the anomalies normalized away while loading.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedTest {
    pub test: Test,
    pub anomalies: Vec<ModelAnomaly>,
}

impl Test {
    /// Build a test from already-normalized sections.
    ///
    /// # Errors
    ///
    /// Returns `TestModelError::NoSections` or `TestModelError::NoQuestions`
    /// for a structurally empty test.
    pub fn new(
        id: TestId,
        title: impl Into<String>,
        sections: Vec<TestSection>,
    ) -> Result<Self, TestModelError> {
        if sections.is_empty() {
            return Err(TestModelError::NoSections(id));
        }
        if sections.iter().all(|s| s.question_count() == 0) {
            return Err(TestModelError::NoQuestions(id));
        }
        Ok(Self {
            id,
            title: title.into(),
            description: None,
            instructions: None,
            sections,
        })
    }

    /// Normalize a `StartTest` payload.
    ///
    /// Sections, groups and questions are stably sorted by their `ordering`
    /// field. Authoring anomalies are skipped or normalized and reported in
    /// `LoadedTest::anomalies`; only a structurally empty test is an error.
    ///
    /// # Errors
    ///
    /// Returns `TestModelError` if no section or no question survives.
    pub fn from_payload(payload: TestPayload) -> Result<LoadedTest, TestModelError> {
        let TestPayload {
            id,
            title,
            description,
            instructions,
            mut sections,
        } = payload;

        let mut anomalies = Vec::new();
        let mut seen = HashSet::new();

        sections.sort_by_key(|s| s.ordering);
        let sections: Vec<_> = sections
            .into_iter()
            .map(|section| build_section(section, &mut seen, &mut anomalies))
            .collect();

        let mut test = Self::new(TestId::new(id), title, sections)?;
        test.description = description;
        test.instructions = instructions;
        Ok(LoadedTest { test, anomalies })
    }

    #[must_use]
    pub fn id(&self) -> &TestId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    #[must_use]
    pub fn sections(&self) -> &[TestSection] {
        &self.sections
    }

    #[must_use]
    pub fn section(&self, id: &SectionId) -> Option<&TestSection> {
        self.sections.iter().find(|s| &s.id == id)
    }

    /// Sum of all section durations, in seconds.
    #[must_use]
    pub fn total_duration_seconds(&self) -> u64 {
        self.sections
            .iter()
            .map(|s| u64::from(s.duration_minutes) * 60)
            .sum()
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.sections.iter().map(|s| s.question_count()).sum()
    }

    /// All questions in flat order.
    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.sections.iter().flat_map(|s| s.questions())
    }
}

fn build_section(
    section: SectionPayload,
    seen: &mut HashSet<String>,
    anomalies: &mut Vec<ModelAnomaly>,
) -> TestSection {
    let SectionPayload {
        id,
        name,
        kind: raw_kind,
        duration,
        description,
        ordering: _,
        mut groups,
        questions: loose,
    } = section;
    let section_id = SectionId::new(id);

    let kind = SectionKind::parse(&raw_kind);
    if kind.is_none() {
        anomalies.push(ModelAnomaly::UnknownSectionKind {
            section_id: section_id.clone(),
            raw: raw_kind,
        });
    }

    // Loose questions are attached by `groupId`; unknown groups drop them.
    let group_ids: HashSet<&str> = groups.iter().map(|g| g.id.as_str()).collect();
    let mut attached: HashMap<String, Vec<QuestionPayload>> = HashMap::new();
    for question in loose {
        match question.group_id.clone() {
            Some(gid) if group_ids.contains(gid.as_str()) => {
                attached.entry(gid).or_default().push(question);
            }
            other => anomalies.push(ModelAnomaly::OrphanQuestion {
                question_id: QuestionId::new(question.id),
                group_id: other.map(GroupId::new),
            }),
        }
    }

    groups.sort_by_key(|g| g.ordering);
    let groups = groups
        .into_iter()
        .map(|mut group| {
            if let Some(extra) = attached.remove(&group.id) {
                group.questions.extend(extra);
            }
            build_group(group, seen, anomalies)
        })
        .collect();

    TestSection {
        id: section_id,
        name,
        kind,
        duration_minutes: duration,
        description,
        groups,
    }
}

fn build_group(
    group: GroupPayload,
    seen: &mut HashSet<String>,
    anomalies: &mut Vec<ModelAnomaly>,
) -> QuestionGroup {
    let GroupPayload {
        id,
        title,
        instruction,
        passage,
        image_url,
        question_type,
        ordering: _,
        mut questions,
    } = group;
    let group_id = GroupId::new(id);
    let group_type = question_type
        .as_deref()
        .filter(|raw| !raw.trim().is_empty() && !raw.eq_ignore_ascii_case("mixed"))
        .map(QuestionType::parse);

    questions.sort_by_key(|q| q.ordering);
    let mut built = Vec::with_capacity(questions.len());
    for question in questions {
        if question.id.trim().is_empty() {
            anomalies.push(ModelAnomaly::EmptyQuestionId {
                group_id: group_id.clone(),
            });
            continue;
        }
        if !seen.insert(question.id.clone()) {
            anomalies.push(ModelAnomaly::DuplicateQuestion {
                question_id: QuestionId::new(question.id),
            });
            continue;
        }
        built.push(build_question(question, group_type.as_ref(), anomalies));
    }

    QuestionGroup {
        id: group_id,
        title,
        instruction,
        passage,
        image_url,
        question_type: group_type,
        questions: built,
    }
}

fn build_question(
    question: QuestionPayload,
    group_type: Option<&QuestionType>,
    anomalies: &mut Vec<ModelAnomaly>,
) -> Question {
    let question_id = QuestionId::new(question.id);
    let own_type = question.question_type.as_deref().map(QuestionType::parse);

    // A question's own tag wins; an untagged question inherits the group's.
    let question_type = match (own_type, group_type) {
        (Some(own), Some(group)) if &own != group => {
            anomalies.push(ModelAnomaly::TypeMismatch {
                question_id: question_id.clone(),
                group_type: group.clone(),
                question_type: own.clone(),
            });
            own
        }
        (Some(own), _) => own,
        (None, Some(group)) => group.clone(),
        (None, None) => QuestionType::Other(String::new()),
    };

    let options: Vec<_> = question
        .options
        .into_iter()
        .filter(|opt| !opt.id.trim().is_empty())
        .map(|opt| AnswerOption {
            id: OptionId::new(opt.id),
            text: opt.text,
        })
        .collect();
    if question_type.is_closed_form() && options.is_empty() {
        anomalies.push(ModelAnomaly::MissingOptions {
            question_id: question_id.clone(),
        });
    }

    Question::new(question_id, question_type, question.prompt)
        .with_points(question.points.unwrap_or(1.0))
        .with_media(question.audio_url, question.image_url, question.passage)
        .with_options(options)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::payload::OptionPayload;

    fn question(id: &str, ordering: i64) -> QuestionPayload {
        QuestionPayload {
            id: id.into(),
            group_id: None,
            question_type: None,
            prompt: format!("prompt {id}"),
            audio_url: None,
            image_url: None,
            passage: None,
            points: None,
            ordering,
            options: vec![OptionPayload {
                id: "a".into(),
                text: "A".into(),
            }],
        }
    }

    fn group(id: &str, ordering: i64, questions: Vec<QuestionPayload>) -> GroupPayload {
        GroupPayload {
            id: id.into(),
            title: None,
            instruction: None,
            passage: None,
            image_url: None,
            question_type: Some("multiple_choice".into()),
            ordering,
            questions,
        }
    }

    fn section(id: &str, ordering: i64, groups: Vec<GroupPayload>) -> SectionPayload {
        SectionPayload {
            id: id.into(),
            name: id.to_uppercase(),
            kind: "reading".into(),
            duration: 30,
            description: None,
            ordering,
            groups,
            questions: Vec::new(),
        }
    }

    fn payload(sections: Vec<SectionPayload>) -> TestPayload {
        TestPayload {
            id: "t1".into(),
            title: "Mock".into(),
            description: None,
            instructions: Some("Read carefully".into()),
            sections,
        }
    }

    fn flat_ids(test: &Test) -> Vec<String> {
        test.questions().map(|q| q.id().to_string()).collect()
    }

    #[test]
    fn orders_by_ordering_field_not_position() {
        let loaded = Test::from_payload(payload(vec![
            section("s2", 2, vec![group("g3", 1, vec![question("q5", 1)])]),
            section(
                "s1",
                1,
                vec![
                    group("g2", 2, vec![question("q4", 2), question("q3", 1)]),
                    group("g1", 1, vec![question("q2", 2), question("q1", 1)]),
                ],
            ),
        ]))
        .unwrap();

        assert_eq!(flat_ids(&loaded.test), vec!["q1", "q2", "q3", "q4", "q5"]);
        assert_eq!(loaded.test.sections()[0].id, SectionId::new("s1"));
        assert!(loaded.anomalies.is_empty());
    }

    #[test]
    fn equal_ordering_keeps_payload_order() {
        let loaded = Test::from_payload(payload(vec![section(
            "s1",
            0,
            vec![group("g1", 0, vec![question("b", 0), question("a", 0)])],
        )]))
        .unwrap();

        assert_eq!(flat_ids(&loaded.test), vec!["b", "a"]);
    }

    #[test]
    fn empty_test_is_rejected() {
        let err = Test::from_payload(payload(Vec::new())).unwrap_err();
        assert_eq!(err, TestModelError::NoSections(TestId::new("t1")));

        let err = Test::from_payload(payload(vec![section("s1", 0, Vec::new())])).unwrap_err();
        assert_eq!(err, TestModelError::NoQuestions(TestId::new("t1")));
    }

    #[test]
    fn orphan_questions_are_skipped() {
        let mut s = section("s1", 0, vec![group("g1", 0, vec![question("q1", 0)])]);
        let mut attached = question("q2", 1);
        attached.group_id = Some("g1".into());
        let mut orphan = question("q3", 0);
        orphan.group_id = Some("missing".into());
        s.questions = vec![attached, orphan];

        let loaded = Test::from_payload(payload(vec![s])).unwrap();

        assert_eq!(flat_ids(&loaded.test), vec!["q1", "q2"]);
        assert_eq!(
            loaded.anomalies,
            vec![ModelAnomaly::OrphanQuestion {
                question_id: QuestionId::new("q3"),
                group_id: Some(GroupId::new("missing")),
            }]
        );
    }

    #[test]
    fn duplicate_and_anonymous_questions_are_dropped() {
        let loaded = Test::from_payload(payload(vec![section(
            "s1",
            0,
            vec![group(
                "g1",
                0,
                vec![question("q1", 0), question("q1", 1), question("  ", 2)],
            )],
        )]))
        .unwrap();

        assert_eq!(loaded.test.question_count(), 1);
        assert_eq!(loaded.anomalies.len(), 2);
    }

    #[test]
    fn closed_form_without_options_is_kept_and_reported() {
        let mut q = question("q1", 0);
        q.options.clear();
        let loaded =
            Test::from_payload(payload(vec![section("s1", 0, vec![group("g1", 0, vec![q])])]))
                .unwrap();

        assert_eq!(loaded.test.question_count(), 1);
        assert_eq!(
            loaded.anomalies,
            vec![ModelAnomaly::MissingOptions {
                question_id: QuestionId::new("q1")
            }]
        );
    }

    #[test]
    fn question_inherits_group_type_and_keeps_own_on_mismatch() {
        let mut tagged = question("q2", 1);
        tagged.question_type = Some("fill_blank".into());
        let loaded = Test::from_payload(payload(vec![section(
            "s1",
            0,
            vec![group("g1", 0, vec![question("q1", 0), tagged])],
        )]))
        .unwrap();

        let types: Vec<_> = loaded.test.questions().map(|q| q.question_type().clone()).collect();
        assert_eq!(types, vec![QuestionType::MultipleChoice, QuestionType::FillBlank]);
        assert!(matches!(loaded.anomalies[0], ModelAnomaly::TypeMismatch { .. }));
    }

    #[test]
    fn total_duration_sums_sections() {
        let loaded = Test::from_payload(payload(vec![
            section("s1", 0, vec![group("g1", 0, vec![question("q1", 0)])]),
            section("s2", 1, vec![group("g2", 0, vec![question("q2", 0)])]),
        ]))
        .unwrap();

        assert_eq!(loaded.test.total_duration_seconds(), 3600);
        assert_eq!(loaded.test.instructions(), Some("Read carefully"));
    }

    #[test]
    fn unknown_section_kind_is_reported() {
        let mut s = section("s1", 0, vec![group("g1", 0, vec![question("q1", 0)])]);
        s.kind = "grammar".into();
        let loaded = Test::from_payload(payload(vec![s])).unwrap();

        assert_eq!(loaded.test.sections()[0].kind, None);
        assert!(matches!(
            loaded.anomalies[0],
            ModelAnomaly::UnknownSectionKind { .. }
        ));
    }
}
