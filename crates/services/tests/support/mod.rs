#![allow(dead_code)]

use std::sync::Arc;

use exam_core::model::{GroupPayload, OptionPayload, QuestionPayload, SectionPayload, TestPayload};
use exam_core::time::fixed_now;
use exam_core::ManualClock;
use remote::ScriptedAssessmentApi;
use services::{Clock, SessionConfig, TestSession};

pub const TEST_ID: &str = "t-mock";

fn question(id: &str, kind: &str, options: &[&str]) -> QuestionPayload {
    QuestionPayload {
        id: id.into(),
        group_id: None,
        question_type: Some(kind.into()),
        prompt: format!("Prompt {id}"),
        audio_url: None,
        image_url: None,
        passage: None,
        points: None,
        ordering: 0,
        options: options
            .iter()
            .map(|o| OptionPayload {
                id: (*o).into(),
                text: o.to_uppercase(),
            })
            .collect(),
    }
}

fn group(id: &str, kind: &str, questions: Vec<QuestionPayload>) -> GroupPayload {
    GroupPayload {
        id: id.into(),
        title: None,
        instruction: None,
        passage: None,
        image_url: None,
        question_type: Some(kind.into()),
        ordering: 0,
        questions,
    }
}

fn section(id: &str, name: &str, minutes: u32, ordering: i64, groups: Vec<GroupPayload>) -> SectionPayload {
    SectionPayload {
        id: id.into(),
        name: name.into(),
        kind: name.to_lowercase(),
        duration: minutes,
        description: None,
        ordering,
        groups,
        questions: Vec::new(),
    }
}

/// Reading: one group of two multiple-choice questions.
/// Listening: one group with a single fill-blank question.
/// One minute in total.
pub fn two_section_test() -> TestPayload {
    TestPayload {
        id: TEST_ID.into(),
        title: "Mock test".into(),
        description: None,
        instructions: Some("Answer everything.".into()),
        sections: vec![
            section(
                "s-listening",
                "Listening",
                0,
                2,
                vec![group("g-2", "fill_blank", vec![question("q3", "fill_blank", &[])])],
            ),
            section(
                "s-reading",
                "Reading",
                1,
                1,
                vec![group(
                    "g-1",
                    "multiple_choice",
                    vec![
                        question("q1", "multiple_choice", &["optA", "optB"]),
                        question("q2", "multiple_choice", &["optC", "optD"]),
                    ],
                )],
            ),
        ],
    }
}

pub struct Harness {
    pub api: ScriptedAssessmentApi,
    pub clock: ManualClock,
    pub session: Arc<TestSession>,
}

pub fn harness(config: SessionConfig) -> Harness {
    let api = ScriptedAssessmentApi::new();
    api.insert_test(two_section_test()).unwrap();
    let clock = ManualClock::starting_at(fixed_now());
    let session = TestSession::new(Arc::new(api.clone()))
        .with_clock(Clock::from(clock.clone()))
        .with_config(config);
    Harness {
        api,
        clock,
        session: Arc::new(session),
    }
}

/// Loaded and begun.
pub async fn started(config: SessionConfig) -> Harness {
    let h = harness(config);
    h.session.load(TEST_ID.into()).await.unwrap();
    h.session.begin().unwrap();
    h
}
