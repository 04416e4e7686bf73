//! Wire shapes returned by the `StartTest` remote operation.
//!
//! These mirror the backend JSON one-to-one and are deliberately loose
//! (optional fields, defaulted lists). `Test::from_payload` turns them into
//! the normalized model and reports whatever it had to skip.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestPayload {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default, alias = "testSections")]
    pub sections: Vec<SectionPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionPayload {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", alias = "sectionType", default)]
    pub kind: String,
    /// Minutes.
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ordering: i64,
    #[serde(default, alias = "questionGroups")]
    pub groups: Vec<GroupPayload>,
    /// Questions attached to a group by `groupId` instead of by nesting.
    #[serde(default)]
    pub questions: Vec<QuestionPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPayload {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub instruction: Option<String>,
    #[serde(default)]
    pub passage: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub question_type: Option<String>,
    #[serde(default)]
    pub ordering: i64,
    #[serde(default)]
    pub questions: Vec<QuestionPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPayload {
    pub id: String,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub question_type: Option<String>,
    #[serde(default, alias = "questionText")]
    pub prompt: String,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub passage: Option<String>,
    #[serde(default)]
    pub points: Option<f64>,
    #[serde(default)]
    pub ordering: i64,
    #[serde(default)]
    pub options: Vec<OptionPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionPayload {
    pub id: String,
    #[serde(default, alias = "optionText")]
    pub text: String,
}

/// Successful `StartTest` response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTestPayload {
    pub test_result_id: String,
    pub test: TestPayload,
}
