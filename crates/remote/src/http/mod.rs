use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use thiserror::Error;

use exam_core::model::{StartTestPayload, SubmissionResult, SubmitSectionRequest, TestId};

use crate::api::{AssessmentApi, RemoteError};

mod mapping;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RemoteConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("invalid {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Connection settings for the assessment backend.
#[derive(Clone, Debug)]
pub struct RemoteConfig {
    pub base_url: Url,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl RemoteConfig {
    /// Read `EXAM_API_BASE_URL`, `EXAM_API_TOKEN` and `EXAM_API_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Returns `RemoteConfigError` if the base URL is missing or a value is malformed.
    pub fn from_env() -> Result<Self, RemoteConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` with an injectable variable source.
    ///
    /// # Errors
    ///
    /// Returns `RemoteConfigError` if the base URL is missing or a value is malformed.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, RemoteConfigError> {
        let raw_url = lookup("EXAM_API_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(RemoteConfigError::Missing("EXAM_API_BASE_URL"))?;
        let base_url = parse_base_url(&raw_url)?;

        let token = lookup("EXAM_API_TOKEN").filter(|v| !v.trim().is_empty());

        let timeout = match lookup("EXAM_API_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or(RemoteConfigError::Invalid {
                    key: "EXAM_API_TIMEOUT_SECS",
                    value: raw,
                })?,
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            base_url,
            token,
            timeout,
        })
    }

    /// Config pointing at `base_url` with defaults for everything else.
    ///
    /// # Errors
    ///
    /// Returns `RemoteConfigError::Invalid` if `base_url` is not an absolute http(s) URL.
    pub fn new(base_url: &str) -> Result<Self, RemoteConfigError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

fn parse_base_url(raw: &str) -> Result<Url, RemoteConfigError> {
    let invalid = || RemoteConfigError::Invalid {
        key: "EXAM_API_BASE_URL",
        value: raw.to_owned(),
    };
    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(invalid());
    }
    Ok(url)
}

/// `AssessmentApi` over JSON/HTTP.
#[derive(Clone)]
pub struct HttpAssessmentApi {
    client: Client,
    config: RemoteConfig,
}

impl HttpAssessmentApi {
    /// # Errors
    ///
    /// Returns `RemoteError::Transport` if the HTTP client cannot be built.
    pub fn new(config: RemoteConfig) -> Result<Self, RemoteError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    fn post(&self, url: Url) -> reqwest::RequestBuilder {
        let request = self.client.post(url);
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl AssessmentApi for HttpAssessmentApi {
    #[tracing::instrument(skip(self, test_id), fields(test_id = %test_id))]
    async fn start_test(&self, test_id: &TestId) -> Result<StartTestPayload, RemoteError> {
        let url = mapping::endpoint(&self.config.base_url, &["tests", test_id.as_str(), "start"]);
        let response = self.post(url).send().await?;
        let payload: StartTestPayload = mapping::read_json(response).await?;
        tracing::debug!(
            test_result_id = %payload.test_result_id,
            sections = payload.test.sections.len(),
            "test started"
        );
        Ok(payload)
    }

    #[tracing::instrument(
        skip(self, request),
        fields(
            test_result_id = %request.test_result_id,
            section_id = %request.test_section_id,
            answers = request.answers.len(),
        )
    )]
    async fn submit_section(
        &self,
        request: &SubmitSectionRequest,
    ) -> Result<SubmissionResult, RemoteError> {
        let url = mapping::endpoint(
            &self.config.base_url,
            &[
                "test-results",
                request.test_result_id.as_str(),
                "sections",
                request.test_section_id.as_str(),
                "submit",
            ],
        );
        let response = self.post(url).json(request).send().await?;
        let result: SubmissionResult = mapping::read_json(response).await?;
        tracing::debug!(
            band_score = result.band_score,
            correct = result.correct_answers,
            total = result.total_questions,
            "section graded"
        );
        Ok(result)
    }
}
