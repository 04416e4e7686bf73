use async_trait::async_trait;
use thiserror::Error;

use exam_core::model::{StartTestPayload, SubmissionResult, SubmitSectionRequest, TestId};

/// Errors surfaced by remote adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RemoteError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("request rejected with status {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("remote unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

impl RemoteError {
    /// Whether repeating the same call can reasonably succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unavailable(_) | Self::Transport(_) => true,
            Self::HttpStatus { status, .. } => {
                status.is_server_error()
                    || *status == reqwest::StatusCode::REQUEST_TIMEOUT
                    || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            Self::NotFound(_) | Self::Decode(_) => false,
        }
    }
}

/// The two remote operations bounding an assessment session.
#[async_trait]
pub trait AssessmentApi: Send + Sync {
    /// Open a fresh attempt for `test_id` and fetch the full test structure.
    ///
    /// Every call issues a new `testResultId`; attempts are never resumed.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` on transport, status or decoding failures.
    async fn start_test(&self, test_id: &TestId) -> Result<StartTestPayload, RemoteError>;

    /// Submit serialized answers for grading.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` on transport, status or decoding failures.
    async fn submit_section(
        &self,
        request: &SubmitSectionRequest,
    ) -> Result<SubmissionResult, RemoteError>;
}
