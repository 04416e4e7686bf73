use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::Notify;

use exam_core::model::{
    StartTestPayload, SubmissionResult, SubmitSectionRequest, TestId, TestPayload,
};

use crate::api::{AssessmentApi, RemoteError};

#[derive(Default)]
struct ScriptState {
    tests: HashMap<TestId, TestPayload>,
    result: Option<SubmissionResult>,
    fail_next_starts: u32,
    fail_next_submits: u32,
    start_calls: u32,
    submit_calls: u32,
    submitted: Vec<SubmitSectionRequest>,
    gate: Option<Arc<Notify>>,
}

/// In-memory `AssessmentApi` for tests and offline runs.
///
/// Counts calls, records every submitted request, can fail the next N calls
/// and can hold submissions open until released.
#[derive(Clone, Default)]
pub struct ScriptedAssessmentApi {
    state: Arc<Mutex<ScriptState>>,
}

/// Handle that releases a held submission.
#[derive(Clone)]
pub struct SubmitGate {
    notify: Arc<Notify>,
}

impl SubmitGate {
    /// Let one waiting (or the next) submission complete.
    pub fn release(&self) {
        self.notify.notify_one();
    }
}

impl ScriptedAssessmentApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, ScriptState>, RemoteError> {
        self.state
            .lock()
            .map_err(|e| RemoteError::Unavailable(e.to_string()))
    }

    /// Register a test under its payload id.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Unavailable` if the internal lock is poisoned.
    pub fn insert_test(&self, test: TestPayload) -> Result<(), RemoteError> {
        let mut guard = self.lock()?;
        guard.tests.insert(TestId::new(test.id.clone()), test);
        Ok(())
    }

    /// Result returned by every successful submission.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Unavailable` if the internal lock is poisoned.
    pub fn set_result(&self, result: SubmissionResult) -> Result<(), RemoteError> {
        self.lock()?.result = Some(result);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RemoteError::Unavailable` if the internal lock is poisoned.
    pub fn fail_next_starts(&self, count: u32) -> Result<(), RemoteError> {
        self.lock()?.fail_next_starts = count;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RemoteError::Unavailable` if the internal lock is poisoned.
    pub fn fail_next_submits(&self, count: u32) -> Result<(), RemoteError> {
        self.lock()?.fail_next_submits = count;
        Ok(())
    }

    /// Hold every following submission until the returned gate is released.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Unavailable` if the internal lock is poisoned.
    pub fn hold_submissions(&self) -> Result<SubmitGate, RemoteError> {
        let notify = Arc::new(Notify::new());
        self.lock()?.gate = Some(Arc::clone(&notify));
        Ok(SubmitGate { notify })
    }

    #[must_use]
    pub fn start_calls(&self) -> u32 {
        self.lock().map_or(0, |s| s.start_calls)
    }

    #[must_use]
    pub fn submit_calls(&self) -> u32 {
        self.lock().map_or(0, |s| s.submit_calls)
    }

    /// Requests received so far, including ones that were scripted to fail.
    #[must_use]
    pub fn submitted(&self) -> Vec<SubmitSectionRequest> {
        self.lock().map(|s| s.submitted.clone()).unwrap_or_default()
    }
}

fn default_result(request: &SubmitSectionRequest) -> SubmissionResult {
    let answered = request
        .answers
        .iter()
        .filter(|record| !record.user_answer.is_blank())
        .count();
    SubmissionResult {
        band_score: 0.0,
        correct_answers: u32::try_from(answered).unwrap_or(u32::MAX),
        total_questions: u32::try_from(request.answers.len()).unwrap_or(u32::MAX),
        detailed_answers: None,
    }
}

#[async_trait]
impl AssessmentApi for ScriptedAssessmentApi {
    async fn start_test(&self, test_id: &TestId) -> Result<StartTestPayload, RemoteError> {
        let mut guard = self.lock()?;
        guard.start_calls += 1;
        if guard.fail_next_starts > 0 {
            guard.fail_next_starts -= 1;
            return Err(RemoteError::Unavailable("scripted start failure".into()));
        }
        let test = guard
            .tests
            .get(test_id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(format!("test {test_id}")))?;
        Ok(StartTestPayload {
            test_result_id: format!("tr-{}", guard.start_calls),
            test,
        })
    }

    async fn submit_section(
        &self,
        request: &SubmitSectionRequest,
    ) -> Result<SubmissionResult, RemoteError> {
        let gate = {
            let mut guard = self.lock()?;
            guard.submit_calls += 1;
            guard.submitted.push(request.clone());
            guard.gate.clone()
        };

        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut guard = self.lock()?;
        if guard.fail_next_submits > 0 {
            guard.fail_next_submits -= 1;
            return Err(RemoteError::Unavailable("scripted submit failure".into()));
        }
        Ok(guard
            .result
            .clone()
            .unwrap_or_else(|| default_result(request)))
    }
}
