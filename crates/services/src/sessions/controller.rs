use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use exam_core::model::{
    QuestionId, SectionId, SubmissionResult, SubmitSectionRequest, Test, TestId, TestResultId,
};
use exam_core::serializer::build_answer_records;
use exam_core::{
    AnswerStore, AnswerValue, Clock, CountdownTimer, FlagTracker, NavQuestionRef,
    NavigationIndex, TimerTick,
};
use remote::AssessmentApi;

use super::state::{SessionState, SubmitTrigger};
use super::view::{SectionProgress, SessionSnapshot};
use crate::config::SessionConfig;
use crate::error::SessionError;

//
// ─── SUBMIT OUTCOME ────────────────────────────────────────────────────────────
//

/// What a call to `submit` ended up doing.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// This call issued `SubmitSection` and the session is now completed.
    Submitted(SubmissionResult),
    /// Another submission was already in flight; this call did nothing.
    AlreadyInFlight,
    /// The session was exited while the call was in flight; result dropped.
    Discarded,
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Derived from one `StartTest` response; replaced wholesale on reload.
struct ActiveTest {
    test_result_id: TestResultId,
    test: Arc<Test>,
    nav: Arc<NavigationIndex>,
}

struct Inner {
    state: SessionState,
    test_id: Option<TestId>,
    active: Option<ActiveTest>,
    answers: AnswerStore,
    flags: FlagTracker,
    timer: Option<CountdownTimer>,
    active_section: Option<SectionId>,
    position: Option<usize>,
    result: Option<SubmissionResult>,
    last_error: Option<String>,
    /// Bumped by `load` and `exit`; async completions from an older epoch are dropped.
    epoch: u64,
    /// Epoch of the `SubmitSection` call in flight, if any. A call left over
    /// from an exited session never blocks the current one.
    in_flight: Option<u64>,
}

impl Inner {
    fn idle(epoch: u64) -> Self {
        Self {
            state: SessionState::Idle,
            test_id: None,
            active: None,
            answers: AnswerStore::new(),
            flags: FlagTracker::new(),
            timer: None,
            active_section: None,
            position: None,
            result: None,
            last_error: None,
            epoch,
            in_flight: None,
        }
    }

    fn require(&self, expected: SessionState, action: &'static str) -> Result<(), SessionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                action,
                state: self.state,
            })
        }
    }

    fn active(&self, action: &'static str) -> Result<&ActiveTest, SessionError> {
        self.active.as_ref().ok_or(SessionError::InvalidTransition {
            action,
            state: self.state,
        })
    }

    fn require_question(&self, question_id: &QuestionId) -> Result<(), SessionError> {
        if self.active("answer")?.nav.contains(question_id) {
            Ok(())
        } else {
            Err(SessionError::UnknownQuestion(question_id.clone()))
        }
    }

    fn require_navigable(&self) -> Result<&ActiveTest, SessionError> {
        match self.state {
            SessionState::InProgress | SessionState::Submitting | SessionState::Completed => {
                self.active("navigate")
            }
            state => Err(SessionError::InvalidTransition {
                action: "navigate",
                state,
            }),
        }
    }

    fn move_to(&mut self, flat_index: usize) -> Result<NavQuestionRef, SessionError> {
        let nav = self
            .require_navigable()?
            .nav
            .jump_to(flat_index)
            .cloned()
            .ok_or(SessionError::OutOfRange(flat_index))?;
        self.position = Some(nav.flat_index);
        self.active_section = Some(nav.section_id.clone());
        Ok(nav)
    }

    fn is_submitting(&self) -> bool {
        self.in_flight == Some(self.epoch)
    }

    fn first_section(&self) -> Option<SectionId> {
        self.active
            .as_ref()
            .and_then(|a| a.test.sections().first())
            .map(|s| s.id.clone())
    }
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// Drives one student through a timed, multi-section test.
///
/// All mutable session state sits behind one mutex that is never held across
/// an `.await`. Submission is claimed under that lock and tagged with the
/// session epoch: a second `submit` (user or timer) while one is in flight
/// returns `SubmitOutcome::AlreadyInFlight` without touching the network.
pub struct TestSession {
    api: Arc<dyn AssessmentApi>,
    clock: Clock,
    config: SessionConfig,
    inner: Mutex<Inner>,
}

impl TestSession {
    #[must_use]
    pub fn new(api: Arc<dyn AssessmentApi>) -> Self {
        Self {
            api,
            clock: Clock::System,
            config: SessionConfig::default(),
            inner: Mutex::new(Inner::idle(0)),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, SessionError> {
        self.inner.lock().map_err(|_| SessionError::Poisoned)
    }

    // Readers only copy plain data out, so a poisoned lock is still safe to read.
    fn read(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Issue `StartTest` and build the model, navigation index and timer.
    ///
    /// Allowed from `Idle` and `Failed`. On failure the session moves to
    /// `Failed` and `load` may be retried; each attempt gets a fresh
    /// `testResultId`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` from any other state,
    /// `SessionError::Remote` / `SessionError::Model` when loading fails, and
    /// `SessionError::Superseded` if the session was exited meanwhile.
    pub async fn load(&self, test_id: TestId) -> Result<(), SessionError> {
        let epoch = {
            let mut inner = self.lock()?;
            if !inner.state.can_load() {
                return Err(SessionError::InvalidTransition {
                    action: "load",
                    state: inner.state,
                });
            }
            let epoch = inner.epoch + 1;
            *inner = Inner::idle(epoch);
            inner.state = SessionState::Loading;
            inner.test_id = Some(test_id.clone());
            epoch
        };
        tracing::info!(%test_id, "loading test");

        let response = self.api.start_test(&test_id).await;

        let mut guard = self.lock()?;
        let inner = &mut *guard;
        if inner.epoch != epoch {
            return Err(SessionError::Superseded);
        }

        let loaded = response.map_err(SessionError::from).and_then(|payload| {
            let loaded = Test::from_payload(payload.test)?;
            Ok((TestResultId::new(payload.test_result_id), loaded))
        });

        match loaded {
            Ok((test_result_id, loaded)) => {
                for anomaly in &loaded.anomalies {
                    tracing::warn!(%test_id, %anomaly, "normalized test payload");
                }
                let test = loaded.test;
                let nav = NavigationIndex::build(&test);
                inner.timer = Some(CountdownTimer::armed(test.total_duration_seconds()));
                inner.active_section = test.sections().first().map(|s| s.id.clone());
                tracing::info!(
                    %test_id,
                    %test_result_id,
                    sections = test.sections().len(),
                    questions = nav.len(),
                    duration_seconds = test.total_duration_seconds(),
                    "test loaded"
                );
                inner.active = Some(ActiveTest {
                    test_result_id,
                    test: Arc::new(test),
                    nav: Arc::new(nav),
                });
                inner.state = SessionState::Instructions;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(%test_id, error = %err, "test load failed");
                inner.state = SessionState::Failed;
                inner.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Start the countdown. Answers and flags start out empty.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless the session is in `Instructions`.
    pub fn begin(&self) -> Result<(), SessionError> {
        let mut guard = self.lock()?;
        let inner = &mut *guard;
        inner.require(SessionState::Instructions, "begin")?;

        let now = self.clock.now();
        inner.answers.clear();
        inner.flags.clear();
        inner.result = None;
        inner.last_error = None;
        if let Some(timer) = inner.timer.as_mut() {
            timer.start(now);
        }
        inner.state = SessionState::InProgress;
        inner.move_to(0)?;

        tracing::info!(started_at = %now, "session started");
        Ok(())
    }

    /// Record an answer. Last write wins; `AnswerValue::Absent` clears it.
    ///
    /// The value is not checked against the question type.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` outside `InProgress` and
    /// `SessionError::UnknownQuestion` for ids not in the loaded test.
    pub fn set_answer(&self, question_id: QuestionId, value: AnswerValue) -> Result<(), SessionError> {
        let mut guard = self.lock()?;
        let inner = &mut *guard;
        inner.require(SessionState::InProgress, "answer")?;
        inner.require_question(&question_id)?;
        inner.answers.set(question_id, value);
        Ok(())
    }

    /// Flip the review flag on a question. Returns whether it is now flagged.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` outside `InProgress` and
    /// `SessionError::UnknownQuestion` for ids not in the loaded test.
    pub fn toggle_flag(&self, question_id: QuestionId) -> Result<bool, SessionError> {
        let mut guard = self.lock()?;
        let inner = &mut *guard;
        inner.require(SessionState::InProgress, "flag")?;
        inner.require_question(&question_id)?;
        Ok(inner.flags.toggle(question_id))
    }

    /// # Errors
    ///
    /// Returns `SessionError::OutOfRange` past the last question, or
    /// `SessionError::InvalidTransition` before the session has begun.
    pub fn jump_to(&self, flat_index: usize) -> Result<NavQuestionRef, SessionError> {
        self.lock()?.move_to(flat_index)
    }

    /// # Errors
    ///
    /// Returns `SessionError::UnknownQuestion` for ids not in the loaded test,
    /// or `SessionError::InvalidTransition` before the session has begun.
    pub fn jump_to_question(&self, question_id: &QuestionId) -> Result<NavQuestionRef, SessionError> {
        let mut inner = self.lock()?;
        let flat_index = inner
            .require_navigable()?
            .nav
            .jump_to_question(question_id)
            .map(|nav| nav.flat_index)
            .ok_or_else(|| SessionError::UnknownQuestion(question_id.clone()))?;
        inner.move_to(flat_index)
    }

    /// Move to the following question; `None` at the end.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` before the session has begun.
    pub fn next(&self) -> Result<Option<NavQuestionRef>, SessionError> {
        let mut inner = self.lock()?;
        let len = inner.require_navigable()?.nav.len();
        let next = inner.position.map_or(0, |p| p + 1);
        if next >= len {
            return Ok(None);
        }
        inner.move_to(next).map(Some)
    }

    /// Move to the preceding question; `None` at the start.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` before the session has begun.
    pub fn previous(&self) -> Result<Option<NavQuestionRef>, SessionError> {
        let mut inner = self.lock()?;
        inner.require_navigable()?;
        match inner.position {
            Some(p) if p > 0 => inner.move_to(p - 1).map(Some),
            _ => Ok(None),
        }
    }

    /// Poll the countdown. Returns `None` when the timer is not running.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Poisoned` if the state lock is poisoned.
    pub fn tick(&self) -> Result<Option<TimerTick>, SessionError> {
        let mut inner = self.lock()?;
        if !inner.state.is_timed() {
            return Ok(None);
        }
        let now = self.clock.now();
        let tick = inner.timer.as_mut().and_then(|timer| timer.tick(now));
        if let Some(tick) = &tick {
            tracing::debug!(remaining = tick.remaining_seconds, "tick");
            if tick.expired_now {
                tracing::info!(elapsed = tick.elapsed_seconds, "time expired");
            }
        }
        Ok(tick)
    }

    /// Poll the countdown and auto-submit on the expiry edge.
    ///
    /// # Errors
    ///
    /// Returns the auto-submission's error; the session stays `InProgress`
    /// and a manual `submit` can retry.
    pub async fn on_tick(&self) -> Result<Option<TimerTick>, SessionError> {
        let tick = self.tick()?;
        if tick.is_some_and(|t| t.expired_now) {
            self.submit_with(SubmitTrigger::Expiry).await?;
        }
        Ok(tick)
    }

    /// User-initiated submission.
    ///
    /// # Errors
    ///
    /// See `submit_with`.
    pub async fn submit(&self) -> Result<SubmitOutcome, SessionError> {
        self.submit_with(SubmitTrigger::User).await
    }

    /// Serialize every question and issue `SubmitSection` at most once.
    ///
    /// A call made while another submission is in flight returns
    /// `SubmitOutcome::AlreadyInFlight` immediately. On remote failure the
    /// session returns to `InProgress` with all answers intact. Once the
    /// countdown has run out, a user submission skips the empty-answer gate
    /// so a failed auto-submit can always be retried.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` outside `InProgress`,
    /// `SessionError::NothingAnswered` for an empty user submission when
    /// answers are required, and `SessionError::Remote` on remote failure.
    pub async fn submit_with(&self, trigger: SubmitTrigger) -> Result<SubmitOutcome, SessionError> {
        let (request, epoch) = {
            let mut guard = self.lock()?;
            let inner = &mut *guard;
            if inner.is_submitting() {
                tracing::warn!(?trigger, "submission already in flight; dropped");
                return Ok(SubmitOutcome::AlreadyInFlight);
            }
            inner.require(SessionState::InProgress, "submit")?;

            let now = self.clock.now();
            let time_is_up = inner
                .timer
                .as_ref()
                .is_some_and(|t| t.has_expired() || t.remaining_at(now) == 0);
            if trigger == SubmitTrigger::User
                && self.config.require_answer
                && !time_is_up
                && inner.answers.is_empty()
            {
                return Err(SessionError::NothingAnswered);
            }

            let active = inner.active("submit")?;
            let section_id = inner
                .active_section
                .clone()
                .or_else(|| inner.first_section())
                .ok_or(SessionError::InvalidTransition {
                    action: "submit",
                    state: inner.state,
                })?;
            let request = SubmitSectionRequest {
                test_result_id: active.test_result_id.clone(),
                test_section_id: section_id,
                time_taken_seconds: inner.timer.as_ref().map_or(0, |t| t.elapsed_at(now)),
                answers: build_answer_records(&active.test, &inner.answers),
            };
            inner.state = SessionState::Submitting;
            inner.in_flight = Some(inner.epoch);
            (request, inner.epoch)
        };
        let mut flight = InFlight::new(self, epoch);

        tracing::info!(
            ?trigger,
            section_id = %request.test_section_id,
            answers = request.answers.len(),
            time_taken = request.time_taken_seconds,
            "submitting"
        );
        let response = self.api.submit_section(&request).await;

        let mut guard = self.lock()?;
        let inner = &mut *guard;
        flight.settle(inner);
        if inner.epoch != epoch {
            tracing::info!("session exited during submission; result discarded");
            return Ok(SubmitOutcome::Discarded);
        }

        match response {
            Ok(result) => {
                inner.state = SessionState::Completed;
                inner.result = Some(result.clone());
                inner.last_error = None;
                tracing::info!(
                    band_score = result.band_score,
                    correct = result.correct_answers,
                    total = result.total_questions,
                    "session completed"
                );
                Ok(SubmitOutcome::Submitted(result))
            }
            Err(err) => {
                inner.state = SessionState::InProgress;
                inner.last_error = Some(err.to_string());
                tracing::warn!(?trigger, error = %err, retryable = err.is_retryable(), "submission failed");
                Err(err.into())
            }
        }
    }

    /// Back to `Instructions` for another run of the same loaded test.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless the session is `Completed`.
    pub fn reset(&self) -> Result<(), SessionError> {
        let mut guard = self.lock()?;
        let inner = &mut *guard;
        inner.require(SessionState::Completed, "reset")?;

        inner.answers.clear();
        inner.flags.clear();
        if let Some(timer) = inner.timer.as_mut() {
            timer.reset();
        }
        inner.result = None;
        inner.last_error = None;
        inner.position = None;
        inner.active_section = inner.first_section();
        inner.state = SessionState::Instructions;
        tracing::info!("session reset");
        Ok(())
    }

    /// Drop all session state and return to `Idle`. Never calls the remote.
    ///
    /// An in-flight remote call still runs to completion; its result is discarded.
    pub fn exit(&self) {
        let mut inner = self.read();
        let epoch = inner.epoch + 1;
        *inner = Inner::idle(epoch);
        tracing::info!("session exited");
    }

    //
    // ─── READ MODEL ────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.read().state
    }

    /// Whether a `SubmitSection` call is currently in flight.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.read().is_submitting()
    }

    #[must_use]
    pub fn test(&self) -> Option<Arc<Test>> {
        self.read().active.as_ref().map(|a| Arc::clone(&a.test))
    }

    #[must_use]
    pub fn navigation(&self) -> Option<Arc<NavigationIndex>> {
        self.read().active.as_ref().map(|a| Arc::clone(&a.nav))
    }

    #[must_use]
    pub fn test_result_id(&self) -> Option<TestResultId> {
        self.read().active.as_ref().map(|a| a.test_result_id.clone())
    }

    #[must_use]
    pub fn answer(&self, question_id: &QuestionId) -> Option<AnswerValue> {
        self.read().answers.get(question_id).cloned()
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.read().answers.count()
    }

    #[must_use]
    pub fn flagged(&self) -> Vec<QuestionId> {
        self.read().flags.iter().cloned().collect()
    }

    /// Remaining seconds without publishing a tick.
    #[must_use]
    pub fn remaining_seconds(&self) -> Option<u64> {
        let now = self.clock.now();
        self.read().timer.as_ref().map(|t| t.remaining_at(now))
    }

    #[must_use]
    pub fn current(&self) -> Option<NavQuestionRef> {
        let inner = self.read();
        let position = inner.position?;
        inner.active.as_ref()?.nav.jump_to(position).cloned()
    }

    #[must_use]
    pub fn result(&self) -> Option<SubmissionResult> {
        self.read().result.clone()
    }

    /// Questions without an answer, in flat order.
    #[must_use]
    pub fn unanswered_questions(&self) -> Vec<NavQuestionRef> {
        let inner = self.read();
        let Some(active) = inner.active.as_ref() else {
            return Vec::new();
        };
        active
            .nav
            .refs()
            .iter()
            .filter(|nav| !inner.answers.is_answered(&nav.question_id))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let now = self.clock.now();
        let inner = self.read();

        let mut snapshot = SessionSnapshot::idle();
        snapshot.state = inner.state;
        snapshot.test_id = inner.test_id.clone();
        snapshot.last_error = inner.last_error.clone();

        let Some(active) = inner.active.as_ref() else {
            return snapshot;
        };

        snapshot.test_result_id = Some(active.test_result_id.clone());
        snapshot.active_section = inner.active_section.clone();
        snapshot.started_at = inner.timer.as_ref().and_then(CountdownTimer::started_at);
        snapshot.remaining_seconds = inner.timer.as_ref().map(|t| t.remaining_at(now));
        snapshot.answered = inner.answers.count();
        snapshot.total = active.nav.len();
        snapshot.sections = active
            .test
            .sections()
            .iter()
            .enumerate()
            .map(|(index, section)| {
                let (answered, total) = active.nav.section_refs(index).fold(
                    (0, 0),
                    |(answered, total), nav| {
                        let hit = usize::from(inner.answers.is_answered(&nav.question_id));
                        (answered + hit, total + 1)
                    },
                );
                SectionProgress {
                    section_id: section.id.clone(),
                    name: section.name.clone(),
                    answered,
                    total,
                }
            })
            .collect();
        snapshot.flagged = inner.flags.iter().cloned().collect();
        snapshot.current = inner
            .position
            .and_then(|p| active.nav.jump_to(p))
            .cloned();
        snapshot.result = inner.result.clone();
        snapshot
    }
}

impl fmt::Debug for TestSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.read();
        f.debug_struct("TestSession")
            .field("state", &inner.state)
            .field("test_id", &inner.test_id)
            .field("answered", &inner.answers.count())
            .field("submitting", &inner.is_submitting())
            .field("epoch", &inner.epoch)
            .finish_non_exhaustive()
    }
}

//
// ─── IN-FLIGHT GUARD ───────────────────────────────────────────────────────────
//

/// Owns the in-flight claim of one `submit_with` call.
///
/// Dropped without `settle` (the future itself dropped mid call) it releases
/// the claim and puts a `Submitting` session of the same epoch back to
/// `InProgress`.
struct InFlight<'a> {
    session: &'a TestSession,
    epoch: u64,
    settled: bool,
}

impl<'a> InFlight<'a> {
    fn new(session: &'a TestSession, epoch: u64) -> Self {
        Self {
            session,
            epoch,
            settled: false,
        }
    }

    /// Release the claim. A newer session's claim is left alone.
    fn settle(&mut self, inner: &mut Inner) {
        self.settled = true;
        if inner.in_flight == Some(self.epoch) {
            inner.in_flight = None;
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut inner = self.session.read();
        if inner.in_flight == Some(self.epoch) {
            inner.in_flight = None;
        }
        if inner.epoch == self.epoch && inner.state == SessionState::Submitting {
            inner.state = SessionState::InProgress;
            inner.last_error = Some("submission interrupted".into());
        }
    }
}
