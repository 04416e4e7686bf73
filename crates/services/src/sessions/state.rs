use std::fmt;

/// Lifecycle of a timed assessment session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    Loading,
    /// Test loaded, timer armed but not started.
    Instructions,
    InProgress,
    Submitting,
    Completed,
    /// `StartTest` failed or returned an unusable test. `load` may be retried.
    Failed,
}

impl SessionState {
    /// States in which the countdown is running.
    #[must_use]
    pub fn is_timed(self) -> bool {
        matches!(self, Self::InProgress | Self::Submitting)
    }

    #[must_use]
    pub fn can_load(self) -> bool {
        matches!(self, Self::Idle | Self::Failed)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Instructions => "instructions",
            Self::InProgress => "in_progress",
            Self::Submitting => "submitting",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which event source asked for submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    User,
    Expiry,
}
