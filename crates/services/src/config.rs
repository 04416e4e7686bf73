use std::env;
use std::time::Duration;

use crate::error::ConfigError;

const DEFAULT_TICK_MILLIS: u64 = 1_000;

/// Tunables for a session controller and its timer driver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// How often the timer driver polls the countdown.
    pub tick_interval: Duration,
    /// Reject a user-triggered submit while nothing is answered.
    /// Expiry always submits.
    pub require_answer: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(DEFAULT_TICK_MILLIS),
            require_answer: true,
        }
    }
}

impl SessionConfig {
    /// Read `EXAM_TICK_MILLIS` and `EXAM_REQUIRE_ANSWER`, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for malformed values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for malformed values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup("EXAM_TICK_MILLIS") {
            let millis = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or(ConfigError::Invalid {
                    key: "EXAM_TICK_MILLIS",
                    value: raw,
                })?;
            config.tick_interval = Duration::from_millis(millis);
        }

        if let Some(raw) = lookup("EXAM_REQUIRE_ANSWER") {
            config.require_answer = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "EXAM_REQUIRE_ANSWER",
                        value: raw,
                    });
                }
            };
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    #[must_use]
    pub fn with_require_answer(mut self, require_answer: bool) -> Self {
        self.require_answer = require_answer;
        self
    }
}
