#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod sessions;

pub use exam_core::Clock;
pub use sessions as session;

pub use config::SessionConfig;
pub use error::{ConfigError, SessionError};

pub use sessions::{
    SectionProgress, SessionSnapshot, SessionState, SubmitOutcome, SubmitTrigger, TestSession,
    TimerHandle, spawn_timer,
};
