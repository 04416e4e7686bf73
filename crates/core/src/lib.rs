#![forbid(unsafe_code)]

//! Session-independent building blocks of a timed assessment: the normalized
//! test model, navigation index, answer store, flag tracker, countdown timer
//! and the submission serializer.

pub mod answers;
pub mod flags;
pub mod model;
pub mod navigation;
pub mod serializer;
pub mod time;
pub mod timer;

pub use answers::{AnswerStore, AnswerValue};
pub use flags::FlagTracker;
pub use navigation::{NavQuestionRef, NavigationIndex};
pub use time::{Clock, ManualClock};
pub use timer::{CountdownTimer, TimerTick};
