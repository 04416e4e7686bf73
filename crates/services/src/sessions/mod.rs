mod controller;
mod state;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use controller::{SubmitOutcome, TestSession};
pub use state::{SessionState, SubmitTrigger};
pub use view::{SectionProgress, SessionSnapshot};
pub use workflow::{TimerHandle, spawn_timer};
