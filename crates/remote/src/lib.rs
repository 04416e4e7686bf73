#![forbid(unsafe_code)]

pub mod api;
pub mod http;
pub mod memory;

pub use api::{AssessmentApi, RemoteError};
pub use http::{HttpAssessmentApi, RemoteConfig, RemoteConfigError};
pub use memory::{ScriptedAssessmentApi, SubmitGate};
