use serde::{Deserialize, Serialize};
use std::fmt;

// Identifiers are opaque strings issued by the content backend. They are
// compared and hashed verbatim; no normalization is applied.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the underlying string value
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Identifier of a test as known to the content backend.
    TestId
);
string_id!(
    /// Identifier of one attempt, issued fresh by every `StartTest` call.
    TestResultId
);
string_id!(
    /// Identifier of a test section (Reading, Listening, ...).
    SectionId
);
string_id!(
    /// Identifier of a question group.
    GroupId
);
string_id!(
    /// Identifier of a question.
    QuestionId
);
string_id!(
    /// Identifier of a closed-form answer option.
    OptionId
);

// ─── Tests ─────────────────────────────────────────────────────────────────────
