use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::{Value, format_values};

/// Submission order of a call, assigned by the coordinator starting at 1.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Sequence(u64);

impl Sequence {
    #[must_use]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Immutable description of one submitted invocation.
///
/// This is the part of a call envelope that diagnostics and the test get to
/// see; the response sink stays with the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSummary {
    sequence: Sequence,
    identity: String,
    arguments: Vec<Value>,
}

impl CallSummary {
    #[must_use]
    pub fn new(sequence: Sequence, identity: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            sequence,
            identity: identity.into(),
            arguments,
        }
    }

    #[must_use]
    pub fn sequence(&self) -> Sequence {
        self.sequence
    }

    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    #[must_use]
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    #[must_use]
    pub fn into_arguments(self) -> Vec<Value> {
        self.arguments
    }
}

impl fmt::Display for CallSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}({})",
            self.sequence,
            self.identity,
            format_values(&self.arguments)
        )
    }
}
