use std::fmt;
use std::time::Duration;

use crate::pattern::CallPattern;

/// How an expectation picks its call out of the pending queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Only the oldest unclaimed call is considered; a mismatch is fatal.
    Sequential,
    /// The oldest unclaimed call that matches is taken; others stay pending.
    Eventual,
}

impl Mode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Eventual => "eventual",
        }
    }
}

/// A test-side claim on exactly one future or pending call.
///
/// The mode is fixed when the expectation is constructed.
#[derive(Debug, Clone)]
pub enum Expectation {
    Sequential {
        pattern: CallPattern,
        deadline: Option<Duration>,
    },
    Eventual {
        pattern: CallPattern,
        deadline: Option<Duration>,
    },
}

impl Expectation {
    #[must_use]
    pub fn sequential(pattern: CallPattern) -> Self {
        Self::Sequential {
            pattern,
            deadline: None,
        }
    }

    #[must_use]
    pub fn eventual(pattern: CallPattern) -> Self {
        Self::Eventual {
            pattern,
            deadline: None,
        }
    }

    /// Bound the wait for a matching call, measured from registration.
    pub fn within(self, limit: Duration) -> Self {
        match self {
            Self::Sequential { pattern, .. } => Self::Sequential {
                pattern,
                deadline: Some(limit),
            },
            Self::Eventual { pattern, .. } => Self::Eventual {
                pattern,
                deadline: Some(limit),
            },
        }
    }

    #[must_use]
    pub fn pattern(&self) -> &CallPattern {
        match self {
            Self::Sequential { pattern, .. } | Self::Eventual { pattern, .. } => pattern,
        }
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        match self {
            Self::Sequential { deadline, .. } | Self::Eventual { deadline, .. } => *deadline,
        }
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        match self {
            Self::Sequential { .. } => Mode::Sequential,
            Self::Eventual { .. } => Mode::Eventual,
        }
    }
}

impl From<CallPattern> for Expectation {
    fn from(pattern: CallPattern) -> Self {
        Self::sequential(pattern)
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}", self.pattern(), self.mode().as_str())?;
        if let Some(deadline) = self.deadline() {
            write!(f, ", within {deadline:?}")?;
        }
        f.write_str("]")
    }
}
