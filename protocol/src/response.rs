use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::{Value, format_values};

/// The outcome delivered to a waiting producer.
///
/// Being an enum, exactly one of the two outcomes is ever set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Response {
    /// The call returns normally with these values, in order.
    Return { values: Vec<Value> },
    /// The call terminates abnormally, carrying an arbitrary payload.
    Abnormal { payload: Value },
}

impl Response {
    #[must_use]
    pub fn returning(values: Vec<Value>) -> Self {
        Self::Return { values }
    }

    /// A normal return with no values.
    #[must_use]
    pub fn nothing() -> Self {
        Self::Return { values: Vec::new() }
    }

    #[must_use]
    pub fn abnormal(payload: impl Into<Value>) -> Self {
        Self::Abnormal {
            payload: payload.into(),
        }
    }

    #[must_use]
    pub fn is_abnormal(&self) -> bool {
        matches!(self, Self::Abnormal { .. })
    }

    /// Split into return values or the abnormal payload.
    pub fn into_result(self) -> Result<Vec<Value>, Value> {
        match self {
            Self::Return { values } => Ok(values),
            Self::Abnormal { payload } => Err(payload),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Return { values } => write!(f, "returned ({})", format_values(values)),
            Self::Abnormal { payload } => write!(f, "aborted with {payload}"),
        }
    }
}
