//! Per-argument predicates.
//!
//! An [`ArgumentMatcher`] either compares structurally against an exact
//! value or runs an arbitrary predicate that carries its own description.
//! Matchers never fail with an error: a value that cannot be decoded for a
//! typed predicate is simply a mismatch with a reason attached.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::value::Value;

/// Outcome of checking a value (or a whole call) against a matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    Matched,
    Mismatched(String),
}

impl MatchResult {
    #[must_use]
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Matched)
    }

    /// The mismatch reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Matched => None,
            Self::Mismatched(reason) => Some(reason),
        }
    }
}

type PredicateFn = dyn Fn(&Value) -> MatchResult + Send + Sync;

/// An arbitrary test over one argument, with a human-readable description.
#[derive(Clone)]
pub struct Predicate {
    description: String,
    test: Arc<PredicateFn>,
}

impl Predicate {
    pub fn new<F>(description: impl Into<String>, test: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        let description = description.into();
        let expected = description.clone();
        Self {
            description,
            test: Arc::new(move |value: &Value| {
                if test(value) {
                    MatchResult::Matched
                } else {
                    MatchResult::Mismatched(format!("expected {expected}, got {value}"))
                }
            }),
        }
    }

    fn with_reason<F>(description: String, test: F) -> Self
    where
        F: Fn(&Value) -> MatchResult + Send + Sync + 'static,
    {
        Self {
            description,
            test: Arc::new(test),
        }
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn check(&self, value: &Value) -> MatchResult {
        (self.test)(value)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum ArgumentMatcher {
    /// Structural equality with the given value.
    Exact(Value),
    Predicate(Predicate),
}

impl ArgumentMatcher {
    #[must_use]
    pub fn check(&self, value: &Value) -> MatchResult {
        match self {
            Self::Exact(expected) if expected == value => MatchResult::Matched,
            Self::Exact(expected) => {
                MatchResult::Mismatched(format!("expected {expected}, got {value}"))
            }
            Self::Predicate(predicate) => predicate.check(value),
        }
    }
}

impl fmt::Display for ArgumentMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(value) => write!(f, "{value}"),
            Self::Predicate(predicate) => write!(f, "<{}>", predicate.description),
        }
    }
}

impl From<Value> for ArgumentMatcher {
    fn from(value: Value) -> Self {
        Self::Exact(value)
    }
}

impl From<Predicate> for ArgumentMatcher {
    fn from(predicate: Predicate) -> Self {
        Self::Predicate(predicate)
    }
}

/// Match a value structurally equal to `value`.
pub fn eq(value: impl Into<Value>) -> ArgumentMatcher {
    ArgumentMatcher::Exact(value.into())
}

/// Match any value.
#[must_use]
pub fn any() -> ArgumentMatcher {
    ArgumentMatcher::Predicate(Predicate::with_reason("any".to_string(), |_| {
        MatchResult::Matched
    }))
}

pub fn predicate<F>(description: impl Into<String>, test: F) -> ArgumentMatcher
where
    F: Fn(&Value) -> bool + Send + Sync + 'static,
{
    ArgumentMatcher::Predicate(Predicate::new(description, test))
}

/// Decode the argument into `T` and test it.
///
/// A value that does not decode is a mismatch, reported with the decode error.
pub fn typed<T, F>(description: impl Into<String>, test: F) -> ArgumentMatcher
where
    T: DeserializeOwned + 'static,
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    let description = description.into();
    let expected = description.clone();
    ArgumentMatcher::Predicate(Predicate::with_reason(description, move |value| {
        match serde_json::from_value::<T>(value.clone()) {
            Ok(decoded) if test(&decoded) => MatchResult::Matched,
            Ok(_) => MatchResult::Mismatched(format!("expected {expected}, got {value}")),
            Err(e) => MatchResult::Mismatched(format!(
                "expected {expected}, got {value} which is not a {}: {e}",
                std::any::type_name::<T>()
            )),
        }
    }))
}

/// Invert a matcher.
#[must_use]
pub fn not(matcher: ArgumentMatcher) -> ArgumentMatcher {
    let description = format!("not {matcher}");
    let expected = description.clone();
    ArgumentMatcher::Predicate(Predicate::with_reason(description, move |value| {
        if matcher.check(value).is_match() {
            MatchResult::Mismatched(format!("expected {expected}, got {value}"))
        } else {
            MatchResult::Matched
        }
    }))
}
