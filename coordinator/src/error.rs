use std::fmt;
use std::time::Duration;

use tandem_protocol::{CallSummary, Value, format_values};
use thiserror::Error;

/// Why a call was still outstanding when the coordinator shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrandedReason {
    /// No expectation ever claimed the call.
    Unclaimed,
    /// An expectation claimed the call but the test never resolved it.
    Unresolved,
}

impl StrandedReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unclaimed => "never claimed by an expectation",
            Self::Unresolved => "claimed but never resolved",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrandedCall {
    pub call: CallSummary,
    pub reason: StrandedReason,
}

impl fmt::Display for StrandedCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.call, self.reason.as_str())
    }
}

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("next call {actual} does not match sequential expectation {expected}: {reason}")]
    Mismatch {
        expected: String,
        actual: CallSummary,
        reason: String,
    },
    #[error(
        "timed out after {waited:?} waiting for {expected}; pending calls: {}",
        format_pending(.pending)
    )]
    Timeout {
        expected: String,
        waited: Duration,
        pending: Vec<CallSummary>,
    },
    #[error("call {call} was resolved twice")]
    DoubleResolution { call: CallSummary },
    #[error("call {call} was claimed from a different coordinator")]
    ForeignCall { call: CallSummary },
    #[error(
        "coordinator closed with {} stranded call(s):\n{}",
        .calls.len(),
        format_stranded(.calls)
    )]
    Stranded { calls: Vec<StrandedCall> },
    #[error("coordinator is closed")]
    Closed,
    #[error("call {call} got no response within {waited:?}")]
    ResponseTimeout { call: CallSummary, waited: Duration },
}

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("target {name} was never started")]
    NotStarted { name: String },
    #[error("target {name} was already started")]
    AlreadyStarted { name: String },
    #[error("target {name} did not finish within {waited:?}")]
    Timeout { name: String, waited: Duration },
    #[error("target {name} was cancelled before it finished")]
    Cancelled { name: String },
    #[error(
        "target {name} returned ({}), expected ({})",
        format_values(.actual),
        format_values(.expected)
    )]
    ReturnMismatch {
        name: String,
        expected: Vec<Value>,
        actual: Vec<Value>,
    },
    #[error(
        "target {name} was expected to return ({}) but it aborted instead with {payload}",
        format_values(.expected)
    )]
    AbortedInstead {
        name: String,
        expected: Vec<Value>,
        payload: Value,
    },
    #[error("target {name} aborted with {actual}, expected {expected}")]
    AbnormalMismatch {
        name: String,
        expected: Value,
        actual: Value,
    },
    #[error(
        "target {name} was expected to abort with {expected} but it returned ({}) instead",
        format_values(.values)
    )]
    ReturnedInstead {
        name: String,
        expected: Value,
        values: Vec<Value>,
    },
}

fn format_pending(pending: &[CallSummary]) -> String {
    if pending.is_empty() {
        return "none".to_string();
    }
    pending
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_stranded(calls: &[StrandedCall]) -> String {
    calls
        .iter()
        .map(|call| format!("  {call}"))
        .collect::<Vec<_>>()
        .join("\n")
}
