//! Launching code under test and observing how it ends.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tandem_protocol::{Value, format_values};
use tokio::task::JoinHandle;

use crate::coordinator::Coordinator;
use crate::error::TargetError;
use crate::sink::payload_from_panic;

/// Conversion of a target's return into the value list it is compared by.
pub trait IntoValues {
    fn into_values(self) -> Vec<Value>;
}

impl IntoValues for () {
    fn into_values(self) -> Vec<Value> {
        Vec::new()
    }
}

impl IntoValues for Value {
    fn into_values(self) -> Vec<Value> {
        vec![self]
    }
}

impl IntoValues for Vec<Value> {
    fn into_values(self) -> Vec<Value> {
        self
    }
}

fn to_value_lossy<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value)
        .unwrap_or_else(|e| Value::String(format!("<unserializable return value: {e}>")))
}

macro_rules! impl_into_values_for_tuple {
    ($($name:ident),+) => {
        impl<$($name: Serialize),+> IntoValues for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_values(self) -> Vec<Value> {
                let ($($name,)+) = self;
                vec![$(to_value_lossy(&$name)),+]
            }
        }
    };
}

impl_into_values_for_tuple!(A);
impl_into_values_for_tuple!(A, B);
impl_into_values_for_tuple!(A, B, C);
impl_into_values_for_tuple!(A, B, C, D);

/// How a target task ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Returned(Vec<Value>),
    Aborted(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    NotStarted,
    Running,
    Returned,
    Aborted,
    /// The task was cancelled by the runtime before it finished.
    Cancelled,
}

#[derive(Debug)]
enum Phase {
    NotStarted,
    Running(JoinHandle<Vec<Value>>),
    Finished(Outcome),
    Cancelled,
}

/// One invocation of code under test running as its own task.
///
/// The outcome is observed once and cached; every later observation returns
/// the same outcome without waiting.
#[derive(Debug)]
pub struct Target {
    name: String,
    phase: Phase,
    timeout: Option<Duration>,
}

impl Coordinator {
    /// A target that waits at most the configured outcome timeout.
    pub fn target(&self, name: impl Into<String>) -> Target {
        let target = Target::new(name);
        match self.config().outcome_timeout() {
            Some(limit) => target.with_timeout(limit),
            None => target,
        }
    }
}

impl Target {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phase: Phase::NotStarted,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn state(&self) -> TargetState {
        match &self.phase {
            Phase::NotStarted => TargetState::NotStarted,
            Phase::Running(_) => TargetState::Running,
            Phase::Finished(Outcome::Returned(_)) => TargetState::Returned,
            Phase::Finished(Outcome::Aborted(_)) => TargetState::Aborted,
            Phase::Cancelled => TargetState::Cancelled,
        }
    }

    /// Spawn `run` on the current tokio runtime.
    ///
    /// A panic inside `run` is the target's abnormal termination.
    pub fn start<F>(&mut self, run: F) -> Result<(), TargetError>
    where
        F: Future + Send + 'static,
        F::Output: IntoValues,
    {
        if !matches!(self.phase, Phase::NotStarted) {
            return Err(TargetError::AlreadyStarted {
                name: self.name.clone(),
            });
        }
        tracing::debug!(target_name = %self.name, "Target started");
        self.phase = Phase::Running(tokio::spawn(async move { run.await.into_values() }));
        Ok(())
    }

    /// Wait for the target to finish and return its cached outcome.
    pub async fn await_outcome(&mut self) -> Result<&Outcome, TargetError> {
        if let Phase::Running(handle) = &mut self.phase {
            let joined = match self.timeout {
                Some(limit) => tokio::time::timeout(limit, handle).await.map_err(|_| {
                    TargetError::Timeout {
                        name: self.name.clone(),
                        waited: limit,
                    }
                })?,
                None => handle.await,
            };
            self.phase = match joined {
                Ok(values) => Phase::Finished(Outcome::Returned(values)),
                Err(e) if e.is_panic() => {
                    Phase::Finished(Outcome::Aborted(payload_from_panic(e.into_panic())))
                }
                Err(_) => Phase::Cancelled,
            };
            match &self.phase {
                Phase::Finished(Outcome::Aborted(payload)) => {
                    tracing::debug!(target_name = %self.name, "Target aborted with {payload}");
                }
                Phase::Finished(Outcome::Returned(values)) => {
                    tracing::debug!(
                        target_name = %self.name,
                        "Target returned ({})",
                        format_values(values)
                    );
                }
                _ => {}
            }
        }

        match &self.phase {
            Phase::Finished(outcome) => Ok(outcome),
            Phase::NotStarted => Err(TargetError::NotStarted {
                name: self.name.clone(),
            }),
            Phase::Running(_) | Phase::Cancelled => Err(TargetError::Cancelled {
                name: self.name.clone(),
            }),
        }
    }

    /// Assert the target returned exactly `expected`.
    pub async fn expect_returns_equal(&mut self, expected: Vec<Value>) -> Result<(), TargetError> {
        let name = self.name.clone();
        match self.await_outcome().await? {
            Outcome::Returned(actual) if *actual == expected => Ok(()),
            Outcome::Returned(actual) => Err(TargetError::ReturnMismatch {
                name,
                expected,
                actual: actual.clone(),
            }),
            Outcome::Aborted(payload) => Err(TargetError::AbortedInstead {
                name,
                expected,
                payload: payload.clone(),
            }),
        }
    }

    /// Assert the target terminated abnormally with `expected`.
    pub async fn expect_abnormal_equals(
        &mut self,
        expected: impl Into<Value>,
    ) -> Result<(), TargetError> {
        let expected = expected.into();
        let name = self.name.clone();
        match self.await_outcome().await? {
            Outcome::Aborted(actual) if *actual == expected => Ok(()),
            Outcome::Aborted(actual) => Err(TargetError::AbnormalMismatch {
                name,
                expected,
                actual: actual.clone(),
            }),
            Outcome::Returned(values) => Err(TargetError::ReturnedInstead {
                name,
                expected,
                values: values.clone(),
            }),
        }
    }
}
