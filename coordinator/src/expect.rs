use std::time::Duration;

use tandem_protocol::{CallSummary, Expectation, Response, Value};

use crate::coordinator::{ClaimedCall, Coordinator};
use crate::error::CoordinatorError;

/// An expectation bound to a coordinator, waiting for its terminal operation.
///
/// Nothing happens until one of the async terminals runs. The matched call is
/// only ever exposed after it arrived, so a response cannot be injected ahead
/// of the call it answers.
#[derive(Debug)]
#[must_use = "an expectation does nothing until claimed or answered"]
pub struct Expect<'a> {
    coordinator: &'a Coordinator,
    expectation: Expectation,
}

impl Coordinator {
    pub fn expect(&self, expectation: impl Into<Expectation>) -> Expect<'_> {
        Expect {
            coordinator: self,
            expectation: expectation.into(),
        }
    }
}

impl Expect<'_> {
    pub fn within(mut self, limit: Duration) -> Self {
        self.expectation = self.expectation.within(limit);
        self
    }

    #[must_use]
    pub fn expectation(&self) -> &Expectation {
        &self.expectation
    }

    /// Wait for the matching call and hand it over unresolved.
    pub async fn claim(self) -> Result<ClaimedCall, CoordinatorError> {
        self.coordinator.consume(&self.expectation).await
    }

    /// Wait for the matching call and answer it with `response`.
    pub async fn respond(self, response: Response) -> Result<CallSummary, CoordinatorError> {
        let call = self.coordinator.consume(&self.expectation).await?;
        self.coordinator.resolve(&call, response)?;
        Ok(call.into_summary())
    }

    pub async fn returns(self, values: Vec<Value>) -> Result<CallSummary, CoordinatorError> {
        self.respond(Response::returning(values)).await
    }

    pub async fn returns_nothing(self) -> Result<CallSummary, CoordinatorError> {
        self.respond(Response::nothing()).await
    }

    pub async fn aborts(self, payload: impl Into<Value>) -> Result<CallSummary, CoordinatorError> {
        self.respond(Response::abnormal(payload)).await
    }
}
