//! Producer side of a call: the write-once response sink and the handle a
//! producer blocks on.

use std::any::Any;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tandem_protocol::{CallSummary, Response, Value};
use tokio::sync::oneshot;

use crate::error::{CoordinatorError, StrandedCall, StrandedReason};

/// What travels through a call's sink: the test's response, or notice that
/// the coordinator shut down without one.
type Delivery = Result<Response, StrandedReason>;

#[derive(Debug)]
enum SinkState {
    Open(oneshot::Sender<Delivery>),
    Resolved,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SinkError {
    AlreadyResolved,
    Released,
}

/// Write-once channel back to the producer.
///
/// Shared between the coordinator and the test's claimed call so that the
/// coordinator can release producers at close even after their call was
/// claimed.
#[derive(Debug)]
pub(crate) struct ResponseSink {
    state: Mutex<SinkState>,
}

impl ResponseSink {
    pub(crate) fn new(sender: oneshot::Sender<Delivery>) -> Self {
        Self {
            state: Mutex::new(SinkState::Open(sender)),
        }
    }

    /// Deliver `response`. Returns whether the producer was still listening.
    pub(crate) fn resolve(&self, response: Response) -> Result<bool, SinkError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match std::mem::replace(&mut *state, SinkState::Resolved) {
            SinkState::Open(sender) => Ok(sender.send(Ok(response)).is_ok()),
            SinkState::Resolved => Err(SinkError::AlreadyResolved),
            SinkState::Released => {
                *state = SinkState::Released;
                Err(SinkError::Released)
            }
        }
    }

    /// Wake the producer with a stranded notice. No-op once resolved.
    pub(crate) fn release(&self, reason: StrandedReason) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(*state, SinkState::Open(_))
            && let SinkState::Open(sender) = std::mem::replace(&mut *state, SinkState::Released)
        {
            let _ = sender.send(Err(reason));
        }
    }
}

pub(crate) fn channel() -> (oneshot::Sender<Delivery>, oneshot::Receiver<Delivery>) {
    oneshot::channel()
}

/// Panic payload used to re-raise an abnormal response inside a producer task.
///
/// [`crate::Target`] recognizes it and reports the payload unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct AbnormalPanic(pub Value);

/// Recover an abnormal-termination payload from a caught panic.
#[must_use]
pub fn payload_from_panic(panic: Box<dyn Any + Send>) -> Value {
    let panic = match panic.downcast::<AbnormalPanic>() {
        Ok(abnormal) => {
            let AbnormalPanic(payload) = *abnormal;
            return payload;
        }
        Err(other) => other,
    };
    let panic = match panic.downcast::<String>() {
        Ok(message) => return Value::String(*message),
        Err(other) => other,
    };
    match panic.downcast_ref::<&'static str>() {
        Some(message) => Value::from(*message),
        None => Value::from("<non-string panic payload>"),
    }
}

/// The read half of a submitted call's sink.
#[derive(Debug)]
pub struct PendingResponse {
    call: CallSummary,
    receiver: Option<oneshot::Receiver<Delivery>>,
    timeout: Option<Duration>,
}

impl PendingResponse {
    pub(crate) fn new(
        call: CallSummary,
        receiver: oneshot::Receiver<Delivery>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            call,
            receiver: Some(receiver),
            timeout,
        }
    }

    /// A call submitted after close; it will never be answered.
    pub(crate) fn rejected(call: CallSummary) -> Self {
        Self {
            call,
            receiver: None,
            timeout: None,
        }
    }

    #[must_use]
    pub fn call(&self) -> &CallSummary {
        &self.call
    }

    /// Block until the test resolves this call.
    pub async fn await_response(self) -> Result<Response, CoordinatorError> {
        let Some(receiver) = self.receiver else {
            return Err(CoordinatorError::Closed);
        };
        let delivered = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, receiver).await {
                Ok(delivered) => delivered,
                Err(_) => {
                    return Err(CoordinatorError::ResponseTimeout {
                        call: self.call,
                        waited: limit,
                    });
                }
            },
            None => receiver.await,
        };
        match delivered {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(reason)) => Err(stranded(self.call, reason)),
            // Sender dropped without a delivery: the coordinator went away
            // while the call was claimed.
            Err(_) => Err(stranded(self.call, StrandedReason::Unresolved)),
        }
    }

    /// Await the response and hand back its values, re-raising anything else.
    ///
    /// This is the boundary where an abnormal response turns back into an
    /// abnormal termination of the calling task.
    ///
    /// # Panics
    ///
    /// Panics with [`AbnormalPanic`] when the test answered with an abnormal
    /// response, and with the error text when no response could be received.
    pub async fn into_values(self) -> Vec<Value> {
        match self.await_response().await {
            Ok(Response::Return { values }) => values,
            Ok(Response::Abnormal { payload }) => std::panic::panic_any(AbnormalPanic(payload)),
            Err(e) => panic!("{e}"),
        }
    }
}

fn stranded(call: CallSummary, reason: StrandedReason) -> CoordinatorError {
    CoordinatorError::Stranded {
        calls: vec![StrandedCall { call, reason }],
    }
}
