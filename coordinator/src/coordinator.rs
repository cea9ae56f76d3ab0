//! The broker between producer tasks and the test.
//!
//! Producers [`Coordinator::submit`] calls and block on the returned
//! [`PendingResponse`]. The test [`Coordinator::consume`]s calls with
//! expectations and [`Coordinator::resolve`]s them. All shared state lives
//! behind one mutex that is never held across an await point; waiting is done
//! on a [`Notify`] that is armed before the pending queue is inspected, so an
//! arrival between inspection and sleep is never lost.

use std::collections::{BTreeMap, VecDeque};
use std::pin::pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tandem_protocol::{
    CallSummary, DecodeError, Expectation, MatchResult, Mode, Response, Sequence, Value,
    decode_at,
};
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::config::CoordinatorConfig;
use crate::error::{CoordinatorError, StrandedCall, StrandedReason};
use crate::sink::{self, PendingResponse, ResponseSink, SinkError};

/// A producer's description of one invocation, before submission.
#[derive(Debug, Clone, PartialEq)]
pub struct CallEnvelope {
    identity: String,
    arguments: Vec<Value>,
}

impl CallEnvelope {
    pub fn new(identity: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            identity: identity.into(),
            arguments,
        }
    }

    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    #[must_use]
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Active,
    Closed,
}

/// An unclaimed call waiting in arrival order.
#[derive(Debug)]
struct PendingCall {
    summary: CallSummary,
    arrived: Instant,
    sink: Arc<ResponseSink>,
}

/// A claimed call whose producer is still blocked.
#[derive(Debug)]
struct AwaitingCall {
    summary: CallSummary,
    sink: Arc<ResponseSink>,
}

#[derive(Debug)]
struct State {
    lifecycle: Lifecycle,
    last_sequence: Sequence,
    pending: VecDeque<PendingCall>,
    awaiting: BTreeMap<Sequence, AwaitingCall>,
}

impl State {
    /// Wake every outstanding producer and report who was left behind.
    fn release_all(&mut self) -> Vec<StrandedCall> {
        let mut stranded = Vec::with_capacity(self.pending.len() + self.awaiting.len());
        for call in self.pending.drain(..) {
            call.sink.release(StrandedReason::Unclaimed);
            stranded.push(StrandedCall {
                call: call.summary,
                reason: StrandedReason::Unclaimed,
            });
        }
        for (_, call) in std::mem::take(&mut self.awaiting) {
            call.sink.release(StrandedReason::Unresolved);
            stranded.push(StrandedCall {
                call: call.summary,
                reason: StrandedReason::Unresolved,
            });
        }
        stranded.sort_by_key(|stranded| stranded.call.sequence());
        stranded
    }
}

#[derive(Debug)]
struct Shared {
    config: CoordinatorConfig,
    state: Mutex<State>,
    arrivals: Notify,
}

impl Drop for Shared {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if state.lifecycle == Lifecycle::Closed {
            return;
        }
        let stranded = state.release_all();
        if !stranded.is_empty() && !std::thread::panicking() {
            tracing::warn!(
                count = stranded.len(),
                "Coordinator dropped without close; releasing stranded calls"
            );
            for call in &stranded {
                tracing::warn!("  stranded: {call}");
            }
        }
    }
}

/// Single-consumer rendezvous between code under test and the test.
///
/// Cloning is cheap and yields another handle to the same queue; hand clones
/// to producer tasks and keep one in the test.
#[derive(Debug, Clone)]
pub struct Coordinator {
    shared: Arc<Shared>,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Coordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CoordinatorConfig::default())
    }

    #[must_use]
    pub fn with_config(config: CoordinatorConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(State {
                    lifecycle: Lifecycle::Active,
                    last_sequence: Sequence::new(0),
                    pending: VecDeque::new(),
                    awaiting: BTreeMap::new(),
                }),
                arrivals: Notify::new(),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &CoordinatorConfig {
        &self.shared.config
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue a call. Never blocks.
    ///
    /// A call submitted after [`close`](Self::close) is not queued; its
    /// response fails with [`CoordinatorError::Closed`].
    pub fn submit(&self, call: CallEnvelope) -> PendingResponse {
        let mut state = self.lock();
        let sequence = state.last_sequence.next();
        state.last_sequence = sequence;
        let summary = CallSummary::new(sequence, call.identity, call.arguments);

        if state.lifecycle == Lifecycle::Closed {
            tracing::warn!("Call submitted after close: {summary}");
            return PendingResponse::rejected(summary);
        }

        let (sender, receiver) = sink::channel();
        state.pending.push_back(PendingCall {
            summary: summary.clone(),
            arrived: Instant::now(),
            sink: Arc::new(ResponseSink::new(sender)),
        });
        drop(state);

        tracing::debug!(seq = sequence.value(), identity = %summary.identity(), "Call submitted");
        self.shared.arrivals.notify_waiters();
        PendingResponse::new(summary, receiver, self.shared.config.response_timeout())
    }

    /// Submit a call and wait for its values; the entry point for generated glue.
    ///
    /// # Panics
    ///
    /// Re-raises an abnormal response as a panic, see
    /// [`PendingResponse::into_values`].
    pub async fn invoke(&self, identity: impl Into<String>, arguments: Vec<Value>) -> Vec<Value> {
        self.submit(CallEnvelope::new(identity, arguments))
            .into_values()
            .await
    }

    /// Claim the call `expectation` describes, waiting for it if necessary.
    ///
    /// Sequential expectations only look at the oldest unclaimed call and fail
    /// with [`CoordinatorError::Mismatch`] if it differs. Eventual expectations
    /// take the oldest matching call and leave everything else pending.
    pub async fn consume(&self, expectation: &Expectation) -> Result<ClaimedCall, CoordinatorError> {
        let started = Instant::now();
        let deadline = expectation
            .deadline()
            .or_else(|| self.shared.config.default_deadline())
            .map(|limit| started + limit);

        loop {
            let mut arrival = pin!(self.shared.arrivals.notified());
            arrival.as_mut().enable();

            if let Some(claimed) = self.try_claim(expectation)? {
                return Ok(claimed);
            }

            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, arrival).await.is_err() {
                        return Err(self.timeout(expectation, started));
                    }
                }
                None => arrival.await,
            }
        }
    }

    fn try_claim(&self, expectation: &Expectation) -> Result<Option<ClaimedCall>, CoordinatorError> {
        let mut state = self.lock();
        if state.lifecycle == Lifecycle::Closed {
            return Err(CoordinatorError::Closed);
        }

        let pattern = expectation.pattern();
        let index = match expectation.mode() {
            Mode::Sequential => {
                let Some(head) = state.pending.front() else {
                    return Ok(None);
                };
                if let MatchResult::Mismatched(reason) =
                    pattern.check(head.summary.identity(), head.summary.arguments())
                {
                    return Err(CoordinatorError::Mismatch {
                        expected: expectation.to_string(),
                        actual: head.summary.clone(),
                        reason,
                    });
                }
                0
            }
            Mode::Eventual => {
                let found = state.pending.iter().position(|call| {
                    pattern
                        .check(call.summary.identity(), call.summary.arguments())
                        .is_match()
                });
                match found {
                    Some(index) => index,
                    None => return Ok(None),
                }
            }
        };

        let Some(call) = state.pending.remove(index) else {
            return Ok(None);
        };
        tracing::debug!(
            seq = call.summary.sequence().value(),
            identity = %call.summary.identity(),
            mode = expectation.mode().as_str(),
            queued = ?call.arrived.elapsed(),
            "Call claimed"
        );
        state.awaiting.insert(
            call.summary.sequence(),
            AwaitingCall {
                summary: call.summary.clone(),
                sink: Arc::clone(&call.sink),
            },
        );
        Ok(Some(ClaimedCall {
            summary: call.summary,
            sink: call.sink,
            owner: Arc::downgrade(&self.shared),
        }))
    }

    fn timeout(&self, expectation: &Expectation, started: Instant) -> CoordinatorError {
        let pending = self
            .lock()
            .pending
            .iter()
            .map(|call| call.summary.clone())
            .collect();
        CoordinatorError::Timeout {
            expected: expectation.to_string(),
            waited: started.elapsed(),
            pending,
        }
    }

    /// Deliver `response` to the producer blocked on `call`.
    ///
    /// Each claimed call resolves exactly once; a second attempt fails with
    /// [`CoordinatorError::DoubleResolution`]. A call claimed from another
    /// coordinator is refused with [`CoordinatorError::ForeignCall`].
    pub fn resolve(&self, call: &ClaimedCall, response: Response) -> Result<(), CoordinatorError> {
        if !std::ptr::eq(call.owner.as_ptr(), Arc::as_ptr(&self.shared)) {
            return Err(CoordinatorError::ForeignCall {
                call: call.summary.clone(),
            });
        }

        // Sink and bookkeeping change together so close never sees a
        // resolved call still awaiting.
        let resolved = {
            let mut state = self.lock();
            let resolved = call.sink.resolve(response);
            if resolved.is_ok() {
                state.awaiting.remove(&call.summary.sequence());
            }
            resolved
        };
        let listening = match resolved {
            Ok(listening) => listening,
            Err(SinkError::AlreadyResolved) => {
                return Err(CoordinatorError::DoubleResolution {
                    call: call.summary.clone(),
                });
            }
            Err(SinkError::Released) => return Err(CoordinatorError::Closed),
        };

        if listening {
            tracing::debug!(seq = call.summary.sequence().value(), "Call resolved");
        } else {
            tracing::warn!(
                "Resolved {} but its producer had stopped waiting",
                call.summary
            );
        }
        Ok(())
    }

    /// End the test.
    ///
    /// Fails with [`CoordinatorError::Stranded`] if any call was never claimed
    /// or never resolved. Every such producer is woken with the same error so
    /// no task outlives the test blocked. Closing twice is a no-op.
    pub fn close(&self) -> Result<(), CoordinatorError> {
        let stranded = {
            let mut state = self.lock();
            if state.lifecycle == Lifecycle::Closed {
                return Ok(());
            }
            state.lifecycle = Lifecycle::Closed;
            state.release_all()
        };
        self.shared.arrivals.notify_waiters();

        if stranded.is_empty() {
            tracing::info!("Coordinator closed");
            return Ok(());
        }
        tracing::warn!(count = stranded.len(), "Coordinator closed with stranded calls");
        Err(CoordinatorError::Stranded { calls: stranded })
    }

    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lock().lifecycle
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lifecycle() == Lifecycle::Closed
    }

    /// Snapshot of the unclaimed calls, oldest first.
    #[must_use]
    pub fn pending_calls(&self) -> Vec<CallSummary> {
        self.lock()
            .pending
            .iter()
            .map(|call| call.summary.clone())
            .collect()
    }
}

/// A call matched by an expectation and waiting for the test's response.
#[derive(Debug)]
pub struct ClaimedCall {
    summary: CallSummary,
    sink: Arc<ResponseSink>,
    owner: Weak<Shared>,
}

impl ClaimedCall {
    #[must_use]
    pub fn identity(&self) -> &str {
        self.summary.identity()
    }

    #[must_use]
    pub fn arguments(&self) -> &[Value] {
        self.summary.arguments()
    }

    #[must_use]
    pub fn sequence(&self) -> Sequence {
        self.summary.sequence()
    }

    /// Decode argument `index` into `T`.
    pub fn argument<T: serde::de::DeserializeOwned>(&self, index: usize) -> Result<T, DecodeError> {
        decode_at(self.summary.arguments(), index)
    }

    #[must_use]
    pub fn summary(&self) -> &CallSummary {
        &self.summary
    }

    #[must_use]
    pub fn into_summary(self) -> CallSummary {
        self.summary
    }
}
