//! Rendezvous between code under test and the test that drives it.
//!
//! Producer tasks submit calls and block until the test answers them. The
//! test claims calls with sequential or eventual expectations, resolves them,
//! and observes targets launched as their own tasks. Closing the coordinator
//! surfaces every call that was left hanging.

mod config;
mod coordinator;
mod error;
mod expect;
mod sink;
mod target;

pub use config::{
    ConfigError, CoordinatorConfig, DEFAULT_DEADLINE_ENV, OUTCOME_TIMEOUT_ENV, RESPONSE_TIMEOUT_ENV,
};
pub use coordinator::{CallEnvelope, ClaimedCall, Coordinator, Lifecycle};
pub use error::{CoordinatorError, StrandedCall, StrandedReason, TargetError};
pub use expect::Expect;
pub use sink::{AbnormalPanic, PendingResponse, payload_from_panic};
pub use target::{IntoValues, Outcome, Target, TargetState};
