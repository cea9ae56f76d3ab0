//! Observe and control the calls code under test makes while it runs as
//! concurrent tasks.
//!
//! ```no_run
//! use tandem::{CallPattern, Coordinator, Expectation, args, eq};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let coordinator = Coordinator::new();
//! let producer = coordinator.clone();
//! let mut player = coordinator.target("player");
//! player.start(async move { producer.invoke("Register", args!["Ping"]).await })?;
//!
//! coordinator
//!     .expect(Expectation::eventual(CallPattern::new("Register").arg(eq("Ping"))))
//!     .returns(args![true])
//!     .await?;
//! player.expect_returns_equal(args![true]).await?;
//! coordinator.close()?;
//! # Ok(())
//! # }
//! ```

mod logging;

pub use logging::init_test_logging;

pub use tandem_coordinator::{
    AbnormalPanic, CallEnvelope, ClaimedCall, ConfigError, Coordinator, CoordinatorConfig,
    CoordinatorError, DEFAULT_DEADLINE_ENV, Expect, IntoValues, Lifecycle, OUTCOME_TIMEOUT_ENV,
    Outcome, PendingResponse, RESPONSE_TIMEOUT_ENV, StrandedCall, StrandedReason, Target,
    TargetError, TargetState, payload_from_panic,
};
pub use tandem_protocol::{
    ArgumentMatcher, CallPattern, CallSummary, DecodeError, Expectation, MatchResult, Mode,
    Predicate, Response, Sequence, Value, any, args, decode_at, eq, format_values, not,
    predicate, typed,
};
