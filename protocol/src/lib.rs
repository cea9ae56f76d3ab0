//! Core protocol types for tandem.
//!
//! This crate contains the pure data half of the call rendezvous: values,
//! call summaries, response envelopes, argument matchers, call patterns and
//! expectations. No IO, no async. The coordinator crate moves these values
//! between producer tasks and the test.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod call;
mod expectation;
mod matcher;
mod pattern;
mod response;
mod value;

pub use call::{CallSummary, Sequence};
pub use expectation::{Expectation, Mode};
pub use matcher::{ArgumentMatcher, MatchResult, Predicate, any, eq, not, predicate, typed};
pub use pattern::CallPattern;
pub use response::Response;
pub use value::{DecodeError, Value, decode_at, format_values};

#[doc(hidden)]
pub mod __private {
    pub use serde_json::json;
}

/// Build an argument (or return value) list from serializable expressions.
///
/// ```
/// let args = tandem_protocol::args!["Ping", 3, true];
/// assert_eq!(args.len(), 3);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::__private::json!($arg)),+]
    };
}
