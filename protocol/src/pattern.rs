use std::fmt;

use crate::matcher::{ArgumentMatcher, MatchResult};
use crate::value::Value;

/// A predicate over whole calls: an identity plus positional argument matchers.
///
/// Without matchers the pattern is a wildcard over the arguments (any value,
/// any arity). With matchers, arity must agree and every position must match.
#[derive(Debug, Clone)]
pub struct CallPattern {
    identity: String,
    matchers: Option<Vec<ArgumentMatcher>>,
}

impl CallPattern {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            matchers: None,
        }
    }

    /// Append a matcher for the next argument position.
    pub fn arg(mut self, matcher: impl Into<ArgumentMatcher>) -> Self {
        self.matchers.get_or_insert_with(Vec::new).push(matcher.into());
        self
    }

    pub fn args<I, M>(mut self, matchers: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<ArgumentMatcher>,
    {
        self.matchers
            .get_or_insert_with(Vec::new)
            .extend(matchers.into_iter().map(Into::into));
        self
    }

    /// Require the call to carry no arguments at all.
    pub fn no_args(mut self) -> Self {
        self.matchers = Some(Vec::new());
        self
    }

    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    #[must_use]
    pub fn matchers(&self) -> Option<&[ArgumentMatcher]> {
        self.matchers.as_deref()
    }

    #[must_use]
    pub fn check(&self, identity: &str, arguments: &[Value]) -> MatchResult {
        if identity != self.identity {
            return MatchResult::Mismatched(format!(
                "expected call to {}, got {identity}",
                self.identity
            ));
        }
        let Some(matchers) = &self.matchers else {
            return MatchResult::Matched;
        };
        if matchers.len() != arguments.len() {
            return MatchResult::Mismatched(format!(
                "expected {} argument(s), got {}",
                matchers.len(),
                arguments.len()
            ));
        }
        for (index, (matcher, value)) in matchers.iter().zip(arguments).enumerate() {
            if let MatchResult::Mismatched(reason) = matcher.check(value) {
                return MatchResult::Mismatched(format!("argument {index}: {reason}"));
            }
        }
        MatchResult::Matched
    }
}

impl fmt::Display for CallPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.matchers {
            None => write!(f, "{}(..)", self.identity),
            Some(matchers) => {
                let rendered = matchers
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{}({rendered})", self.identity)
            }
        }
    }
}
