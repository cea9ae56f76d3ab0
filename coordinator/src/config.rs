use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_DEADLINE_ENV: &str = "TANDEM_DEFAULT_DEADLINE_MS";
pub const RESPONSE_TIMEOUT_ENV: &str = "TANDEM_RESPONSE_TIMEOUT_MS";
pub const OUTCOME_TIMEOUT_ENV: &str = "TANDEM_OUTCOME_TIMEOUT_MS";

/// Wait bounds shared by a coordinator and the targets created from it.
///
/// Every bound is optional; an unset bound waits indefinitely. Values are
/// milliseconds so they read naturally in TOML:
///
/// ```toml
/// default_deadline_ms = 2000
/// response_timeout_ms = 5000
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CoordinatorConfig {
    /// Deadline for expectations that do not carry their own.
    #[serde(default)]
    pub default_deadline_ms: Option<u64>,
    /// How long a producer waits for the test to resolve its call.
    #[serde(default)]
    pub response_timeout_ms: Option<u64>,
    /// How long `Target::await_outcome` waits for the target task.
    #[serde(default)]
    pub outcome_timeout_ms: Option<u64>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", describe_source(.path.as_deref()))]
    Parse {
        path: Option<PathBuf>,
        source: toml::de::Error,
    },
    #[error("{var} must be a number of milliseconds or \"none\", got {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

impl CoordinatorConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|source| ConfigError::Parse { path: None, source })
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: Some(path.to_path_buf()),
            source,
        })
    }

    /// Defaults overlaid with the `TANDEM_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// A variable that is present but empty, `0`, or `none` clears the bound.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        for (var, slot) in [
            (DEFAULT_DEADLINE_ENV, &mut self.default_deadline_ms),
            (RESPONSE_TIMEOUT_ENV, &mut self.response_timeout_ms),
            (OUTCOME_TIMEOUT_ENV, &mut self.outcome_timeout_ms),
        ] {
            if let Some(raw) = lookup(var) {
                *slot = parse_millis(var, &raw)?;
            }
        }
        Ok(self)
    }

    pub fn with_default_deadline(mut self, limit: Duration) -> Self {
        self.default_deadline_ms = Some(as_millis(limit));
        self
    }

    pub fn with_response_timeout(mut self, limit: Duration) -> Self {
        self.response_timeout_ms = Some(as_millis(limit));
        self
    }

    pub fn with_outcome_timeout(mut self, limit: Duration) -> Self {
        self.outcome_timeout_ms = Some(as_millis(limit));
        self
    }

    #[must_use]
    pub fn default_deadline(&self) -> Option<Duration> {
        self.default_deadline_ms.map(Duration::from_millis)
    }

    #[must_use]
    pub fn response_timeout(&self) -> Option<Duration> {
        self.response_timeout_ms.map(Duration::from_millis)
    }

    #[must_use]
    pub fn outcome_timeout(&self) -> Option<Duration> {
        self.outcome_timeout_ms.map(Duration::from_millis)
    }
}

fn describe_source(path: Option<&Path>) -> String {
    path.map_or_else(|| "config".to_string(), |p| p.display().to_string())
}

fn as_millis(limit: Duration) -> u64 {
    u64::try_from(limit.as_millis()).unwrap_or(u64::MAX)
}

fn parse_millis(var: &'static str, raw: &str) -> Result<Option<u64>, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    match trimmed.parse::<u64>() {
        Ok(0) => Ok(None),
        Ok(ms) => Ok(Some(ms)),
        Err(_) => Err(ConfigError::InvalidEnv {
            var,
            value: raw.to_string(),
        }),
    }
}
