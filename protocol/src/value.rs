use serde::de::DeserializeOwned;
use thiserror::Error;

/// Dynamically-typed argument, return value, or abnormal payload.
pub use serde_json::Value;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("value {index} is out of range ({len} available)")]
    OutOfRange { index: usize, len: usize },
    #[error("value {index} does not decode as {target}: {source}")]
    Invalid {
        index: usize,
        target: &'static str,
        source: serde_json::Error,
    },
}

/// Decode the value at `index` into `T`.
pub fn decode_at<T: DeserializeOwned>(values: &[Value], index: usize) -> Result<T, DecodeError> {
    let value = values.get(index).ok_or(DecodeError::OutOfRange {
        index,
        len: values.len(),
    })?;
    serde_json::from_value(value.clone()).map_err(|source| DecodeError::Invalid {
        index,
        target: std::any::type_name::<T>(),
        source,
    })
}

/// Render values as a comma separated list of compact JSON.
#[must_use]
pub fn format_values(values: &[Value]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
