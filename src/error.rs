use thiserror::Error;

/// Malformed encoded polyline
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Polyline truncated at offset {offset}")]
    Truncated { offset: usize },

    #[error("Invalid polyline character {ch:?} at offset {offset}")]
    InvalidCharacter { offset: usize, ch: char },

    #[error("Polyline value overflows at offset {offset}")]
    Overflow { offset: usize },
}

/// Navigation core error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NavError {
    #[error("Polyline decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("Route data inconsistency: {0}")]
    RouteDataInconsistency(String),

    #[error("Instruction index {index} out of range (route has {len} instructions)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid fix: ({latitude}, {longitude})")]
    InvalidFix { latitude: f64, longitude: f64 },

    #[error("Routing provider error: {0}")]
    Provider(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Peripheral signal delivery failures. Never fatal to navigation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("Signal sink not connected")]
    Unavailable,

    #[error("Signal sink busy, signal dropped")]
    Busy,

    #[error("Signal value {0} does not fit in one byte")]
    SignalOutOfRange(i32),

    #[error("Signal send failed: {0}")]
    SendFailed(String),
}

/// Result type for navigation core operations
pub type NavResult<T> = Result<T, NavError>;

impl From<serde_json::Error> for NavError {
    fn from(err: serde_json::Error) -> Self {
        NavError::Parse(err.to_string())
    }
}
