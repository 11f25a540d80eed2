use thiserror::Error;

/// Failure of a request against the match backend.
///
/// `NotFound` is terminal for the requested entity; the other kinds are
/// transient and the caller keeps whatever it already has.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Reasons a push message is discarded before it reaches the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PushError {
    #[error("message is not valid json: {0}")]
    NotJson(String),
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("invalid value for `{field}`: {value}")]
    InvalidField { field: &'static str, value: String },
}
