use thiserror::Error;

/// Failure reported by an [`crate::source::EntitySource`]. Always carried as a
/// value into the picker's list state; never raised across rendering.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("entity source unavailable: {0}")]
    Unavailable(String),
    #[error("unexpected response shape: {0}")]
    Envelope(#[from] EnvelopeError),
    #[error("catalog query failed: {0}")]
    Storage(String),
    #[error("fetch task aborted: {0}")]
    Aborted(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("response is not valid JSON: {0}")]
    Json(String),
    #[error("response does not match the list envelope: {0}")]
    Shape(String),
    #[error("backend reported failure: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CategoryParseError {
    #[error("expected <facet>:<value>, got '{0}'")]
    MissingSeparator(String),
    #[error("unknown facet '{0}': expected role|level|type|region|sector")]
    UnknownFacet(String),
    #[error("category value is empty in '{0}'")]
    EmptyValue(String),
}
