//! Harness error types.

use thiserror::Error;

/// Failures surfaced by the in-process test harness.
///
/// Assertion helpers panic instead; these errors cover the plumbing
/// around building requests and reading responses.
#[derive(Debug, Error)]
pub enum TestError {
    /// The request body could not be serialized to JSON.
    #[error("cannot serialize request body: {0}")]
    BodySerialize(#[source] serde_json::Error),

    /// The response body could not be read.
    #[error("cannot read response body: {0}")]
    BodyRead(String),

    /// The response body is not valid UTF-8.
    #[error("response body is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::string::FromUtf8Error),

    /// The response body could not be parsed as JSON.
    #[error("cannot parse response JSON: {0}")]
    Json(#[from] serde_json::Error),
}
