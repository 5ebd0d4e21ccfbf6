//! Buffered response wrapper with assertion helpers.

use std::fmt;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::TestError;

/// A fully buffered response with helpers for assertions.
///
/// Assertion methods return `&Self` so checks chain:
///
/// ```
/// use bytes::Bytes;
/// use http::{HeaderMap, StatusCode};
/// use portico_test::TestResponse;
///
/// let response = TestResponse::new(StatusCode::OK, HeaderMap::new(), Bytes::from("hello"));
/// response
///     .assert_status(StatusCode::OK)
///     .assert_body_contains("hello");
/// ```
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    /// Buffers an `http::Response` into a `TestResponse`.
    ///
    /// # Errors
    ///
    /// Returns an error when the body stream fails.
    pub async fn from_http<B>(response: http::Response<B>) -> Result<Self, TestError>
    where
        B: http_body_util::BodyExt,
        B::Error: fmt::Display,
    {
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|err| TestError::BodyRead(err.to_string()))?
            .to_bytes();

        Ok(Self {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }

    /// Builds a response from raw parts.
    #[must_use]
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// The response status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The response status as a bare number.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// True for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// All response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header value as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// The `content-type` header, if present.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// The raw body bytes.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The body as a UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns an error when the body is not valid UTF-8.
    pub fn text(&self) -> Result<String, TestError> {
        Ok(String::from_utf8(self.body.to_vec())?)
    }

    /// Deserializes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error when the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Deserializes the body as a loose JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error when the body is not valid JSON.
    pub fn json_value(&self) -> Result<serde_json::Value, TestError> {
        self.json()
    }

    /// Asserts the status matches.
    ///
    /// # Panics
    ///
    /// Panics when the status differs.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status, expected,
            "expected status {expected}, got {}",
            self.status
        );
        self
    }

    /// Asserts the status matches a bare number.
    ///
    /// # Panics
    ///
    /// Panics when the status differs.
    pub fn assert_status_code(&self, expected: u16) -> &Self {
        assert_eq!(
            self.status.as_u16(),
            expected,
            "expected status {expected}, got {}",
            self.status.as_u16()
        );
        self
    }

    /// Asserts a header is present with the expected value.
    ///
    /// # Panics
    ///
    /// Panics when the header is missing or differs.
    pub fn assert_header(&self, name: &str, expected: &str) -> &Self {
        let actual = self
            .header(name)
            .unwrap_or_else(|| panic!("header {name} not found"));
        assert_eq!(actual, expected, "header {name}: expected {expected}, got {actual}");
        self
    }

    /// Asserts the body contains a substring.
    ///
    /// # Panics
    ///
    /// Panics when the body is not UTF-8 or does not contain `needle`.
    pub fn assert_body_contains(&self, needle: &str) -> &Self {
        let body = self.text().expect("body should be valid UTF-8");
        assert!(
            body.contains(needle),
            "body should contain {needle:?}, got: {body}"
        );
        self
    }

    /// Asserts a dotted-path JSON field equals the expected value.
    ///
    /// Path segments that parse as numbers index into arrays, so
    /// `errors.0.message` reaches into the first error object.
    ///
    /// # Panics
    ///
    /// Panics when the body is not JSON, the path is missing, or the
    /// value differs.
    pub fn assert_json_field(&self, path: &str, expected: &serde_json::Value) -> &Self {
        let json = self.json_value().expect("body should be valid JSON");
        let actual = json_path(&json, path)
            .unwrap_or_else(|| panic!("JSON path {path:?} not found in {json}"));
        assert_eq!(actual, expected, "JSON field {path}");
        self
    }
}

impl fmt::Debug for TestResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .finish()
    }
}

fn json_path<'a>(value: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    let mut current = value;
    for segment in path.split('.').filter(|segment| !segment.is_empty()) {
        current = match segment.parse::<usize>() {
            Ok(index) => current.get(index)?,
            Err(_) => current.get(segment)?,
        };
    }
    Some(current)
}
