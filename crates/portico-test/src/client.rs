//! In-process test client.

use bytes::Bytes;
use http::Method;
use portico_server::Server;
use serde::Serialize;

use crate::error::TestError;
use crate::response::TestResponse;

/// Client that dispatches requests straight into a [`Server`].
///
/// No socket is bound; requests run through the same routing and
/// middleware path a live listener uses, so tests cover the full
/// pipeline without network setup.
#[must_use]
pub struct TestClient {
    server: Server,
}

impl TestClient {
    /// Wraps a configured server.
    pub fn new(server: Server) -> Self {
        Self { server }
    }

    /// The wrapped server, for registering more routes mid-test.
    #[must_use]
    pub fn server(&self) -> &Server {
        &self.server
    }

    /// Mutable access to the wrapped server.
    pub fn server_mut(&mut self) -> &mut Server {
        &mut self.server
    }

    /// Starts a GET request.
    pub fn get(&self, path: impl Into<String>) -> TestRequestBuilder<'_> {
        self.request(Method::GET, path)
    }

    /// Starts a POST request.
    pub fn post(&self, path: impl Into<String>) -> TestRequestBuilder<'_> {
        self.request(Method::POST, path)
    }

    /// Starts a PUT request.
    pub fn put(&self, path: impl Into<String>) -> TestRequestBuilder<'_> {
        self.request(Method::PUT, path)
    }

    /// Starts a PATCH request.
    pub fn patch(&self, path: impl Into<String>) -> TestRequestBuilder<'_> {
        self.request(Method::PATCH, path)
    }

    /// Starts a DELETE request.
    pub fn delete(&self, path: impl Into<String>) -> TestRequestBuilder<'_> {
        self.request(Method::DELETE, path)
    }

    /// Starts a HEAD request.
    pub fn head(&self, path: impl Into<String>) -> TestRequestBuilder<'_> {
        self.request(Method::HEAD, path)
    }

    /// Starts an OPTIONS request.
    pub fn options(&self, path: impl Into<String>) -> TestRequestBuilder<'_> {
        self.request(Method::OPTIONS, path)
    }

    /// Starts a request with an explicit method.
    pub fn request(&self, method: Method, path: impl Into<String>) -> TestRequestBuilder<'_> {
        TestRequestBuilder {
            client: self,
            method,
            path: path.into(),
            headers: Vec::new(),
            body: Bytes::new(),
            error: None,
        }
    }
}

/// Chainable request builder bound to a [`TestClient`].
///
/// Builder-stage failures (an unserializable JSON body) are deferred
/// until [`send`](Self::send) or [`try_send`](Self::try_send).
#[must_use]
pub struct TestRequestBuilder<'a> {
    client: &'a TestClient,
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
    body: Bytes,
    error: Option<TestError>,
}

impl TestRequestBuilder<'_> {
    /// Adds a request header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the raw request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Serializes `value` as the JSON request body and sets the
    /// content type.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => {
                self.body = Bytes::from(body);
                self.headers
                    .push(("content-type".to_owned(), "application/json".to_owned()));
            }
            Err(err) => self.error = Some(TestError::BodySerialize(err)),
        }
        self
    }

    /// Encodes `fields` as a form body and sets the content type.
    pub fn form(mut self, fields: &[(&str, &str)]) -> Self {
        let encoded = fields
            .iter()
            .map(|(name, value)| {
                format!("{}={}", urlencoding::encode(name), urlencoding::encode(value))
            })
            .collect::<Vec<_>>()
            .join("&");
        self.body = Bytes::from(encoded);
        self.headers.push((
            "content-type".to_owned(),
            "application/x-www-form-urlencoded".to_owned(),
        ));
        self
    }

    /// Sends the request.
    ///
    /// # Panics
    ///
    /// Panics on harness-level failures; use [`try_send`](Self::try_send)
    /// to handle them instead.
    pub async fn send(self) -> TestResponse {
        match self.try_send().await {
            Ok(response) => response,
            Err(err) => panic!("test request failed: {err}"),
        }
    }

    /// Sends the request, surfacing harness-level failures.
    ///
    /// # Errors
    ///
    /// Returns an error when the request body could not be built or the
    /// response body could not be read.
    pub async fn try_send(self) -> Result<TestResponse, TestError> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect();
        let response = self
            .client
            .server
            .test_request(self.method, &self.path, &headers, self.body)
            .await;

        TestResponse::from_http(response).await
    }
}
