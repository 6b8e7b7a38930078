//! Transport abstraction for entity requests.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

/// HTTP verbs issued by the syncer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// Read.
    Get,
    /// Create.
    Post,
    /// Update.
    Put,
    /// Destroy.
    Delete,
}

impl HttpMethod {
    /// Returns the method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether params travel in the body rather than the query string.
    pub fn sends_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request handed to an [`HttpClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Verb.
    pub method: HttpMethod,
    /// Absolute URL.
    pub url: String,
    /// JSON body for POST/PUT, query parameters for GET/DELETE.
    pub params: Option<Value>,
    /// Headers, shared ones merged with per-call overrides.
    pub headers: BTreeMap<String, String>,
}

/// A response returned by an [`HttpClient`].
///
/// Non-success statuses are responses, not errors; the syncer decides
/// what they mean.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Decoded body, `Null` when empty.
    pub body: Value,
}

impl HttpResponse {
    /// Creates a response.
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Creates a 200 response.
    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    /// Creates a 204 response.
    pub fn no_content() -> Self {
        Self::new(204, Value::Null)
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client abstraction.
///
/// Implement this trait to plug in the actual HTTP stack. Implementations
/// return `Err` only when no response was obtained at all.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Performs one request.
    async fn perform_request(&self, request: HttpRequest) -> SyncResult<HttpResponse>;
}

/// A scripted client for testing.
///
/// Responses are returned in the order they were queued; every request is
/// recorded.
#[derive(Debug, Default)]
pub struct MockHttpClient {
    responses: Mutex<VecDeque<SyncResult<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockHttpClient {
    /// Creates a mock client with no queued responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response.
    pub fn push_response(&self, response: HttpResponse) {
        self.responses.lock().push_back(Ok(response));
    }

    /// Queues a JSON response with the given status.
    pub fn push_json(&self, status: u16, body: Value) {
        self.push_response(HttpResponse::new(status, body));
    }

    /// Queues a transport failure.
    pub fn push_error(&self, error: SyncError) {
        self.responses.lock().push_back(Err(error));
    }

    /// Returns every request performed so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests performed so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// The most recent request.
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn perform_request(&self, request: HttpRequest) -> SyncResult<HttpResponse> {
        let label = format!("{} {}", request.method, request.url);
        self.requests.lock().push(request);
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(SyncError::transport_fatal(format!("no mock response queued for {label}"))))
    }
}
