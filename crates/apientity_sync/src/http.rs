//! `reqwest`-backed HTTP client.

use crate::error::{SyncError, SyncResult};
use crate::transport::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// [`HttpClient`] backed by a `reqwest::Client`.
///
/// POST and PUT params are sent as a JSON body, GET and DELETE params as
/// the query string. Bodies that are not JSON are returned as a string.
#[derive(Debug, Clone, Default)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a client with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing `reqwest::Client`.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn perform_request(&self, request: HttpRequest) -> SyncResult<HttpResponse> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(params) = &request.params {
            if request.method.sends_body() {
                builder = builder.json(params);
            } else {
                builder = builder.query(&query_pairs(params));
            }
        }

        let response = builder.send().await.map_err(map_error)?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(map_error)?;
        debug!(method = %request.method, url = %request.url, status, len = bytes.len(), "response received");

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        Ok(HttpResponse::new(status, body))
    }
}

fn map_error(err: reqwest::Error) -> SyncError {
    if err.is_timeout() {
        SyncError::Timeout
    } else if err.is_connect() || err.is_request() {
        SyncError::transport_retryable(err.to_string())
    } else {
        SyncError::transport_fatal(err.to_string())
    }
}

/// Flattens a params map into query pairs. Arrays repeat their key.
fn query_pairs(params: &Value) -> Vec<(String, String)> {
    let Some(map) = params.as_object() else {
        return Vec::new();
    };

    let mut pairs = Vec::new();
    for (key, value) in map {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    pairs.push((key.clone(), scalar_text(item)));
                }
            }
            other => pairs.push((key.clone(), scalar_text(other))),
        }
    }
    pairs
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_flattening() {
        let mut pairs = query_pairs(&json!({
            "q": "blue",
            "page": 2,
            "tags": ["a", "b"],
            "skip": null
        }));
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("page".to_string(), "2".to_string()),
                ("q".to_string(), "blue".to_string()),
                ("tags".to_string(), "a".to_string()),
                ("tags".to_string(), "b".to_string()),
            ]
        );
        assert!(query_pairs(&json!([1, 2])).is_empty());
    }
}
