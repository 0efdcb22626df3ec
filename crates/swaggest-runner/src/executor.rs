//! Blocking HTTP execution of request descriptors

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};

use swaggest_core::{ActualResponse, RequestDescriptor};

/// Sends [`RequestDescriptor`]s and materializes the responses.
pub struct HttpExecutor {
    client: reqwest::blocking::Client,
}

impl HttpExecutor {
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(timeout: Duration) -> Result<Self, ExecuteError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExecuteError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    /// Send one request and read the whole response.
    ///
    /// # Errors
    ///
    /// Unknown method, or a transport failure (connect, timeout, body read).
    pub fn execute(&self, request: &RequestDescriptor) -> Result<ActualResponse, ExecuteError> {
        let method = reqwest::Method::from_bytes(request.method.to_uppercase().as_bytes())
            .map_err(|_| ExecuteError::InvalidMethod(request.method.clone()))?;

        let mut req = self.client.request(method, &request.uri);

        let pairs = request.query_pairs();
        if !pairs.is_empty() {
            req = req.query(&pairs);
        }

        for (name, value) in request.header_pairs() {
            // Names or values HTTP cannot carry are dropped, not sent broken
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) {
                (Ok(name), Ok(value)) => req = req.header(name, value),
                _ => tracing::warn!(header = %name, "skipping header not representable in HTTP"),
            }
        }

        if let Some(body) = &request.body {
            req = req.json(body);
        }

        let resp = req
            .send()
            .map_err(|e| ExecuteError::Transport(e.to_string()))?;

        let status = resp.status().as_u16();
        let headers = header_map(resp.headers());
        let text = resp
            .text()
            .map_err(|e| ExecuteError::Transport(e.to_string()))?;

        tracing::debug!(uri = %request.uri, status, bytes = text.len(), "response received");

        Ok(ActualResponse {
            status: Some(status),
            headers,
            data: decode_body(&text),
        })
    }
}

/// Lower-cased names; repeated headers are joined with ", ".
fn header_map(headers: &HeaderMap) -> Map<String, Value> {
    let mut out = Map::new();
    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(", ");
        out.insert(name.as_str().to_ascii_lowercase(), Value::String(joined));
    }
    out
}

/// JSON when it parses, the raw text otherwise, nothing when empty.
fn decode_body(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())))
}

#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    #[error("HTTP client error: {0}")]
    Client(String),
    #[error("invalid HTTP method '{0}'")]
    InvalidMethod(String),
    #[error("transport error: {0}")]
    Transport(String),
}
