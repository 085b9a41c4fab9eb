//! The strategy the coordinator uses to reach the REST backend.
//!
//! [HttpBackend] talks to a server over the network, [InProcessBackend]
//! dispatches straight into the mock server's router. Both are chosen by
//! whoever constructs the [crate::Coordinator].

mod http;
mod in_process;

pub use http::HttpBackend;
pub use in_process::InProcessBackend;

use std::time::Duration;

use async_trait::async_trait;
use axum::http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Error;

/// A request for the backend, independent of the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// The resource path, e.g. "/budgets/7".
    pub path: String,
    /// Query string parameters as (name, value) pairs.
    pub query: Vec<(String, String)>,
    /// The JSON body for create and update requests.
    pub body: Option<Value>,
}

impl ApiRequest {
    /// A `GET` request for `path`.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// A request with `method` for `path` carrying `body`.
    pub fn with_body(method: Method, path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body,
        }
    }

    /// Replace the query string parameters.
    pub fn query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    /// The path with the encoded query string appended, if there is one.
    pub fn path_and_query(&self) -> Result<String, Error> {
        if self.query.is_empty() {
            return Ok(self.path.clone());
        }

        let query = serde_urlencoded::to_string(&self.query)
            .map_err(|error| Error::Encode(error.to_string()))?;

        Ok(format!("{}?{}", self.path, query))
    }
}

/// The raw result of a request that reached the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// The parsed JSON body, `Value::Null` when the body was empty, or a JSON
    /// string when the body was not JSON (e.g. a CSV export).
    pub body: Value,
    /// The parsed `Retry-After` header.
    pub retry_after: Option<Duration>,
}

impl ApiResponse {
    /// A `200 OK` response wrapping `data` in a successful envelope.
    pub fn ok(data: Value) -> Self {
        Self {
            status: 200,
            body: serde_json::json!({ "success": true, "data": data }),
            retry_after: None,
        }
    }

    /// An error response with `status` and `message` in the envelope.
    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: serde_json::json!({ "success": false, "message": message }),
            retry_after: None,
        }
    }

    /// Unwrap the envelope, classifying failures into [Error] variants.
    ///
    /// # Errors
    ///
    /// Returns the classified error for non-2xx statuses, and
    /// [Error::Client] for a 2xx response whose envelope reports failure.
    pub fn into_data(self) -> Result<Value, Error> {
        if !(200..300).contains(&self.status) {
            let message = self
                .body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_owned);

            return Err(Error::from_status(self.status, message, self.retry_after));
        }

        let envelope = match self.body {
            Value::Object(_) => serde_json::from_value::<Envelope<Value>>(self.body)
                .map_err(|error| Error::Decode(error.to_string()))?,
            // Bodies that are not an envelope, e.g. CSV text, are the data.
            other => return Ok(other),
        };

        if !envelope.success {
            return Err(Error::Client {
                status: self.status,
                message: envelope.message,
            });
        }

        Ok(envelope.data.unwrap_or(Value::Null))
    }
}

/// The response envelope every endpoint returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    /// A successful envelope carrying `data`.
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    /// A failed envelope with an optional message.
    pub fn failure(message: Option<String>) -> Self {
        Self {
            success: false,
            data: None,
            message,
        }
    }
}

/// Sends requests to a REST backend.
///
/// Implementations return `Ok` for every response that arrived, whatever its
/// status, and [Error::Network] only when no response was received.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, Error>;
}

/// Serialize a payload as a JSON request body.
pub(crate) fn to_body<T: Serialize + ?Sized>(payload: &T) -> Result<Value, Error> {
    serde_json::to_value(payload).map_err(|error| Error::Encode(error.to_string()))
}

/// Parse a `Retry-After` header given in seconds.
pub(crate) fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    value
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Parse a response body as JSON, keeping non-JSON text as a string.
pub(crate) fn parse_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }

    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).to_string()))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::Method;
    use serde_json::{Value, json};

    use crate::{
        Error,
        backend::{ApiRequest, ApiResponse, parse_body, parse_retry_after},
    };

    #[test]
    fn unwraps_successful_envelope() {
        let response = ApiResponse::ok(json!([{"id": 1}]));

        assert_eq!(response.into_data(), Ok(json!([{"id": 1}])));
    }

    #[test]
    fn classifies_error_status() {
        let response = ApiResponse::error(404, "Budget not found");

        assert_eq!(
            response.into_data(),
            Err(Error::NotFound(Some("Budget not found".to_owned())))
        );
    }

    #[test]
    fn carries_retry_after_hint() {
        let response = ApiResponse {
            retry_after: Some(Duration::from_secs(3)),
            ..ApiResponse::error(429, "Slow down")
        };

        assert_eq!(
            response.into_data(),
            Err(Error::RateLimited {
                retry_after: Some(Duration::from_secs(3)),
                message: Some("Slow down".to_owned())
            })
        );
    }

    #[test]
    fn failed_envelope_with_ok_status_is_an_error() {
        let response = ApiResponse {
            status: 200,
            body: json!({"success": false, "message": "nope"}),
            retry_after: None,
        };

        assert!(matches!(
            response.into_data(),
            Err(Error::Client { status: 200, .. })
        ));
    }

    #[test]
    fn non_json_error_body_is_classified() {
        let response = ApiResponse {
            status: 502,
            body: Value::String("Bad Gateway".to_owned()),
            retry_after: None,
        };

        assert_eq!(
            response.into_data(),
            Err(Error::Server {
                status: 502,
                message: None
            })
        );
    }

    #[test]
    fn text_body_is_the_data() {
        let response = ApiResponse {
            status: 200,
            body: Value::String("id,amount\n".to_owned()),
            retry_after: None,
        };

        assert_eq!(response.into_data(), Ok(json!("id,amount\n")));
    }

    #[test]
    fn encodes_query_string() {
        let request = ApiRequest::get("/transactions").query(vec![
            ("page".to_owned(), "2".to_owned()),
            ("search".to_owned(), "coffee beans".to_owned()),
        ]);

        assert_eq!(
            request.path_and_query().unwrap(),
            "/transactions?page=2&search=coffee+beans"
        );
    }

    #[test]
    fn request_without_query_is_the_path() {
        let request = ApiRequest::with_body(Method::DELETE, "/budgets/1", None);

        assert_eq!(request.path_and_query().unwrap(), "/budgets/1");
    }

    #[test]
    fn parses_headers_and_bodies() {
        assert_eq!(parse_retry_after(Some("12")), Some(Duration::from_secs(12)));
        assert_eq!(parse_retry_after(Some("soon")), None);
        assert_eq!(parse_body(b""), Value::Null);
        assert_eq!(parse_body(b"{\"a\":1}"), json!({"a": 1}));
        assert_eq!(parse_body(b"a,b"), json!("a,b"));
    }
}
