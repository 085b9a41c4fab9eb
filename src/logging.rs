//! Logging setup and request/response log lines.
//!
//! Bodies longer than [LOG_BODY_LENGTH_LIMIT] bytes are truncated at the
//! `info` level and logged in full at the `debug` level. Credentials are
//! redacted before anything is written.

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderMap, HeaderValue, StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::backend::{ApiRequest, ApiResponse};

/// Bodies longer than this many bytes are truncated in `info` logs.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

const REDACTED: &str = "********";
/// Compared against field names with case and underscores ignored, so
/// `refresh_token` and `refreshToken` are both secret.
const SECRET_FIELDS: [&str; 5] = [
    "password",
    "token",
    "authtoken",
    "refreshtoken",
    "accesstoken",
];

fn is_secret_field(key: &str) -> bool {
    let normalised: String = key
        .chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect();

    SECRET_FIELDS.contains(&normalised.as_str())
}

/// Install a pretty stdout subscriber.
///
/// The `RUST_LOG` environment variable takes precedence over
/// `default_directive`, e.g. "info" or "budgeteur_client=debug".
pub fn init_logging(default_directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().pretty())
        .try_init();

    if let Err(error) = result {
        tracing::debug!("Logging was already initialised: {error}");
    }
}

/// Replace the values of credential fields anywhere in `value`.
pub fn redact_secrets(value: &Value) -> Value {
    match value {
        Value::Object(object) => Value::Object(
            object
                .iter()
                .map(|(key, value)| {
                    if is_secret_field(key) {
                        (key.clone(), Value::String(REDACTED.to_owned()))
                    } else {
                        (key.clone(), redact_secrets(value))
                    }
                })
                .collect(),
        ),
        Value::Array(values) => Value::Array(values.iter().map(redact_secrets).collect()),
        other => other.clone(),
    }
}

fn redact_headers(headers: &HeaderMap) -> HeaderMap {
    let mut headers = headers.clone();

    if headers.contains_key(AUTHORIZATION) {
        headers.insert(AUTHORIZATION, HeaderValue::from_static(REDACTED));
    }

    headers
}

fn truncate(body: &str) -> &str {
    if body.len() <= LOG_BODY_LENGTH_LIMIT {
        return body;
    }

    let mut end = LOG_BODY_LENGTH_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }

    &body[..end]
}

fn log_body(prefix: &str, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!("{prefix}\nbody: {:}...", truncate(body));
        tracing::debug!("Full body: {body:?}");
    } else {
        tracing::info!("{prefix}\nbody: {body:?}");
    }
}

/// Log a request the coordinator is about to send.
pub fn log_request(request: &ApiRequest) {
    let body = request
        .body
        .as_ref()
        .map(|body| redact_secrets(body).to_string())
        .unwrap_or_default();
    let target = request
        .path_and_query()
        .unwrap_or_else(|_| request.path.clone());

    log_body(&format!("Sending request: {} {}", request.method, target), &body);
}

/// Log a response the coordinator received.
pub fn log_response(request: &ApiRequest, response: &ApiResponse) {
    let body = redact_secrets(&response.body).to_string();

    log_body(
        &format!(
            "Received response: {} {} -> {}",
            request.method, request.path, response.status
        ),
        &body,
    );
}

/// Log the request and response for each request handled by the mock server.
///
/// Both the request and response are logged at the `info` level.
/// If a body is longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is
/// truncated and logged in full at the `debug` level.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let body_text = match body_to_text(body).await {
        Ok(text) => text,
        Err(response) => return response,
    };

    let display_text = serde_json::from_str::<Value>(&body_text)
        .map(|value| redact_secrets(&value).to_string())
        .unwrap_or_else(|_| body_text.clone());
    log_body(
        &format!(
            "Received request: {} {}\nheaders: {:#?}",
            parts.method,
            parts.uri,
            redact_headers(&parts.headers)
        ),
        &display_text,
    );

    let request = Request::from_parts(parts, Body::from(body_text));
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let body_text = match body_to_text(body).await {
        Ok(text) => text,
        Err(response) => return response,
    };
    log_body(&format!("Sending response: {}", parts.status), &body_text);

    Response::from_parts(parts, Body::from(body_text))
}

async fn body_to_text(body: Body) -> Result<String, Response> {
    match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).to_string()),
        Err(error) => {
            tracing::error!("Could not read body: {error}");
            Err(StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
    }
}
