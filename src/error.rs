//! Defines the crate level error type and the classification of HTTP results.

use std::time::Duration;

use crate::validation::ValidationErrors;

/// The errors that may occur when reading from or writing to the backend.
///
/// Errors are `Clone` because a single in-flight read is shared by every
/// caller waiting on the same cache key, and each of them receives a copy of
/// the outcome.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum Error {
    /// The payload failed client-side checks, no request was issued.
    ///
    /// These errors are meant to be rendered next to the offending form fields
    /// and never produce a notification.
    #[error("the request did not pass validation: {0}")]
    Validation(ValidationErrors),

    /// The backend reports the session is no longer valid.
    ///
    /// The caller should send the user to the log in page.
    #[error("the session is no longer valid")]
    Unauthorized,

    /// The backend refused to perform the request for this user.
    #[error("access to the requested resource is forbidden")]
    Forbidden(Option<String>),

    /// The backend is throttling the client.
    ///
    /// `retry_after` is the backend's hint for how long to wait before
    /// resubmitting, if it gave one.
    #[error("too many requests, try again later")]
    RateLimited {
        /// How long the backend asked the client to wait.
        retry_after: Option<Duration>,
        /// The message from the backend, if any.
        message: Option<String>,
    },

    /// The requested entity does not exist, e.g. a budget that was deleted in
    /// another tab.
    #[error("the requested resource could not be found")]
    NotFound(Option<String>),

    /// Any other 4xx response, including 408 request timeouts.
    #[error("the request was rejected with status {status}")]
    Client {
        /// The HTTP status code.
        status: u16,
        /// The message from the backend, if any.
        message: Option<String>,
    },

    /// The backend failed to handle the request.
    #[error("the server failed with status {status}")]
    Server {
        /// The HTTP status code.
        status: u16,
        /// The message from the backend, if any.
        message: Option<String>,
    },

    /// No response was received at all.
    #[error("could not reach the server: {0}")]
    Network(String),

    /// The response body did not have the expected shape.
    #[error("could not decode the response: {0}")]
    Decode(String),

    /// The request payload or parameters could not be serialized.
    #[error("could not encode the request: {0}")]
    Encode(String),

    /// The persisted credential store failed.
    #[error("could not access the token store: {0}")]
    Storage(String),
}

impl Error {
    /// Classify a non-successful HTTP response.
    ///
    /// `message` is the human readable message from the response envelope and
    /// `retry_after` the parsed `Retry-After` header.
    pub fn from_status(status: u16, message: Option<String>, retry_after: Option<Duration>) -> Self {
        match status {
            401 => Error::Unauthorized,
            403 => Error::Forbidden(message),
            404 => Error::NotFound(message),
            429 => Error::RateLimited {
                retry_after,
                message,
            },
            500..=599 => Error::Server { status, message },
            _ => Error::Client { status, message },
        }
    }

    /// Whether a read that failed with this error may be retried
    /// automatically.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Server { .. } | Error::Network(_) | Error::RateLimited { .. } => true,
            Error::Client { status, .. } => *status == 408,
            _ => false,
        }
    }

    /// The message the backend attached to the error, if any.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Error::Forbidden(message)
            | Error::NotFound(message)
            | Error::RateLimited { message, .. }
            | Error::Client { message, .. }
            | Error::Server { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// The text to show the user: the backend's message when there is one,
    /// otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self.backend_message() {
            Some(message) if !message.trim().is_empty() => message.to_owned(),
            _ => fallback.to_owned(),
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        tracing::error!("an unhandled SQL error occurred: {}", value);
        Error::Storage(value.to_string())
    }
}

impl From<ValidationErrors> for Error {
    fn from(value: ValidationErrors) -> Self {
        Error::Validation(value)
    }
}
