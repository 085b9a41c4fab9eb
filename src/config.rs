//! Settings for the coordinator and the HTTP backend.

use std::time::Duration;

use crate::coordinator::RetryPolicy;

/// How long query results stay fresh and how failed reads are retried.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// How long a fetched value is served from the cache before the next read
    /// refetches it.
    pub stale_time: Duration,
    /// The backoff policy for failed reads. Writes are never retried.
    pub retry: RetryPolicy,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(5 * 60),
            retry: RetryPolicy::default(),
        }
    }
}

/// Where the REST backend lives and how long to wait for it.
#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    /// The scheme, host and port of the backend, e.g. "http://localhost:3000".
    pub base_url: String,
    /// The time limit for a single request.
    pub timeout: Duration,
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_owned(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl HttpBackendConfig {
    /// A config for `base_url` with the default timeout.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::HttpBackendConfig;

    #[test]
    fn trailing_slash_is_removed() {
        let config = HttpBackendConfig::new("http://localhost:8080/");

        assert_eq!(config.base_url, "http://localhost:8080");
    }
}
