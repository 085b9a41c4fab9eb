//! A [Backend] that talks to a REST server over HTTP.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;

use crate::{
    Error,
    backend::{ApiRequest, ApiResponse, Backend, parse_body, parse_retry_after},
    config::HttpBackendConfig,
    tokens::TokenStore,
};

/// Sends requests to `base_url` with the stored bearer credential attached.
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
}

impl HttpBackend {
    /// Create a backend for the server described by `config`.
    ///
    /// # Errors
    /// Returns [Error::Network] if the HTTP client cannot be built, e.g. when
    /// no TLS backend is available.
    pub fn new(config: &HttpBackendConfig, tokens: Arc<dyn TokenStore>) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|error| Error::Network(error.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            tokens,
        })
    }

    fn build(&self, request: &ApiRequest) -> Result<reqwest::RequestBuilder, Error> {
        let mut builder = self
            .http
            .request(request.method.clone(), format!("{}{}", self.base_url, request.path));

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        if let Some(token) = self.tokens.auth_token()? {
            builder = builder.bearer_auth(token);
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        Ok(builder)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, Error> {
        let response = self
            .build(&request)?
            .send()
            .await
            .map_err(|error| Error::Network(error.to_string()))?;

        let status = response.status().as_u16();
        let retry_after = parse_retry_after(
            response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok()),
        );
        let bytes = response
            .bytes()
            .await
            .map_err(|error| Error::Network(error.to_string()))?;

        Ok(ApiResponse {
            status,
            body: parse_body(&bytes),
            retry_after,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, net::SocketAddr, sync::Arc, time::Duration};

    use axum::{
        Json, Router,
        extract::Query,
        http::{HeaderMap, Method, StatusCode, header::AUTHORIZATION},
        response::IntoResponse,
        routing::get,
    };
    use axum_server::Handle;
    use reqwest::header::RETRY_AFTER;
    use serde_json::{Value, json};

    use crate::{
        Error,
        backend::{ApiRequest, Backend, HttpBackend},
        config::HttpBackendConfig,
        endpoints,
        mock_server::{DEMO_EMAIL, DEMO_PASSWORD, MemoryStore, MockState, build_router},
        tokens::{AUTH_TOKEN_KEY, MemoryTokenStore, TokenStore},
    };

    /// Serve `router` on an ephemeral port and return its base URL.
    async fn serve(router: Router) -> String {
        let handle: Handle<SocketAddr> = Handle::new();
        let server = axum_server::bind(SocketAddr::from(([127, 0, 0, 1], 0))).handle(handle.clone());
        tokio::spawn(async move { server.serve(router.into_make_service()).await });

        let addr = handle
            .listening()
            .await
            .expect("Could not start test server.");

        format!("http://{addr}")
    }

    fn backend_for(base_url: &str, tokens: Arc<MemoryTokenStore>) -> HttpBackend {
        HttpBackend::new(&HttpBackendConfig::new(base_url), tokens).unwrap()
    }

    async fn echo(headers: HeaderMap, Query(query): Query<HashMap<String, String>>) -> impl IntoResponse {
        let authorization = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        Json(json!({
            "success": true,
            "data": { "authorization": authorization, "query": query }
        }))
    }

    #[tokio::test]
    async fn sends_bearer_token_and_query() {
        let base_url = serve(Router::new().route("/echo", get(echo))).await;
        let tokens = Arc::new(MemoryTokenStore::with_auth_token("abc123"));
        let backend = backend_for(&base_url, tokens);

        let response = backend
            .send(ApiRequest::get("/echo").query(vec![("page".to_owned(), "2".to_owned())]))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(
            response.into_data().unwrap(),
            json!({ "authorization": "Bearer abc123", "query": { "page": "2" } })
        );
    }

    #[tokio::test]
    async fn omits_authorization_without_token() {
        let base_url = serve(Router::new().route("/echo", get(echo))).await;
        let backend = backend_for(&base_url, Arc::new(MemoryTokenStore::new()));

        let data = backend
            .send(ApiRequest::get("/echo"))
            .await
            .unwrap()
            .into_data()
            .unwrap();

        assert_eq!(data["authorization"], Value::Null);
    }

    #[tokio::test]
    async fn rate_limit_carries_retry_after() {
        let router = Router::new().route(
            "/budgets",
            get(|| async {
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    [(RETRY_AFTER, "7")],
                    Json(json!({ "success": false, "message": "Slow down" })),
                )
            }),
        );
        let base_url = serve(router).await;
        let backend = backend_for(&base_url, Arc::new(MemoryTokenStore::new()));

        let response = backend.send(ApiRequest::get("/budgets")).await.unwrap();

        assert_eq!(response.status, 429);
        assert_eq!(response.retry_after, Some(Duration::from_secs(7)));
        assert_eq!(
            response.into_data(),
            Err(Error::RateLimited {
                retry_after: Some(Duration::from_secs(7)),
                message: Some("Slow down".to_owned()),
            })
        );
    }

    #[tokio::test]
    async fn timeout_is_a_network_error() {
        let router = Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({ "success": true }))
            }),
        );
        let base_url = serve(router).await;
        let config = HttpBackendConfig {
            timeout: Duration::from_millis(100),
            ..HttpBackendConfig::new(&base_url)
        };
        let backend = HttpBackend::new(&config, Arc::new(MemoryTokenStore::new())).unwrap();

        let got = backend.send(ApiRequest::get("/slow")).await;

        assert!(matches!(got, Err(Error::Network(_))), "got {got:?}");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        let backend = backend_for("http://127.0.0.1:9", Arc::new(MemoryTokenStore::new()));

        let got = backend.send(ApiRequest::get("/budgets")).await;

        assert!(matches!(got, Err(Error::Network(_))), "got {got:?}");
    }

    #[tokio::test]
    async fn logs_in_and_reads_from_mock_server() {
        let base_url = serve(build_router(MockState::new(MemoryStore::new()))).await;
        let tokens = Arc::new(MemoryTokenStore::new());
        let backend = backend_for(&base_url, tokens.clone());

        let denied = backend.send(ApiRequest::get(endpoints::ACCOUNTS)).await.unwrap();
        assert_eq!(denied.into_data(), Err(Error::Unauthorized));

        let session = backend
            .send(ApiRequest::with_body(
                Method::POST,
                endpoints::LOG_IN,
                Some(json!({ "email": DEMO_EMAIL, "password": DEMO_PASSWORD })),
            ))
            .await
            .unwrap()
            .into_data()
            .unwrap();
        tokens
            .set(AUTH_TOKEN_KEY, session["token"].as_str().unwrap())
            .unwrap();

        let accounts = backend
            .send(ApiRequest::get(endpoints::ACCOUNTS))
            .await
            .unwrap()
            .into_data()
            .unwrap();

        assert_eq!(accounts, json!([]));
    }
}
