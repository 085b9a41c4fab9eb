//! A [Backend] that hands requests straight to an axum router in the same
//! process, without opening a socket.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{
        Request,
        header::{AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER},
    },
};
use tower::ServiceExt;

use crate::{
    Error,
    backend::{ApiRequest, ApiResponse, Backend, parse_body, parse_retry_after},
    tokens::TokenStore,
};

/// Dispatches requests into `router`, typically [crate::mock_server::build_router].
#[derive(Clone)]
pub struct InProcessBackend {
    router: Router,
    tokens: Arc<dyn TokenStore>,
}

impl InProcessBackend {
    pub fn new(router: Router, tokens: Arc<dyn TokenStore>) -> Self {
        Self { router, tokens }
    }

    fn build(&self, request: &ApiRequest) -> Result<Request<Body>, Error> {
        let mut builder = Request::builder()
            .method(request.method.clone())
            .uri(request.path_and_query()?);

        if let Some(token) = self.tokens.auth_token()? {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let body = match &request.body {
            Some(body) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };

        builder
            .body(body)
            .map_err(|error| Error::Encode(error.to_string()))
    }
}

#[async_trait]
impl Backend for InProcessBackend {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, Error> {
        let http_request = self.build(&request)?;

        let response = self
            .router
            .clone()
            .oneshot(http_request)
            .await
            .map_err(|error| Error::Network(error.to_string()))?;

        let status = response.status().as_u16();
        let retry_after = parse_retry_after(
            response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok()),
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|error| Error::Network(error.to_string()))?;

        Ok(ApiResponse {
            status,
            body: parse_body(&bytes),
            retry_after,
        })
    }
}
