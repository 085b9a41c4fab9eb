//! Logging in and out through the coordinator.

use std::sync::atomic::Ordering;

use axum::http::Method;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    backend::ApiRequest,
    coordinator::{CacheEvent, Coordinator},
    endpoints,
    tokens::{AUTH_TOKEN_KEY, REFRESH_TOKEN_KEY},
    validation::ValidationErrors,
};

/// The email and password a user logs in with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Check that both fields were filled in.
    ///
    /// # Errors
    ///
    /// Returns a field error for each blank field.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.email.trim().is_empty() {
            errors.add("email", "This field is required");
        } else if !self.email.contains('@') {
            errors.add("email", "Must be a valid email address");
        }

        if self.password.is_empty() {
            errors.add("password", "This field is required");
        }

        errors.into_result()
    }
}

/// The credentials issued by a successful log in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub refresh_token: String,
    pub user_id: i64,
}

impl Coordinator {
    /// Exchange `credentials` for a session and persist its tokens.
    ///
    /// A successful log in allows the next expired session to redirect to the
    /// log in page again.
    ///
    /// # Errors
    ///
    /// Returns [Error::Validation] for blank fields, the classified backend
    /// error (e.g. [Error::Unauthorized] for a wrong password), or
    /// [Error::Storage] if the tokens cannot be saved.
    pub async fn log_in(&self, credentials: &Credentials) -> Result<Session, Error> {
        credentials.validate()?;

        let body = serde_json::to_value(credentials)
            .map_err(|error| Error::Encode(error.to_string()))?;
        let request = ApiRequest::with_body(Method::POST, endpoints::LOG_IN, Some(body));

        let session: Session = serde_json::from_value(self.send_once(&request).await?)
            .map_err(|error| Error::Decode(error.to_string()))?;

        self.tokens.set(AUTH_TOKEN_KEY, &session.token)?;
        self.tokens.set(REFRESH_TOKEN_KEY, &session.refresh_token)?;
        self.redirected.store(false, Ordering::SeqCst);
        tracing::info!("Logged in as user {}", session.user_id);

        Ok(session)
    }

    /// End the session: tell the backend, forget the tokens and drop every
    /// cached read.
    ///
    /// The backend is told on a best effort basis; the local session is ended
    /// even if that request fails.
    ///
    /// # Errors
    ///
    /// Returns [Error::Storage] if the tokens cannot be removed.
    pub async fn log_out(&self) -> Result<(), Error> {
        let request = ApiRequest::with_body(Method::POST, endpoints::LOG_OUT, None);

        if let Err(error) = self.send_once(&request).await {
            tracing::warn!("Could not end the session on the server: {error}");
        }

        self.tokens.clear_credentials()?;
        self.cache.teardown();
        let _ = self.events.send(CacheEvent::Cleared);
        tracing::info!("Logged out");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use serde_json::{Value, json};

    use crate::{
        Error,
        backend::ApiResponse,
        endpoints,
        test_utils::{ScriptedBackend, coordinator_with},
        tokens::{REFRESH_TOKEN_KEY, TokenStore},
    };

    use super::Credentials;

    fn credentials() -> Credentials {
        Credentials {
            email: "demo@example.com".to_owned(),
            password: "hunter2".to_owned(),
        }
    }

    fn session_backend() -> Arc<ScriptedBackend> {
        Arc::new(ScriptedBackend::new(|_, request| {
            let response = match request.path.as_str() {
                endpoints::LOG_IN => ApiResponse::ok(json!({
                    "token": "new-token",
                    "refreshToken": "new-refresh",
                    "userId": 1
                })),
                endpoints::LOG_OUT => ApiResponse::ok(Value::Null),
                _ => ApiResponse::error(401, "Session expired"),
            };
            (Duration::ZERO, Ok(response))
        }))
    }

    #[tokio::test]
    async fn blank_credentials_are_rejected_locally() {
        let backend = session_backend();
        let (coordinator, _, _) = coordinator_with(backend.clone());

        let got = coordinator
            .log_in(&Credentials {
                email: " ".to_owned(),
                password: String::new(),
            })
            .await;

        match got {
            Err(Error::Validation(errors)) => assert_eq!(errors.errors().len(), 2),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn log_in_persists_tokens() {
        let (coordinator, _, tokens) = coordinator_with(session_backend());

        let session = coordinator.log_in(&credentials()).await.unwrap();

        assert_eq!(session.user_id, 1);
        assert_eq!(tokens.auth_token(), Ok(Some("new-token".to_owned())));
        assert_eq!(
            tokens.get(REFRESH_TOKEN_KEY),
            Ok(Some("new-refresh".to_owned()))
        );
    }

    #[tokio::test]
    async fn log_in_rearms_redirect() {
        let (coordinator, notifier, _) = coordinator_with(session_backend());

        let _ = coordinator.query::<Value, _>("budgets", &()).await;
        let _ = coordinator.query::<Value, _>("accounts", &()).await;
        assert_eq!(notifier.redirect_count(), 1);

        coordinator.log_in(&credentials()).await.unwrap();
        let _ = coordinator.query::<Value, _>("goals", &()).await;

        assert_eq!(notifier.redirect_count(), 2);
    }

    #[tokio::test]
    async fn log_out_clears_tokens_and_cache() {
        let (coordinator, _, tokens) = coordinator_with(session_backend());
        coordinator.log_in(&credentials()).await.unwrap();
        coordinator
            .cache()
            .set(crate::coordinator::QueryKey::new("budgets"), json!([]));

        coordinator.log_out().await.unwrap();

        assert_eq!(tokens.auth_token(), Ok(None));
        assert_eq!(tokens.get(REFRESH_TOKEN_KEY), Ok(None));
        assert!(coordinator.cache().is_empty());
    }
}
