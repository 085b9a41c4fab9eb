//! Log in and log out.

use axum::{Extension, Json, extract::State, response::IntoResponse};

use crate::{
    coordinator::{Credentials, Session},
    mock_server::{MockState, ServerError, SessionToken, store::hash_hex, success},
};

/// Exchange an email and password for a bearer token and refresh token.
pub async fn log_in(
    State(state): State<MockState>,
    Json(credentials): Json<Credentials>,
) -> Result<impl IntoResponse, ServerError> {
    credentials.validate()?;

    let mut store = state.store();
    let user_id = match store.user_by_email(&credentials.email) {
        Some(user) if user.password_hash == hash_hex(&credentials.password) => user.id,
        _ => {
            tracing::debug!("Rejected log in for {}", credentials.email);
            return Err(ServerError::InvalidCredentials);
        }
    };

    let token = store.issue_token(user_id, "auth");
    let refresh_token = store.issue_token(user_id, "refresh");
    store.sessions.insert(token.clone(), user_id);

    Ok(success(Session {
        token,
        refresh_token,
        user_id,
    }))
}

/// End the session of the token the request was made with.
pub async fn log_out(
    State(state): State<MockState>,
    Extension(SessionToken(token)): Extension<SessionToken>,
) -> impl IntoResponse {
    state.store().sessions.remove(&token);

    success(())
}
