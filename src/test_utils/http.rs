use axum::http::StatusCode;
use axum_test::{TestResponse, TestServer};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use time::macros::date;

use crate::{
    coordinator::Session,
    endpoints,
    mock_server::{DEMO_EMAIL, DEMO_PASSWORD, MemoryStore, MockState, build_router},
};

/// A server for the mock router with only the demo user and today pinned to
/// 2025-04-16.
pub(crate) fn test_server() -> TestServer {
    let state = MockState::new(MemoryStore::new()).with_today(date!(2025 - 04 - 16));

    TestServer::try_new(build_router(state)).expect("Could not create test server.")
}

pub(crate) const OTHER_EMAIL: &str = "other@example.com";
pub(crate) const OTHER_PASSWORD: &str = "hunter2hunter2";

/// Like [test_server], with a second user who logs in with [OTHER_EMAIL].
pub(crate) fn two_user_test_server() -> TestServer {
    let mut store = MemoryStore::new();
    store.add_user(OTHER_EMAIL, OTHER_PASSWORD);
    let state = MockState::new(store).with_today(date!(2025 - 04 - 16));

    TestServer::try_new(build_router(state)).expect("Could not create test server.")
}

/// Log in as the demo user and return the bearer token.
pub(crate) async fn log_in_token(server: &TestServer) -> String {
    log_in_as(server, DEMO_EMAIL, DEMO_PASSWORD).await
}

/// Log in with `email` and `password` and return the bearer token.
pub(crate) async fn log_in_as(server: &TestServer, email: &str, password: &str) -> String {
    let response = server
        .post(endpoints::LOG_IN)
        .json(&json!({ "email": email, "password": password }))
        .await;
    response.assert_status_ok();

    envelope_data::<Session>(&response).token
}

/// The `data` field of a successful envelope.
#[track_caller]
pub(crate) fn envelope_data<T: DeserializeOwned>(response: &TestResponse) -> T {
    let body = response.json::<Value>();
    assert_eq!(
        body["success"],
        Value::Bool(true),
        "expected a successful envelope, got {body}"
    );

    serde_json::from_value(body["data"].clone()).expect("Could not parse envelope data")
}

/// Assert the response has `status` and a failed envelope with `message`.
#[track_caller]
pub(crate) fn assert_failure(response: &TestResponse, status: StatusCode, message: &str) {
    response.assert_status(status);

    let body = response.json::<Value>();
    assert_eq!(body["success"], Value::Bool(false));
    assert_eq!(body["message"], Value::String(message.to_owned()));
}
