//! Handlers for `/goals`.

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use time::OffsetDateTime;

use crate::{
    budget::UserId,
    goal::{Contribution, GoalId, GoalUpdate, NewGoal},
    mock_server::{MockState, ServerError, success},
};

const GOAL: &str = "Goal";

pub async fn list_goals(
    State(state): State<MockState>,
    Extension(user_id): Extension<UserId>,
) -> impl IntoResponse {
    success(state.store().goals(user_id))
}

pub async fn create_goal(
    State(state): State<MockState>,
    Extension(user_id): Extension<UserId>,
    Json(goal): Json<NewGoal>,
) -> Result<impl IntoResponse, ServerError> {
    goal.validate()?;

    Ok(success(
        state
            .store()
            .insert_goal(user_id, &goal, OffsetDateTime::now_utc()),
    ))
}

pub async fn get_goal(
    State(state): State<MockState>,
    Extension(user_id): Extension<UserId>,
    Path(goal_id): Path<GoalId>,
) -> Result<impl IntoResponse, ServerError> {
    state
        .store()
        .goal(user_id, goal_id)
        .cloned()
        .map(success)
        .ok_or(ServerError::NotFound(GOAL))
}

pub async fn update_goal(
    State(state): State<MockState>,
    Extension(user_id): Extension<UserId>,
    Path(goal_id): Path<GoalId>,
    Json(update): Json<GoalUpdate>,
) -> Result<impl IntoResponse, ServerError> {
    update.validate()?;

    let mut store = state.store();
    let goal = store.goal_mut(user_id, goal_id).ok_or(ServerError::NotFound(GOAL))?;
    update.apply(goal);
    goal.updated_at = OffsetDateTime::now_utc();

    Ok(success(goal.clone()))
}

pub async fn delete_goal(
    State(state): State<MockState>,
    Extension(user_id): Extension<UserId>,
    Path(goal_id): Path<GoalId>,
) -> Result<impl IntoResponse, ServerError> {
    if !state.store().remove_goal(user_id, goal_id) {
        return Err(ServerError::NotFound(GOAL));
    }

    Ok(success(()))
}

/// Add money to a goal. Contributions may take a goal past its target.
pub async fn contribute_to_goal(
    State(state): State<MockState>,
    Extension(user_id): Extension<UserId>,
    Path(goal_id): Path<GoalId>,
    Json(contribution): Json<Contribution>,
) -> Result<impl IntoResponse, ServerError> {
    contribution.validate()?;

    let mut store = state.store();
    let goal = store.goal_mut(user_id, goal_id).ok_or(ServerError::NotFound(GOAL))?;
    goal.current_amount += contribution.amount;
    goal.updated_at = OffsetDateTime::now_utc();

    Ok(success(goal.clone()))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::json;

    use crate::{
        endpoints::{self, format_endpoint},
        goal::Goal,
        test_utils::{
            OTHER_EMAIL, OTHER_PASSWORD, assert_failure, envelope_data, log_in_as, log_in_token,
            test_server, two_user_test_server,
        },
    };

    async fn create_goal(server: &TestServer, token: &str) -> Goal {
        let response = server
            .post(endpoints::GOALS)
            .authorization_bearer(token)
            .json(&json!({ "name": "Car", "targetAmount": 1000.0, "targetDate": "2026-01-31" }))
            .await;
        response.assert_status_ok();

        envelope_data(&response)
    }

    #[tokio::test]
    async fn contributions_accumulate() {
        let server = test_server();
        let token = log_in_token(&server).await;
        let goal = create_goal(&server, &token).await;
        let path = format_endpoint(endpoints::GOAL_CONTRIBUTE, goal.id);

        for amount in [250.0, 500.0, 400.0] {
            server
                .post(&path)
                .authorization_bearer(&token)
                .json(&json!({ "amount": amount }))
                .await
                .assert_status_ok();
        }

        let goal: Goal = envelope_data(
            &server
                .get(&format_endpoint(endpoints::GOAL, goal.id))
                .authorization_bearer(&token)
                .await,
        );
        assert_eq!(goal.current_amount, 1150.0);
        assert!(goal.is_complete());
        assert_eq!(goal.progress_percent(), 100.0);
    }

    #[tokio::test]
    async fn contribution_must_be_positive() {
        let server = test_server();
        let token = log_in_token(&server).await;
        let goal = create_goal(&server, &token).await;

        let response = server
            .post(&format_endpoint(endpoints::GOAL_CONTRIBUTE, goal.id))
            .authorization_bearer(&token)
            .json(&json!({ "amount": -5.0 }))
            .await;

        assert_failure(
            &response,
            StatusCode::UNPROCESSABLE_ENTITY,
            "amount: Must be greater than zero",
        );
    }

    #[tokio::test]
    async fn update_keeps_absent_fields() {
        let server = test_server();
        let token = log_in_token(&server).await;
        let goal = create_goal(&server, &token).await;

        let response = server
            .put(&format_endpoint(endpoints::GOAL, goal.id))
            .authorization_bearer(&token)
            .json(&json!({ "targetAmount": 1500.0 }))
            .await;
        let updated: Goal = envelope_data(&response);

        assert_eq!(updated.target_amount, 1500.0);
        assert_eq!(updated.name, "Car");
        assert_eq!(updated.target_date, goal.target_date);
    }

    #[tokio::test]
    async fn delete_removes_goal_from_list() {
        let server = test_server();
        let token = log_in_token(&server).await;
        let goal = create_goal(&server, &token).await;

        server
            .delete(&format_endpoint(endpoints::GOAL, goal.id))
            .authorization_bearer(&token)
            .await
            .assert_status_ok();

        let goals: Vec<Goal> = envelope_data(
            &server
                .get(endpoints::GOALS)
                .authorization_bearer(&token)
                .await,
        );
        assert!(goals.is_empty());
    }

    #[tokio::test]
    async fn goals_are_private_to_their_owner() {
        let server = two_user_test_server();
        let owner = log_in_token(&server).await;
        let other = log_in_as(&server, OTHER_EMAIL, OTHER_PASSWORD).await;
        let goal = create_goal(&server, &owner).await;

        let goals: Vec<Goal> = envelope_data(
            &server
                .get(endpoints::GOALS)
                .authorization_bearer(&other)
                .await,
        );
        assert!(goals.is_empty());

        let response = server
            .post(&format_endpoint(endpoints::GOAL_CONTRIBUTE, goal.id))
            .authorization_bearer(&other)
            .json(&json!({ "amount": 10.0 }))
            .await;
        assert_failure(&response, StatusCode::NOT_FOUND, "Goal not found");
    }
}
