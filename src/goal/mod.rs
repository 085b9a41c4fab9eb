//! Savings goals and the reads and writes for every `/goals` resource.

mod core;

pub use core::{Contribution, Goal, GoalId, GoalUpdate, MAX_GOAL_NAME_LENGTH, NewGoal};

use axum::http::Method;

use crate::{
    Error,
    backend::{ApiRequest, to_body},
    coordinator::{Coordinator, Mutation, MutationKind},
    endpoints::{self, entity_key, format_endpoint},
};

impl Coordinator {
    /// # Errors
    ///
    /// See [Coordinator::query].
    pub async fn goals(&self) -> Result<Vec<Goal>, Error> {
        self.query(&entity_key(endpoints::GOALS, None), &()).await
    }

    /// # Errors
    ///
    /// Returns [Error::NotFound] if there is no goal with `id`.
    pub async fn goal(&self, id: GoalId) -> Result<Goal, Error> {
        self.query(&entity_key(endpoints::GOAL, Some(id)), &())
            .await
    }

    /// # Errors
    ///
    /// Returns [Error::Validation] without contacting the backend if `goal`
    /// fails its checks, otherwise see [Coordinator::mutate].
    pub async fn create_goal(&self, goal: &NewGoal) -> Result<Goal, Error> {
        goal.validate()?;

        self.mutate(Mutation::new(
            MutationKind::CreateGoal,
            ApiRequest::with_body(Method::POST, endpoints::GOALS, Some(to_body(goal)?)),
        ))
        .await
    }

    /// # Errors
    ///
    /// Returns [Error::Validation] without contacting the backend if `update`
    /// fails its checks, otherwise see [Coordinator::mutate].
    pub async fn update_goal(&self, id: GoalId, update: &GoalUpdate) -> Result<Goal, Error> {
        update.validate()?;

        self.mutate(Mutation::new(
            MutationKind::UpdateGoal,
            ApiRequest::with_body(
                Method::PUT,
                format_endpoint(endpoints::GOAL, id),
                Some(to_body(update)?),
            ),
        ))
        .await
    }

    /// # Errors
    ///
    /// See [Coordinator::mutate].
    pub async fn delete_goal(&self, id: GoalId) -> Result<(), Error> {
        self.mutate(Mutation::new(
            MutationKind::DeleteGoal,
            ApiRequest::with_body(Method::DELETE, format_endpoint(endpoints::GOAL, id), None),
        ))
        .await
    }

    /// Add `amount` to the goal with `id`.
    ///
    /// # Errors
    ///
    /// Returns [Error::Validation] without contacting the backend unless
    /// `amount` is greater than zero, otherwise see [Coordinator::mutate].
    pub async fn contribute_to_goal(&self, id: GoalId, amount: f64) -> Result<Goal, Error> {
        let contribution = Contribution { amount };
        contribution.validate()?;

        self.mutate(Mutation::new(
            MutationKind::ContributeToGoal,
            ApiRequest::with_body(
                Method::POST,
                format_endpoint(endpoints::GOAL_CONTRIBUTE, id),
                Some(to_body(&contribution)?),
            ),
        ))
        .await
    }
}
