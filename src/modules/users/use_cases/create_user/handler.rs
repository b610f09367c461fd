use crate::modules::users::adapters::outbound::user_repository::{InsertOutcome, UserRepository};
use crate::modules::users::core::user::User;
use crate::modules::users::use_cases::create_user::command::CreateUser;
use crate::modules::users::use_cases::create_user::decide::decide_create_user;
use crate::modules::users::use_cases::create_user::decision::{CreateUserRejection, Decision};
use crate::shared::application::event_publisher::EventPublisher;
use crate::shared::application::use_case::{UseCase, UseCaseFailure};
use crate::shared::infrastructure::outbox::OutboxStore;
use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::Span;
use uuid::Uuid;

pub struct CreateUserHandler<TDatabase>
where
    TDatabase: UserRepository + OutboxStore + 'static,
{
    database: Arc<TDatabase>,
    publisher: EventPublisher<TDatabase>,
}

impl<TDatabase> CreateUserHandler<TDatabase>
where
    TDatabase: UserRepository + OutboxStore + 'static,
{
    pub fn new(database: Arc<TDatabase>, publisher: EventPublisher<TDatabase>) -> Self {
        Self {
            database,
            publisher,
        }
    }
}

#[async_trait]
impl<TDatabase> UseCase<TDatabase> for CreateUserHandler<TDatabase>
where
    TDatabase: UserRepository + OutboxStore + 'static,
{
    type Request = CreateUser;
    type Response = User;
    type Rejection = CreateUserRejection;

    fn name(&self) -> &'static str {
        "create_user"
    }

    fn context(&self, request: &CreateUser) -> Span {
        tracing::info_span!(
            "create_user",
            email = %request.email,
            first_name = %request.first_name,
            last_name = %request.last_name,
        )
    }

    async fn run(
        &self,
        tx: &mut TDatabase::Tx,
        request: CreateUser,
    ) -> Result<User, UseCaseFailure<CreateUserRejection>> {
        tracing::info!("creating a new user");

        let (user, events) = match decide_create_user(request, Uuid::now_v7(), Utc::now()) {
            Decision::Accepted { user, events } => (user, events),
            Decision::Rejected { reason } => return Err(UseCaseFailure::Rejected(reason)),
        };

        let outcome = self
            .database
            .insert_if_absent(tx, &user)
            .await
            .context("failed to insert user")?;
        if outcome == InsertOutcome::AlreadyExists {
            return Err(UseCaseFailure::Rejected(CreateUserRejection::AlreadyExists));
        }

        self.publisher
            .publish(tx, &events)
            .await
            .context("failed to publish user events")?;

        tracing::info!(user_id = %user.id, "user has been created");
        Ok(user)
    }
}
