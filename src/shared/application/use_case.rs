// Use-case execution boundary.
//
// Purpose
// - Make one use case invocation one atomic unit of work: the business write
//   and the outbox append either both commit or both roll back.
//
// Responsibilities
// - Own the transaction: begin, run, commit on success, roll back otherwise.
// - Build the request's log context before any database work and keep it
//   attached to every log line of the invocation.
// - Turn rejections into typed results and every other failure, panics
//   included, into a generic `Unexpected` error.

use crate::shared::infrastructure::database::TransactionManager;
use async_trait::async_trait;
use futures::FutureExt;
use std::error::Error as StdError;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tracing::{Instrument, Span};

pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// What `UseCase::run` may fail with.
#[derive(Debug)]
pub enum UseCaseFailure<TRejection> {
    /// Expected business outcome, returned to the caller as is.
    Rejected(TRejection),
    /// Anything else. Logged and hidden behind a generic message.
    Fault(anyhow::Error),
}

impl<TRejection> From<anyhow::Error> for UseCaseFailure<TRejection> {
    fn from(error: anyhow::Error) -> Self {
        UseCaseFailure::Fault(error)
    }
}

/// What callers of `UseCaseExecutor::execute` see.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UseCaseError<TRejection>
where
    TRejection: StdError + 'static,
{
    #[error(transparent)]
    Rejected(TRejection),

    #[error("{message}")]
    Unexpected { message: String },
}

impl<TRejection> UseCaseError<TRejection>
where
    TRejection: StdError + 'static,
{
    fn unexpected() -> Self {
        UseCaseError::Unexpected {
            message: UNEXPECTED_ERROR_MESSAGE.to_string(),
        }
    }
}

pub type UseCaseResponse<TResponse, TRejection> = Result<TResponse, UseCaseError<TRejection>>;

#[async_trait]
pub trait UseCase<TDatabase>: Send + Sync
where
    TDatabase: TransactionManager,
{
    type Request: Send + 'static;
    type Response: Send + 'static;
    type Rejection: StdError + Send + Sync + 'static;

    fn name(&self) -> &'static str;

    /// Log context for one request. Runs before the transaction opens and
    /// must not touch the database.
    fn context(&self, request: &Self::Request) -> Span;

    async fn run(
        &self,
        tx: &mut TDatabase::Tx,
        request: Self::Request,
    ) -> Result<Self::Response, UseCaseFailure<Self::Rejection>>;
}

pub struct UseCaseExecutor<TDatabase>
where
    TDatabase: TransactionManager + 'static,
{
    database: Arc<TDatabase>,
}

impl<TDatabase> UseCaseExecutor<TDatabase>
where
    TDatabase: TransactionManager + 'static,
{
    pub fn new(database: Arc<TDatabase>) -> Self {
        Self { database }
    }

    pub async fn execute<TUseCase>(
        &self,
        use_case: &TUseCase,
        request: TUseCase::Request,
    ) -> UseCaseResponse<TUseCase::Response, TUseCase::Rejection>
    where
        TUseCase: UseCase<TDatabase>,
    {
        let outer = tracing::info_span!("use_case", use_case = use_case.name());
        let context = outer.in_scope(|| use_case.context(&request));
        self.execute_in_transaction(use_case, request)
            .instrument(context)
            .instrument(outer)
            .await
    }

    async fn execute_in_transaction<TUseCase>(
        &self,
        use_case: &TUseCase,
        request: TUseCase::Request,
    ) -> UseCaseResponse<TUseCase::Response, TUseCase::Rejection>
    where
        TUseCase: UseCase<TDatabase>,
    {
        let mut tx = match self.database.begin().await {
            Ok(tx) => tx,
            Err(error) => {
                tracing::error!(error = %error, "failed to open transaction");
                return Err(UseCaseError::unexpected());
            }
        };

        let outcome = AssertUnwindSafe(use_case.run(&mut tx, request))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(response)) => match self.database.commit(tx).await {
                Ok(()) => Ok(response),
                Err(error) => {
                    tracing::error!(error = %error, "failed to commit transaction");
                    Err(UseCaseError::unexpected())
                }
            },
            Ok(Err(UseCaseFailure::Rejected(rejection))) => {
                self.rollback(tx).await;
                tracing::warn!(reason = %rejection, "use case rejected");
                Err(UseCaseError::Rejected(rejection))
            }
            Ok(Err(UseCaseFailure::Fault(error))) => {
                self.rollback(tx).await;
                tracing::error!(error = %format!("{error:#}"), "use case failed");
                Err(UseCaseError::unexpected())
            }
            Err(panic) => {
                self.rollback(tx).await;
                tracing::error!(panic = panic_message(panic.as_ref()), "use case panicked");
                Err(UseCaseError::unexpected())
            }
        }
    }

    async fn rollback(&self, tx: TDatabase::Tx) {
        if let Err(error) = self.database.rollback(tx).await {
            tracing::error!(error = %error, "failed to roll back transaction");
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
