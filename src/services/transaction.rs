//! Run goal writes inside a transaction and turn failures into values.
//!
//! [`TransactionalExecutor::execute_in_transaction`] never returns an error:
//! whatever happens, the caller gets a [`TransactionOutcome`] and the
//! transaction handle has been either committed or rolled back.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;

use crate::domain::errors::{error_chain, DomainResult};
use crate::domain::ports::{GoalTransaction, TransactionManager};

/// Result of a transactional operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionOutcome<T> {
    pub success: bool,
    pub result: Option<T>,
    pub message: String,
}

impl<T> TransactionOutcome<T> {
    fn committed(result: T) -> Self {
        Self {
            success: true,
            result: Some(result),
            message: "committed".to_string(),
        }
    }

    fn failed(message: String) -> Self {
        Self {
            success: false,
            result: None,
            message,
        }
    }

    pub fn into_result(self) -> Option<T> {
        self.result
    }
}

#[derive(Clone)]
pub struct TransactionalExecutor {
    manager: Arc<dyn TransactionManager>,
}

impl TransactionalExecutor {
    pub fn new(manager: Arc<dyn TransactionManager>) -> Self {
        Self { manager }
    }

    /// Begin a transaction, run `operation` on it and commit.
    ///
    /// If the operation fails the handle is rolled back. A failing rollback is
    /// logged on its own and does not replace the original error.
    pub async fn execute_in_transaction<T, F>(
        &self,
        operation: F,
        error_context: &str,
        log_context: serde_json::Value,
    ) -> TransactionOutcome<T>
    where
        T: Send,
        F: for<'t> FnOnce(&'t mut (dyn GoalTransaction + 'static)) -> BoxFuture<'t, DomainResult<T>> + Send,
    {
        let mut tx = match self.manager.begin().await {
            Ok(tx) => tx,
            Err(err) => {
                tracing::error!(
                    context = %log_context,
                    error = %error_chain(&err),
                    "{error_context}: could not begin transaction"
                );
                return TransactionOutcome::failed(format!("{error_context}: {err}"));
            }
        };

        let outcome = operation(tx.as_mut()).await;

        match outcome {
            Ok(value) => match tx.commit().await {
                Ok(()) => TransactionOutcome::committed(value),
                Err(err) => {
                    tracing::error!(
                        context = %log_context,
                        error = %error_chain(&err),
                        "{error_context}: commit failed"
                    );
                    TransactionOutcome::failed(format!("{error_context}: {err}"))
                }
            },
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(
                        context = %log_context,
                        error = %error_chain(&rollback_err),
                        original_error = %err,
                        "{error_context}: rollback failed"
                    );
                }
                tracing::error!(
                    context = %log_context,
                    error = %error_chain(&err),
                    "{error_context}"
                );
                TransactionOutcome::failed(format!("{error_context}: {err}"))
            }
        }
    }
}
