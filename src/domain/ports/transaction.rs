//! Transaction ports.
//!
//! A transaction is an explicit handle returned by [`TransactionManager::begin`].
//! `commit` and `rollback` consume the handle, so no ambient "is a transaction
//! open" state exists anywhere.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::errors::DomainResult;

/// Goal writes performed inside one database transaction.
///
/// Writes are guarded by the goal's version: they return `Ok(false)` when the
/// stored version no longer matches `expected_version`.
#[async_trait]
pub trait GoalTransaction: Send {
    /// Store a recomputed progress value.
    async fn write_progress(&mut self, id: Uuid, expected_version: i64, current_value: i64) -> DomainResult<bool>;

    /// Mark a goal completed and inactive. Already-completed goals are left
    /// untouched and reported as `Ok(false)`.
    async fn mark_completed(
        &mut self,
        id: Uuid,
        expected_version: i64,
        completed_at: DateTime<Utc>,
    ) -> DomainResult<bool>;

    /// Commit and release the handle.
    async fn commit(self: Box<Self>) -> DomainResult<()>;

    /// Roll back and release the handle.
    async fn rollback(self: Box<Self>) -> DomainResult<()>;
}

/// Source of transaction handles.
#[async_trait]
pub trait TransactionManager: Send + Sync {
    async fn begin(&self) -> DomainResult<Box<dyn GoalTransaction>>;
}
