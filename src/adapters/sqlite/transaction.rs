//! SQLite transaction handles for goal writes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use super::format_timestamp;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::{GoalTransaction, TransactionManager};

#[derive(Clone)]
pub struct SqliteTransactionManager {
    pool: SqlitePool,
}

impl SqliteTransactionManager {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionManager for SqliteTransactionManager {
    async fn begin(&self) -> DomainResult<Box<dyn GoalTransaction>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::TransactionFailed(format!("begin: {e}")))?;
        Ok(Box::new(SqliteGoalTransaction { tx }))
    }
}

/// One open SQLite transaction. Dropping it without commit rolls back.
pub struct SqliteGoalTransaction {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl GoalTransaction for SqliteGoalTransaction {
    async fn write_progress(&mut self, id: Uuid, expected_version: i64, current_value: i64) -> DomainResult<bool> {
        let result = sqlx::query(
            "UPDATE goals SET current_value = ?, version = version + 1, updated_at = ? WHERE id = ? AND version = ?",
        )
        .bind(current_value)
        .bind(format_timestamp(&Utc::now()))
        .bind(id.to_string())
        .bind(expected_version)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_completed(
        &mut self,
        id: Uuid,
        expected_version: i64,
        completed_at: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let result = sqlx::query(
            r#"UPDATE goals SET completed_at = ?, is_active = 0, version = version + 1, updated_at = ?
               WHERE id = ? AND version = ? AND completed_at IS NULL"#,
        )
        .bind(format_timestamp(&completed_at))
        .bind(format_timestamp(&Utc::now()))
        .bind(id.to_string())
        .bind(expected_version)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> DomainResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| DomainError::TransactionFailed(format!("commit: {e}")))
    }

    async fn rollback(self: Box<Self>) -> DomainResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| DomainError::TransactionFailed(format!("rollback: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteGoalRepository};
    use crate::domain::models::{Goal, GoalTarget, GoalType};
    use crate::domain::ports::GoalRepository;
    use chrono::NaiveDate;

    async fn setup() -> (SqliteTransactionManager, SqliteGoalRepository, Goal) {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = SqliteGoalRepository::new(pool.clone());
        let goal = Goal::new(
            Uuid::new_v4(),
            "Ten sessions",
            GoalType::SessionCount,
            GoalTarget::new().with("sessions", 10),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );
        repo.create(&goal).await.unwrap();
        (SqliteTransactionManager::new(pool), repo, goal)
    }

    #[tokio::test]
    async fn test_committed_write_is_visible() {
        let (manager, repo, goal) = setup().await;

        let mut tx = manager.begin().await.unwrap();
        assert!(tx.write_progress(goal.id, goal.version, 4).await.unwrap());
        tx.commit().await.unwrap();

        let stored = repo.get(goal.id).await.unwrap().unwrap();
        assert_eq!(stored.current_value, 4);
        assert_eq!(stored.version, goal.version + 1);
    }

    #[tokio::test]
    async fn test_rolled_back_write_is_discarded() {
        let (manager, repo, goal) = setup().await;

        let mut tx = manager.begin().await.unwrap();
        assert!(tx.write_progress(goal.id, goal.version, 7).await.unwrap());
        tx.rollback().await.unwrap();

        let stored = repo.get(goal.id).await.unwrap().unwrap();
        assert_eq!(stored.current_value, 0);
        assert_eq!(stored.version, goal.version);
    }

    #[tokio::test]
    async fn test_stale_version_writes_nothing() {
        let (manager, _repo, goal) = setup().await;

        let mut tx = manager.begin().await.unwrap();
        assert!(!tx.write_progress(goal.id, goal.version + 5, 3).await.unwrap());
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_mark_completed_only_once() {
        let (manager, repo, goal) = setup().await;

        let mut tx = manager.begin().await.unwrap();
        assert!(tx.mark_completed(goal.id, goal.version, Utc::now()).await.unwrap());
        assert!(!tx.mark_completed(goal.id, goal.version + 1, Utc::now()).await.unwrap());
        tx.commit().await.unwrap();

        let stored = repo.get(goal.id).await.unwrap().unwrap();
        assert!(stored.is_completed());
        assert!(!stored.is_active);
    }
}
