//! Process-wide wiring of repositories, services and the listener queue.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::adapters::sqlite::{
    initialize_database, PoolConfig, SqliteGoalRepository, SqliteSessionRepository,
    SqliteTransactionManager,
};
use crate::domain::models::Config;
use crate::domain::ports::{EventPublisher, GoalRepository, SessionRepository};
use crate::services::{
    EventQueue, GoalProgressService, GoalService, QueueStats, RetryPolicy, SessionService,
    StrategyRegistry, TransactionalExecutor, UpdateGoalProgressAfterSession,
    UpdateGoalProgressAfterSessionBlock,
};

/// Everything a command needs, built once at process start.
pub struct AppContext {
    pub config: Config,
    pub pool: SqlitePool,
    pub goals: GoalService,
    pub sessions: SessionService,
    pub progress: Arc<GoalProgressService>,
    pub queue: Arc<EventQueue>,
}

impl AppContext {
    /// Open (and migrate) the configured database, then wire the services.
    pub async fn build(config: Config) -> Result<Self> {
        let url = config.database.url();
        let pool = initialize_database(&url, Some(PoolConfig::from(&config.database)))
            .await
            .with_context(|| format!("Failed to open database at {}", config.database.path))?;

        Self::from_pool(pool, config).await
    }

    /// Wire the services on top of an already migrated pool.
    ///
    /// Both progress listeners are registered and the queue workers are
    /// running when this returns.
    pub async fn from_pool(pool: SqlitePool, config: Config) -> Result<Self> {
        let goal_repo: Arc<dyn GoalRepository> = Arc::new(SqliteGoalRepository::new(pool.clone()));
        let session_repo: Arc<dyn SessionRepository> =
            Arc::new(SqliteSessionRepository::new(pool.clone()));

        let registry = StrategyRegistry::with_defaults(session_repo.clone());
        let executor = TransactionalExecutor::new(Arc::new(SqliteTransactionManager::new(pool.clone())));

        let progress = Arc::new(GoalProgressService::new(
            goal_repo.clone(),
            session_repo.clone(),
            registry.clone(),
            executor,
            config.progress.clone(),
        ));

        let queue = Arc::new(EventQueue::new(
            config.queue.clone(),
            RetryPolicy::from(&config.retry),
        ));
        queue
            .register(Arc::new(UpdateGoalProgressAfterSession::new(progress.clone())))
            .await;
        queue
            .register(Arc::new(UpdateGoalProgressAfterSessionBlock::new(progress.clone())))
            .await;
        queue.start().await;

        let publisher: Arc<dyn EventPublisher> = queue.clone();
        let sessions = SessionService::new(session_repo, publisher);
        let goals = GoalService::new(goal_repo, registry);

        tracing::debug!(
            workers = config.queue.workers,
            max_retries = config.retry.max_retries,
            "application context ready"
        );

        Ok(Self {
            config,
            pool,
            goals,
            sessions,
            progress,
            queue,
        })
    }

    /// Let pending listener jobs finish for up to `drain`, then stop the
    /// workers and close the pool.
    pub async fn shutdown(&self, drain: Duration) -> QueueStats {
        self.queue.shutdown(drain).await;

        for dead in self.queue.dead_letters().await {
            tracing::warn!(
                event_id = %dead.event_id,
                event_type = dead.event_type,
                listener = %dead.listener,
                attempts = dead.attempts,
                error = %dead.error,
                "listener delivery abandoned"
            );
        }

        let stats = self.queue.stats();
        self.pool.close().await;
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use crate::domain::models::{GoalTarget, GoalType};
    use crate::services::PlannedBlock;
    use chrono::{Duration as ChronoDuration, Utc};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_completed_session_reaches_goal_through_queue() {
        let pool = create_migrated_test_pool().await.unwrap();
        let ctx = AppContext::from_pool(pool, Config::default()).await.unwrap();
        assert!(ctx.queue.is_running());

        let user = Uuid::new_v4();
        let today = Utc::now().date_naive();
        let goal = ctx
            .goals
            .create_goal(
                user,
                "Two sessions".to_string(),
                GoalType::SessionCount,
                GoalTarget::new().with("sessions", 2),
                today - ChronoDuration::days(1),
                None,
            )
            .await
            .unwrap();

        for _ in 0..2 {
            let session = ctx
                .sessions
                .create_session(user, 600, vec![PlannedBlock { block_type: "scales".to_string(), planned_duration_secs: 600 }])
                .await
                .unwrap();
            ctx.sessions.start_session(session.id).await.unwrap();
            ctx.sessions.complete_session(session.id, Some(600)).await.unwrap();
        }

        assert!(ctx.queue.wait_idle(Duration::from_secs(5)).await);

        let stored = ctx.goals.get_goal(goal.id).await.unwrap().unwrap();
        assert_eq!(stored.current_value, 2);
        assert!(stored.completed_at.is_some());
        assert!(!stored.is_active);

        let stats = ctx.shutdown(Duration::from_secs(1)).await;
        assert_eq!(stats.published, 2);
        assert_eq!(stats.dead_lettered, 0);
    }
}
