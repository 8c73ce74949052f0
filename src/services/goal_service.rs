//! Goal service: creation and lookup of goals.

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use super::goal_progress::StrategyRegistry;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Goal, GoalTarget, GoalType};
use crate::domain::ports::{GoalFilter, GoalRepository};

pub struct GoalService {
    repository: Arc<dyn GoalRepository>,
    registry: StrategyRegistry,
}

impl GoalService {
    pub fn new(repository: Arc<dyn GoalRepository>, registry: StrategyRegistry) -> Self {
        Self { repository, registry }
    }

    /// Create a new goal.
    ///
    /// The target must be understood by the strategy registered for
    /// `goal_type`, otherwise the goal could never make progress.
    pub async fn create_goal(
        &self,
        user_id: Uuid,
        name: String,
        goal_type: GoalType,
        target: GoalTarget,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
    ) -> DomainResult<Goal> {
        let mut goal = Goal::new(user_id, name, goal_type, target, start_date);
        if let Some(end) = end_date {
            goal = goal.with_end_date(end);
        }

        goal.validate().map_err(DomainError::ValidationFailed)?;
        self.registry.resolve(&goal).map_err(|e| match e {
            DomainError::StrategyNotFound { reason, .. } => {
                DomainError::ValidationFailed(format!("{goal_type} goal rejected: {reason}"))
            }
            other => other,
        })?;

        self.repository.create(&goal).await?;
        tracing::info!(goal_id = %goal.id, %user_id, goal_type = %goal_type, "goal created");
        Ok(goal)
    }

    /// Get a goal by ID.
    pub async fn get_goal(&self, id: Uuid) -> DomainResult<Option<Goal>> {
        self.repository.get(id).await
    }

    /// List goals with optional filters.
    pub async fn list_goals(&self, filter: GoalFilter) -> DomainResult<Vec<Goal>> {
        self.repository.list(filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteGoalRepository, SqliteSessionRepository};

    async fn setup_service() -> GoalService {
        let pool = create_migrated_test_pool().await.unwrap();
        let registry = StrategyRegistry::with_defaults(Arc::new(SqliteSessionRepository::new(pool.clone())));
        GoalService::new(Arc::new(SqliteGoalRepository::new(pool)), registry)
    }

    fn jan(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[tokio::test]
    async fn test_create_goal() {
        let service = setup_service().await;
        let user = Uuid::new_v4();
        let goal = service
            .create_goal(
                user,
                "Daily scales".to_string(),
                GoalType::BlockCount,
                GoalTarget::new().with("blocks_per_week", 7).with_text("block_type", "scales"),
                jan(1),
                Some(jan(31)),
            )
            .await
            .unwrap();

        let stored = service.get_goal(goal.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Daily scales");
        assert_eq!(stored.end_date, Some(jan(31)));

        let listed = service
            .list_goals(GoalFilter { user_id: Some(user), ..GoalFilter::default() })
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_unusable_target() {
        let service = setup_service().await;
        let err = service
            .create_goal(
                Uuid::new_v4(),
                "Minutes".to_string(),
                GoalType::PracticeDuration,
                GoalTarget::new().with("sessions", 3),
                jan(1),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ValidationFailed(ref msg) if msg.starts_with("practice_duration goal rejected")));
    }

    #[tokio::test]
    async fn test_create_rejects_inverted_dates() {
        let service = setup_service().await;
        let err = service
            .create_goal(
                Uuid::new_v4(),
                "Backwards".to_string(),
                GoalType::SessionCount,
                GoalTarget::new().with("sessions", 3),
                jan(10),
                Some(jan(1)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ValidationFailed(_)));
    }
}
