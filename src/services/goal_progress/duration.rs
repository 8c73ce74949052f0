//! Total practice time goals.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::strategy::{GoalProgressStrategy, TargetKeys};
use crate::domain::errors::DomainResult;
use crate::domain::models::{Goal, GoalType, ProgressWindow};
use crate::domain::ports::SessionRepository;

/// Targets are given in minutes, progress is counted in seconds.
const KEYS: TargetKeys = TargetKeys {
    absolute: "minutes",
    weekly: "minutes_per_week",
    unit: 60,
};

/// Sums `actual_duration_secs` of the user's completed sessions.
pub struct PracticeDurationStrategy {
    sessions: Arc<dyn SessionRepository>,
}

impl PracticeDurationStrategy {
    pub fn new(sessions: Arc<dyn SessionRepository>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl GoalProgressStrategy for PracticeDurationStrategy {
    fn goal_type(&self) -> GoalType {
        GoalType::PracticeDuration
    }

    fn supports(&self, goal: &Goal) -> bool {
        goal.goal_type == GoalType::PracticeDuration && KEYS.present_in(goal)
    }

    async fn calculate_current_value(
        &self,
        user_id: Uuid,
        _goal: &Goal,
        window: &ProgressWindow,
    ) -> DomainResult<i64> {
        self.sessions.sum_completed_duration(user_id, window).await
    }

    fn calculate_total_value(&self, goal: &Goal, window: &ProgressWindow) -> DomainResult<i64> {
        KEYS.total(goal, window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteSessionRepository};
    use crate::domain::models::{GoalTarget, Session};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn goal(target: GoalTarget) -> Goal {
        Goal::new(
            Uuid::new_v4(),
            "Practice",
            GoalType::PracticeDuration,
            target,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
    }

    async fn strategy() -> (PracticeDurationStrategy, Arc<SqliteSessionRepository>) {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = Arc::new(SqliteSessionRepository::new(pool));
        (PracticeDurationStrategy::new(repo.clone()), repo)
    }

    #[tokio::test]
    async fn test_supports_requires_positive_minutes() {
        let (strategy, _) = strategy().await;
        assert!(strategy.supports(&goal(GoalTarget::new().with("minutes", 300))));
        assert!(strategy.supports(&goal(GoalTarget::new().with("minutes_per_week", 90))));
        assert!(!strategy.supports(&goal(GoalTarget::new().with("minutes", 0))));
        assert!(!strategy.supports(&goal(GoalTarget::new().with("sessions", 5))));

        let mut wrong_type = goal(GoalTarget::new().with("minutes", 300));
        wrong_type.goal_type = GoalType::SessionCount;
        assert!(!strategy.supports(&wrong_type));
    }

    #[tokio::test]
    async fn test_total_value_in_seconds() {
        let (strategy, _) = strategy().await;
        let window = ProgressWindow::for_dates(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 14).unwrap(),
        )
        .unwrap();

        let fixed = goal(GoalTarget::new().with("minutes", 300));
        assert_eq!(strategy.calculate_total_value(&fixed, &window).unwrap(), 18_000);

        let weekly = goal(GoalTarget::new().with("minutes_per_week", 60));
        assert_eq!(strategy.calculate_total_value(&weekly, &window).unwrap(), 7_200);
    }

    #[tokio::test]
    async fn test_current_value_sums_durations() {
        let (strategy, repo) = strategy().await;
        let g = goal(GoalTarget::new().with("minutes", 300));
        let at = Utc.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap();
        repo.create(&Session::completed(g.user_id, 600, at)).await.unwrap();
        repo.create(&Session::completed(g.user_id, 900, at)).await.unwrap();

        let window = ProgressWindow::for_dates(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .unwrap();
        assert_eq!(strategy.calculate_current_value(g.user_id, &g, &window).await.unwrap(), 1_500);
    }
}
