//! Completed-block count goals, optionally restricted to one block type.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::strategy::{GoalProgressStrategy, TargetKeys};
use crate::domain::errors::DomainResult;
use crate::domain::models::{Goal, GoalType, ProgressWindow};
use crate::domain::ports::SessionRepository;

const KEYS: TargetKeys = TargetKeys {
    absolute: "blocks",
    weekly: "blocks_per_week",
    unit: 1,
};

/// Optional target key naming the block type to count.
pub const BLOCK_TYPE_KEY: &str = "block_type";

pub struct BlockCountStrategy {
    sessions: Arc<dyn SessionRepository>,
}

impl BlockCountStrategy {
    pub fn new(sessions: Arc<dyn SessionRepository>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl GoalProgressStrategy for BlockCountStrategy {
    fn goal_type(&self) -> GoalType {
        GoalType::BlockCount
    }

    fn supports(&self, goal: &Goal) -> bool {
        goal.goal_type == GoalType::BlockCount && KEYS.present_in(goal)
    }

    async fn calculate_current_value(
        &self,
        user_id: Uuid,
        goal: &Goal,
        window: &ProgressWindow,
    ) -> DomainResult<i64> {
        let block_type = goal.target.get_str(BLOCK_TYPE_KEY);
        self.sessions.count_completed_blocks(user_id, window, block_type).await
    }

    fn calculate_total_value(&self, goal: &Goal, window: &ProgressWindow) -> DomainResult<i64> {
        KEYS.total(goal, window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteSessionRepository};
    use crate::domain::models::{BlockStatus, GoalTarget, Session, SessionBlock};
    use chrono::{NaiveDate, TimeZone, Utc};

    #[tokio::test]
    async fn test_counts_blocks_of_target_type() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = Arc::new(SqliteSessionRepository::new(pool));
        let strategy = BlockCountStrategy::new(repo.clone());

        let user = Uuid::new_v4();
        let at = Utc.with_ymd_and_hms(2024, 1, 4, 19, 0, 0).unwrap();
        let mut session = Session::new(user, 1200);
        for (i, kind) in ["scales", "scales", "etude"].iter().enumerate() {
            let mut block = SessionBlock::new(session.id, *kind, 400, i as i32);
            block.status = BlockStatus::Completed;
            block.actual_duration_secs = Some(400);
            block.completed_at = Some(at);
            session.blocks.push(block);
        }
        repo.create(&session).await.unwrap();

        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let window = ProgressWindow::for_dates(start, NaiveDate::from_ymd_opt(2024, 1, 7).unwrap()).unwrap();

        let scales = Goal::new(
            user,
            "Scales",
            GoalType::BlockCount,
            GoalTarget::new().with("blocks", 10).with_text(BLOCK_TYPE_KEY, "scales"),
            start,
        );
        let any = Goal::new(user, "Any block", GoalType::BlockCount, GoalTarget::new().with("blocks", 10), start);

        assert_eq!(strategy.calculate_current_value(user, &scales, &window).await.unwrap(), 2);
        assert_eq!(strategy.calculate_current_value(user, &any, &window).await.unwrap(), 3);
        assert!(!strategy.supports(&Goal::new(user, "Bad", GoalType::BlockCount, GoalTarget::new().with_text(BLOCK_TYPE_KEY, "scales"), start)));
    }
}
