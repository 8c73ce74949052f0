//! Completed-session count goals.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::strategy::{GoalProgressStrategy, TargetKeys};
use crate::domain::errors::DomainResult;
use crate::domain::models::{Goal, GoalType, ProgressWindow};
use crate::domain::ports::SessionRepository;

const KEYS: TargetKeys = TargetKeys {
    absolute: "sessions",
    weekly: "sessions_per_week",
    unit: 1,
};

pub struct SessionCountStrategy {
    sessions: Arc<dyn SessionRepository>,
}

impl SessionCountStrategy {
    pub fn new(sessions: Arc<dyn SessionRepository>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl GoalProgressStrategy for SessionCountStrategy {
    fn goal_type(&self) -> GoalType {
        GoalType::SessionCount
    }

    fn supports(&self, goal: &Goal) -> bool {
        goal.goal_type == GoalType::SessionCount && KEYS.present_in(goal)
    }

    async fn calculate_current_value(
        &self,
        user_id: Uuid,
        _goal: &Goal,
        window: &ProgressWindow,
    ) -> DomainResult<i64> {
        self.sessions.count_completed_sessions(user_id, window).await
    }

    fn calculate_total_value(&self, goal: &Goal, window: &ProgressWindow) -> DomainResult<i64> {
        KEYS.total(goal, window)
    }
}
