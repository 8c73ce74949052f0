//! Per-goal-type progress computation.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Goal, GoalType, ProgressWindow};

/// Computes the current and target value of goals of one type.
///
/// `calculate_current_value` must be a pure function of stored session data:
/// it reads, never writes, so calling it twice over the same data yields the
/// same number.
#[async_trait]
pub trait GoalProgressStrategy: Send + Sync {
    /// Goal type this strategy is registered under.
    fn goal_type(&self) -> GoalType;

    /// Whether this strategy can evaluate `goal`: the type matches and the
    /// target carries a positive parameter the strategy understands.
    fn supports(&self, goal: &Goal) -> bool;

    /// Aggregate the user's measure over `window`.
    async fn calculate_current_value(
        &self,
        user_id: Uuid,
        goal: &Goal,
        window: &ProgressWindow,
    ) -> DomainResult<i64>;

    /// Target value over `window`, weekly targets scaled by the weeks covered.
    fn calculate_total_value(&self, goal: &Goal, window: &ProgressWindow) -> DomainResult<i64>;
}

/// Target parameters understood by a strategy.
///
/// `absolute` is a total for the whole window; `weekly` is multiplied by
/// [`ProgressWindow::weeks`]. Both are multiplied by `unit` to convert into the
/// unit the current value is measured in.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TargetKeys {
    pub absolute: &'static str,
    pub weekly: &'static str,
    pub unit: i64,
}

impl TargetKeys {
    pub fn present_in(&self, goal: &Goal) -> bool {
        goal.target.positive(self.absolute).is_some() || goal.target.positive(self.weekly).is_some()
    }

    pub fn total(&self, goal: &Goal, window: &ProgressWindow) -> DomainResult<i64> {
        if let Some(value) = goal.target.positive(self.absolute) {
            return Ok(value.saturating_mul(self.unit));
        }
        if let Some(per_week) = goal.target.positive(self.weekly) {
            return Ok(per_week.saturating_mul(window.weeks()).saturating_mul(self.unit));
        }
        Err(DomainError::StrategyNotFound {
            goal_id: goal.id,
            goal_type: goal.goal_type,
            reason: format!("target needs a positive '{}' or '{}'", self.absolute, self.weekly),
        })
    }
}
