//! Strategy registry keyed by goal type.
//!
//! Resolution is a single map lookup followed by the strategy's `supports`
//! check. A second registration for the same goal type is reported as
//! [`DomainError::AmbiguousStrategy`] and ignored, so the first registration
//! always wins.

use std::collections::HashMap;
use std::sync::Arc;

use super::block_count::BlockCountStrategy;
use super::duration::PracticeDurationStrategy;
use super::session_count::SessionCountStrategy;
use super::strategy::GoalProgressStrategy;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Goal, GoalType};
use crate::domain::ports::SessionRepository;

#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: HashMap<GoalType, Arc<dyn GoalProgressStrategy>>,
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("goal_types", &self.registered_types())
            .finish()
    }
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding one strategy per built-in goal type.
    pub fn with_defaults(sessions: Arc<dyn SessionRepository>) -> Self {
        let builtins: [Arc<dyn GoalProgressStrategy>; 3] = [
            Arc::new(PracticeDurationStrategy::new(sessions.clone())),
            Arc::new(SessionCountStrategy::new(sessions.clone())),
            Arc::new(BlockCountStrategy::new(sessions)),
        ];

        let mut registry = Self::new();
        for strategy in builtins {
            let goal_type = strategy.goal_type();
            let registered = registry.register(strategy);
            debug_assert!(registered.is_ok(), "built-in strategy for {goal_type} registered twice");
        }
        registry
    }

    /// Register a strategy under its goal type.
    ///
    /// Returns `AmbiguousStrategy` (after logging a warning) when the type is
    /// already taken; the existing strategy is kept.
    pub fn register(&mut self, strategy: Arc<dyn GoalProgressStrategy>) -> DomainResult<()> {
        let goal_type = strategy.goal_type();
        if self.strategies.contains_key(&goal_type) {
            let err = DomainError::AmbiguousStrategy(goal_type);
            tracing::warn!(goal_type = %goal_type, error = %err, "ignoring duplicate strategy registration");
            return Err(err);
        }
        self.strategies.insert(goal_type, strategy);
        Ok(())
    }

    /// Strategy for `goal`, or `StrategyNotFound` when no registered strategy
    /// can evaluate it.
    pub fn resolve(&self, goal: &Goal) -> DomainResult<Arc<dyn GoalProgressStrategy>> {
        let strategy = self.strategies.get(&goal.goal_type).ok_or_else(|| DomainError::StrategyNotFound {
            goal_id: goal.id,
            goal_type: goal.goal_type,
            reason: "no strategy registered for this goal type".to_string(),
        })?;

        if !strategy.supports(goal) {
            return Err(DomainError::StrategyNotFound {
                goal_id: goal.id,
                goal_type: goal.goal_type,
                reason: format!("target {} is not understood", serde_json::Value::Object(goal.target.as_map().clone())),
            });
        }

        Ok(strategy.clone())
    }

    pub fn registered_types(&self) -> Vec<GoalType> {
        let mut types: Vec<_> = self.strategies.keys().copied().collect();
        types.sort_by_key(|t| t.as_str());
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteSessionRepository};
    use crate::domain::models::GoalTarget;
    use chrono::NaiveDate;
    use uuid::Uuid;

    async fn sessions() -> Arc<dyn SessionRepository> {
        let pool = create_migrated_test_pool().await.unwrap();
        Arc::new(SqliteSessionRepository::new(pool))
    }

    fn goal(goal_type: GoalType, target: GoalTarget) -> Goal {
        Goal::new(Uuid::new_v4(), "goal", goal_type, target, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    }

    #[tokio::test]
    async fn test_defaults_cover_every_goal_type() {
        let registry = StrategyRegistry::with_defaults(sessions().await);
        let mut expected = GoalType::all().to_vec();
        expected.sort_by_key(|t| t.as_str());
        assert_eq!(registry.registered_types(), expected);
    }

    #[tokio::test]
    async fn test_resolve_by_type() {
        let registry = StrategyRegistry::with_defaults(sessions().await);
        let g = goal(GoalType::SessionCount, GoalTarget::new().with("sessions", 4));
        assert_eq!(registry.resolve(&g).unwrap().goal_type(), GoalType::SessionCount);
    }

    #[tokio::test]
    async fn test_unsupported_target_is_strategy_not_found() {
        let registry = StrategyRegistry::with_defaults(sessions().await);
        let g = goal(GoalType::PracticeDuration, GoalTarget::new().with("sessions", 4));
        let err = registry.resolve(&g).err().unwrap();
        assert!(matches!(err, DomainError::StrategyNotFound { .. }));
        assert!(err.is_configuration_defect());
    }

    #[tokio::test]
    async fn test_empty_registry_finds_nothing() {
        let registry = StrategyRegistry::new();
        let g = goal(GoalType::BlockCount, GoalTarget::new().with("blocks", 1));
        assert!(matches!(registry.resolve(&g), Err(DomainError::StrategyNotFound { .. })));
    }

    #[tokio::test]
    async fn test_duplicate_registration_keeps_first() {
        let repo = sessions().await;
        let mut registry = StrategyRegistry::new();
        let first: Arc<dyn GoalProgressStrategy> = Arc::new(SessionCountStrategy::new(repo.clone()));
        registry.register(first.clone()).unwrap();

        let err = registry.register(Arc::new(SessionCountStrategy::new(repo))).unwrap_err();
        assert!(matches!(err, DomainError::AmbiguousStrategy(GoalType::SessionCount)));

        let g = goal(GoalType::SessionCount, GoalTarget::new().with("sessions", 1));
        assert!(Arc::ptr_eq(&registry.resolve(&g).unwrap(), &first));
    }
}
