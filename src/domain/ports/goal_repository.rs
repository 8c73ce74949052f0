//! Goal repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Goal, GoalType};

/// Filter criteria for listing goals.
#[derive(Debug, Clone, Default)]
pub struct GoalFilter {
    pub user_id: Option<Uuid>,
    pub is_active: Option<bool>,
    pub goal_type: Option<GoalType>,
}

/// Repository interface for Goal persistence.
#[async_trait]
pub trait GoalRepository: Send + Sync {
    /// Create a new goal.
    async fn create(&self, goal: &Goal) -> DomainResult<()>;

    /// Get a goal by ID.
    async fn get(&self, id: Uuid) -> DomainResult<Option<Goal>>;

    /// List goals with optional filters.
    async fn list(&self, filter: GoalFilter) -> DomainResult<Vec<Goal>>;

    /// Active goals belonging to one user, oldest first.
    async fn active_for_user(&self, user_id: Uuid) -> DomainResult<Vec<Goal>>;
}
