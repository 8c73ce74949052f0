//! Domain errors for the practice tracker.

use thiserror::Error;
use uuid::Uuid;

use super::models::GoalType;

/// Domain-level errors that can occur while tracking practice and goals.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Goal not found: {0}")]
    GoalNotFound(Uuid),

    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Session block not found: {0}")]
    BlockNotFound(Uuid),

    #[error("No strategy supports goal {goal_id} of type {goal_type}: {reason}")]
    StrategyNotFound {
        goal_id: Uuid,
        goal_type: GoalType,
        reason: String,
    },

    #[error("More than one strategy registered for goal type {0}")]
    AmbiguousStrategy(GoalType),

    #[error("Invalid progress window for goal {goal_id}: {reason}")]
    InvalidGoalWindow { goal_id: Uuid, reason: String },

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Concurrency conflict: {entity} {id} was modified")]
    ConcurrencyConflict { entity: String, id: String },

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Listener '{listener}' failed: {reason}")]
    ListenerFailed { listener: String, reason: String },

    #[error("Event queue is closed")]
    QueueClosed,
}

impl DomainError {
    /// Configuration defects that a retry cannot fix.
    ///
    /// The progress service skips goals failing with one of these instead of
    /// asking the queue to redeliver the event.
    pub fn is_configuration_defect(&self) -> bool {
        matches!(
            self,
            Self::StrategyNotFound { .. }
                | Self::AmbiguousStrategy(_)
                | Self::InvalidGoalWindow { .. }
                | Self::ValidationFailed(_)
        )
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

/// Render an error together with its `source()` chain, outermost first.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(source) = current {
        parts.push(source.to_string());
        current = source.source();
    }
    parts.join(": caused by: ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("outer")]
    struct Outer(#[source] Inner);

    #[derive(Debug, Error)]
    #[error("inner")]
    struct Inner;

    #[test]
    fn test_error_chain_walks_sources() {
        let err = Outer(Inner);
        assert_eq!(error_chain(&err), "outer: caused by: inner");
    }

    #[test]
    fn test_configuration_defects() {
        let missing = DomainError::StrategyNotFound {
            goal_id: Uuid::new_v4(),
            goal_type: GoalType::SessionCount,
            reason: "no strategy registered".to_string(),
        };
        assert!(missing.is_configuration_defect());
        assert!(!DomainError::DatabaseError("locked".to_string()).is_configuration_defect());
        assert!(!DomainError::QueueClosed.is_configuration_defect());
    }
}
