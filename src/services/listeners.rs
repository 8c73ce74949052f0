//! Listeners that recompute goal progress when practice is completed.
//!
//! Both listeners fail the delivery when a goal could not be persisted, so
//! the queue redelivers. Skipped goals (configuration defects) do not fail
//! the delivery.

use std::sync::Arc;

use async_trait::async_trait;

use super::event_queue::EventListener;
use super::goal_progress::{GoalProgressService, ProgressReport};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::events::{EventPayload, PracticeEvent};

fn delivery_result(listener: &str, result: DomainResult<ProgressReport>) -> DomainResult<()> {
    match result {
        Ok(report) if report.has_failures() => Err(DomainError::ListenerFailed {
            listener: listener.to_string(),
            reason: report.failure_summary(),
        }),
        Ok(_) => Ok(()),
        Err(err) => Err(DomainError::ListenerFailed {
            listener: listener.to_string(),
            reason: err.to_string(),
        }),
    }
}

pub struct UpdateGoalProgressAfterSession {
    service: Arc<GoalProgressService>,
}

impl UpdateGoalProgressAfterSession {
    pub const NAME: &'static str = "update_goal_progress_after_session";

    pub fn new(service: Arc<GoalProgressService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl EventListener for UpdateGoalProgressAfterSession {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn handles(&self, event: &PracticeEvent) -> bool {
        matches!(event.payload, EventPayload::SessionCompleted(_))
    }

    async fn handle(&self, event: &PracticeEvent) -> DomainResult<()> {
        let EventPayload::SessionCompleted(completed) = &event.payload else {
            return Ok(());
        };
        let result = self.service.update_progress_after_session(&completed.session).await;
        delivery_result(Self::NAME, result)
    }
}

pub struct UpdateGoalProgressAfterSessionBlock {
    service: Arc<GoalProgressService>,
}

impl UpdateGoalProgressAfterSessionBlock {
    pub const NAME: &'static str = "update_goal_progress_after_session_block";

    pub fn new(service: Arc<GoalProgressService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl EventListener for UpdateGoalProgressAfterSessionBlock {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn handles(&self, event: &PracticeEvent) -> bool {
        matches!(event.payload, EventPayload::SessionBlockCompleted(_))
    }

    async fn handle(&self, event: &PracticeEvent) -> DomainResult<()> {
        let EventPayload::SessionBlockCompleted(completed) = &event.payload else {
            return Ok(());
        };
        let result = self.service.update_progress_after_session_block(&completed.block).await;
        delivery_result(Self::NAME, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::goal_progress::GoalIssue;
    use uuid::Uuid;

    #[test]
    fn test_failed_goals_fail_the_delivery() {
        let report = ProgressReport {
            failed: vec![GoalIssue { goal_id: Uuid::nil(), reason: "commit failed".to_string() }],
            ..ProgressReport::default()
        };
        let err = delivery_result("listener", Ok(report)).unwrap_err();
        assert!(matches!(err, DomainError::ListenerFailed { ref reason, .. } if reason.contains("commit failed")));
    }

    #[test]
    fn test_skipped_goals_do_not_fail_the_delivery() {
        let report = ProgressReport {
            skipped: vec![GoalIssue { goal_id: Uuid::nil(), reason: "no strategy".to_string() }],
            ..ProgressReport::default()
        };
        assert!(delivery_result("listener", Ok(report)).is_ok());
    }

    #[test]
    fn test_service_error_fails_the_delivery() {
        let err = delivery_result("listener", Err(DomainError::SessionNotFound(Uuid::nil()))).unwrap_err();
        assert!(matches!(err, DomainError::ListenerFailed { ref listener, .. } if listener == "listener"));
    }
}
