//! Goal progress recomputation and completion.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use uuid::Uuid;

use super::registry::StrategyRegistry;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Goal, GoalProgress, ProgressConfig, ProgressWindow, Session, SessionBlock};
use crate::domain::ports::{GoalRepository, SessionRepository};
use crate::services::transaction::TransactionalExecutor;

/// A goal that was not processed, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GoalIssue {
    pub goal_id: Uuid,
    pub reason: String,
}

/// What one recomputation pass did to each goal.
///
/// `skipped` goals have a configuration defect (no strategy, bad window) that
/// a retry cannot fix. `failed` goals hit a persistence problem and are worth
/// retrying.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgressReport {
    pub updated: Vec<Uuid>,
    pub unchanged: Vec<Uuid>,
    pub skipped: Vec<GoalIssue>,
    pub failed: Vec<GoalIssue>,
    pub completed: Vec<Uuid>,
}

impl ProgressReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn failure_summary(&self) -> String {
        self.failed
            .iter()
            .map(|issue| format!("{}: {}", issue.goal_id, issue.reason))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn merge_completion(&mut self, other: ProgressReport) {
        self.completed.extend(other.completed);
        self.failed.extend(other.failed);
        for issue in other.skipped {
            if !self.skipped.iter().any(|s| s.goal_id == issue.goal_id) {
                self.skipped.push(issue);
            }
        }
    }
}

enum RecomputeOutcome {
    Updated,
    Unchanged,
    Skipped(String),
    Failed(String),
}

enum CompletionOutcome {
    Completed,
    NotReached,
    Skipped(String),
    Failed(String),
}

/// Recomputes goal progress from stored sessions and completes goals.
///
/// Every value written is a full recomputation over the goal window, so
/// repeated or reordered invocations converge on the same stored state.
pub struct GoalProgressService {
    goals: Arc<dyn GoalRepository>,
    sessions: Arc<dyn SessionRepository>,
    registry: StrategyRegistry,
    executor: TransactionalExecutor,
    config: ProgressConfig,
}

impl GoalProgressService {
    pub fn new(
        goals: Arc<dyn GoalRepository>,
        sessions: Arc<dyn SessionRepository>,
        registry: StrategyRegistry,
        executor: TransactionalExecutor,
        config: ProgressConfig,
    ) -> Self {
        Self {
            goals,
            sessions,
            registry,
            executor,
            config,
        }
    }

    /// Recompute the active goals of the session's owner, then complete the
    /// ones that reached their target.
    #[tracing::instrument(skip(self, session), fields(session_id = %session.id, user_id = %session.user_id))]
    pub async fn update_progress_after_session(&self, session: &Session) -> DomainResult<ProgressReport> {
        self.recalculate_user(session.user_id).await
    }

    /// Same as [`update_progress_after_session`](Self::update_progress_after_session),
    /// with the user resolved through the block's parent session.
    #[tracing::instrument(skip(self, block), fields(block_id = %block.id, session_id = %block.session_id))]
    pub async fn update_progress_after_session_block(&self, block: &SessionBlock) -> DomainResult<ProgressReport> {
        let session = self
            .sessions
            .get(block.session_id)
            .await?
            .ok_or(DomainError::SessionNotFound(block.session_id))?;
        self.recalculate_user(session.user_id).await
    }

    /// Recompute every active goal of one user. Also used for backfills.
    pub async fn recalculate_user(&self, user_id: Uuid) -> DomainResult<ProgressReport> {
        let goals = self.goals.active_for_user(user_id).await?;
        let now = Utc::now();
        let mut report = ProgressReport::default();

        for goal in goals {
            let goal_id = goal.id;
            match self.recompute_goal(goal, None, now).await {
                RecomputeOutcome::Updated => report.updated.push(goal_id),
                RecomputeOutcome::Unchanged => report.unchanged.push(goal_id),
                RecomputeOutcome::Skipped(reason) => report.skipped.push(GoalIssue { goal_id, reason }),
                RecomputeOutcome::Failed(reason) => report.failed.push(GoalIssue { goal_id, reason }),
            }
        }

        let already_reported: HashSet<Uuid> = report.skipped.iter().map(|s| s.goal_id).collect();
        let completion = self.complete_goals(user_id, &already_reported, now).await?;
        report.merge_completion(completion);

        tracing::info!(
            %user_id,
            updated = report.updated.len(),
            unchanged = report.unchanged.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            completed = report.completed.len(),
            "goal progress recalculated"
        );
        Ok(report)
    }

    /// Mark every active goal of `user_id` whose progress reached its target
    /// as completed. Goals already completed are left alone.
    pub async fn check_and_complete_goals(&self, user_id: Uuid) -> DomainResult<ProgressReport> {
        self.complete_goals(user_id, &HashSet::new(), Utc::now()).await
    }

    /// Recompute a single goal, optionally over an explicit window instead of
    /// the goal's own. The explicit window is clamped to the goal's window, so
    /// sessions outside `[start_date, min(end_date, now)]` never count.
    pub async fn recalculate_goal(
        &self,
        goal_id: Uuid,
        window_override: Option<ProgressWindow>,
    ) -> DomainResult<ProgressReport> {
        let goal = self.goals.get(goal_id).await?.ok_or(DomainError::GoalNotFound(goal_id))?;
        let now = Utc::now();
        let mut report = ProgressReport::default();

        match self.recompute_goal(goal, window_override, now).await {
            RecomputeOutcome::Updated => report.updated.push(goal_id),
            RecomputeOutcome::Unchanged => report.unchanged.push(goal_id),
            RecomputeOutcome::Skipped(reason) => {
                report.skipped.push(GoalIssue { goal_id, reason });
                return Ok(report);
            }
            RecomputeOutcome::Failed(reason) => {
                report.failed.push(GoalIssue { goal_id, reason });
                return Ok(report);
            }
        }

        let goal = self.goals.get(goal_id).await?.ok_or(DomainError::GoalNotFound(goal_id))?;
        if goal.is_active {
            self.record_completion(&mut report, goal, now).await;
        }
        Ok(report)
    }

    /// Current and target value of a goal.
    pub async fn goal_progress(&self, goal_id: Uuid) -> DomainResult<GoalProgress> {
        let goal = self.goals.get(goal_id).await?.ok_or(DomainError::GoalNotFound(goal_id))?;
        let strategy = self.registry.resolve(&goal)?;
        let window = goal.target_window(Utc::now())?;
        let total = strategy.calculate_total_value(&goal, &window)?;
        Ok(GoalProgress::new(&goal, total))
    }

    async fn complete_goals(
        &self,
        user_id: Uuid,
        already_reported: &HashSet<Uuid>,
        now: DateTime<Utc>,
    ) -> DomainResult<ProgressReport> {
        let goals = self.goals.active_for_user(user_id).await?;
        let mut report = ProgressReport::default();

        for goal in goals {
            if already_reported.contains(&goal.id) {
                continue;
            }
            self.record_completion(&mut report, goal, now).await;
        }
        Ok(report)
    }

    async fn record_completion(&self, report: &mut ProgressReport, goal: Goal, now: DateTime<Utc>) {
        let goal_id = goal.id;
        match self.complete_if_reached(goal, now).await {
            CompletionOutcome::Completed => report.completed.push(goal_id),
            CompletionOutcome::NotReached => {}
            CompletionOutcome::Skipped(reason) => report.skipped.push(GoalIssue { goal_id, reason }),
            CompletionOutcome::Failed(reason) => report.failed.push(GoalIssue { goal_id, reason }),
        }
    }

    async fn recompute_goal(
        &self,
        mut goal: Goal,
        window_override: Option<ProgressWindow>,
        now: DateTime<Utc>,
    ) -> RecomputeOutcome {
        let strategy = match self.registry.resolve(&goal) {
            Ok(strategy) => strategy,
            Err(err) => return self.skip(&goal, err),
        };

        let mut conflicts = 0;
        loop {
            let window = match goal.progress_window(now) {
                Ok(Some(window)) => window,
                Ok(None) => {
                    tracing::debug!(goal_id = %goal.id, start_date = %goal.start_date, "goal has not started yet");
                    return RecomputeOutcome::Unchanged;
                }
                Err(err) => return self.skip(&goal, err),
            };
            let window = match window_override {
                None => window,
                Some(requested) => match requested.intersect(&window) {
                    Some(clamped) => clamped,
                    None => {
                        tracing::debug!(
                            goal_id = %goal.id,
                            from = %requested.from,
                            to = %requested.to,
                            "requested window lies outside the goal window"
                        );
                        return RecomputeOutcome::Unchanged;
                    }
                },
            };

            let value = match strategy.calculate_current_value(goal.user_id, &goal, &window).await {
                Ok(value) => value,
                Err(err) if err.is_configuration_defect() => return self.skip(&goal, err),
                Err(err) => {
                    tracing::error!(goal_id = %goal.id, error = %err, "failed to calculate goal progress");
                    return RecomputeOutcome::Failed(err.to_string());
                }
            };

            if value == goal.current_value {
                tracing::debug!(goal_id = %goal.id, value, "goal progress unchanged");
                return RecomputeOutcome::Unchanged;
            }

            let (goal_id, version) = (goal.id, goal.version);
            let outcome = self
                .executor
                .execute_in_transaction(
                    move |tx| async move { tx.write_progress(goal_id, version, value).await }.boxed(),
                    "Failed to persist goal progress",
                    serde_json::json!({
                        "goal_id": goal_id,
                        "user_id": goal.user_id,
                        "version": version,
                        "value": value,
                    }),
                )
                .await;

            match (outcome.success, outcome.result) {
                (true, Some(true)) => {
                    tracing::debug!(%goal_id, from = goal.current_value, to = value, "goal progress updated");
                    return RecomputeOutcome::Updated;
                }
                (true, _) => {}
                (false, _) => return RecomputeOutcome::Failed(outcome.message),
            }

            conflicts += 1;
            if conflicts > self.config.max_conflict_retries {
                let err = DomainError::ConcurrencyConflict {
                    entity: "goal".to_string(),
                    id: goal_id.to_string(),
                };
                tracing::error!(%goal_id, attempts = conflicts, error = %err, "giving up on goal progress write");
                return RecomputeOutcome::Failed(err.to_string());
            }

            tracing::debug!(%goal_id, attempt = conflicts, "goal modified concurrently, recomputing");
            goal = match self.goals.get(goal_id).await {
                Ok(Some(reloaded)) => reloaded,
                Ok(None) => return self.skip(&goal, DomainError::GoalNotFound(goal_id)),
                Err(err) => return RecomputeOutcome::Failed(err.to_string()),
            };
        }
    }

    async fn complete_if_reached(&self, mut goal: Goal, now: DateTime<Utc>) -> CompletionOutcome {
        let mut conflicts = 0;
        loop {
            if goal.is_completed() {
                return CompletionOutcome::NotReached;
            }

            let strategy = match self.registry.resolve(&goal) {
                Ok(strategy) => strategy,
                Err(err) => return self.skip_completion(&goal, err),
            };
            let total = match goal
                .target_window(now)
                .and_then(|window| strategy.calculate_total_value(&goal, &window))
            {
                Ok(total) => total,
                Err(err) => return self.skip_completion(&goal, err),
            };

            if goal.current_value < total {
                return CompletionOutcome::NotReached;
            }

            let (goal_id, version) = (goal.id, goal.version);
            let outcome = self
                .executor
                .execute_in_transaction(
                    move |tx| async move { tx.mark_completed(goal_id, version, now).await }.boxed(),
                    "Failed to complete goal",
                    serde_json::json!({
                        "goal_id": goal_id,
                        "user_id": goal.user_id,
                        "current_value": goal.current_value,
                        "total_value": total,
                    }),
                )
                .await;

            match (outcome.success, outcome.result) {
                (true, Some(true)) => {
                    tracing::info!(%goal_id, user_id = %goal.user_id, current = goal.current_value, total, "goal completed");
                    return CompletionOutcome::Completed;
                }
                (true, _) => {}
                (false, _) => return CompletionOutcome::Failed(outcome.message),
            }

            conflicts += 1;
            if conflicts > self.config.max_conflict_retries {
                return CompletionOutcome::Failed(
                    DomainError::ConcurrencyConflict {
                        entity: "goal".to_string(),
                        id: goal_id.to_string(),
                    }
                    .to_string(),
                );
            }

            goal = match self.goals.get(goal_id).await {
                Ok(Some(reloaded)) => reloaded,
                Ok(None) => return CompletionOutcome::NotReached,
                Err(err) => return CompletionOutcome::Failed(err.to_string()),
            };
        }
    }

    fn skip(&self, goal: &Goal, err: DomainError) -> RecomputeOutcome {
        tracing::error!(goal_id = %goal.id, goal_type = %goal.goal_type, error = %err, "skipping goal");
        RecomputeOutcome::Skipped(err.to_string())
    }

    fn skip_completion(&self, goal: &Goal, err: DomainError) -> CompletionOutcome {
        tracing::error!(goal_id = %goal.id, goal_type = %goal.goal_type, error = %err, "skipping goal completion check");
        CompletionOutcome::Skipped(err.to_string())
    }
}
