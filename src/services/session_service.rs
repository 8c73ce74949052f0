//! Session lifecycle.
//!
//! Drives sessions and blocks through their state machines and publishes a
//! [`PracticeEvent`] whenever one of them reaches `completed`.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::events::PracticeEvent;
use crate::domain::models::{BlockStatus, Session, SessionBlock, SessionStatus};
use crate::domain::ports::{EventPublisher, SessionRepository};

/// Planned block given when a session is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedBlock {
    pub block_type: String,
    pub planned_duration_secs: i64,
}

pub struct SessionService {
    repository: Arc<dyn SessionRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl SessionService {
    pub fn new(repository: Arc<dyn SessionRepository>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { repository, publisher }
    }

    /// Create a pending session with its planned blocks, in order.
    pub async fn create_session(
        &self,
        user_id: Uuid,
        planned_duration_secs: i64,
        blocks: Vec<PlannedBlock>,
    ) -> DomainResult<Session> {
        if planned_duration_secs < 0 {
            return Err(DomainError::ValidationFailed("Planned duration cannot be negative".to_string()));
        }

        let mut session = Session::new(user_id, planned_duration_secs);
        for (index, planned) in blocks.into_iter().enumerate() {
            let block = Self::new_block(&session, planned, i32::try_from(index).unwrap_or(i32::MAX))?;
            session.blocks.push(block);
        }

        self.repository.create(&session).await?;
        tracing::info!(session_id = %session.id, %user_id, blocks = session.blocks.len(), "session created");
        Ok(session)
    }

    pub async fn get_session(&self, id: Uuid) -> DomainResult<Session> {
        self.repository.get(id).await?.ok_or(DomainError::SessionNotFound(id))
    }

    pub async fn list_sessions(
        &self,
        user_id: Uuid,
        status: Option<SessionStatus>,
        limit: usize,
    ) -> DomainResult<Vec<Session>> {
        self.repository.list_for_user(user_id, status, limit).await
    }

    pub async fn start_session(&self, id: Uuid) -> DomainResult<Session> {
        self.transition_session(id, SessionStatus::Active).await
    }

    pub async fn pause_session(&self, id: Uuid) -> DomainResult<Session> {
        self.transition_session(id, SessionStatus::Paused).await
    }

    pub async fn resume_session(&self, id: Uuid) -> DomainResult<Session> {
        self.transition_session(id, SessionStatus::Active).await
    }

    /// Complete a session and publish `SessionCompleted`.
    ///
    /// Without an explicit duration the session is credited with its
    /// completed blocks, or with the time since it was started when no block
    /// was completed.
    pub async fn complete_session(&self, id: Uuid, actual_duration_secs: Option<i64>) -> DomainResult<Session> {
        let mut session = self.get_session(id).await?;
        Self::apply_session_transition(&mut session, SessionStatus::Completed)?;

        let actual = match actual_duration_secs {
            Some(secs) if secs < 0 => {
                return Err(DomainError::ValidationFailed("Actual duration cannot be negative".to_string()));
            }
            Some(secs) => secs,
            None => match session.completed_blocks_duration_secs() {
                0 => session.elapsed_secs(Utc::now()),
                from_blocks => from_blocks,
            },
        };
        session.actual_duration_secs = Some(actual);

        self.repository.update(&session).await?;
        tracing::info!(session_id = %session.id, user_id = %session.user_id, actual_duration_secs = actual, "session completed");

        self.publish(PracticeEvent::session_completed(session.clone())).await;
        Ok(session)
    }

    /// Append a block to a session that is not completed yet.
    pub async fn add_block(
        &self,
        session_id: Uuid,
        block_type: impl Into<String>,
        planned_duration_secs: i64,
    ) -> DomainResult<SessionBlock> {
        let session = self.get_session(session_id).await?;
        if session.is_completed() {
            return Err(DomainError::ValidationFailed(format!(
                "Session {session_id} is completed, blocks can no longer be added"
            )));
        }

        let planned = PlannedBlock {
            block_type: block_type.into(),
            planned_duration_secs,
        };
        let block = Self::new_block(&session, planned, session.next_sort_order())?;
        self.repository.add_block(&block).await?;
        Ok(block)
    }

    /// Start a block. Its session must be active.
    pub async fn start_block(&self, block_id: Uuid) -> DomainResult<SessionBlock> {
        let mut block = self.get_block(block_id).await?;
        let session = self.get_session(block.session_id).await?;
        if session.status != SessionStatus::Active {
            return Err(DomainError::ValidationFailed(format!(
                "Session {} must be active to start a block (is {})",
                session.id, session.status
            )));
        }

        Self::apply_block_transition(&mut block, BlockStatus::Active)?;
        self.repository.update_block(&block).await?;
        Ok(block)
    }

    /// Complete a block and publish `SessionBlockCompleted`. Its session must
    /// be active or paused.
    ///
    /// Without an explicit duration the block is credited with the time since
    /// it was started, or its planned duration if it never was.
    pub async fn complete_block(&self, block_id: Uuid, actual_duration_secs: Option<i64>) -> DomainResult<SessionBlock> {
        let mut block = self.get_block(block_id).await?;
        let session = self.get_session(block.session_id).await?;
        if !matches!(session.status, SessionStatus::Active | SessionStatus::Paused) {
            return Err(DomainError::ValidationFailed(format!(
                "Session {} must be active or paused to complete a block (is {})",
                session.id, session.status
            )));
        }

        Self::apply_block_transition(&mut block, BlockStatus::Completed)?;

        let actual = match (actual_duration_secs, block.started_at, block.completed_at) {
            (Some(secs), _, _) if secs < 0 => {
                return Err(DomainError::ValidationFailed("Actual duration cannot be negative".to_string()));
            }
            (Some(secs), _, _) => secs,
            (None, Some(started), Some(completed)) => (completed - started).num_seconds().max(0),
            (None, _, _) => block.planned_duration_secs,
        };
        block.actual_duration_secs = Some(actual);

        self.repository.update_block(&block).await?;
        tracing::info!(block_id = %block.id, session_id = %block.session_id, actual_duration_secs = actual, "block completed");

        self.publish(PracticeEvent::block_completed(block.clone())).await;
        Ok(block)
    }

    pub async fn skip_block(&self, block_id: Uuid) -> DomainResult<SessionBlock> {
        let mut block = self.get_block(block_id).await?;
        Self::apply_block_transition(&mut block, BlockStatus::Skipped)?;
        self.repository.update_block(&block).await?;
        Ok(block)
    }

    async fn transition_session(&self, id: Uuid, to: SessionStatus) -> DomainResult<Session> {
        let mut session = self.get_session(id).await?;
        Self::apply_session_transition(&mut session, to)?;
        self.repository.update(&session).await?;
        tracing::debug!(session_id = %id, status = %to, "session transitioned");
        Ok(session)
    }

    async fn get_block(&self, id: Uuid) -> DomainResult<SessionBlock> {
        self.repository.get_block(id).await?.ok_or(DomainError::BlockNotFound(id))
    }

    // The session row is already stored when this runs; a lost event only
    // delays progress until the next recompute.
    async fn publish(&self, event: PracticeEvent) {
        let event_id = event.id;
        let event_type = event.variant_name();
        if let Err(err) = self.publisher.publish(event).await {
            tracing::error!(%event_id, event_type, error = %err, "failed to publish event");
        }
    }

    fn new_block(session: &Session, planned: PlannedBlock, sort_order: i32) -> DomainResult<SessionBlock> {
        if planned.block_type.trim().is_empty() {
            return Err(DomainError::ValidationFailed("Block type cannot be empty".to_string()));
        }
        if planned.planned_duration_secs < 0 {
            return Err(DomainError::ValidationFailed("Planned duration cannot be negative".to_string()));
        }
        Ok(SessionBlock::new(session.id, planned.block_type, planned.planned_duration_secs, sort_order))
    }

    fn apply_session_transition(session: &mut Session, to: SessionStatus) -> DomainResult<()> {
        let from = session.status;
        session.transition_to(to).map_err(|_| DomainError::InvalidStateTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    fn apply_block_transition(block: &mut SessionBlock, to: BlockStatus) -> DomainResult<()> {
        let from = block.status;
        block.transition_to(to).map_err(|_| DomainError::InvalidStateTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}
