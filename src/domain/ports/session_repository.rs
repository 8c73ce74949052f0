//! Session repository port.
//!
//! Besides plain persistence of sessions and blocks, the port exposes the
//! user-scoped, window-bounded aggregates the goal strategies are built on.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ProgressWindow, Session, SessionBlock, SessionStatus};

/// Repository interface for practice sessions and their blocks.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Insert a session together with any blocks it already holds.
    async fn create(&self, session: &Session) -> DomainResult<()>;

    /// Get a session by ID, blocks included and ordered.
    async fn get(&self, id: Uuid) -> DomainResult<Option<Session>>;

    /// Update the session row (blocks are written separately).
    async fn update(&self, session: &Session) -> DomainResult<()>;

    /// List a user's sessions, newest first.
    async fn list_for_user(
        &self,
        user_id: Uuid,
        status: Option<SessionStatus>,
        limit: usize,
    ) -> DomainResult<Vec<Session>>;

    /// Insert a block into an existing session.
    async fn add_block(&self, block: &SessionBlock) -> DomainResult<()>;

    /// Get a block by ID.
    async fn get_block(&self, id: Uuid) -> DomainResult<Option<SessionBlock>>;

    /// Update a block row.
    async fn update_block(&self, block: &SessionBlock) -> DomainResult<()>;

    /// Sum of `actual_duration_secs` over the user's completed sessions whose
    /// completion time lies inside the window (bounds inclusive).
    async fn sum_completed_duration(&self, user_id: Uuid, window: &ProgressWindow) -> DomainResult<i64>;

    /// Number of the user's completed sessions inside the window.
    async fn count_completed_sessions(&self, user_id: Uuid, window: &ProgressWindow) -> DomainResult<i64>;

    /// Number of the user's completed blocks inside the window, optionally of
    /// a single block type.
    async fn count_completed_blocks(
        &self,
        user_id: Uuid,
        window: &ProgressWindow,
        block_type: Option<&str>,
    ) -> DomainResult<i64>;
}
