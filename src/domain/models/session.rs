//! Practice session domain models.
//!
//! A session is a timed practice occurrence made of ordered blocks, one block
//! per planned exercise. Durations are kept in seconds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Scheduled, not started yet
    Pending,
    /// Timer running
    Active,
    /// Timer stopped, can be resumed
    Paused,
    /// Finished; counts toward goals
    Completed,
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "active" => Some(Self::Active),
            "paused" => Some(Self::Paused),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, new_status: Self) -> bool {
        matches!(
            (self, new_status),
            (Self::Pending, Self::Active)
                | (Self::Active, Self::Paused)
                | (Self::Active, Self::Completed)
                | (Self::Paused, Self::Active)
                | (Self::Paused, Self::Completed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Block lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockStatus {
    Pending,
    Active,
    Completed,
    /// Dropped from the session without being practiced
    Skipped,
}

impl Default for BlockStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl BlockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Skipped => "skipped",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, new_status: Self) -> bool {
        matches!(
            (self, new_status),
            (Self::Pending, Self::Active)
                | (Self::Pending, Self::Completed)
                | (Self::Pending, Self::Skipped)
                | (Self::Active, Self::Completed)
                | (Self::Active, Self::Skipped)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }
}

impl std::fmt::Display for BlockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A timed practice session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub planned_duration_secs: i64,
    pub actual_duration_secs: Option<i64>,
    pub status: SessionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Blocks ordered by `sort_order`.
    #[serde(default)]
    pub blocks: Vec<SessionBlock>,
}

impl Session {
    pub fn new(user_id: Uuid, planned_duration_secs: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            planned_duration_secs,
            actual_duration_secs: None,
            status: SessionStatus::Pending,
            started_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
            blocks: Vec::new(),
        }
    }

    /// Build an already-completed session, as imported history or test data.
    pub fn completed(user_id: Uuid, actual_duration_secs: i64, completed_at: DateTime<Utc>) -> Self {
        let mut session = Self::new(user_id, actual_duration_secs);
        session.status = SessionStatus::Completed;
        session.actual_duration_secs = Some(actual_duration_secs);
        session.started_at =
            Some(completed_at - chrono::Duration::seconds(actual_duration_secs.max(0)));
        session.completed_at = Some(completed_at);
        session
    }

    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    /// Transition to a new status, stamping the lifecycle timestamps.
    pub fn transition_to(&mut self, new_status: SessionStatus) -> Result<(), String> {
        if !self.status.can_transition_to(new_status) {
            return Err(format!(
                "Cannot transition session from {} to {}",
                self.status, new_status
            ));
        }
        let now = Utc::now();
        if new_status == SessionStatus::Active && self.started_at.is_none() {
            self.started_at = Some(now);
        }
        if new_status == SessionStatus::Completed {
            self.completed_at = Some(now);
        }
        self.status = new_status;
        self.updated_at = now;
        Ok(())
    }

    /// Seconds elapsed since the session was first started.
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> i64 {
        self.started_at
            .map(|started| (now - started).num_seconds().max(0))
            .unwrap_or(0)
    }

    /// Sum of actual durations of the completed blocks.
    pub fn completed_blocks_duration_secs(&self) -> i64 {
        self.blocks
            .iter()
            .filter(|b| b.status == BlockStatus::Completed)
            .filter_map(|b| b.actual_duration_secs)
            .sum()
    }

    pub fn next_sort_order(&self) -> i32 {
        self.blocks.iter().map(|b| b.sort_order + 1).max().unwrap_or(0)
    }
}

/// One planned exercise inside a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionBlock {
    pub id: Uuid,
    /// Parent session (back-reference; the session owns its blocks).
    pub session_id: Uuid,
    pub block_type: String,
    pub planned_duration_secs: i64,
    pub actual_duration_secs: Option<i64>,
    pub status: BlockStatus,
    pub sort_order: i32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SessionBlock {
    pub fn new(
        session_id: Uuid,
        block_type: impl Into<String>,
        planned_duration_secs: i64,
        sort_order: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            block_type: block_type.into(),
            planned_duration_secs,
            actual_duration_secs: None,
            status: BlockStatus::Pending,
            sort_order,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn transition_to(&mut self, new_status: BlockStatus) -> Result<(), String> {
        if !self.status.can_transition_to(new_status) {
            return Err(format!(
                "Cannot transition block from {} to {}",
                self.status, new_status
            ));
        }
        let now = Utc::now();
        if new_status == BlockStatus::Active {
            self.started_at = Some(now);
        }
        if new_status == BlockStatus::Completed {
            self.completed_at = Some(now);
        }
        self.status = new_status;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_lifecycle() {
        let mut session = Session::new(Uuid::new_v4(), 1800);
        assert_eq!(session.status, SessionStatus::Pending);

        session.transition_to(SessionStatus::Active).unwrap();
        let started = session.started_at.unwrap();

        session.transition_to(SessionStatus::Paused).unwrap();
        session.transition_to(SessionStatus::Active).unwrap();
        assert_eq!(session.started_at, Some(started), "resume keeps the first start");

        session.transition_to(SessionStatus::Completed).unwrap();
        assert!(session.is_completed());
        assert!(session.completed_at.is_some());
    }

    #[test]
    fn test_session_invalid_transitions() {
        let mut session = Session::new(Uuid::new_v4(), 600);
        assert!(session.transition_to(SessionStatus::Completed).is_err());
        assert!(session.transition_to(SessionStatus::Paused).is_err());

        session.transition_to(SessionStatus::Active).unwrap();
        session.transition_to(SessionStatus::Completed).unwrap();
        assert!(session.transition_to(SessionStatus::Active).is_err());
    }

    #[test]
    fn test_block_transitions() {
        let mut block = SessionBlock::new(Uuid::new_v4(), "scales", 300, 0);
        block.transition_to(BlockStatus::Active).unwrap();
        block.transition_to(BlockStatus::Completed).unwrap();
        assert!(block.completed_at.is_some());
        assert!(block.transition_to(BlockStatus::Skipped).is_err());
    }

    #[test]
    fn test_next_sort_order_and_block_durations() {
        let mut session = Session::new(Uuid::new_v4(), 600);
        assert_eq!(session.next_sort_order(), 0);

        let mut first = SessionBlock::new(session.id, "scales", 300, 0);
        first.status = BlockStatus::Completed;
        first.actual_duration_secs = Some(280);
        let mut second = SessionBlock::new(session.id, "etude", 300, 1);
        second.status = BlockStatus::Skipped;
        second.actual_duration_secs = Some(40);
        session.blocks = vec![first, second];

        assert_eq!(session.next_sort_order(), 2);
        assert_eq!(session.completed_blocks_duration_secs(), 280);
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(SessionStatus::from_str("ACTIVE"), Some(SessionStatus::Active));
        assert_eq!(BlockStatus::from_str("skipped"), Some(BlockStatus::Skipped));
        assert_eq!(SessionStatus::from_str("archived"), None);
    }
}
