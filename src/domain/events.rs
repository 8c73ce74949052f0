//! Domain events published by the session lifecycle.
//!
//! Events are immutable facts carrying a snapshot of the completed entity.
//! They are only transient triggers for goal recomputation and are not
//! persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::models::{Session, SessionBlock};

/// Unique identifier for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A session moved to `completed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCompleted {
    pub session: Session,
    pub occurred_at: DateTime<Utc>,
}

/// A session block moved to `completed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionBlockCompleted {
    pub block: SessionBlock,
    pub occurred_at: DateTime<Utc>,
}

/// Event payload variants that affect goal progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EventPayload {
    SessionCompleted(SessionCompleted),
    SessionBlockCompleted(SessionBlockCompleted),
}

/// Event envelope delivered to listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeEvent {
    pub id: EventId,
    pub payload: EventPayload,
}

impl PracticeEvent {
    pub fn session_completed(session: Session) -> Self {
        let occurred_at = session.completed_at.unwrap_or_else(Utc::now);
        Self {
            id: EventId::new(),
            payload: EventPayload::SessionCompleted(SessionCompleted {
                session,
                occurred_at,
            }),
        }
    }

    pub fn block_completed(block: SessionBlock) -> Self {
        let occurred_at = block.completed_at.unwrap_or_else(Utc::now);
        Self {
            id: EventId::new(),
            payload: EventPayload::SessionBlockCompleted(SessionBlockCompleted {
                block,
                occurred_at,
            }),
        }
    }

    /// Name of the payload variant, used for logging and listener routing.
    pub fn variant_name(&self) -> &'static str {
        match self.payload {
            EventPayload::SessionCompleted(_) => "SessionCompleted",
            EventPayload::SessionBlockCompleted(_) => "SessionBlockCompleted",
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match &self.payload {
            EventPayload::SessionCompleted(e) => e.occurred_at,
            EventPayload::SessionBlockCompleted(e) => e.occurred_at,
        }
    }

    /// Id of the session the event is about.
    pub fn session_id(&self) -> Uuid {
        match &self.payload {
            EventPayload::SessionCompleted(e) => e.session.id,
            EventPayload::SessionBlockCompleted(e) => e.block.session_id,
        }
    }
}
