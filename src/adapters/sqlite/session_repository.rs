//! SQLite implementation of the SessionRepository.
//!
//! Window bounds are compared as strings. This relies on every timestamp
//! being written through [`format_timestamp`](super::format_timestamp).

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{format_optional_timestamp, format_timestamp, parse_datetime, parse_optional_datetime, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{BlockStatus, ProgressWindow, Session, SessionBlock, SessionStatus};
use crate::domain::ports::SessionRepository;

const SESSION_COLUMNS: &str = "id, user_id, planned_duration_secs, actual_duration_secs, status, started_at, completed_at, created_at, updated_at";
const BLOCK_COLUMNS: &str = "id, session_id, block_type, planned_duration_secs, actual_duration_secs, status, sort_order, started_at, completed_at";

#[derive(Clone)]
pub struct SqliteSessionRepository {
    pool: SqlitePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn load_blocks(&self, session_id: Uuid) -> DomainResult<Vec<SessionBlock>> {
        let rows: Vec<BlockRow> = sqlx::query_as(&format!(
            "SELECT {BLOCK_COLUMNS} FROM session_blocks WHERE session_id = ? ORDER BY sort_order, id"
        ))
        .bind(session_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn insert_block<'e, E>(executor: E, block: &SessionBlock) -> DomainResult<()>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        sqlx::query(
            r#"INSERT INTO session_blocks (id, session_id, block_type, planned_duration_secs, actual_duration_secs, status, sort_order, started_at, completed_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#
        )
        .bind(block.id.to_string())
        .bind(block.session_id.to_string())
        .bind(&block.block_type)
        .bind(block.planned_duration_secs)
        .bind(block.actual_duration_secs)
        .bind(block.status.as_str())
        .bind(block.sort_order)
        .bind(format_optional_timestamp(block.started_at.as_ref()))
        .bind(format_optional_timestamp(block.completed_at.as_ref()))
        .execute(executor)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for SqliteSessionRepository {
    async fn create(&self, session: &Session) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"INSERT INTO sessions (id, user_id, planned_duration_secs, actual_duration_secs, status, started_at, completed_at, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#
        )
        .bind(session.id.to_string())
        .bind(session.user_id.to_string())
        .bind(session.planned_duration_secs)
        .bind(session.actual_duration_secs)
        .bind(session.status.as_str())
        .bind(format_optional_timestamp(session.started_at.as_ref()))
        .bind(format_optional_timestamp(session.completed_at.as_ref()))
        .bind(format_timestamp(&session.created_at))
        .bind(format_timestamp(&session.updated_at))
        .execute(&mut *tx)
        .await?;

        for block in &session.blocks {
            Self::insert_block(&mut *tx, block).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Session>> {
        let row: Option<SessionRow> = sqlx::query_as(&format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let mut session: Session = row.try_into()?;
                session.blocks = self.load_blocks(session.id).await?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    async fn update(&self, session: &Session) -> DomainResult<()> {
        let result = sqlx::query(
            r#"UPDATE sessions SET planned_duration_secs = ?, actual_duration_secs = ?, status = ?,
               started_at = ?, completed_at = ?, updated_at = ?
               WHERE id = ?"#
        )
        .bind(session.planned_duration_secs)
        .bind(session.actual_duration_secs)
        .bind(session.status.as_str())
        .bind(format_optional_timestamp(session.started_at.as_ref()))
        .bind(format_optional_timestamp(session.completed_at.as_ref()))
        .bind(format_timestamp(&session.updated_at))
        .bind(session.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::SessionNotFound(session.id));
        }

        Ok(())
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        status: Option<SessionStatus>,
        limit: usize,
    ) -> DomainResult<Vec<Session>> {
        let rows: Vec<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE user_id = ? AND (? IS NULL OR status = ?) ORDER BY created_at DESC LIMIT ?"
        ))
        .bind(user_id.to_string())
        .bind(status.map(|s| s.as_str()))
        .bind(status.map(|s| s.as_str()))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in rows {
            let mut session: Session = row.try_into()?;
            session.blocks = self.load_blocks(session.id).await?;
            sessions.push(session);
        }
        Ok(sessions)
    }

    async fn add_block(&self, block: &SessionBlock) -> DomainResult<()> {
        let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM sessions WHERE id = ?")
            .bind(block.session_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(DomainError::SessionNotFound(block.session_id));
        }

        Self::insert_block(&self.pool, block).await
    }

    async fn get_block(&self, id: Uuid) -> DomainResult<Option<SessionBlock>> {
        let row: Option<BlockRow> = sqlx::query_as(&format!("SELECT {BLOCK_COLUMNS} FROM session_blocks WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.try_into()).transpose()
    }

    async fn update_block(&self, block: &SessionBlock) -> DomainResult<()> {
        let result = sqlx::query(
            r#"UPDATE session_blocks SET block_type = ?, planned_duration_secs = ?, actual_duration_secs = ?,
               status = ?, sort_order = ?, started_at = ?, completed_at = ?
               WHERE id = ?"#
        )
        .bind(&block.block_type)
        .bind(block.planned_duration_secs)
        .bind(block.actual_duration_secs)
        .bind(block.status.as_str())
        .bind(block.sort_order)
        .bind(format_optional_timestamp(block.started_at.as_ref()))
        .bind(format_optional_timestamp(block.completed_at.as_ref()))
        .bind(block.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::BlockNotFound(block.id));
        }

        Ok(())
    }

    async fn sum_completed_duration(&self, user_id: Uuid, window: &ProgressWindow) -> DomainResult<i64> {
        let (total,): (i64,) = sqlx::query_as(
            r#"SELECT COALESCE(SUM(actual_duration_secs), 0) FROM sessions
               WHERE user_id = ? AND status = 'completed'
                 AND completed_at IS NOT NULL AND completed_at >= ? AND completed_at <= ?"#
        )
        .bind(user_id.to_string())
        .bind(format_timestamp(&window.from))
        .bind(format_timestamp(&window.to))
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    async fn count_completed_sessions(&self, user_id: Uuid, window: &ProgressWindow) -> DomainResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"SELECT COUNT(*) FROM sessions
               WHERE user_id = ? AND status = 'completed'
                 AND completed_at IS NOT NULL AND completed_at >= ? AND completed_at <= ?"#
        )
        .bind(user_id.to_string())
        .bind(format_timestamp(&window.from))
        .bind(format_timestamp(&window.to))
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn count_completed_blocks(
        &self,
        user_id: Uuid,
        window: &ProgressWindow,
        block_type: Option<&str>,
    ) -> DomainResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"SELECT COUNT(*) FROM session_blocks b
               JOIN sessions s ON s.id = b.session_id
               WHERE s.user_id = ? AND b.status = 'completed'
                 AND b.completed_at IS NOT NULL AND b.completed_at >= ? AND b.completed_at <= ?
                 AND (? IS NULL OR b.block_type = ?)"#
        )
        .bind(user_id.to_string())
        .bind(format_timestamp(&window.from))
        .bind(format_timestamp(&window.to))
        .bind(block_type)
        .bind(block_type)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: String,
    user_id: String,
    planned_duration_secs: i64,
    actual_duration_secs: Option<i64>,
    status: String,
    started_at: Option<String>,
    completed_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<SessionRow> for Session {
    type Error = DomainError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let status = SessionStatus::from_str(&row.status)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid session status: {}", row.status)))?;

        Ok(Session {
            id: parse_uuid(&row.id)?,
            user_id: parse_uuid(&row.user_id)?,
            planned_duration_secs: row.planned_duration_secs,
            actual_duration_secs: row.actual_duration_secs,
            status,
            started_at: parse_optional_datetime(row.started_at)?,
            completed_at: parse_optional_datetime(row.completed_at)?,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
            blocks: Vec::new(),
        })
    }
}

#[derive(sqlx::FromRow)]
struct BlockRow {
    id: String,
    session_id: String,
    block_type: String,
    planned_duration_secs: i64,
    actual_duration_secs: Option<i64>,
    status: String,
    sort_order: i32,
    started_at: Option<String>,
    completed_at: Option<String>,
}

impl TryFrom<BlockRow> for SessionBlock {
    type Error = DomainError;

    fn try_from(row: BlockRow) -> Result<Self, Self::Error> {
        let status = BlockStatus::from_str(&row.status)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid block status: {}", row.status)))?;

        Ok(SessionBlock {
            id: parse_uuid(&row.id)?,
            session_id: parse_uuid(&row.session_id)?,
            block_type: row.block_type,
            planned_duration_secs: row.planned_duration_secs,
            actual_duration_secs: row.actual_duration_secs,
            status,
            sort_order: row.sort_order,
            started_at: parse_optional_datetime(row.started_at)?,
            completed_at: parse_optional_datetime(row.completed_at)?,
        })
    }
}
