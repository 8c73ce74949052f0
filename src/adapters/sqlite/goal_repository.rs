//! SQLite implementation of the GoalRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{format_date, format_optional_timestamp, format_timestamp, parse_date, parse_datetime, parse_optional_datetime, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Goal, GoalTarget, GoalType};
use crate::domain::ports::{GoalFilter, GoalRepository};

const GOAL_COLUMNS: &str = "id, user_id, name, goal_type, target, start_date, end_date, is_active, current_value, completed_at, version, created_at, updated_at";

#[derive(Clone)]
pub struct SqliteGoalRepository {
    pool: SqlitePool,
}

impl SqliteGoalRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GoalRepository for SqliteGoalRepository {
    async fn create(&self, goal: &Goal) -> DomainResult<()> {
        let target_json = serde_json::to_string(&goal.target)?;

        sqlx::query(
            r#"INSERT INTO goals (id, user_id, name, goal_type, target, start_date, end_date, is_active, current_value, completed_at, version, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#
        )
        .bind(goal.id.to_string())
        .bind(goal.user_id.to_string())
        .bind(&goal.name)
        .bind(goal.goal_type.as_str())
        .bind(&target_json)
        .bind(format_date(&goal.start_date))
        .bind(goal.end_date.as_ref().map(format_date))
        .bind(goal.is_active)
        .bind(goal.current_value)
        .bind(format_optional_timestamp(goal.completed_at.as_ref()))
        .bind(goal.version)
        .bind(format_timestamp(&goal.created_at))
        .bind(format_timestamp(&goal.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Goal>> {
        let row: Option<GoalRow> = sqlx::query_as(&format!("SELECT {GOAL_COLUMNS} FROM goals WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.try_into()).transpose()
    }

    async fn list(&self, filter: GoalFilter) -> DomainResult<Vec<Goal>> {
        let mut query = format!("SELECT {GOAL_COLUMNS} FROM goals WHERE 1=1");
        let mut bindings: Vec<String> = Vec::new();

        if let Some(user_id) = &filter.user_id {
            query.push_str(" AND user_id = ?");
            bindings.push(user_id.to_string());
        }

        if let Some(is_active) = filter.is_active {
            query.push_str(if is_active { " AND is_active = 1" } else { " AND is_active = 0" });
        }

        if let Some(goal_type) = &filter.goal_type {
            query.push_str(" AND goal_type = ?");
            bindings.push(goal_type.as_str().to_string());
        }

        query.push_str(" ORDER BY created_at, id");

        let mut q = sqlx::query_as::<_, GoalRow>(&query);
        for binding in &bindings {
            q = q.bind(binding);
        }

        let rows: Vec<GoalRow> = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn active_for_user(&self, user_id: Uuid) -> DomainResult<Vec<Goal>> {
        self.list(GoalFilter {
            user_id: Some(user_id),
            is_active: Some(true),
            goal_type: None,
        })
        .await
    }
}

#[derive(sqlx::FromRow)]
struct GoalRow {
    id: String,
    user_id: String,
    name: String,
    goal_type: String,
    target: String,
    start_date: String,
    end_date: Option<String>,
    is_active: bool,
    current_value: i64,
    completed_at: Option<String>,
    version: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<GoalRow> for Goal {
    type Error = DomainError;

    fn try_from(row: GoalRow) -> Result<Self, Self::Error> {
        let goal_type = GoalType::from_str(&row.goal_type)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid goal type: {}", row.goal_type)))?;

        let target: GoalTarget = serde_json::from_str(&row.target)?;

        Ok(Goal {
            id: parse_uuid(&row.id)?,
            user_id: parse_uuid(&row.user_id)?,
            name: row.name,
            goal_type,
            target,
            start_date: parse_date(&row.start_date)?,
            end_date: row.end_date.as_deref().map(parse_date).transpose()?,
            is_active: row.is_active,
            current_value: row.current_value,
            completed_at: parse_optional_datetime(row.completed_at)?,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
            version: row.version,
        })
    }
}
