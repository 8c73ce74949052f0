//! SQLite database adapters for the practice tracker.

pub mod connection;
pub mod goal_repository;
pub mod migrations;
pub mod session_repository;
pub mod transaction;

pub use connection::{create_pool, create_test_pool, ConnectionError, PoolConfig};
pub use goal_repository::SqliteGoalRepository;
pub use migrations::{Migration, MigrationError, Migrator, MIGRATIONS};
pub use session_repository::SqliteSessionRepository;
pub use transaction::{SqliteGoalTransaction, SqliteTransactionManager};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a UUID string from a SQLite row field.
pub fn parse_uuid(s: &str) -> DomainResult<Uuid> {
    Uuid::parse_str(s).map_err(|e| DomainError::SerializationError(e.to_string()))
}

/// Parse an RFC3339 datetime string from a SQLite row field.
pub fn parse_datetime(s: &str) -> DomainResult<DateTime<Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map_err(|e| DomainError::SerializationError(e.to_string()))
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse an optional RFC3339 datetime string from a SQLite row field.
pub fn parse_optional_datetime(s: Option<String>) -> DomainResult<Option<DateTime<Utc>>> {
    s.map(|s| chrono::DateTime::parse_from_rfc3339(&s).map(|d| d.with_timezone(&Utc)))
        .transpose()
        .map_err(|e| DomainError::SerializationError(e.to_string()))
}

/// Parse a `YYYY-MM-DD` date from a SQLite row field.
pub fn parse_date(s: &str) -> DomainResult<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| DomainError::SerializationError(e.to_string()))
}

/// Timestamps are written with a fixed width and a `Z` suffix so that
/// string comparison in SQL matches chronological order.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn format_optional_timestamp(dt: Option<&DateTime<Utc>>) -> Option<String> {
    dt.map(format_timestamp)
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),
    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),
    #[error("Query error: {0}")]
    Query(#[from] sqlx::Error),
}

pub async fn initialize_database(database_url: &str, config: Option<PoolConfig>) -> Result<SqlitePool, DatabaseError> {
    let pool = create_pool(database_url, config).await?;
    let applied = Migrator::new(pool.clone()).migrate(MIGRATIONS).await?;
    if !applied.is_empty() {
        tracing::info!(?applied, database_url, "database migrations applied");
    }
    Ok(pool)
}

/// Create an in-memory test pool with all migrations applied.
pub async fn create_migrated_test_pool() -> Result<SqlitePool, DatabaseError> {
    let pool = create_test_pool().await?;
    Migrator::new(pool.clone()).migrate(MIGRATIONS).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamps_sort_lexicographically() {
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let late = early + chrono::Duration::microseconds(1);
        let day_end = Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 59).unwrap();

        assert!(format_timestamp(&early) < format_timestamp(&late));
        assert!(format_timestamp(&late) < format_timestamp(&day_end));
        assert!(format_timestamp(&early).ends_with('Z'));
    }

    #[test]
    fn test_timestamp_and_date_parse_back() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 12, 30, 0).unwrap();
        assert_eq!(parse_datetime(&format_timestamp(&at)).unwrap(), at);

        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(format_date(&date), "2024-03-05");
        assert_eq!(parse_date("2024-03-05").unwrap(), date);
        assert!(parse_date("05/03/2024").is_err());
    }
}
