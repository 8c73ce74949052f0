//! Embedded schema migrations for the practice database.

use sqlx::{Executor, SqlitePool};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Failed to apply migration {version} ({description}): {source}")]
    ApplyFailed {
        version: i64,
        description: &'static str,
        #[source]
        source: sqlx::Error,
    },
    #[error("Failed to prepare migration bookkeeping: {0}")]
    Bookkeeping(#[source] sqlx::Error),
}

/// One schema step. Versions are applied in ascending order.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub sql: &'static str,
}

/// Every migration shipped with the binary.
pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "goals, sessions and session blocks",
    sql: include_str!("../../../migrations/001_initial_schema.sql"),
}];

pub struct Migrator {
    pool: SqlitePool,
}

impl Migrator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Bring the schema up to date. Returns the versions applied by this call.
    pub async fn migrate(&self, migrations: &[Migration]) -> Result<Vec<i64>, MigrationError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(MigrationError::Bookkeeping)?;

        let current = self.schema_version().await?;
        let mut pending: Vec<&Migration> = migrations.iter().filter(|m| m.version > current).collect();
        pending.sort_by_key(|m| m.version);

        let mut applied = Vec::with_capacity(pending.len());
        for migration in pending {
            self.apply(migration).await?;
            tracing::debug!(version = migration.version, description = migration.description, "schema migration applied");
            applied.push(migration.version);
        }
        Ok(applied)
    }

    /// Highest applied version, zero on a fresh database.
    pub async fn schema_version(&self) -> Result<i64, MigrationError> {
        let (version,): (i64,) = sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
            .fetch_one(&self.pool)
            .await
            .map_err(MigrationError::Bookkeeping)?;
        Ok(version)
    }

    // The script and its bookkeeping row commit together.
    async fn apply(&self, migration: &Migration) -> Result<(), MigrationError> {
        let failed = |source| MigrationError::ApplyFailed {
            version: migration.version,
            description: migration.description,
            source,
        };

        let mut tx = self.pool.begin().await.map_err(failed)?;
        (&mut *tx).execute(migration.sql).await.map_err(failed)?;
        sqlx::query("INSERT INTO schema_migrations (version, description) VALUES (?, ?)")
            .bind(migration.version)
            .bind(migration.description)
            .execute(&mut *tx)
            .await
            .map_err(failed)?;
        tx.commit().await.map_err(failed)
    }
}
