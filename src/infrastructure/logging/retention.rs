//! Removal of rolled log files past their retention period

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use super::logger::LOG_FILE_NAME;

/// Deletes rolled log files older than `retention_days`.
#[derive(Debug, Clone, Copy)]
pub struct LogRetention {
    retention_days: u32,
}

impl LogRetention {
    pub const fn new(retention_days: u32) -> Self {
        Self { retention_days }
    }

    /// Delete files named `practice.log*` in `log_dir` last modified before the cutoff.
    ///
    /// Returns the number of deleted files.
    pub async fn cleanup_old_logs(&self, log_dir: impl AsRef<Path>) -> Result<usize> {
        let log_dir = log_dir.as_ref();

        if !log_dir.exists() {
            warn!(path = %log_dir.display(), "log directory does not exist");
            return Ok(0);
        }

        let cutoff = Utc::now() - Duration::days(i64::from(self.retention_days));
        let mut deleted_count = 0;

        let mut entries = tokio::fs::read_dir(log_dir)
            .await
            .context("failed to read log directory")?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .context("failed to read directory entry")?
        {
            let path = entry.path();
            let is_log_file = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(LOG_FILE_NAME));
            if !is_log_file {
                continue;
            }

            let modified: DateTime<Utc> = tokio::fs::metadata(&path)
                .await
                .context("failed to get file metadata")?
                .modified()
                .context("failed to get file modification time")?
                .into();

            if modified < cutoff {
                tokio::fs::remove_file(&path)
                    .await
                    .context("failed to delete old log file")?;
                deleted_count += 1;
            }
        }

        if deleted_count > 0 {
            info!(count = deleted_count, "cleaned up old log files");
        }

        Ok(deleted_count)
    }
}
