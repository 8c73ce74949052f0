//! Implementation of the `practice init` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tokio::fs;

use crate::adapters::sqlite::initialize_database;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::config::loader::PROJECT_DIR;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Rewrite the configuration file even if already initialized
    #[arg(long, short)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub initialized_path: PathBuf,
    pub config_written: bool,
    pub database_path: Option<PathBuf>,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if self.config_written {
            lines.push(format!("\nConfiguration written to {PROJECT_DIR}/config.yaml"));
        }
        if let Some(db) = &self.database_path {
            lines.push(format!("Database initialized at {}", db.display()));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: InitArgs, json_mode: bool) -> Result<()> {
    let target_path = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(&args.path)
    };

    let project_dir = target_path.join(PROJECT_DIR);
    let config_path = project_dir.join("config.yaml");

    if config_path.exists() && !args.force {
        let output_data = InitOutput {
            success: false,
            message: "Project already initialized. Use --force to rewrite the configuration.".to_string(),
            initialized_path: target_path,
            config_written: false,
            database_path: None,
        };
        output(&output_data, json_mode);
        return Ok(());
    }

    fs::create_dir_all(&project_dir)
        .await
        .with_context(|| format!("Failed to create {}", project_dir.display()))?;

    let mut config = Config::default();
    let db_path = target_path.join(&config.database.path);
    config.database.path = db_path.display().to_string();

    let yaml = serde_yaml::to_string(&config).context("Failed to serialize default configuration")?;
    fs::write(&config_path, yaml)
        .await
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    // Existing data is kept; migrations only add what is missing.
    let pool = initialize_database(&config.database.url(), None)
        .await
        .context("Failed to initialize database")?;
    pool.close().await;

    tracing::info!(path = %target_path.display(), "project initialized");

    let output_data = InitOutput {
        success: true,
        message: if args.force {
            "Project reinitialized successfully.".to_string()
        } else {
            "Project initialized successfully.".to_string()
        },
        initialized_path: target_path,
        config_written: true,
        database_path: Some(db_path),
    };
    output(&output_data, json_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::ConfigLoader;

    #[tokio::test]
    async fn test_init_creates_config_and_database() {
        let dir = tempfile::tempdir().unwrap();
        let args = InitArgs { force: false, path: dir.path().to_path_buf() };

        execute(args, true).await.unwrap();

        let config_path = dir.path().join(PROJECT_DIR).join("config.yaml");
        assert!(config_path.exists());
        assert!(dir.path().join(PROJECT_DIR).join("practice.db").exists());

        let config = ConfigLoader::load_from_file(&config_path).unwrap();
        assert!(config.database.path.ends_with("practice.db"));
    }

    #[tokio::test]
    async fn test_init_twice_keeps_existing_config() {
        let dir = tempfile::tempdir().unwrap();
        execute(InitArgs { force: false, path: dir.path().to_path_buf() }, true).await.unwrap();

        let config_path = dir.path().join(PROJECT_DIR).join("config.yaml");
        std::fs::write(&config_path, "queue:\n  workers: 2\n").unwrap();

        execute(InitArgs { force: false, path: dir.path().to_path_buf() }, true).await.unwrap();
        let content = std::fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("workers: 2"));

        execute(InitArgs { force: true, path: dir.path().to_path_buf() }, true).await.unwrap();
        let content = std::fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("workers: 4"));
    }
}
