//! Session CLI commands.
//!
//! Completing a session or a block publishes an event; the goal listeners
//! run on the queue and are drained before the process exits.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use uuid::Uuid;

use crate::application::AppContext;
use crate::cli::output::{format_duration, list_table, output, render_list, short_id, CommandOutput};
use crate::domain::models::{Session, SessionBlock, SessionStatus};
use crate::services::PlannedBlock;

#[derive(Args, Debug)]
pub struct SessionArgs {
    #[command(subcommand)]
    pub command: SessionCommands,
}

#[derive(Subcommand, Debug)]
pub enum SessionCommands {
    /// Create a pending session
    Create {
        /// Owner of the session
        #[arg(short, long, env = "PRACTICE_USER")]
        user: Uuid,
        /// Planned length in minutes (defaults to the sum of the blocks)
        #[arg(short, long)]
        minutes: Option<i64>,
        /// Planned block as type:minutes, in practice order
        #[arg(short, long = "block", value_parser = parse_planned_block)]
        blocks: Vec<PlannedBlock>,
    },
    /// Start a pending session
    Start {
        /// Session ID
        id: Uuid,
    },
    /// Pause an active session
    Pause {
        /// Session ID
        id: Uuid,
    },
    /// Resume a paused session
    Resume {
        /// Session ID
        id: Uuid,
    },
    /// Complete a session and update goal progress
    Complete {
        /// Session ID
        id: Uuid,
        /// Minutes practiced (defaults to completed blocks, then elapsed time)
        #[arg(short, long)]
        minutes: Option<i64>,
    },
    /// Append a block to a session
    AddBlock {
        /// Session ID
        session_id: Uuid,
        /// Kind of exercise, e.g. scales
        block_type: String,
        /// Planned length in minutes
        #[arg(short, long, default_value = "10")]
        minutes: i64,
    },
    /// Start a block of an active session
    StartBlock {
        /// Block ID
        id: Uuid,
    },
    /// Complete a block and update goal progress
    CompleteBlock {
        /// Block ID
        id: Uuid,
        /// Minutes practiced (defaults to time since start, then planned length)
        #[arg(short, long)]
        minutes: Option<i64>,
    },
    /// Skip a block
    SkipBlock {
        /// Block ID
        id: Uuid,
    },
    /// Show a session and its blocks
    Show {
        /// Session ID
        id: Uuid,
    },
    /// List sessions of a user, newest first
    List {
        /// Owner of the sessions
        #[arg(short, long, env = "PRACTICE_USER")]
        user: Uuid,
        /// Filter by status (pending, active, paused, completed)
        #[arg(short, long, value_parser = parse_session_status)]
        status: Option<SessionStatus>,
        /// Maximum number of sessions to display
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

fn parse_planned_block(s: &str) -> Result<PlannedBlock, String> {
    let (block_type, minutes) = s
        .rsplit_once(':')
        .ok_or_else(|| format!("block '{s}' must be type:minutes"))?;
    let minutes: i64 = minutes
        .trim()
        .parse()
        .map_err(|_| format!("block '{s}' has an invalid minute count"))?;
    if block_type.trim().is_empty() || minutes < 0 {
        return Err(format!("block '{s}' must be type:minutes with a non-negative count"));
    }
    Ok(PlannedBlock {
        block_type: block_type.trim().to_string(),
        planned_duration_secs: minutes * 60,
    })
}

fn parse_session_status(s: &str) -> Result<SessionStatus, String> {
    SessionStatus::from_str(s).ok_or_else(|| format!("unknown session status '{s}'"))
}

fn minutes_to_secs(minutes: Option<i64>) -> Option<i64> {
    minutes.map(|m| m.saturating_mul(60))
}

#[derive(Debug, serde::Serialize)]
pub struct BlockOutput {
    pub id: String,
    pub block_type: String,
    pub status: String,
    pub sort_order: i32,
    pub planned_duration_secs: i64,
    pub actual_duration_secs: Option<i64>,
}

impl From<&SessionBlock> for BlockOutput {
    fn from(block: &SessionBlock) -> Self {
        Self {
            id: block.id.to_string(),
            block_type: block.block_type.clone(),
            status: block.status.to_string(),
            sort_order: block.sort_order,
            planned_duration_secs: block.planned_duration_secs,
            actual_duration_secs: block.actual_duration_secs,
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct SessionOutput {
    pub id: String,
    pub user_id: String,
    pub status: String,
    pub planned_duration_secs: i64,
    pub actual_duration_secs: Option<i64>,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub blocks: Vec<BlockOutput>,
}

impl From<&Session> for SessionOutput {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id.to_string(),
            user_id: session.user_id.to_string(),
            status: session.status.to_string(),
            planned_duration_secs: session.planned_duration_secs,
            actual_duration_secs: session.actual_duration_secs,
            started_at: session.started_at.map(|t| t.to_rfc3339()),
            completed_at: session.completed_at.map(|t| t.to_rfc3339()),
            blocks: session.blocks.iter().map(BlockOutput::from).collect(),
        }
    }
}

impl CommandOutput for SessionOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Session: {}", self.id),
            format!("User: {}", self.user_id),
            format!("Status: {}", self.status),
            format!("Planned: {}", format_duration(self.planned_duration_secs)),
        ];
        if let Some(actual) = self.actual_duration_secs {
            lines.push(format!("Practiced: {}", format_duration(actual)));
        }
        if let Some(completed_at) = &self.completed_at {
            lines.push(format!("Completed: {completed_at}"));
        }

        if !self.blocks.is_empty() {
            let mut table = list_table(&["#", "id", "type", "status", "planned", "practiced"]);
            for block in &self.blocks {
                table.add_row(vec![
                    block.sort_order.to_string(),
                    short_id(&block.id).to_string(),
                    block.block_type.clone(),
                    block.status.clone(),
                    format_duration(block.planned_duration_secs),
                    block.actual_duration_secs.map_or_else(|| "-".to_string(), format_duration),
                ]);
            }
            lines.push(format!("\nBlocks:\n{table}"));
        }
        lines.join("\n")
    }
}

#[derive(Debug, serde::Serialize)]
pub struct SessionListOutput {
    pub sessions: Vec<SessionOutput>,
    pub total: usize,
}

impl CommandOutput for SessionListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "status", "planned", "practiced", "blocks", "completed"]);
        for session in &self.sessions {
            table.add_row(vec![
                short_id(&session.id).to_string(),
                session.status.clone(),
                format_duration(session.planned_duration_secs),
                session.actual_duration_secs.map_or_else(|| "-".to_string(), format_duration),
                session.blocks.len().to_string(),
                session.completed_at.clone().unwrap_or_else(|| "-".to_string()),
            ]);
        }
        render_list("session", &table, self.total)
    }
}

#[derive(Debug, serde::Serialize)]
pub struct SessionActionOutput {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<BlockOutput>,
}

impl SessionActionOutput {
    fn session(message: String, session: &Session) -> Self {
        Self { success: true, message, session: Some(SessionOutput::from(session)), block: None }
    }

    fn block(message: String, block: &SessionBlock) -> Self {
        Self { success: true, message, session: None, block: Some(BlockOutput::from(block)) }
    }
}

impl CommandOutput for SessionActionOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }
}

pub async fn execute(args: SessionArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let sessions = &ctx.sessions;

    let out = match args.command {
        SessionCommands::Create { user, minutes, blocks } => {
            let planned = minutes_to_secs(minutes)
                .unwrap_or_else(|| blocks.iter().map(|b| b.planned_duration_secs).sum());
            let session = sessions
                .create_session(user, planned, blocks)
                .await
                .context("Failed to create session")?;
            SessionActionOutput::session(format!("Session created: {}", session.id), &session)
        }
        SessionCommands::Start { id } => {
            let session = sessions.start_session(id).await?;
            SessionActionOutput::session(format!("Session started: {id}"), &session)
        }
        SessionCommands::Pause { id } => {
            let session = sessions.pause_session(id).await?;
            SessionActionOutput::session(format!("Session paused: {id}"), &session)
        }
        SessionCommands::Resume { id } => {
            let session = sessions.resume_session(id).await?;
            SessionActionOutput::session(format!("Session resumed: {id}"), &session)
        }
        SessionCommands::Complete { id, minutes } => {
            let session = sessions.complete_session(id, minutes_to_secs(minutes)).await?;
            let practiced = session.actual_duration_secs.unwrap_or_default();
            SessionActionOutput::session(
                format!("Session completed: {id} ({})", format_duration(practiced)),
                &session,
            )
        }
        SessionCommands::AddBlock { session_id, block_type, minutes } => {
            let block = sessions.add_block(session_id, block_type, minutes.saturating_mul(60)).await?;
            SessionActionOutput::block(format!("Block added: {}", block.id), &block)
        }
        SessionCommands::StartBlock { id } => {
            let block = sessions.start_block(id).await?;
            SessionActionOutput::block(format!("Block started: {id}"), &block)
        }
        SessionCommands::CompleteBlock { id, minutes } => {
            let block = sessions.complete_block(id, minutes_to_secs(minutes)).await?;
            SessionActionOutput::block(format!("Block completed: {id}"), &block)
        }
        SessionCommands::SkipBlock { id } => {
            let block = sessions.skip_block(id).await?;
            SessionActionOutput::block(format!("Block skipped: {id}"), &block)
        }
        SessionCommands::Show { id } => {
            let session = sessions.get_session(id).await?;
            output(&SessionOutput::from(&session), json_mode);
            return Ok(());
        }
        SessionCommands::List { user, status, limit } => {
            let list = sessions
                .list_sessions(user, status, limit)
                .await
                .context("Failed to list sessions")?;
            let out = SessionListOutput {
                total: list.len(),
                sessions: list.iter().map(SessionOutput::from).collect(),
            };
            output(&out, json_mode);
            return Ok(());
        }
    };

    output(&out, json_mode);
    Ok(())
}
