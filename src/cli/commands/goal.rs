//! Goal CLI commands.

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Args, Subcommand};
use uuid::Uuid;

use crate::application::AppContext;
use crate::cli::output::{format_duration, list_table, output, render_list, short_id, truncate, CommandOutput};
use crate::domain::models::{Goal, GoalProgress, GoalTarget, GoalType, ProgressWindow};
use crate::domain::ports::GoalFilter;
use crate::services::ProgressReport;

#[derive(Args, Debug)]
pub struct GoalArgs {
    #[command(subcommand)]
    pub command: GoalCommands,
}

#[derive(Subcommand, Debug)]
pub enum GoalCommands {
    /// Create a new goal
    Create {
        /// Goal name
        name: String,
        /// Owner of the goal
        #[arg(short, long, env = "PRACTICE_USER")]
        user: Uuid,
        /// Goal type (practice_duration, session_count, block_count)
        #[arg(short = 't', long = "type", value_parser = parse_goal_type)]
        goal_type: GoalType,
        /// Target parameter as key=value, e.g. minutes=300 or block_type=scales
        #[arg(long = "target", required = true)]
        target: Vec<String>,
        /// First day counted (defaults to today)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Last day counted
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// List goals
    List {
        /// Filter by owner
        #[arg(short, long, env = "PRACTICE_USER")]
        user: Option<Uuid>,
        /// Filter by goal type
        #[arg(short = 't', long = "type", value_parser = parse_goal_type)]
        goal_type: Option<GoalType>,
        /// Include completed and inactive goals
        #[arg(short, long)]
        all: bool,
    },
    /// Show goal details and progress
    Show {
        /// Goal ID
        id: Uuid,
    },
    /// Recompute progress for one goal or for all active goals of a user
    Recompute {
        /// Goal ID
        #[arg(conflicts_with = "user")]
        id: Option<Uuid>,
        /// Recompute every active goal of this user
        #[arg(short, long)]
        user: Option<Uuid>,
        /// Window start, overrides the goal's own (single goal only)
        #[arg(long, requires = "id", requires = "to")]
        from: Option<NaiveDate>,
        /// Window end, overrides the goal's own (single goal only)
        #[arg(long, requires = "id", requires = "from")]
        to: Option<NaiveDate>,
    },
    /// Complete every active goal of a user that reached its target
    Check {
        /// Owner of the goals
        #[arg(short, long, env = "PRACTICE_USER")]
        user: Uuid,
    },
}

fn parse_goal_type(s: &str) -> Result<GoalType, String> {
    GoalType::from_str(s).ok_or_else(|| {
        format!("unknown goal type '{s}' (expected practice_duration, session_count or block_count)")
    })
}

/// Stored value rendered in the goal's unit.
fn display_value(goal_type: GoalType, value: i64) -> String {
    match goal_type {
        GoalType::PracticeDuration => format_duration(value),
        GoalType::SessionCount | GoalType::BlockCount => value.to_string(),
    }
}

#[derive(Debug, serde::Serialize)]
pub struct GoalOutput {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub goal_type: GoalType,
    pub target: GoalTarget,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub is_active: bool,
    pub current_value: i64,
    pub completed_at: Option<String>,
}

impl From<&Goal> for GoalOutput {
    fn from(goal: &Goal) -> Self {
        Self {
            id: goal.id.to_string(),
            user_id: goal.user_id.to_string(),
            name: goal.name.clone(),
            goal_type: goal.goal_type,
            target: goal.target.clone(),
            start_date: goal.start_date,
            end_date: goal.end_date,
            is_active: goal.is_active,
            current_value: goal.current_value,
            completed_at: goal.completed_at.map(|t| t.to_rfc3339()),
        }
    }
}

impl GoalOutput {
    fn status(&self) -> &'static str {
        match (self.completed_at.is_some(), self.is_active) {
            (true, _) => "completed",
            (false, true) => "active",
            (false, false) => "inactive",
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct GoalListOutput {
    pub goals: Vec<GoalOutput>,
    pub total: usize,
}

impl CommandOutput for GoalListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "name", "type", "status", "progress", "window"]);
        for goal in &self.goals {
            let window = match goal.end_date {
                Some(end) => format!("{} .. {end}", goal.start_date),
                None => format!("{} ..", goal.start_date),
            };
            table.add_row(vec![
                short_id(&goal.id).to_string(),
                truncate(&goal.name, 24),
                goal.goal_type.to_string(),
                goal.status().to_string(),
                display_value(goal.goal_type, goal.current_value),
                window,
            ]);
        }
        render_list("goal", &table, self.total)
    }
}

#[derive(Debug, serde::Serialize)]
pub struct GoalDetailOutput {
    pub goal: GoalOutput,
    pub progress: Option<GoalProgress>,
    pub progress_error: Option<String>,
    pub days_remaining: Option<i64>,
}

impl CommandOutput for GoalDetailOutput {
    fn to_human(&self) -> String {
        let goal = &self.goal;
        let mut lines = vec![
            format!("Goal: {}", goal.name),
            format!("ID: {}", goal.id),
            format!("User: {}", goal.user_id),
            format!("Type: {}", goal.goal_type),
            format!(
                "Target: {}",
                serde_json::to_string(&goal.target).unwrap_or_default()
            ),
            format!("Status: {}", goal.status()),
            format!(
                "Window: {} .. {}",
                goal.start_date,
                goal.end_date.map_or_else(|| "open".to_string(), |d| d.to_string())
            ),
        ];

        match (&self.progress, &self.progress_error) {
            (Some(progress), _) => lines.push(format!(
                "Progress: {} / {} ({:.1}%)",
                display_value(goal.goal_type, progress.current_value),
                display_value(goal.goal_type, progress.total_value),
                progress.percent
            )),
            (None, Some(err)) => lines.push(format!("Progress: unavailable ({err})")),
            (None, None) => {}
        }

        if let (Some(days), None) = (self.days_remaining, &goal.completed_at) {
            lines.push(format!("Days remaining: {days}"));
        }

        if let Some(completed_at) = &goal.completed_at {
            lines.push(format!("Completed: {completed_at}"));
        }
        lines.join("\n")
    }
}

#[derive(Debug, serde::Serialize)]
pub struct GoalActionOutput {
    pub success: bool,
    pub message: String,
    pub goal: Option<GoalOutput>,
}

impl CommandOutput for GoalActionOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ProgressReportOutput {
    pub success: bool,
    #[serde(flatten)]
    pub report: ProgressReport,
}

impl CommandOutput for ProgressReportOutput {
    fn to_human(&self) -> String {
        let report = &self.report;
        let mut lines = vec![format!(
            "Updated: {}  Unchanged: {}  Completed: {}  Skipped: {}  Failed: {}",
            report.updated.len(),
            report.unchanged.len(),
            report.completed.len(),
            report.skipped.len(),
            report.failed.len()
        )];
        for id in &report.completed {
            lines.push(format!("  completed {id}"));
        }
        for issue in &report.skipped {
            lines.push(format!("  skipped {}: {}", issue.goal_id, issue.reason));
        }
        for issue in &report.failed {
            lines.push(format!("  failed {}: {}", issue.goal_id, issue.reason));
        }
        lines.join("\n")
    }
}

impl From<ProgressReport> for ProgressReportOutput {
    fn from(report: ProgressReport) -> Self {
        Self {
            success: !report.has_failures(),
            report,
        }
    }
}

pub async fn execute(args: GoalArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    match args.command {
        GoalCommands::Create { name, user, goal_type, target, start, end } => {
            let target = GoalTarget::from_pairs(target.iter().map(String::as_str))?;
            let start = start.unwrap_or_else(|| Utc::now().date_naive());

            let goal = ctx
                .goals
                .create_goal(user, name, goal_type, target, start, end)
                .await
                .context("Failed to create goal")?;

            // Sessions already recorded inside the window count from the start.
            let report = ctx.progress.recalculate_goal(goal.id, None).await?;
            let goal = ctx.goals.get_goal(goal.id).await?.unwrap_or(goal);

            let message = if report.completed.is_empty() {
                format!("Goal created: {}", goal.id)
            } else {
                format!("Goal created: {} (already reached)", goal.id)
            };
            output(
                &GoalActionOutput { success: true, message, goal: Some(GoalOutput::from(&goal)) },
                json_mode,
            );
        }

        GoalCommands::List { user, goal_type, all } => {
            let filter = GoalFilter {
                user_id: user,
                is_active: if all { None } else { Some(true) },
                goal_type,
            };
            let goals = ctx.goals.list_goals(filter).await?;
            let out = GoalListOutput {
                total: goals.len(),
                goals: goals.iter().map(GoalOutput::from).collect(),
            };
            output(&out, json_mode);
        }

        GoalCommands::Show { id } => {
            let goal = ctx
                .goals
                .get_goal(id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Goal not found: {id}"))?;

            let (progress, progress_error) = match ctx.progress.goal_progress(id).await {
                Ok(progress) => (Some(progress), None),
                Err(err) => (None, Some(err.to_string())),
            };

            let out = GoalDetailOutput {
                goal: GoalOutput::from(&goal),
                progress,
                progress_error,
                days_remaining: goal.days_remaining(Utc::now().date_naive()),
            };
            output(&out, json_mode);
        }

        GoalCommands::Recompute { id, user, from, to } => {
            let report = match (id, user) {
                (Some(goal_id), _) => {
                    let window = match (from, to) {
                        (Some(from), Some(to)) => Some(ProgressWindow::for_dates(from, to)?),
                        _ => None,
                    };
                    ctx.progress.recalculate_goal(goal_id, window).await?
                }
                (None, Some(user_id)) => ctx.progress.recalculate_user(user_id).await?,
                (None, None) => bail!("Either a goal ID or --user is required"),
            };
            output(&ProgressReportOutput::from(report), json_mode);
        }

        GoalCommands::Check { user } => {
            let report = ctx.progress.check_and_complete_goals(user).await?;
            output(&ProgressReportOutput::from(report), json_mode);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_goal_type_aliases() {
        assert_eq!(parse_goal_type("duration").unwrap(), GoalType::PracticeDuration);
        assert_eq!(parse_goal_type("session-count").unwrap(), GoalType::SessionCount);
        assert!(parse_goal_type("streak").is_err());
    }

    #[test]
    fn test_display_value_uses_goal_unit() {
        assert_eq!(display_value(GoalType::PracticeDuration, 5400), "1h 30m");
        assert_eq!(display_value(GoalType::SessionCount, 3), "3");
    }

    #[test]
    fn test_detail_output_shows_days_remaining() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let goal = Goal::new(Uuid::new_v4(), "January", GoalType::SessionCount, GoalTarget::new().with("sessions", 5), start)
            .with_end_date(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        let out = GoalDetailOutput {
            goal: GoalOutput::from(&goal),
            progress: None,
            progress_error: None,
            days_remaining: goal.days_remaining(NaiveDate::from_ymd_opt(2024, 1, 21).unwrap()),
        };
        assert!(out.to_human().contains("Days remaining: 10"));
        assert_eq!(out.to_json()["days_remaining"], 10);

        let open = GoalDetailOutput { days_remaining: None, ..out };
        assert!(!open.to_human().contains("Days remaining"));
    }

    #[test]
    fn test_report_output_marks_failures() {
        let report = ProgressReport {
            failed: vec![crate::services::goal_progress::GoalIssue {
                goal_id: Uuid::nil(),
                reason: "conflict".to_string(),
            }],
            ..ProgressReport::default()
        };
        let out = ProgressReportOutput::from(report);
        assert!(!out.success);
        assert!(out.to_human().contains("failed"));
        assert_eq!(out.to_json()["failed"][0]["reason"], "conflict");
    }
}
