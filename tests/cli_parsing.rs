use chrono::NaiveDate;
use clap::Parser;
use uuid::Uuid;

use practice_tracker::cli::commands::goal::GoalCommands;
use practice_tracker::cli::commands::session::SessionCommands;
use practice_tracker::cli::{Cli, Commands};
use practice_tracker::domain::models::{GoalType, SessionStatus};

const USER: &str = "550e8400-e29b-41d4-a716-446655440000";

#[test]
fn test_parse_init() {
    let cli = Cli::try_parse_from(["practice", "init", "--force"]).unwrap();
    match cli.command {
        Commands::Init(args) => {
            assert!(args.force);
            assert_eq!(args.path.to_str(), Some("."));
        }
        _ => panic!("Wrong top-level command"),
    }
    assert!(!cli.json);
}

#[test]
fn test_parse_goal_create() {
    let cli = Cli::try_parse_from([
        "practice",
        "goal",
        "create",
        "Weekly scales",
        "--user",
        USER,
        "--type",
        "block_count",
        "--target",
        "blocks_per_week=5",
        "--target",
        "block_type=scales",
        "--start",
        "2024-01-01",
        "--end",
        "2024-03-31",
        "--json",
    ])
    .unwrap();

    assert!(cli.json, "--json is global");
    match cli.command {
        Commands::Goal(args) => match args.command {
            GoalCommands::Create { name, user, goal_type, target, start, end } => {
                assert_eq!(name, "Weekly scales");
                assert_eq!(user, Uuid::parse_str(USER).unwrap());
                assert_eq!(goal_type, GoalType::BlockCount);
                assert_eq!(target, vec!["blocks_per_week=5", "block_type=scales"]);
                assert_eq!(start, NaiveDate::from_ymd_opt(2024, 1, 1));
                assert_eq!(end, NaiveDate::from_ymd_opt(2024, 3, 31));
            }
            _ => panic!("Wrong goal command"),
        },
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_goal_create_requires_target() {
    let result = Cli::try_parse_from([
        "practice", "goal", "create", "No target", "--user", USER, "--type", "duration",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_goal_create_rejects_unknown_type() {
    let result = Cli::try_parse_from([
        "practice", "goal", "create", "Streak", "--user", USER, "--type", "streak", "--target", "days=3",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_parse_goal_recompute_with_window() {
    let goal_id = Uuid::new_v4().to_string();
    let cli = Cli::try_parse_from([
        "practice", "goal", "recompute", &goal_id, "--from", "2024-01-01", "--to", "2024-01-07",
    ])
    .unwrap();

    match cli.command {
        Commands::Goal(args) => match args.command {
            GoalCommands::Recompute { id, user, from, to } => {
                assert_eq!(id.map(|i| i.to_string()), Some(goal_id));
                assert!(user.is_none());
                assert_eq!(from, NaiveDate::from_ymd_opt(2024, 1, 1));
                assert_eq!(to, NaiveDate::from_ymd_opt(2024, 1, 7));
            }
            _ => panic!("Wrong goal command"),
        },
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_goal_recompute_window_needs_both_bounds() {
    let goal_id = Uuid::new_v4().to_string();
    let result = Cli::try_parse_from(["practice", "goal", "recompute", &goal_id, "--from", "2024-01-01"]);
    assert!(result.is_err());
}

#[test]
fn test_goal_recompute_id_conflicts_with_user() {
    let goal_id = Uuid::new_v4().to_string();
    let result = Cli::try_parse_from(["practice", "goal", "recompute", &goal_id, "--user", USER]);
    assert!(result.is_err());
}

#[test]
fn test_parse_session_create_with_blocks() {
    let cli = Cli::try_parse_from([
        "practice", "session", "create", "--user", USER, "--block", "scales:10", "--block", "etudes:20",
    ])
    .unwrap();

    match cli.command {
        Commands::Session(args) => match args.command {
            SessionCommands::Create { user, minutes, blocks } => {
                assert_eq!(user, Uuid::parse_str(USER).unwrap());
                assert!(minutes.is_none());
                assert_eq!(blocks.len(), 2);
                assert_eq!(blocks[0].block_type, "scales");
                assert_eq!(blocks[1].planned_duration_secs, 1200);
            }
            _ => panic!("Wrong session command"),
        },
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_parse_session_complete_block() {
    let block_id = Uuid::new_v4();
    let cli = Cli::try_parse_from([
        "practice",
        "session",
        "complete-block",
        &block_id.to_string(),
        "--minutes",
        "12",
    ])
    .unwrap();

    match cli.command {
        Commands::Session(args) => match args.command {
            SessionCommands::CompleteBlock { id, minutes } => {
                assert_eq!(id, block_id);
                assert_eq!(minutes, Some(12));
            }
            _ => panic!("Wrong session command"),
        },
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_parse_session_list_status() {
    let cli = Cli::try_parse_from([
        "practice", "session", "list", "--user", USER, "--status", "completed", "--limit", "5",
    ])
    .unwrap();

    match cli.command {
        Commands::Session(args) => match args.command {
            SessionCommands::List { status, limit, .. } => {
                assert_eq!(status, Some(SessionStatus::Completed));
                assert_eq!(limit, 5);
            }
            _ => panic!("Wrong session command"),
        },
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_session_id_must_be_uuid() {
    assert!(Cli::try_parse_from(["practice", "session", "start", "not-a-uuid"]).is_err());
}
