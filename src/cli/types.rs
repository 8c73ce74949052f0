//! CLI type definitions
//!
//! Top-level clap structures. Each subcommand's arguments live next to its
//! implementation under `commands`.

use clap::{Parser, Subcommand};

use super::commands::goal::GoalArgs;
use super::commands::init::InitArgs;
use super::commands::session::SessionArgs;

#[derive(Parser, Debug)]
#[command(name = "practice")]
#[command(about = "Practice session tracker with goal progress", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize configuration and database in the current directory
    Init(InitArgs),

    /// Goal management commands
    Goal(GoalArgs),

    /// Practice session commands
    Session(SessionArgs),
}
