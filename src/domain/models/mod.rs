//! Domain models for the practice tracker.

pub mod config;
pub mod goal;
pub mod session;

pub use config::{
    Config, DatabaseConfig, LoggingConfig, ProgressConfig, QueueConfig, RetryConfig,
};
pub use goal::{end_of_day, start_of_day, Goal, GoalProgress, GoalTarget, GoalType, ProgressWindow};
pub use session::{BlockStatus, Session, SessionBlock, SessionStatus};
