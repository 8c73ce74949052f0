//! Practice tracker
//!
//! Tracks timed practice sessions made of exercise blocks and keeps goal
//! progress up to date. Completing a session or a block publishes a domain
//! event; queued listeners hand it to the goal progress service, which
//! recomputes every active goal of the user through a per-goal-type strategy
//! and completes the goals that reached their target.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, events, errors and port traits
//! - **Service Layer** (`services`): goal progress, listener queue, session lifecycle
//! - **Adapters** (`adapters`): `SQLite` persistence behind the ports
//! - **Application Layer** (`application`): wiring of the above
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): the `practice` command

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::AppContext;
pub use domain::errors::{DomainError, DomainResult};
pub use domain::events::{EventPayload, PracticeEvent};
pub use domain::models::{
    Config, Goal, GoalProgress, GoalTarget, GoalType, ProgressWindow, Session, SessionBlock,
    SessionStatus,
};
pub use domain::ports::{EventPublisher, GoalRepository, SessionRepository};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    EventQueue, GoalProgressService, GoalProgressStrategy, ProgressReport, StrategyRegistry,
    TransactionalExecutor,
};
