//! Application services: goal progress, the event queue and the session
//! lifecycle that feeds it.

pub mod event_queue;
pub mod goal_progress;
pub mod goal_service;
pub mod listeners;
pub mod retry;
pub mod session_service;
pub mod transaction;

pub use event_queue::{DeadLetter, EventListener, EventQueue, QueueStats};
pub use goal_progress::{GoalProgressService, GoalProgressStrategy, ProgressReport, StrategyRegistry};
pub use goal_service::GoalService;
pub use listeners::{UpdateGoalProgressAfterSession, UpdateGoalProgressAfterSessionBlock};
pub use retry::RetryPolicy;
pub use session_service::{PlannedBlock, SessionService};
pub use transaction::{TransactionOutcome, TransactionalExecutor};
