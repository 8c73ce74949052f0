//! Goal progress calculation.
//!
//! One [`GoalProgressStrategy`] per goal type, looked up through the
//! [`StrategyRegistry`], and the [`GoalProgressService`] that recomputes and
//! completes goals with them.

pub mod block_count;
pub mod duration;
pub mod registry;
pub mod service;
pub mod session_count;
pub mod strategy;

pub use block_count::BlockCountStrategy;
pub use duration::PracticeDurationStrategy;
pub use registry::StrategyRegistry;
pub use service::{GoalIssue, GoalProgressService, ProgressReport};
pub use session_count::SessionCountStrategy;
pub use strategy::GoalProgressStrategy;
