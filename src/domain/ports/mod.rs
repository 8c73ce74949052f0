//! Port trait definitions (Hexagonal Architecture)
//!
//! Async trait interfaces that infrastructure adapters implement:
//! - GoalRepository: goal persistence
//! - SessionRepository: session/block persistence and progress aggregates
//! - TransactionManager / GoalTransaction: explicit transaction handles
//! - EventPublisher: hand-off of domain events to the listener queue

pub mod event_publisher;
pub mod goal_repository;
pub mod session_repository;
pub mod transaction;

pub use event_publisher::{EventPublisher, NullEventPublisher};
pub use goal_repository::{GoalFilter, GoalRepository};
pub use session_repository::SessionRepository;
pub use transaction::{GoalTransaction, TransactionManager};
