//! Domain layer for the practice tracker
//!
//! This module contains the domain models, events, errors and the port
//! traits infrastructure adapters implement.

pub mod errors;
pub mod events;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
