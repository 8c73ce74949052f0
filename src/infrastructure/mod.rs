//! Infrastructure layer module
//!
//! Cross-cutting concerns that sit outside the domain:
//! - Configuration management (figment)
//! - Logging infrastructure (tracing)
//!
//! Persistence adapters live under `adapters`.

pub mod config;
pub mod logging;
