//! CLI command implementations.

pub mod goal;
pub mod init;
pub mod session;
