//! CLI command handlers
//!
//! - Argument parsing structures
//! - Command implementations
//! - Progress rendering

pub mod args;
pub mod commands;
pub mod progress;
pub mod router;

pub use args::{Cli, Commands};
pub use router::execute_command;
