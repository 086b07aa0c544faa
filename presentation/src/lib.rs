//! Presentation layer for dialogos
//!
//! This crate contains CLI definitions and console output formatters.

pub mod cli;
pub mod output;

// Re-export commonly used types
pub use cli::commands::{Cli, Command, GroupArgs, OutputFormat, PlanArgs, SimulateArgs, StoreArgs};
pub use output::console::ConsoleFormatter;
