//! Command-line interface for the reconcile tool.

mod commands;
mod output;

pub use commands::{Cli, Commands, LogFormat, OutputFormat};
pub use output::{OutputFormatter, StatusEntry};
