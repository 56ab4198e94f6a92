//! External command execution.
//!
//! The reconciler talks to the system only through [`CommandRunner`], which
//! keeps the decision logic testable without real LXC or Apache tooling.

mod runner;

pub use runner::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
