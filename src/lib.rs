// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Resource Reconciler
//!
//! Idempotent state changes for LXC containers and Apache sites and modules.
//!
//! ## Overview
//!
//! Each invocation takes one resource and one requested state:
//!
//! - Start, stop, create or destroy an LXC container
//! - Enable or disable an Apache site or module
//!
//! It reports whether the system was changed. Running the same request twice
//! in a row reports `changed: false` the second time.
//!
//! ## Architecture
//!
//! 1. **Requested State**: CLI flags or a parameter file
//! 2. **Observed State**: Queried live from `lxc-info` / `a2query`
//! 3. **Reconciler**: Runs at most one corrective command and reports the outcome
//!
//! ## Modules
//!
//! - [`config`]: Parameter parsing and validation
//! - [`resource`]: Resource identity, states and command construction
//! - [`exec`]: External command execution
//! - [`reconciler`]: Per-resource reconciliation
//! - [`lock`]: Optional per-resource lock files
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! module: lxc
//! name: web01
//! action: create
//! template: ubuntu
//! template_options: "-r jammy"
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod exec;
pub mod lock;
pub mod reconciler;
pub mod resource;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigParser, ConfigValidator, ModuleParams, ToolConfig};
pub use error::{ReconcilerError, Result};
pub use exec::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
pub use lock::LockManager;
pub use reconciler::{Outcome, ReconciliationResult, Reconciler};
pub use resource::{ObservedState, Resource, ResourceKind};
