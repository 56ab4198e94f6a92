//! Configuration module for the resource reconciler.
//!
//! This module handles everything that happens before reconciliation starts:
//! - Parameter types for both modules and the tool settings
//! - Loading parameter files and `RECONCILE_*` environment overrides
//! - Validation of parameter values

mod spec;
mod parser;
mod validator;

pub use spec::{ContainerParams, ModuleParams, ToolConfig, WebResourceParams};
pub use parser::{ConfigParser, ENV_LOCK_DIR, ENV_NO_SUDO};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
