//! Error types for the resource reconciler.
//!
//! This module provides the error hierarchy for every stage of a single
//! invocation: parameter loading, external command execution, locking and
//! the reconciliation itself.
//!
//! Informational no-ops (an absent container asked to start, a container that
//! already exists asked to be created) are not errors; they are
//! reported through [`crate::reconciler::Outcome`].

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the reconciler.
#[derive(Debug, Error)]
pub enum ReconcilerError {
    /// Configuration or parameter errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// External command execution errors.
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// Reconciliation errors.
    #[error("{0}")]
    Reconcile(#[from] ReconcileError),

    /// Resource lock errors.
    #[error("Lock error: {0}")]
    Lock(#[from] LockError),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration and parameter errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The parameter file was not found.
    #[error("Parameter file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The parameter file could not be parsed.
    #[error("Failed to parse parameters: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Parameter validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// An option value is not one of the accepted choices.
    #[error("Invalid value '{value}' for {option} (choices: {choices})")]
    InvalidOption {
        /// Option name.
        option: String,
        /// Rejected value.
        value: String,
        /// Accepted values, comma separated.
        choices: String,
    },
}

/// Errors raised while launching an external command.
///
/// A command that *ran* and exited non-zero is not a `CommandError`; its exit
/// status is inspected by the reconciler.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The binary could not be located on `PATH`.
    #[error("Required tool '{program}' not found: {message}")]
    ToolNotFound {
        /// Program name that was looked up.
        program: String,
        /// Resolver message.
        message: String,
    },

    /// The process could not be spawned or waited on.
    #[error("Failed to run '{program}': {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying IO error.
        source: std::io::Error,
    },
}

/// Reconciliation errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The status query could not be run or produced unusable output.
    #[error("Cannot {action} {resource}: status is unavailable: {reason}")]
    StatusUnavailable {
        /// Resource whose status was queried.
        resource: String,
        /// Action the status was needed for ("query" for a plain status check).
        action: String,
        /// Why the status could not be determined.
        reason: String,
    },

    /// The corrective command ran but reported failure.
    #[error("Failed to {action} {resource}: {output}")]
    CorrectiveActionFailed {
        /// Resource being reconciled.
        resource: String,
        /// Attempted action (e.g. "enable", "start").
        action: String,
        /// Captured diagnostic output of the failing command.
        output: String,
    },
}

/// Per-resource lock errors.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another live invocation holds the lock.
    #[error("Cannot {action} {resource}: locked by {holder} until {expires_at}")]
    Held {
        /// Locked resource.
        resource: String,
        /// Action that was refused.
        action: String,
        /// Identifier of the lock holder.
        holder: String,
        /// Expiry timestamp of the held lock.
        expires_at: String,
    },

    /// The lock file exists but cannot be decoded.
    #[error("Lock file {path} is corrupted: {message}")]
    Corrupted {
        /// Lock file path.
        path: PathBuf,
        /// Decode error.
        message: String,
    },

    /// Lock file IO failed.
    #[error("Lock file {path}: {source}")]
    Io {
        /// Lock file path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
}

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, ReconcilerError>;

impl ReconcilerError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error means the external tooling is missing or broken.
    #[must_use]
    pub const fn is_tooling_failure(&self) -> bool {
        matches!(
            self,
            Self::Command(_) | Self::Reconcile(ReconcileError::StatusUnavailable { .. })
        )
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates an invalid-choice error.
    #[must_use]
    pub fn invalid_option(option: &str, value: &str, choices: &[&str]) -> Self {
        Self::InvalidOption {
            option: option.to_string(),
            value: value.to_string(),
            choices: choices.join(", "),
        }
    }
}

impl ReconcileError {
    /// Creates a status-unavailable error.
    #[must_use]
    pub fn status_unavailable(
        resource: impl Into<String>,
        action: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::StatusUnavailable {
            resource: resource.into(),
            action: action.into(),
            reason: reason.into(),
        }
    }

    /// Creates a corrective-action failure carrying the tool output verbatim.
    #[must_use]
    pub fn corrective_failed(
        resource: impl Into<String>,
        action: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self::CorrectiveActionFailed {
            resource: resource.into(),
            action: action.into(),
            output: output.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrective_failure_message_keeps_output() {
        let err = ReconcilerError::from(ReconcileError::corrective_failed(
            "site 000-default",
            "enable",
            "ERROR: Site 000-default does not exist!",
        ));
        let text = err.to_string();
        assert!(text.contains("site 000-default"));
        assert!(text.contains("enable"));
        assert!(text.contains("ERROR: Site 000-default does not exist!"));
    }

    #[test]
    fn test_tooling_failure_classification() {
        let status = ReconcilerError::from(ReconcileError::status_unavailable(
            "container web01",
            "start",
            "lxc-info missing",
        ));
        assert!(status.is_tooling_failure());
        assert_eq!(
            status.to_string(),
            "Cannot start container web01: status is unavailable: lxc-info missing"
        );

        let failed = ReconcilerError::from(ReconcileError::corrective_failed("x", "start", "boom"));
        assert!(!failed.is_tooling_failure());
    }

    #[test]
    fn test_invalid_option_lists_choices() {
        let err = ConfigError::invalid_option("action", "restart", &["start", "stop"]);
        assert_eq!(
            err.to_string(),
            "Invalid value 'restart' for action (choices: start, stop)"
        );
    }
}
