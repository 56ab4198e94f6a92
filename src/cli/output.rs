//! Output formatting for CLI commands.
//!
//! Results go to stdout, either as colored text or as the JSON document
//! `{"changed": .., "msg": ..}` expected by callers that drive the tool.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::{ModuleParams, ValidationResult};
use crate::error::ReconcilerError;
use crate::reconciler::{Outcome, ReconciliationResult};
use crate::resource::Resource;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Observed state of one resource, as shown by `status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusEntry {
    /// Queried resource.
    pub resource: Resource,
    /// Observed state, or the reason it could not be determined.
    pub state: String,
    /// Whether the status query succeeded.
    pub available: bool,
    /// Holder of the resource lock, when locking is enabled and the lock is held.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked_by: Option<String>,
}

/// Status row for table display.
#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Lock")]
    lock: String,
}

#[derive(Serialize)]
struct FailureJson<'a> {
    failed: bool,
    changed: bool,
    msg: &'a str,
}

#[derive(Serialize)]
struct ValidationJson<'a> {
    valid: bool,
    resource: Resource,
    warnings: &'a [String],
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a reconciliation result.
    #[must_use]
    pub fn format_result(&self, result: &ReconciliationResult) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string(result).unwrap_or_default(),
            OutputFormat::Text => {
                let label = match result.outcome {
                    Outcome::WouldChange => "changed (check)".yellow(),
                    _ if result.changed => "changed".yellow(),
                    _ => "ok".green(),
                };
                format!("{label}: [{}] {}", result.resource, result.msg)
            }
        }
    }

    /// Formats a failed invocation.
    #[must_use]
    pub fn format_failure(&self, error: &ReconcilerError) -> String {
        let msg = error.to_string();
        match self.format {
            OutputFormat::Json => serde_json::to_string(&FailureJson {
                failed: true,
                changed: false,
                msg: &msg,
            })
            .unwrap_or_default(),
            OutputFormat::Text => format!("{}: {msg}", "failed".red()),
        }
    }

    /// Formats the observed state of a set of resources.
    #[must_use]
    pub fn format_status(&self, entries: &[StatusEntry]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(entries).unwrap_or_default(),
            OutputFormat::Text => {
                let rows: Vec<StatusRow> = entries
                    .iter()
                    .map(|e| StatusRow {
                        name: e.resource.name.clone(),
                        kind: e.resource.kind.to_string(),
                        state: Self::format_state(e),
                        lock: e.locked_by.clone().unwrap_or_else(|| String::from("-")),
                    })
                    .collect();

                let mut output = Table::new(rows).to_string();
                output.push('\n');
                output
            }
        }
    }

    /// Formats the outcome of parameter validation.
    #[must_use]
    pub fn format_validation(&self, params: &ModuleParams, result: &ValidationResult) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string(&ValidationJson {
                valid: true,
                resource: params.resource(),
                warnings: &result.warnings,
            })
            .unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = format!(
                    "{} Parameters are valid for {}",
                    "✓".green(),
                    params.resource()
                );
                for warning in &result.warnings {
                    let _ = write!(output, "\n  {} {warning}", "⚠".yellow());
                }
                output
            }
        }
    }

    /// Formats an observed state with color.
    fn format_state(entry: &StatusEntry) -> String {
        if !entry.available {
            return format!("{} ({})", "unavailable".red(), entry.state);
        }
        match entry.state.as_str() {
            "running" | "enabled" => entry.state.green().to_string(),
            "absent" => entry.state.dimmed().to_string(),
            _ => entry.state.yellow().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContainerParams;
    use crate::error::ReconcileError;
    use crate::resource::ContainerAction;

    fn result(changed: bool, outcome: Outcome, msg: &str) -> ReconciliationResult {
        ReconciliationResult {
            changed,
            msg: msg.to_string(),
            resource: Resource::container("web01"),
            action: String::from("start"),
            outcome,
            observed: None,
            command: None,
        }
    }

    #[test]
    fn test_json_result_shape() {
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let out = formatter.format_result(&result(true, Outcome::Changed, "Container web01 started."));
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(value["changed"], true);
        assert_eq!(value["msg"], "Container web01 started.");
        assert_eq!(value["outcome"], "changed");
        assert!(value.get("failed").is_none());
    }

    #[test]
    fn test_text_result() {
        let formatter = OutputFormatter::new(OutputFormat::Text);
        let out = formatter.format_result(&result(
            false,
            Outcome::AlreadySatisfied,
            "Container web01 already running.",
        ));
        assert!(out.contains("ok"));
        assert!(out.contains("[container web01] Container web01 already running."));

        let out = formatter.format_result(&result(true, Outcome::WouldChange, "Would start container web01."));
        assert!(out.contains("changed (check)"));
    }

    #[test]
    fn test_json_failure_shape() {
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let err: ReconcilerError =
            ReconcileError::corrective_failed("container web01", "start", "boom").into();
        let value: serde_json::Value =
            serde_json::from_str(&formatter.format_failure(&err)).unwrap();

        assert_eq!(value["failed"], true);
        assert_eq!(value["changed"], false);
        assert!(value["msg"].as_str().unwrap().contains("boom"));
    }

    #[test]
    fn test_status_table() {
        let formatter = OutputFormatter::new(OutputFormat::Text);
        let entries = vec![
            StatusEntry {
                resource: Resource::container("web01"),
                state: String::from("running"),
                available: true,
                locked_by: None,
            },
            StatusEntry {
                resource: Resource::container("web02"),
                state: String::from("lxc-info not found"),
                available: false,
                locked_by: Some(String::from("host-1-abcd")),
            },
        ];

        let out = formatter.format_status(&entries);
        assert!(out.contains("web01"));
        assert!(out.contains("running"));
        assert!(out.contains("unavailable"));
        assert!(out.contains("host-1-abcd"));
    }

    #[test]
    fn test_validation_json() {
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let params = ModuleParams::Lxc(ContainerParams::new("web01", ContainerAction::Stop));
        let validation = ValidationResult {
            errors: Vec::new(),
            warnings: vec![String::from("template ignored")],
        };

        let value: serde_json::Value =
            serde_json::from_str(&formatter.format_validation(&params, &validation)).unwrap();
        assert_eq!(value["valid"], true);
        assert_eq!(value["resource"]["name"], "web01");
        assert_eq!(value["warnings"][0], "template ignored");
    }
}
