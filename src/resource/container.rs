//! LXC container commands and status classification.
//!
//! The substrings below are the whole protocol between the reconciler and
//! the LXC tools, so each one is a named constant with its own test.

use crate::config::ContainerParams;
use crate::error::{ConfigError, Result};
use crate::exec::{CommandOutput, CommandSpec};

use super::types::ContainerState;

/// Status query tool.
pub const LXC_INFO: &str = "lxc-info";
/// Start tool.
pub const LXC_START: &str = "lxc-start";
/// Stop tool.
pub const LXC_STOP: &str = "lxc-stop";
/// Create tool.
pub const LXC_CREATE: &str = "lxc-create";
/// Destroy tool.
pub const LXC_DESTROY: &str = "lxc-destroy";

/// Printed by `lxc-info` for an unknown container. Checked before anything else.
pub const ABSENT_MARKER: &str = "doesn't exist";
/// State reported for a running container.
pub const RUNNING_MARKER: &str = "RUNNING";
/// State reported for a stopped container.
pub const STOPPED_MARKER: &str = "STOPPED";
/// Prefix of the state line in `lxc-info` output.
pub const STATE_LINE_PREFIX: &str = "State:";

/// Builds the status query command.
#[must_use]
pub fn status_command(name: &str) -> CommandSpec {
    CommandSpec::new(LXC_INFO).args(["-n", name]).privileged()
}

/// Builds the start command. The container is started in the background.
#[must_use]
pub fn start_command(name: &str) -> CommandSpec {
    CommandSpec::new(LXC_START)
        .args(["-n", name, "--daemon"])
        .privileged()
}

/// Builds the stop command.
#[must_use]
pub fn stop_command(name: &str) -> CommandSpec {
    CommandSpec::new(LXC_STOP).args(["-n", name]).privileged()
}

/// Builds the destroy command.
#[must_use]
pub fn destroy_command(name: &str) -> CommandSpec {
    CommandSpec::new(LXC_DESTROY).args(["-n", name]).privileged()
}

/// Builds the create command from the container parameters.
///
/// `template_options` is split into words and handed to the template after
/// `--`; it is never interpreted by a shell.
///
/// # Errors
///
/// Returns an error if `template_options` has unbalanced quotes.
pub fn create_command(params: &ContainerParams) -> Result<CommandSpec> {
    let mut spec = CommandSpec::new(LXC_CREATE).args(["-n", params.name.as_str()]);

    if let Some(config_file) = &params.config_file {
        spec = spec.arg("-f").arg(config_file.display().to_string());
    }
    if let Some(template) = &params.template {
        spec = spec.args(["-t", template.as_str()]);
    }
    if let Some(backing_store) = &params.backing_store {
        spec = spec.args(["-B", backing_store.as_str()]);
    }
    if let Some(options) = &params.template_options {
        spec = spec.arg("--").args(split_template_options(options)?);
    }

    Ok(spec.privileged())
}

/// Splits template options into argument words.
///
/// # Errors
///
/// Returns a validation error for unbalanced quoting.
pub fn split_template_options(options: &str) -> Result<Vec<String>> {
    shell_words::split(options).map_err(|e| {
        ConfigError::validation(
            format!("Cannot split template options '{options}': {e}"),
            "template_options",
        )
        .into()
    })
}

/// Classifies `lxc-info` output.
///
/// The absence marker wins over every other substring. Otherwise the
/// `State:` line decides; without one, the bare state words are searched.
#[must_use]
pub fn classify_status(text: &str) -> ContainerState {
    if text.contains(ABSENT_MARKER) {
        return ContainerState::Absent;
    }

    if let Some(value) = text
        .lines()
        .find_map(|line| line.trim().strip_prefix(STATE_LINE_PREFIX))
    {
        return match value.trim() {
            RUNNING_MARKER => ContainerState::Running,
            STOPPED_MARKER => ContainerState::Stopped,
            other => ContainerState::Other(other.to_string()),
        };
    }

    if text.contains(RUNNING_MARKER) {
        ContainerState::Running
    } else if text.contains(STOPPED_MARKER) {
        ContainerState::Stopped
    } else {
        ContainerState::Other(String::from("UNKNOWN"))
    }
}

/// Interprets a finished status query.
///
/// A non-zero exit is only acceptable when it reports absence; anything else
/// means the status is unavailable, and the returned `Err` carries the reason.
///
/// # Errors
///
/// Returns the diagnostic text when the query failed without the absence marker.
pub fn interpret_status(output: &CommandOutput) -> std::result::Result<ContainerState, String> {
    let text = output.combined();
    let state = classify_status(&text);

    if output.success() || state == ContainerState::Absent {
        Ok(state)
    } else {
        Err(output.diagnostic())
    }
}
