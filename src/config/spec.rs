//! Parameter types for a single invocation.
//!
//! These structs are built once at the boundary (CLI flags or a parameter
//! file) and passed by reference into the reconciler.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::resource::{ContainerAction, Resource, WebResourceType, WebState};

/// Parameters of the container module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ContainerParams {
    /// Hostname of the container.
    pub name: String,
    /// Desired action.
    pub action: ContainerAction,
    /// Config file passed to `lxc-create -f`.
    #[serde(default)]
    pub config_file: Option<PathBuf>,
    /// Template passed to `lxc-create -t`.
    #[serde(default)]
    pub template: Option<String>,
    /// Backing store passed to `lxc-create -B`.
    #[serde(default)]
    pub backing_store: Option<String>,
    /// Options passed through to the template after `--`.
    #[serde(default)]
    pub template_options: Option<String>,
}

/// Parameters of the Apache resource module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct WebResourceParams {
    /// Site or module name.
    pub name: String,
    /// Desired state.
    #[serde(default)]
    pub state: WebState,
    /// Whether the resource is a site or a module.
    #[serde(default)]
    pub resource_type: WebResourceType,
}

/// Parameters of either module, as found in a parameter file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "module", rename_all = "snake_case")]
pub enum ModuleParams {
    /// Container module (`module: lxc`).
    Lxc(ContainerParams),
    /// Apache resource module (`module: apache2_resource`).
    Apache2Resource(WebResourceParams),
}

/// Settings for how commands are run, independent of the module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    /// Prefix privileged commands with `sudo`.
    pub use_sudo: bool,
    /// Predict the result without running corrective commands.
    pub check_mode: bool,
    /// Directory for per-resource lock files; `None` disables locking.
    pub lock_dir: Option<PathBuf>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            use_sudo: true,
            check_mode: false,
            lock_dir: None,
        }
    }
}

impl ContainerParams {
    /// Creates container parameters with no create options.
    #[must_use]
    pub fn new(name: impl Into<String>, action: ContainerAction) -> Self {
        Self {
            name: name.into(),
            action,
            config_file: None,
            template: None,
            backing_store: None,
            template_options: None,
        }
    }

    /// Returns true if any create-only option is set.
    #[must_use]
    pub const fn has_create_options(&self) -> bool {
        self.config_file.is_some()
            || self.template.is_some()
            || self.backing_store.is_some()
            || self.template_options.is_some()
    }

    /// Returns the managed resource.
    #[must_use]
    pub fn resource(&self) -> Resource {
        Resource::container(&self.name)
    }
}

impl WebResourceParams {
    /// Creates web resource parameters.
    #[must_use]
    pub fn new(name: impl Into<String>, state: WebState, resource_type: WebResourceType) -> Self {
        Self {
            name: name.into(),
            state,
            resource_type,
        }
    }

    /// Returns the managed resource.
    #[must_use]
    pub fn resource(&self) -> Resource {
        Resource::new(&self.name, self.resource_type.kind())
    }
}

impl ModuleParams {
    /// Returns the managed resource.
    #[must_use]
    pub fn resource(&self) -> Resource {
        match self {
            Self::Lxc(params) => params.resource(),
            Self::Apache2Resource(params) => params.resource(),
        }
    }

    /// Returns the requested action as a verb ("start", "enable", ...).
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::Lxc(params) => params.action.as_str(),
            Self::Apache2Resource(params) => params.state.verb(),
        }
    }
}
