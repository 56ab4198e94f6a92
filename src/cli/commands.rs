//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{ContainerParams, ModuleParams, WebResourceParams};
use crate::resource::{ContainerAction, ResourceKind, WebResourceType, WebState};

/// Reconcile - idempotent state changes for LXC containers and Apache resources.
#[derive(Parser, Debug)]
#[command(name = "reconcile")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Result format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Log format on stderr (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,

    /// Report what would change without running any corrective command.
    #[arg(long, global = true)]
    pub check: bool,

    /// Run privileged LXC commands without sudo.
    #[arg(long, global = true)]
    pub no_sudo: bool,

    /// Lock the resource for the duration of the run, in the default lock directory.
    #[arg(long, global = true)]
    pub lock: bool,

    /// Lock the resource using lock files in this directory.
    #[arg(long, global = true)]
    pub lock_dir: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start, stop, create or destroy an LXC container.
    Container {
        /// Hostname of the container.
        #[arg(short, long)]
        name: String,

        /// Desired action.
        #[arg(short, long)]
        action: ContainerAction,

        /// Config file for creating the container.
        #[arg(long)]
        config_file: Option<PathBuf>,

        /// Template used for creating the container.
        #[arg(long)]
        template: Option<String>,

        /// Backing store for creating the container.
        #[arg(long)]
        backing_store: Option<String>,

        /// Options passed to the template.
        #[arg(long, allow_hyphen_values = true)]
        template_options: Option<String>,
    },

    /// Enable or disable an Apache site or module.
    Apache {
        /// Name of the site or module.
        #[arg(short, long)]
        name: String,

        /// Desired state.
        #[arg(short, long, default_value = "present")]
        state: WebState,

        /// Whether the resource is a site or a module.
        #[arg(short = 't', long, default_value = "module")]
        resource_type: WebResourceType,
    },

    /// Reconcile the resource described by a parameter file.
    Apply {
        /// Parameter file (YAML or JSON) with a `module:` key.
        #[arg(short, long, env = "RECONCILE_PARAMS")]
        params: PathBuf,
    },

    /// Show the observed state of resources.
    Status {
        /// Resource kind.
        #[arg(short, long)]
        kind: ResourceKind,

        /// Resource names.
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Validate a parameter file without touching the system.
    Validate {
        /// Parameter file (YAML or JSON) with a `module:` key.
        #[arg(short, long, env = "RECONCILE_PARAMS")]
        params: PathBuf,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output in the `{"changed": .., "msg": ..}` module shape.
    Json,
}

/// Log format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable log lines.
    #[default]
    Text,
    /// One JSON object per log event.
    Json,
}

impl Commands {
    /// Returns the module parameters given inline on the command line, if any.
    #[must_use]
    pub fn inline_params(&self) -> Option<ModuleParams> {
        match self {
            Self::Container {
                name,
                action,
                config_file,
                template,
                backing_store,
                template_options,
            } => Some(ModuleParams::Lxc(ContainerParams {
                name: name.clone(),
                action: *action,
                config_file: config_file.clone(),
                template: template.clone(),
                backing_store: backing_store.clone(),
                template_options: template_options.clone(),
            })),
            Self::Apache {
                name,
                state,
                resource_type,
            } => Some(ModuleParams::Apache2Resource(WebResourceParams::new(
                name.clone(),
                *state,
                *resource_type,
            ))),
            Self::Apply { .. } | Self::Status { .. } | Self::Validate { .. } => None,
        }
    }
}
