//! Reconciler for a single resource.
//!
//! This module compares the requested state of one container, site or module
//! with what the system reports and runs at most one corrective command to
//! converge them. Every invocation is a strict query, act, report sequence;
//! nothing is retried.
//!
//! Containers are queried with `lxc-info` before acting. Sites and modules are
//! not: the enable/disable command is run directly and its own output decides
//! whether anything changed. Create and destroy trust the exit status of the
//! LXC tool alone, while enable/disable also look for an "already" marker.

use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

use crate::config::{ContainerParams, ModuleParams, WebResourceParams};
use crate::error::{ReconcileError, ReconcilerError, Result};
use crate::exec::{CommandOutput, CommandRunner, CommandSpec};
use crate::lock::LockManager;
use crate::resource::{
    container, web, ContainerAction, ContainerState, ObservedState, Resource, ResourceKind,
    WebResourceState, WebResourceType,
};

/// Action named in errors raised by a plain status query.
const QUERY_ACTION: &str = "query";

/// Reconciler for one resource per invocation.
pub struct Reconciler<'a, R: CommandRunner> {
    /// Command runner.
    runner: &'a R,
    /// Predict instead of acting.
    check_mode: bool,
    /// Optional per-resource locking.
    locks: Option<LockManager>,
}

/// How a reconciliation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The corrective command ran and succeeded.
    Changed,
    /// The resource was already in the requested state.
    AlreadySatisfied,
    /// The action needs an existing resource and there is none.
    ResourceAbsentForAction,
    /// Creation was requested but the resource already exists.
    ResourceAlreadyPresent,
    /// The resource is in a state the action does not apply to (e.g. frozen).
    NotApplicable,
    /// Check mode: the corrective command would have run.
    WouldChange,
}

/// Result of a successful reconciliation.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationResult {
    /// Whether the system was (or, in check mode, would be) changed.
    pub changed: bool,
    /// Human-readable message.
    pub msg: String,
    /// Reconciled resource.
    pub resource: Resource,
    /// Requested action or state.
    pub action: String,
    /// How the reconciliation ended.
    pub outcome: Outcome,
    /// State observed before acting, when a status query was made.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed: Option<ObservedState>,
    /// Corrective command that was executed, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl<'a, R: CommandRunner> Reconciler<'a, R> {
    /// Creates a new reconciler.
    #[must_use]
    pub const fn new(runner: &'a R) -> Self {
        Self {
            runner,
            check_mode: false,
            locks: None,
        }
    }

    /// Enables check mode: no corrective command is run.
    #[must_use]
    pub const fn with_check_mode(mut self, check_mode: bool) -> Self {
        self.check_mode = check_mode;
        self
    }

    /// Enables per-resource locking.
    #[must_use]
    pub fn with_locks(mut self, locks: Option<LockManager>) -> Self {
        self.locks = locks;
        self
    }

    /// Queries the current state of a resource.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::StatusUnavailable`] if the status command
    /// cannot be run or its output cannot be classified.
    pub async fn query_state(&self, resource: &Resource) -> Result<ObservedState> {
        match resource.kind {
            ResourceKind::Container => self
                .query_container(&resource.name, QUERY_ACTION)
                .await
                .map(ObservedState::Container),
            ResourceKind::Site => self
                .query_web(&resource.name, WebResourceType::Site, QUERY_ACTION)
                .await
                .map(ObservedState::Web),
            ResourceKind::Module => self
                .query_web(&resource.name, WebResourceType::Module, QUERY_ACTION)
                .await
                .map(ObservedState::Web),
        }
    }

    /// Reconciles a resource towards the requested state.
    ///
    /// # Errors
    ///
    /// Returns an error if the status is unavailable, the corrective command
    /// fails, or the resource lock is held elsewhere.
    pub async fn reconcile(&self, params: &ModuleParams) -> Result<ReconciliationResult> {
        let resource = params.resource();

        let lock = match &self.locks {
            Some(locks) => Some(locks.acquire(&resource, params.action()).await?),
            None => None,
        };

        let result = match params {
            ModuleParams::Lxc(p) => self.reconcile_container(p).await,
            ModuleParams::Apache2Resource(p) => self.reconcile_web(p).await,
        };

        if let (Some(locks), Some(lock)) = (&self.locks, lock)
            && let Err(e) = locks.release(lock).await
        {
            warn!("Failed to release lock for {resource}: {e}");
        }

        result
    }

    /// Reconciles a container.
    ///
    /// # Errors
    ///
    /// Returns an error if the status is unavailable or the LXC tool fails.
    pub async fn reconcile_container(
        &self,
        params: &ContainerParams,
    ) -> Result<ReconciliationResult> {
        let name = params.name.as_str();
        let action = params.action;
        info!("Reconciling container {name}: {action}");

        let observed = self.query_container(name, action.as_str()).await?;
        debug!("Container {name} observed as {observed}");

        let planned = match (&observed, action) {
            (ContainerState::Absent, ContainerAction::Create) => {
                Planned::Act(container::create_command(params)?)
            }
            (ContainerState::Absent, _) => Planned::Skip(
                Outcome::ResourceAbsentForAction,
                format!("The specified container ({name}) does not exist. Create it first."),
            ),
            (_, ContainerAction::Create) => Planned::Skip(
                Outcome::ResourceAlreadyPresent,
                format!(
                    "The specified container ({name}) already exists and can not be created again."
                ),
            ),
            (_, ContainerAction::Destroy) => Planned::Act(container::destroy_command(name)),
            (ContainerState::Stopped, ContainerAction::Start) => {
                Planned::Act(container::start_command(name))
            }
            (ContainerState::Running, ContainerAction::Stop) => {
                Planned::Act(container::stop_command(name))
            }
            (ContainerState::Running, ContainerAction::Start) => Planned::Skip(
                Outcome::AlreadySatisfied,
                format!("Container {name} already running."),
            ),
            (ContainerState::Stopped, ContainerAction::Stop) => Planned::Skip(
                Outcome::AlreadySatisfied,
                format!("Container {name} already stopped."),
            ),
            (ContainerState::Other(state), _) => Planned::Skip(
                Outcome::NotApplicable,
                format!("Container {name} is {state}; nothing to {action}."),
            ),
        };

        let resource = params.resource();
        let observed = Some(ObservedState::Container(observed));

        let spec = match planned {
            Planned::Skip(outcome, msg) => {
                info!("{msg}");
                return Ok(ReconciliationResult::unchanged(
                    resource,
                    action.as_str(),
                    outcome,
                    msg,
                    observed,
                ));
            }
            Planned::Act(spec) => spec,
        };

        if self.check_mode {
            let msg = format!("Would {action} container {name}.");
            info!("{msg}");
            return Ok(ReconciliationResult::would_change(
                resource,
                action.as_str(),
                msg,
                observed,
                &spec,
            ));
        }

        let output = self.run_corrective(&resource, action.as_str(), &spec).await?;
        if !output.success() {
            return Err(ReconcileError::corrective_failed(
                resource.to_string(),
                action.as_str(),
                output.diagnostic(),
            )
            .into());
        }

        let msg = format!("Container {name} {}.", action.past_tense());
        info!("{msg}");
        Ok(ReconciliationResult::changed(
            resource,
            action.as_str(),
            msg,
            observed,
            &spec,
        ))
    }

    /// Reconciles an Apache site or module.
    ///
    /// # Errors
    ///
    /// Returns an error if the enable/disable command cannot run or fails.
    pub async fn reconcile_web(&self, params: &WebResourceParams) -> Result<ReconciliationResult> {
        let resource = params.resource();
        let state = params.state;
        info!("Reconciling {resource}: {state}");

        if self.check_mode {
            return self.predict_web(params).await;
        }

        let spec = web::corrective_command(&params.name, params.resource_type, state);
        let output = self.run_corrective(&resource, state.verb(), &spec).await?;
        let title = resource.kind.title();

        if web::reports_already(&output.stdout, &params.name, params.resource_type, state) {
            let msg = format!("{title} {} already {}.", params.name, state.adjective());
            info!("{msg}");
            return Ok(ReconciliationResult::unchanged(
                resource,
                state.as_str(),
                Outcome::AlreadySatisfied,
                msg,
                None,
            ));
        }

        if !output.success() {
            let diagnostic = if output.stdout.trim().is_empty() {
                output.diagnostic()
            } else {
                output.stdout.trim().to_string()
            };
            return Err(ReconcileError::corrective_failed(
                resource.to_string(),
                state.verb(),
                diagnostic,
            )
            .into());
        }

        let msg = format!("{title} {} {}.", params.name, state.adjective());
        info!("{msg}");
        Ok(ReconciliationResult::changed(
            resource,
            state.as_str(),
            msg,
            None,
            &spec,
        ))
    }

    /// Predicts a site/module reconciliation from `a2query`.
    async fn predict_web(&self, params: &WebResourceParams) -> Result<ReconciliationResult> {
        let resource = params.resource();
        let state = params.state;
        let name = params.name.as_str();
        let kind = resource.kind;
        let title = kind.title();

        let observed = self
            .query_web(name, params.resource_type, state.verb())
            .await?;
        debug!("{resource} observed as {observed}");
        let spec = web::corrective_command(name, params.resource_type, state);
        let observed_state = Some(ObservedState::Web(observed));

        let result = if observed == WebResourceState::Absent {
            ReconciliationResult::unchanged(
                resource,
                state.as_str(),
                Outcome::ResourceAbsentForAction,
                format!("{title} {name} does not exist; {} would fail.", spec.program),
                observed_state,
            )
        } else if observed == state.satisfied_by() {
            ReconciliationResult::unchanged(
                resource,
                state.as_str(),
                Outcome::AlreadySatisfied,
                format!("{title} {name} already {}.", state.adjective()),
                observed_state,
            )
        } else {
            ReconciliationResult::would_change(
                resource,
                state.as_str(),
                format!("Would {} {kind} {name}.", state.verb()),
                observed_state,
                &spec,
            )
        };

        info!("{}", result.msg);
        Ok(result)
    }

    /// Runs `lxc-info` and classifies the result.
    async fn query_container(&self, name: &str, action: &str) -> Result<ContainerState> {
        let resource = Resource::container(name);
        let output = self
            .run_status(&resource, action, &container::status_command(name))
            .await?;
        container::interpret_status(&output).map_err(|reason| {
            ReconcileError::status_unavailable(resource.to_string(), action, reason).into()
        })
    }

    /// Runs `a2query` and classifies the result.
    async fn query_web(
        &self,
        name: &str,
        resource_type: WebResourceType,
        action: &str,
    ) -> Result<WebResourceState> {
        let resource = Resource::new(name, resource_type.kind());
        let output = self
            .run_status(&resource, action, &web::status_command(name, resource_type))
            .await?;
        web::interpret_status(&output).map_err(|reason| {
            ReconcileError::status_unavailable(resource.to_string(), action, reason).into()
        })
    }

    /// Runs a status command; failing to launch it means the status is unavailable.
    async fn run_status(
        &self,
        resource: &Resource,
        action: &str,
        spec: &CommandSpec,
    ) -> Result<CommandOutput> {
        debug!("Querying status: {spec}");
        self.runner.run(spec).await.map_err(|e| match e {
            ReconcilerError::Command(err) => {
                ReconcileError::status_unavailable(resource.to_string(), action, err.to_string())
                    .into()
            }
            other => other,
        })
    }

    /// Runs a corrective command; failing to launch it is a failed action.
    async fn run_corrective(
        &self,
        resource: &Resource,
        action: &str,
        spec: &CommandSpec,
    ) -> Result<CommandOutput> {
        info!("Running: {spec}");
        self.runner.run(spec).await.map_err(|e| match e {
            ReconcilerError::Command(err) => {
                ReconcileError::corrective_failed(resource.to_string(), action, err.to_string())
                    .into()
            }
            other => other,
        })
    }
}

/// Decision for a container before any corrective command runs.
enum Planned {
    /// Run this command.
    Act(CommandSpec),
    /// Nothing to run.
    Skip(Outcome, String),
}

impl ReconciliationResult {
    /// Creates a result for a successful corrective command.
    fn changed(
        resource: Resource,
        action: &str,
        msg: String,
        observed: Option<ObservedState>,
        spec: &CommandSpec,
    ) -> Self {
        Self {
            changed: true,
            msg,
            resource,
            action: action.to_string(),
            outcome: Outcome::Changed,
            observed,
            command: Some(spec.to_string()),
        }
    }

    /// Creates a check-mode result for a command that would run.
    fn would_change(
        resource: Resource,
        action: &str,
        msg: String,
        observed: Option<ObservedState>,
        spec: &CommandSpec,
    ) -> Self {
        Self {
            changed: true,
            msg,
            resource,
            action: action.to_string(),
            outcome: Outcome::WouldChange,
            observed,
            command: Some(spec.to_string()),
        }
    }

    /// Creates a no-change result.
    fn unchanged(
        resource: Resource,
        action: &str,
        outcome: Outcome,
        msg: String,
        observed: Option<ObservedState>,
    ) -> Self {
        Self {
            changed: false,
            msg,
            resource,
            action: action.to_string(),
            outcome,
            observed,
            command: None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Changed => "changed",
            Self::AlreadySatisfied => "ok",
            Self::ResourceAbsentForAction => "absent",
            Self::ResourceAlreadyPresent => "exists",
            Self::NotApplicable => "skipped",
            Self::WouldChange => "would change",
        };
        f.write_str(s)
    }
}

impl fmt::Display for ReconciliationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.outcome, self.msg)
    }
}
