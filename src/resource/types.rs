//! Resource identity, desired states and observed states.
//!
//! Nothing here is persisted: a [`Resource`] is just a name and a kind, and
//! every observed state is derived live from the system on each invocation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Kind of externally managed resource.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// LXC system container.
    Container,
    /// Apache site configuration.
    Site,
    /// Apache module configuration.
    Module,
}

/// A named resource of a given kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Resource {
    /// Resource name (container hostname, site or module name).
    pub name: String,
    /// Resource kind.
    pub kind: ResourceKind,
}

/// Requested container action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(try_from = "String", into = "String")]
pub enum ContainerAction {
    /// Container should be running.
    Start,
    /// Container should be stopped.
    Stop,
    /// Container should exist.
    Create,
    /// Container should no longer exist.
    Destroy,
}

/// Requested state of an Apache site or module.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(try_from = "String", into = "String")]
pub enum WebState {
    /// Enabled.
    #[default]
    Present,
    /// Disabled.
    Absent,
}

/// Whether an Apache resource is a site or a module.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(try_from = "String", into = "String")]
pub enum WebResourceType {
    /// Apache module (`a2enmod`/`a2dismod`).
    #[default]
    Module,
    /// Apache site (`a2ensite`/`a2dissite`).
    Site,
}

/// Observed container state, classified from `lxc-info` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    /// The container does not exist.
    Absent,
    /// The container exists and is stopped.
    Stopped,
    /// The container is running.
    Running,
    /// Any other reported state (`FROZEN`, `STARTING`, ...), verbatim.
    Other(String),
}

/// Observed state of an Apache site or module, classified from `a2query` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WebResourceState {
    /// Currently enabled.
    Enabled,
    /// Known but disabled.
    Disabled,
    /// No site or module of that name is known.
    Absent,
}

/// Observed state of any resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ObservedState {
    /// Container state.
    Container(ContainerState),
    /// Site or module state.
    Web(WebResourceState),
}

impl ResourceKind {
    /// Returns the lowercase label used in messages and lock file names.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Container => "container",
            Self::Site => "site",
            Self::Module => "module",
        }
    }

    /// Returns the capitalised label used at the start of messages.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Container => "Container",
            Self::Site => "Site",
            Self::Module => "Module",
        }
    }
}

impl Resource {
    /// Creates a resource of the given kind.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Creates a container resource.
    #[must_use]
    pub fn container(name: impl Into<String>) -> Self {
        Self::new(name, ResourceKind::Container)
    }

    /// Creates an Apache site resource.
    #[must_use]
    pub fn site(name: impl Into<String>) -> Self {
        Self::new(name, ResourceKind::Site)
    }

    /// Creates an Apache module resource.
    #[must_use]
    pub fn module(name: impl Into<String>) -> Self {
        Self::new(name, ResourceKind::Module)
    }
}

impl ContainerAction {
    /// Accepted action names.
    pub const CHOICES: &'static [&'static str] = &["start", "stop", "create", "destroy"];

    /// Returns the action name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Create => "create",
            Self::Destroy => "destroy",
        }
    }

    /// Returns the past-tense verb used in change messages.
    #[must_use]
    pub const fn past_tense(self) -> &'static str {
        match self {
            Self::Start => "started",
            Self::Stop => "stopped",
            Self::Create => "created",
            Self::Destroy => "destroyed",
        }
    }

    /// Returns true if the action only makes sense on an existing container.
    #[must_use]
    pub const fn requires_existence(self) -> bool {
        !matches!(self, Self::Create)
    }
}

impl WebState {
    /// Accepted state names.
    pub const CHOICES: &'static [&'static str] = &["present", "absent"];

    /// Returns the state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
        }
    }

    /// Returns the verb of the corrective command ("enable"/"disable").
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Present => "enable",
            Self::Absent => "disable",
        }
    }

    /// Returns the adjective the Apache tools print ("enabled"/"disabled").
    #[must_use]
    pub const fn adjective(self) -> &'static str {
        match self {
            Self::Present => "enabled",
            Self::Absent => "disabled",
        }
    }

    /// Returns the observed state that satisfies this desired state.
    #[must_use]
    pub const fn satisfied_by(self) -> WebResourceState {
        match self {
            Self::Present => WebResourceState::Enabled,
            Self::Absent => WebResourceState::Disabled,
        }
    }
}

impl WebResourceType {
    /// Accepted resource type names.
    pub const CHOICES: &'static [&'static str] = &["module", "site"];

    /// Returns the resource type name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Site => "site",
        }
    }

    /// Returns the matching resource kind.
    #[must_use]
    pub const fn kind(self) -> ResourceKind {
        match self {
            Self::Module => ResourceKind::Module,
            Self::Site => ResourceKind::Site,
        }
    }
}

impl FromStr for ContainerAction {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "create" => Ok(Self::Create),
            "destroy" => Ok(Self::Destroy),
            other => Err(ConfigError::invalid_option("action", other, Self::CHOICES)),
        }
    }
}

impl FromStr for WebState {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" => Ok(Self::Present),
            "absent" => Ok(Self::Absent),
            other => Err(ConfigError::invalid_option("state", other, Self::CHOICES)),
        }
    }
}

impl FromStr for WebResourceType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "module" => Ok(Self::Module),
            "site" => Ok(Self::Site),
            other => Err(ConfigError::invalid_option(
                "resource_type",
                other,
                Self::CHOICES,
            )),
        }
    }
}

impl TryFrom<String> for ContainerAction {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TryFrom<String> for WebState {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TryFrom<String> for WebResourceType {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ContainerAction> for String {
    fn from(value: ContainerAction) -> Self {
        value.as_str().to_string()
    }
}

impl From<WebState> for String {
    fn from(value: WebState) -> Self {
        value.as_str().to_string()
    }
}

impl From<WebResourceType> for String {
    fn from(value: WebResourceType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

impl fmt::Display for ContainerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for WebState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => f.write_str("absent"),
            Self::Stopped => f.write_str("stopped"),
            Self::Running => f.write_str("running"),
            Self::Other(raw) => write!(f, "{}", raw.to_lowercase()),
        }
    }
}

impl fmt::Display for WebResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
            Self::Absent => "absent",
        };
        f.write_str(s)
    }
}

impl fmt::Display for ObservedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Container(state) => state.fmt(f),
            Self::Web(state) => state.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_parsing() {
        assert_eq!("start".parse::<ContainerAction>().unwrap(), ContainerAction::Start);
        assert_eq!("destroy".parse::<ContainerAction>().unwrap(), ContainerAction::Destroy);
        assert!("restart".parse::<ContainerAction>().is_err());
    }

    #[test]
    fn test_only_create_tolerates_absence() {
        assert!(!ContainerAction::Create.requires_existence());
        assert!(ContainerAction::Start.requires_existence());
        assert!(ContainerAction::Stop.requires_existence());
        assert!(ContainerAction::Destroy.requires_existence());
    }

    #[test]
    fn test_web_defaults() {
        assert_eq!(WebState::default(), WebState::Present);
        assert_eq!(WebResourceType::default(), WebResourceType::Module);
        assert_eq!(WebResourceType::Site.kind(), ResourceKind::Site);
    }

    #[test]
    fn test_resource_display() {
        assert_eq!(Resource::container("web01").to_string(), "container web01");
        assert_eq!(Resource::module("wsgi").to_string(), "module wsgi");
    }

    #[test]
    fn test_state_deserialization_rejects_unknown_choice() {
        let ok: WebState = serde_yaml::from_str("absent").unwrap();
        assert_eq!(ok, WebState::Absent);

        let err = serde_yaml::from_str::<WebState>("gone").unwrap_err();
        assert!(err.to_string().contains("present, absent"));
    }
}
