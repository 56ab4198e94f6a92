//! Managed resource kinds.
//!
//! This module holds the resource identity and state types, plus the
//! command builders and output parsers for each kind:
//! - [`container`]: LXC containers (`lxc-*` tools)
//! - [`web`]: Apache sites and modules (`a2*` tools)

pub mod container;
pub mod web;
mod types;

pub use types::{
    ContainerAction, ContainerState, ObservedState, Resource, ResourceKind, WebResourceState,
    WebResourceType, WebState,
};
