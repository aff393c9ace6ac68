//! Host routing service interface
//!
//! The host owns the official audio group objects and their controls. The
//! engine only asks it to create, wire up, activate and destroy groups, and to
//! describe binding targets for a group's controls.

use crate::domain::group::BindingTarget;
use crate::domain::stream::{Axis, StreamAttributes};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors reported by the host routing service
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Group rejected by host: {0}")]
    GroupRejected(String),

    #[error("Group already exists: {0}")]
    DuplicateGroup(String),

    #[error("Unknown group handle: {0}")]
    UnknownHandle(GroupHandle),

    #[error("Unknown binding target: {0}")]
    UnknownTarget(BindingTarget),
}

pub type Result<T> = std::result::Result<T, HostError>;

/// Opaque handle to a host-side audio group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupHandle(u32);

impl GroupHandle {
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for GroupHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a group's control is provided
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupControl {
    /// The group gets its own control
    Own,
    /// The group's control follows another entity's control
    Bind(BindingTarget),
}

/// Operations the engine needs from the host routing service
pub trait RoutingHost: Send + Sync {
    /// Create a group object; it stays inactive until [`activate_group`](Self::activate_group)
    fn create_group(&self, id: &str, description: &str) -> Result<GroupHandle>;

    /// Configure one control of a created group
    fn set_group_control(&self, handle: GroupHandle, axis: Axis, control: GroupControl) -> Result<()>;

    /// Publish a fully configured group
    fn activate_group(&self, handle: GroupHandle) -> Result<()>;

    /// Destroy a group, active or not
    fn destroy_group(&self, handle: GroupHandle);

    /// Binding target describing the given control of a group
    fn binding_target(&self, group_id: &str, axis: Axis) -> BindingTarget;
}

/// Callback the host invokes before a new stream receives its initial control
///
/// Returns the target the stream's control should be bound to, or `None` to
/// leave the stream's default control untouched.
pub trait InitialControlHook: Send + Sync {
    fn on_stream_initial_control(&self, axis: Axis, stream: &StreamAttributes) -> Option<BindingTarget>;
}
