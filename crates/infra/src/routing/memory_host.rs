//! In-memory routing host
//!
//! Keeps audio group objects and their controls in a process-local table.
//! Used by the CLI and tests; failures can be injected per group id.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};
use audiogroups_core::domain::group::{BindingTarget, AUDIO_GROUP_TARGET_TYPE};
use audiogroups_core::domain::host::{GroupControl, GroupHandle, HostError, Result, RoutingHost};
use audiogroups_core::domain::stream::Axis;

/// A group object as held by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedGroup {
    pub id: String,
    pub description: String,
    pub volume_control: Option<GroupControl>,
    pub mute_control: Option<GroupControl>,
    pub active: bool,
}

impl HostedGroup {
    pub fn control(&self, axis: Axis) -> Option<&GroupControl> {
        match axis {
            Axis::Volume => self.volume_control.as_ref(),
            Axis::Mute => self.mute_control.as_ref(),
        }
    }
}

#[derive(Debug, Default)]
struct HostState {
    next_handle: u32,
    groups: BTreeMap<GroupHandle, HostedGroup>,
    destroyed: usize,
}

impl HostState {
    fn group_mut(&mut self, handle: GroupHandle) -> Result<&mut HostedGroup> {
        self.groups.get_mut(&handle).ok_or(HostError::UnknownHandle(handle))
    }
}

/// Routing host keeping everything in memory
#[derive(Debug)]
pub struct InMemoryRoutingHost {
    state: Mutex<HostState>,
    target_types: HashSet<String>,
    rejected_groups: HashSet<String>,
    failing_activations: HashSet<String>,
}

impl Default for InMemoryRoutingHost {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRoutingHost {
    /// Host that accepts bindings to audio groups only
    pub fn new() -> Self {
        Self {
            state: Mutex::default(),
            target_types: HashSet::from([AUDIO_GROUP_TARGET_TYPE.to_string()]),
            rejected_groups: HashSet::new(),
            failing_activations: HashSet::new(),
        }
    }

    /// Also accept bindings to objects of `target_type`
    pub fn with_target_type(mut self, target_type: impl Into<String>) -> Self {
        self.target_types.insert(target_type.into());
        self
    }

    /// Refuse to create the group `id`
    pub fn rejecting_group(mut self, id: impl Into<String>) -> Self {
        self.rejected_groups.insert(id.into());
        self
    }

    /// Fail activation of the group `id` after it has been created
    pub fn failing_activation(mut self, id: impl Into<String>) -> Self {
        self.failing_activations.insert(id.into());
        self
    }

    fn state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Live group by id
    pub fn group(&self, id: &str) -> Option<HostedGroup> {
        self.state().groups.values().find(|g| g.id == id).cloned()
    }

    /// Ids of live groups, in creation order
    pub fn group_ids(&self) -> Vec<String> {
        self.state().groups.values().map(|g| g.id.clone()).collect()
    }

    pub fn active_count(&self) -> usize {
        self.state().groups.values().filter(|g| g.active).count()
    }

    /// Number of groups destroyed so far
    pub fn destroyed_count(&self) -> usize {
        self.state().destroyed
    }
}

impl RoutingHost for InMemoryRoutingHost {
    fn create_group(&self, id: &str, description: &str) -> Result<GroupHandle> {
        if self.rejected_groups.contains(id) {
            return Err(HostError::GroupRejected(id.to_string()));
        }

        let mut state = self.state();
        if state.groups.values().any(|g| g.id == id) {
            return Err(HostError::DuplicateGroup(id.to_string()));
        }

        state.next_handle += 1;
        let handle = GroupHandle::new(state.next_handle);
        state.groups.insert(
            handle,
            HostedGroup {
                id: id.to_string(),
                description: description.to_string(),
                volume_control: None,
                mute_control: None,
                active: false,
            },
        );

        debug!(group = id, handle = handle.raw(), "Group object created");
        Ok(handle)
    }

    fn set_group_control(
        &self,
        handle: GroupHandle,
        axis: Axis,
        control: GroupControl,
    ) -> Result<()> {
        if let GroupControl::Bind(target) = &control {
            if !self.target_types.contains(&target.target_type) {
                return Err(HostError::UnknownTarget(target.clone()));
            }
        }

        let mut state = self.state();
        let group = state.group_mut(handle)?;
        match axis {
            Axis::Volume => group.volume_control = Some(control),
            Axis::Mute => group.mute_control = Some(control),
        }
        Ok(())
    }

    fn activate_group(&self, handle: GroupHandle) -> Result<()> {
        let mut state = self.state();
        let group = state.group_mut(handle)?;

        if self.failing_activations.contains(&group.id) {
            return Err(HostError::GroupRejected(group.id.clone()));
        }

        group.active = true;
        info!(group = %group.id, %handle, "Group activated");
        Ok(())
    }

    fn destroy_group(&self, handle: GroupHandle) {
        let mut state = self.state();
        let removed = state.groups.remove(&handle);
        match removed {
            Some(group) => {
                state.destroyed += 1;
                debug!(group = %group.id, %handle, "Group object destroyed");
            }
            None => warn!(%handle, "Destroying unknown group"),
        }
    }

    fn binding_target(&self, group_id: &str, axis: Axis) -> BindingTarget {
        BindingTarget::audio_group(group_id, axis)
    }
}
