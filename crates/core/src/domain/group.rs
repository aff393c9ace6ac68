//! Audio group definitions and binding targets

use crate::domain::host::{self, GroupControl, GroupHandle, RoutingHost};
use crate::domain::stream::Axis;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Object type name of audio groups in binding targets
pub const AUDIO_GROUP_TARGET_TYPE: &str = "AudioGroup";

const BIND_PREFIX: &str = "bind:";

/// Reference to another entity's control field
///
/// Textual form in configuration files is `bind:<type>:<name>`; the field is
/// implied by the directive the target appears in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BindingTarget {
    pub target_type: String,
    pub name: String,
    pub field: String,
}

impl BindingTarget {
    pub fn new(
        target_type: impl Into<String>,
        name: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self {
            target_type: target_type.into(),
            name: name.into(),
            field: field.into(),
        }
    }

    /// Target pointing at an audio group's control on the given axis
    pub fn audio_group(group_id: &str, axis: Axis) -> Self {
        Self::new(AUDIO_GROUP_TARGET_TYPE, group_id, axis.field_name())
    }

    /// Parse `bind:<type>:<name>`; returns `None` when the text is malformed
    pub fn parse(value: &str, field: &str) -> Option<Self> {
        let spec = value.strip_prefix(BIND_PREFIX)?;
        let (target_type, name) = spec.split_once(':')?;

        if target_type.is_empty() || name.is_empty() {
            return None;
        }

        Some(Self::new(target_type, name, field))
    }
}

impl fmt::Display for BindingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}.{}", self.target_type, self.name, self.field)
    }
}

/// What a group does with one of its controls when it is materialized
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "action", content = "target", rename_all = "lowercase")]
pub enum ControlAction {
    #[default]
    None,
    Create,
    Bind(BindingTarget),
}

impl fmt::Display for ControlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlAction::None => f.write_str("none"),
            ControlAction::Create => f.write_str("create"),
            ControlAction::Bind(target) => write!(f, "bind {}", target),
        }
    }
}

/// An audio group as declared in the configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioGroupDefinition {
    pub id: String,
    pub description: String,
    pub volume_control: ControlAction,
    pub mute_control: ControlAction,
}

impl AudioGroupDefinition {
    /// New definition; the description defaults to the id
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            description: id.clone(),
            id,
            volume_control: ControlAction::None,
            mute_control: ControlAction::None,
        }
    }

    pub fn control(&self, axis: Axis) -> &ControlAction {
        match axis {
            Axis::Volume => &self.volume_control,
            Axis::Mute => &self.mute_control,
        }
    }

    pub fn set_control(&mut self, axis: Axis, action: ControlAction) {
        match axis {
            Axis::Volume => self.volume_control = action,
            Axis::Mute => self.mute_control = action,
        }
    }
}

/// A group materialized through the host routing service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveGroup {
    pub definition: AudioGroupDefinition,
    pub handle: GroupHandle,
}

impl ActiveGroup {
    /// Create, wire up and activate the group on the host
    ///
    /// A group that fails after creation is destroyed again before the error
    /// is returned.
    pub fn materialize(definition: AudioGroupDefinition, host: &dyn RoutingHost) -> host::Result<Self> {
        let handle = host.create_group(&definition.id, &definition.description)?;

        let wired = Axis::ALL
            .iter()
            .try_for_each(|&axis| {
                let control = match definition.control(axis) {
                    ControlAction::None => return Ok(()),
                    ControlAction::Create => GroupControl::Own,
                    ControlAction::Bind(target) => GroupControl::Bind(target.clone()),
                };
                debug!(group = %definition.id, %axis, ?control, "Setting group control");
                host.set_group_control(handle, axis, control)
            })
            .and_then(|_| host.activate_group(handle));

        if let Err(e) = wired {
            host.destroy_group(handle);
            return Err(e);
        }

        Ok(Self { definition, handle })
    }

    pub fn id(&self) -> &str {
        &self.definition.id
    }
}
