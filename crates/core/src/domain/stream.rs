//! Stream attributes seen by the classifier
//!
//! A stream is described by its direction and a property list, plus whether
//! the host already gave it an explicit volume or mute control.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Direction of an audio stream
///
/// Playback streams (sink inputs) are always `Output`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Input => "input",
            Direction::Output => "output",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "input" => Ok(Direction::Input),
            "output" => Ok(Direction::Output),
            other => Err(format!("unknown direction: {}", other)),
        }
    }
}

/// Control axis of a stream or group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Volume,
    Mute,
}

impl Axis {
    pub const ALL: [Axis; 2] = [Axis::Volume, Axis::Mute];

    /// Name of the control field a binding target on this axis points at
    pub fn field_name(&self) -> &'static str {
        match self {
            Axis::Volume => "volume_control",
            Axis::Mute => "mute_control",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Volume => f.write_str("volume"),
            Axis::Mute => f.write_str("mute"),
        }
    }
}

/// Attributes of a stream about to receive its initial controls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamAttributes {
    pub name: String,
    pub direction: Direction,
    pub properties: HashMap<String, String>,
    /// The host already assigned a volume control, classification must not override it
    #[serde(default)]
    pub explicit_volume_control: bool,
    /// The host already assigned a mute control
    #[serde(default)]
    pub explicit_mute_control: bool,
}

impl StreamAttributes {
    pub fn new(name: impl Into<String>, direction: Direction) -> Self {
        Self {
            name: name.into(),
            direction,
            properties: HashMap::new(),
            explicit_volume_control: false,
            explicit_mute_control: false,
        }
    }

    /// Builder-style property setter
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn with_explicit_control(mut self, axis: Axis) -> Self {
        match axis {
            Axis::Volume => self.explicit_volume_control = true,
            Axis::Mute => self.explicit_mute_control = true,
        }
        self
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    pub fn has_explicit_control(&self, axis: Axis) -> bool {
        match axis {
            Axis::Volume => self.explicit_volume_control,
            Axis::Mute => self.explicit_mute_control,
        }
    }
}
