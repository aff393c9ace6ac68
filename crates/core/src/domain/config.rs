//! Audio group configuration loading
//!
//! This module provides:
//! - A line-oriented scanner for `[Section]` / `key = value` files
//! - The two-phase loader: declared names first, entity details second
//! - The finalize step that materializes groups through the host and resolves
//!   stream references into a ready [`AudioGroupsEngine`]
//!
//! Example file:
//!
//! ```text
//! [General]
//! audio-groups = media
//! streams = paplay_stream
//!
//! [AudioGroup media]
//! description = Media
//! volume-control = create
//!
//! [Stream paplay_stream]
//! match = (property application.process.binary=paplay)
//! audio-group-for-volume = media
//! ```

use crate::domain::classifier::AudioGroupsEngine;
use crate::domain::group::{ActiveGroup, AudioGroupDefinition, BindingTarget, ControlAction};
use crate::domain::host::{GroupHandle, RoutingHost};
use crate::domain::rule::{self, Expression, NegationPolicy};
use crate::domain::source::ConfigSource;
use crate::domain::stream::Axis;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, instrument, trace, warn};

pub type Result<T> = std::result::Result<T, ConfigError>;

const GENERAL_SECTION: &str = "General";
const AUDIO_GROUP_SECTION_PREFIX: &str = "AudioGroup ";
const STREAM_SECTION_PREFIX: &str = "Stream ";

const KEY_AUDIO_GROUPS: &str = "audio-groups";
const KEY_STREAMS: &str = "streams";
const KEY_DESCRIPTION: &str = "description";
const KEY_VOLUME_CONTROL: &str = "volume-control";
const KEY_MUTE_CONTROL: &str = "mute-control";
const KEY_GROUP_FOR_VOLUME: &str = "audio-group-for-volume";
const KEY_GROUP_FOR_MUTE: &str = "audio-group-for-mute";
const KEY_MATCH: &str = "match";

const ACTION_CREATE: &str = "create";
const ACTION_NONE: &str = "none";

const COMMENT_MARKERS: &[char] = &['#', ';'];

/// Errors that can occur during configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("File watch error: {0}")]
    WatchError(#[from] notify::Error),

    #[error("[{source_name}:{line}] {message}")]
    Syntax {
        source_name: String,
        line: usize,
        message: String,
    },

    #[error("[{source_name}:{line}] Key \"{key}\" is outside of any section")]
    MissingSection {
        source_name: String,
        line: usize,
        key: String,
    },

    #[error("[{source_name}:{line}] Section \"{section}\" has no name")]
    EmptyEntityName {
        source_name: String,
        line: usize,
        section: String,
    },

    #[error("[{source_name}:{line}] Failed to parse value \"{value}\" of {key}")]
    InvalidControlAction {
        source_name: String,
        line: usize,
        key: String,
        value: String,
    },

    #[error("[{source_name}:{line}] Failed to parse binding target \"{value}\"")]
    InvalidBindingTarget {
        source_name: String,
        line: usize,
        value: String,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// One `key = value` line together with where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigItem {
    pub source: String,
    pub line: usize,
    pub section: Option<String>,
    pub key: String,
    pub value: String,
}

/// Split configuration text into items
///
/// Blank lines and lines starting with `#` or `;` are skipped. Keys and
/// values are trimmed; the value is everything after the first `=`.
pub fn scan(source: &str, text: &str) -> Result<Vec<ConfigItem>> {
    let mut items = Vec::new();
    let mut section: Option<String> = None;

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();

        if trimmed.is_empty() || trimmed.starts_with(COMMENT_MARKERS) {
            continue;
        }

        if let Some(header) = trimmed.strip_prefix('[') {
            let name = header.strip_suffix(']').ok_or_else(|| ConfigError::Syntax {
                source_name: source.to_string(),
                line,
                message: format!("Invalid section header \"{}\"", trimmed),
            })?;
            section = Some(name.to_string());
            continue;
        }

        let (key, value) = trimmed.split_once('=').ok_or_else(|| ConfigError::Syntax {
            source_name: source.to_string(),
            line,
            message: format!("Missing '=' in \"{}\"", trimmed),
        })?;

        items.push(ConfigItem {
            source: source.to_string(),
            line,
            section: section.clone(),
            key: key.trim().to_string(),
            value: value.trim().to_string(),
        });
    }

    Ok(items)
}

/// Group reference of a stream, resolved at finalize time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedBinding {
    pub group: GroupHandle,
    pub target: BindingTarget,
}

/// A `[Stream <name>]` definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamRule {
    pub id: String,
    pub group_for_volume: Option<String>,
    pub group_for_mute: Option<String>,
    /// Compiled match rule; `None` never matches
    pub rule: Option<Expression>,
    volume_binding: Option<ResolvedBinding>,
    mute_binding: Option<ResolvedBinding>,
}

impl StreamRule {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            group_for_volume: None,
            group_for_mute: None,
            rule: None,
            volume_binding: None,
            mute_binding: None,
        }
    }

    pub fn group_name(&self, axis: Axis) -> Option<&str> {
        match axis {
            Axis::Volume => self.group_for_volume.as_deref(),
            Axis::Mute => self.group_for_mute.as_deref(),
        }
    }

    pub fn set_group_name(&mut self, axis: Axis, name: Option<String>) {
        match axis {
            Axis::Volume => self.group_for_volume = name,
            Axis::Mute => self.group_for_mute = name,
        }
    }

    /// Binding resolved for the axis, if the referenced group exists
    pub fn binding(&self, axis: Axis) -> Option<&ResolvedBinding> {
        match axis {
            Axis::Volume => self.volume_binding.as_ref(),
            Axis::Mute => self.mute_binding.as_ref(),
        }
    }

    fn resolve(&mut self, groups: &[ActiveGroup], host: &dyn RoutingHost) {
        for axis in Axis::ALL {
            let binding = self.group_name(axis).and_then(|name| {
                match groups.iter().find(|g| g.id() == name) {
                    Some(group) => Some(ResolvedBinding {
                        group: group.handle,
                        target: host.binding_target(group.id(), axis),
                    }),
                    None => {
                        warn!(
                            stream = %self.id,
                            group = %name,
                            %axis,
                            "Stream refers to undefined audio group"
                        );
                        None
                    }
                }
            });

            match axis {
                Axis::Volume => self.volume_binding = binding,
                Axis::Mute => self.mute_binding = binding,
            }
        }
    }
}

/// Accumulates configuration items until [`finalize`](ConfigLoader::finalize)
///
/// Declared names (from `[General]`) and entity details (from the per-entity
/// sections) may arrive in any order. Entities stay pending by name until
/// finalize moves the declared ones into the active, priority-ordered model.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    group_names: Vec<String>,
    stream_names: Vec<String>,
    pending_groups: HashMap<String, AudioGroupDefinition>,
    pending_streams: HashMap<String, StreamRule>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan and apply configuration text; the first bad directive rejects it all
    pub fn load_str(source: &str, text: &str) -> Result<Self> {
        let mut loader = Self::new();
        for item in scan(source, text)? {
            loader.apply(&item)?;
        }
        Ok(loader)
    }

    /// Read and apply a configuration source
    #[instrument(skip(source), fields(source = %source.name()))]
    pub async fn load(source: &dyn ConfigSource) -> Result<Self> {
        let text = source.read().await?;
        let loader = Self::load_str(&source.name(), &text)?;

        debug!(
            groups = loader.group_names.len(),
            streams = loader.stream_names.len(),
            "Configuration scanned"
        );
        Ok(loader)
    }

    /// Declared audio group names, in declaration order
    pub fn declared_groups(&self) -> &[String] {
        &self.group_names
    }

    /// Declared stream names, in match priority order
    pub fn declared_streams(&self) -> &[String] {
        &self.stream_names
    }

    /// Apply a single configuration item
    pub fn apply(&mut self, item: &ConfigItem) -> Result<()> {
        trace!(section = ?item.section, key = %item.key, line = item.line, "Applying config item");

        let section = item.section.as_deref().ok_or_else(|| ConfigError::MissingSection {
            source_name: item.source.clone(),
            line: item.line,
            key: item.key.clone(),
        })?;

        if section == GENERAL_SECTION {
            self.apply_general(item);
            Ok(())
        } else if let Some(name) = section.strip_prefix(AUDIO_GROUP_SECTION_PREFIX) {
            let name = entity_name(item, section, name)?;
            self.apply_group(name, item)
        } else if let Some(name) = section.strip_prefix(STREAM_SECTION_PREFIX) {
            let name = entity_name(item, section, name)?;
            self.apply_stream(name, item);
            Ok(())
        } else {
            debug!(section, key = %item.key, "Ignoring key in unknown section");
            Ok(())
        }
    }

    fn apply_general(&mut self, item: &ConfigItem) {
        match item.key.as_str() {
            KEY_AUDIO_GROUPS => self.group_names = split_names(&item.value),
            KEY_STREAMS => self.stream_names = split_names(&item.value),
            other => debug!(key = other, "Ignoring unknown key in [General]"),
        }
    }

    fn apply_group(&mut self, name: &str, item: &ConfigItem) -> Result<()> {
        let group = self
            .pending_groups
            .entry(name.to_string())
            .or_insert_with(|| AudioGroupDefinition::new(name));

        match item.key.as_str() {
            KEY_DESCRIPTION => group.description = item.value.clone(),
            KEY_VOLUME_CONTROL => group.set_control(Axis::Volume, control_action(item, Axis::Volume)?),
            KEY_MUTE_CONTROL => group.set_control(Axis::Mute, control_action(item, Axis::Mute)?),
            other => debug!(group = name, key = other, "Ignoring unknown audio group key"),
        }

        Ok(())
    }

    fn apply_stream(&mut self, name: &str, item: &ConfigItem) {
        let stream = self
            .pending_streams
            .entry(name.to_string())
            .or_insert_with(|| StreamRule::new(name));

        match item.key.as_str() {
            KEY_GROUP_FOR_VOLUME => stream.set_group_name(Axis::Volume, non_empty(&item.value)),
            KEY_GROUP_FOR_MUTE => stream.set_group_name(Axis::Mute, non_empty(&item.value)),
            KEY_MATCH => {
                stream.rule = match rule::compile(&item.value) {
                    Ok(expression) => Some(expression),
                    Err(e) => {
                        error!(
                            stream = name,
                            line = item.line,
                            error = %e,
                            "Failed to parse match rule, stream will never match"
                        );
                        None
                    }
                };
            }
            other => debug!(stream = name, key = other, "Ignoring unknown stream key"),
        }
    }

    /// Materialize declared groups and build the classification engine
    ///
    /// Groups the host fails to create are left out. Streams referring to
    /// missing groups keep their place in the evaluation order but leave that
    /// axis unbound. Entities that were described but never declared are
    /// dropped.
    pub fn finalize(self, host: Arc<dyn RoutingHost>, negation: NegationPolicy) -> AudioGroupsEngine {
        let Self {
            group_names,
            stream_names,
            mut pending_groups,
            mut pending_streams,
        } = self;

        let mut groups: Vec<ActiveGroup> = Vec::with_capacity(group_names.len());
        for name in &group_names {
            let definition = pending_groups
                .remove(name)
                .unwrap_or_else(|| AudioGroupDefinition::new(name.as_str()));

            match ActiveGroup::materialize(definition, host.as_ref()) {
                Ok(group) => {
                    info!(group = %name, handle = %group.handle, "Audio group created");
                    groups.push(group);
                }
                Err(e) => warn!(group = %name, error = %e, "Failed to create audio group"),
            }
        }

        for id in pending_groups.keys() {
            debug!(group = %id, "Audio group is not used");
        }

        let mut streams = Vec::with_capacity(stream_names.len());
        for name in &stream_names {
            let Some(mut stream) = pending_streams.remove(name) else {
                warn!(stream = %name, "Reference to undefined stream, ignoring");
                continue;
            };

            stream.resolve(&groups, host.as_ref());
            streams.push(stream);
        }

        for id in pending_streams.keys() {
            debug!(stream = %id, "Stream is not used");
        }

        info!(
            groups = groups.len(),
            streams = streams.len(),
            "Audio group configuration finalized"
        );

        AudioGroupsEngine::new(host, groups, streams, negation)
    }
}

fn entity_name<'a>(item: &ConfigItem, section: &str, name: &'a str) -> Result<&'a str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ConfigError::EmptyEntityName {
            source_name: item.source.clone(),
            line: item.line,
            section: section.to_string(),
        });
    }
    Ok(name)
}

/// Whitespace separated names, first occurrence wins
fn split_names(value: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in value.split_whitespace() {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn control_action(item: &ConfigItem, axis: Axis) -> Result<ControlAction> {
    match item.value.as_str() {
        ACTION_CREATE => Ok(ControlAction::Create),
        ACTION_NONE => Ok(ControlAction::None),
        value if value.starts_with("bind:") => BindingTarget::parse(value, axis.field_name())
            .map(ControlAction::Bind)
            .ok_or_else(|| ConfigError::InvalidBindingTarget {
                source_name: item.source.clone(),
                line: item.line,
                value: value.to_string(),
            }),
        value => Err(ConfigError::InvalidControlAction {
            source_name: item.source.clone(),
            line: item.line,
            key: item.key.clone(),
            value: value.to_string(),
        }),
    }
}
