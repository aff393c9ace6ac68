//! Stream classification
//!
//! The engine holds the finalized configuration: live audio groups and the
//! stream rules in match priority order. For every new stream the host asks,
//! once per axis, which control the stream should be bound to.

use crate::domain::config::StreamRule;
use crate::domain::group::{ActiveGroup, BindingTarget};
use crate::domain::host::{InitialControlHook, RoutingHost};
use crate::domain::rule::NegationPolicy;
use crate::domain::stream::{Axis, StreamAttributes};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Finalized audio group configuration, ready for classification
pub struct AudioGroupsEngine {
    host: Arc<dyn RoutingHost>,
    groups: Vec<ActiveGroup>,
    streams: Vec<StreamRule>,
    negation: NegationPolicy,
}

/// Serializable view of the engine state
#[derive(Debug, Serialize)]
pub struct EngineSnapshot<'a> {
    pub negation: NegationPolicy,
    pub groups: &'a [ActiveGroup],
    pub streams: &'a [StreamRule],
}

impl EngineSnapshot<'_> {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl AudioGroupsEngine {
    pub(crate) fn new(
        host: Arc<dyn RoutingHost>,
        groups: Vec<ActiveGroup>,
        streams: Vec<StreamRule>,
        negation: NegationPolicy,
    ) -> Self {
        Self {
            host,
            groups,
            streams,
            negation,
        }
    }

    /// Live groups, in declaration order
    pub fn groups(&self) -> &[ActiveGroup] {
        &self.groups
    }

    pub fn group(&self, id: &str) -> Option<&ActiveGroup> {
        self.groups.iter().find(|g| g.id() == id)
    }

    /// Stream rules in match priority order
    pub fn streams(&self) -> &[StreamRule] {
        &self.streams
    }

    pub fn negation_policy(&self) -> NegationPolicy {
        self.negation
    }

    pub fn snapshot(&self) -> EngineSnapshot<'_> {
        EngineSnapshot {
            negation: self.negation,
            groups: &self.groups,
            streams: &self.streams,
        }
    }

    /// First rule, in priority order, whose expression matches the stream
    pub fn matching_rule(&self, stream: &StreamAttributes) -> Option<&StreamRule> {
        self.streams.iter().find(|rule| {
            rule.rule
                .as_ref()
                .is_some_and(|expression| expression.matches(stream, self.negation))
        })
    }

    /// Decide which target the stream's control on `axis` should be bound to
    ///
    /// Only the first matching rule is considered. It yields nothing when its
    /// group for the axis is unresolved or the stream already carries an
    /// explicit control for the axis.
    pub fn classify(&self, stream: &StreamAttributes, axis: Axis) -> Option<BindingTarget> {
        let Some(rule) = self.matching_rule(stream) else {
            trace!(stream = %stream.name, %axis, "No rule matched, leaving control untouched");
            return None;
        };

        info!(stream = %stream.name, rule = %rule.id, %axis, "Stream matched rule");
        if let Some(expression) = &rule.rule {
            debug!(rule = %rule.id, expression = %expression, "Matched expression");
        }

        if stream.has_explicit_control(axis) {
            debug!(stream = %stream.name, %axis, "Stream has an explicit control, not binding");
            return None;
        }

        rule.binding(axis).map(|binding| binding.target.clone())
    }

    /// Release every live group through the host
    ///
    /// Safe to call more than once; also runs on drop.
    pub fn teardown(&mut self) {
        if self.groups.is_empty() && self.streams.is_empty() {
            return;
        }

        info!(groups = self.groups.len(), "Tearing down audio groups");
        self.streams.clear();
        for group in self.groups.drain(..) {
            debug!(group = %group.id(), handle = %group.handle, "Destroying audio group");
            self.host.destroy_group(group.handle);
        }
    }
}

impl InitialControlHook for AudioGroupsEngine {
    fn on_stream_initial_control(&self, axis: Axis, stream: &StreamAttributes) -> Option<BindingTarget> {
        self.classify(stream, axis)
    }
}

impl fmt::Debug for AudioGroupsEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioGroupsEngine")
            .field("groups", &self.groups)
            .field("streams", &self.streams)
            .field("negation", &self.negation)
            .finish_non_exhaustive()
    }
}

impl Drop for AudioGroupsEngine {
    fn drop(&mut self) {
        self.teardown();
    }
}
