//! Reloadable engine shared between the config loader and stream callbacks
//!
//! Classification takes a read lock; a reload takes the write lock only after
//! the new configuration text has been read and scanned, so a rejected file
//! leaves the running model untouched.

use std::path::PathBuf;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;
use tracing::{error, info, instrument, warn};
use audiogroups_core::domain::classifier::AudioGroupsEngine;
use audiogroups_core::domain::config::{self, ConfigLoader};
use audiogroups_core::domain::group::BindingTarget;
use audiogroups_core::domain::host::{InitialControlHook, RoutingHost};
use audiogroups_core::domain::rule::NegationPolicy;
use audiogroups_core::domain::source::ConfigSource;
use audiogroups_core::domain::stream::{Axis, StreamAttributes};

/// Thread-safe handle to the current audio groups model
pub struct SharedEngine {
    host: Arc<dyn RoutingHost>,
    negation: NegationPolicy,
    engine: RwLock<Option<AudioGroupsEngine>>,
}

impl SharedEngine {
    /// Handle with no model loaded; every stream is left untouched
    pub fn new(host: Arc<dyn RoutingHost>, negation: NegationPolicy) -> Self {
        Self {
            host,
            negation,
            engine: RwLock::new(None),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<AudioGroupsEngine>> {
        self.engine.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<AudioGroupsEngine>> {
        self.engine.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Load `source` and swap it in for the current model
    ///
    /// The previous groups are destroyed before the new ones are created so
    /// that group ids can be reused. On error the previous model stays.
    #[instrument(skip(self, source), fields(source = %source.name()))]
    pub async fn reload(&self, source: &dyn ConfigSource) -> config::Result<()> {
        let loader = ConfigLoader::load(source).await?;

        let mut engine = self.write();
        if let Some(mut previous) = engine.take() {
            previous.teardown();
        }
        let next = loader.finalize(self.host.clone(), self.negation);
        info!(
            groups = next.groups().len(),
            streams = next.streams().len(),
            "Audio groups model loaded"
        );
        *engine = Some(next);
        Ok(())
    }

    /// Reload every time the watcher reports a change, until the channel closes
    pub async fn follow(
        &self,
        source: &dyn ConfigSource,
        mut changes: broadcast::Receiver<PathBuf>,
    ) {
        loop {
            match changes.recv().await {
                Ok(path) => {
                    info!(path = %path.display(), "Configuration changed, reloading");
                    if let Err(e) = self.reload(source).await {
                        error!(error = %e, "Reload failed, keeping previous configuration");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Missed configuration change events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.read().is_some()
    }

    /// Run `f` against the current model, if any
    pub fn with_engine<R>(&self, f: impl FnOnce(&AudioGroupsEngine) -> R) -> Option<R> {
        self.read().as_ref().map(f)
    }

    pub fn classify(&self, stream: &StreamAttributes, axis: Axis) -> Option<BindingTarget> {
        self.read().as_ref()?.classify(stream, axis)
    }

    /// Drop the current model and destroy its groups
    pub fn teardown(&self) {
        if let Some(mut engine) = self.write().take() {
            engine.teardown();
        }
    }
}

impl InitialControlHook for SharedEngine {
    fn on_stream_initial_control(
        &self,
        axis: Axis,
        stream: &StreamAttributes,
    ) -> Option<BindingTarget> {
        self.classify(stream, axis)
    }
}
