//! Engine settings and configuration file watching

use crate::domain::config::{ConfigError, Result};
use crate::domain::rule::NegationPolicy;
use crate::domain::source::{FileSource, CONFIG_DIR_NAME, DEFAULT_CONFIG_FILE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument};

/// Settings file name inside the configuration directory
pub const SETTINGS_FILE: &str = "settings.toml";

/// Daemon-level settings, stored as TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Audio group configuration file, resolved like [`FileSource::resolve`]
    pub config_file: PathBuf,

    /// How `NEG` in match rules is evaluated
    pub negation: NegationPolicy,

    /// Default `tracing` filter directive
    pub log_filter: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            config_file: PathBuf::from(DEFAULT_CONFIG_FILE),
            negation: NegationPolicy::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl EngineSettings {
    /// Load settings from a TOML file
    #[instrument(skip(path))]
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading settings");

        let contents = fs::read_to_string(path).await?;
        let settings: Self = toml::from_str(&contents)?;

        debug!(?settings, "Settings loaded");
        Ok(settings)
    }

    /// Save settings to a TOML file
    #[instrument(skip(self, path))]
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        info!(path = %path.display(), "Saving settings");

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        fs::write(path, toml_str).await?;
        Ok(())
    }

    /// `~/.config/audiogroups` on Linux
    pub fn default_config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(CONFIG_DIR_NAME))
            .ok_or_else(|| ConfigError::Invalid("Could not determine config directory".to_string()))
    }

    /// Load the settings file from the default directory, or defaults if absent
    pub async fn load_or_default() -> Self {
        let Ok(dir) = Self::default_config_dir() else {
            return Self::default();
        };

        let path = dir.join(SETTINGS_FILE);
        if !path.exists() {
            return Self::default();
        }

        match Self::load_from_file(&path).await {
            Ok(settings) => settings,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to load settings, using defaults");
                Self::default()
            }
        }
    }

    /// Source for the configured audio group file
    pub fn config_source(&self) -> FileSource {
        FileSource::resolve(&self.config_file)
    }
}

/// Watches one configuration file and broadcasts its path on change
pub struct ConfigWatcher {
    _watcher: notify::RecommendedWatcher,
    change_tx: broadcast::Sender<PathBuf>,
}

impl ConfigWatcher {
    /// Start watching `path`
    ///
    /// The parent directory is watched so that editors replacing the file are
    /// noticed too.
    pub async fn new(path: PathBuf) -> Result<Self> {
        use notify::Watcher;

        let file_name = path
            .file_name()
            .map(|name| name.to_os_string())
            .ok_or_else(|| ConfigError::Invalid(format!("Not a file path: {}", path.display())))?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        fs::create_dir_all(&dir).await?;

        let (change_tx, _change_rx) = broadcast::channel(32);
        let tx_clone = change_tx.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                if matches!(
                    event.kind,
                    notify::EventKind::Create(_) | notify::EventKind::Modify(_)
                ) {
                    for changed in event.paths {
                        if changed.file_name() == Some(file_name.as_os_str()) {
                            if let Err(e) = tx_clone.send(changed) {
                                debug!("No listener for config change event: {}", e);
                            }
                        }
                    }
                }
            }
        })?;

        watcher.watch(&dir, notify::RecursiveMode::NonRecursive)?;

        info!(path = %path.display(), "Config watcher started");

        Ok(Self {
            _watcher: watcher,
            change_tx,
        })
    }

    /// Subscribe to change events
    pub fn subscribe(&self) -> broadcast::Receiver<PathBuf> {
        self.change_tx.subscribe()
    }
}
