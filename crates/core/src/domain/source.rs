//! Where audio group configuration text comes from

use crate::domain::config::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "audio-groups.conf";

/// Directory name used under the user and system configuration roots
pub const CONFIG_DIR_NAME: &str = "audiogroups";

const SYSTEM_CONFIG_ROOT: &str = "/etc";

/// Source of configuration text
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Name used in diagnostics (usually a path)
    fn name(&self) -> String;

    /// Read the whole configuration text
    async fn read(&self) -> Result<String>;
}

/// Configuration read from a file
///
/// A missing file reads as empty text, which loads as a configuration without
/// groups or streams.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Resolve `file` the way the daemon searches for its configuration
    ///
    /// Absolute paths are used as is. Relative ones are looked up in the user
    /// configuration directory, then the system one, and finally taken
    /// relative to the working directory.
    pub fn resolve(file: &Path) -> Self {
        if file.is_absolute() {
            return Self::new(file);
        }

        let candidates = dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME).join(file))
            .into_iter()
            .chain(std::iter::once(
                Path::new(SYSTEM_CONFIG_ROOT).join(CONFIG_DIR_NAME).join(file),
            ));

        for candidate in candidates {
            if candidate.exists() {
                debug!(path = %candidate.display(), "Resolved configuration file");
                return Self::new(candidate);
            }
        }

        Self::new(file)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ConfigSource for FileSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    async fn read(&self) -> Result<String> {
        match fs::read_to_string(&self.path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    path = %self.path.display(),
                    "Configuration file not found, no audio groups will be created"
                );
                Ok(String::new())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Configuration text held in memory
#[derive(Debug, Clone)]
pub struct InlineSource {
    name: String,
    text: String,
}

impl InlineSource {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

#[async_trait]
impl ConfigSource for InlineSource {
    fn name(&self) -> String {
        self.name.clone()
    }

    async fn read(&self) -> Result<String> {
        Ok(self.text.clone())
    }
}
