use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use setterweave_weaver::WeaverConfig;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the optional configuration file at the root of a project.
pub const CONFIG_FILE: &str = "setterweave.json";

/// Configuration of a weaving run over a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Directory relative paths are resolved against
    pub project_root: PathBuf,
    /// Directories searched for referenced assemblies
    pub search_paths: Vec<PathBuf>,
    /// Settings handed to the weaver
    pub weaver: WeaverConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            search_paths: Vec::new(),
            weaver: WeaverConfig::default(),
        }
    }
}

impl RunnerConfig {
    /// Reads a configuration file. A relative `project_root` is taken relative to the
    /// directory holding the file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| {
            setterweave_core::Error::FileRead {
                path: path.display().to_string(),
                source,
            }
        })?;
        let mut config: RunnerConfig =
            serde_json::from_str(&text).map_err(|source| Error::Config {
                path: path.to_path_buf(),
                source,
            })?;

        if config.project_root.is_relative() {
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            config.project_root = base.join(&config.project_root);
        }
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Loads `setterweave.json` from `project_root` if present, defaults otherwise.
    pub fn discover(project_root: &Path) -> Result<Self> {
        let candidate = project_root.join(CONFIG_FILE);
        if candidate.is_file() {
            return Self::load(&candidate);
        }
        Ok(Self {
            project_root: project_root.to_path_buf(),
            ..Self::default()
        })
    }
}
