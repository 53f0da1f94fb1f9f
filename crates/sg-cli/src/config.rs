//! YAML configuration file for the `sweepgen` binary.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use sg_sweeper::SweeperConfig;

/// How each job is run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// Program and leading arguments; job overrides are appended.
    pub command: Vec<String>,
    /// Max jobs of one chunk running at the same time.
    pub parallelism: usize,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Defaults to `multirun/<date>/<time>`.
    pub sweep_dir: Option<PathBuf>,
    pub sweeper: SweeperConfig,
    pub launcher: LauncherConfig,
    /// Opaque task settings, copied into the sweep snapshot.
    pub task: serde_json::Value,
}

impl CliConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }
}
