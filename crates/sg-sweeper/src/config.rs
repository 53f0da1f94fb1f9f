//! Sweeper configuration.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use sg_types::{config_error, SgResult};

/// Sentinel for "no batch limit".
pub const UNBOUNDED_BATCH_SIZE: i64 = -1;

/// Name of the configuration snapshot written into the sweep directory.
pub const SNAPSHOT_FILE_NAME: &str = "multirun.yaml";

/// Settings for one sweep invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweeperConfig {
    /// Max number of jobs per launcher call. `None` or `-1` = one chunk.
    pub max_batch_size: Option<i64>,

    /// Legacy single entrypoint identifier.
    pub entrypoint: Option<String>,

    /// Entrypoint identifiers, merged by cartesian product in list order.
    pub entrypoints: Vec<String>,

    /// Collapse identical rendered jobs to their first occurrence.
    pub remove_duplicates: bool,

    /// Reject sweeps with more jobs than this.
    pub max_jobs: Option<usize>,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            max_batch_size: None,
            entrypoint: None,
            entrypoints: Vec::new(),
            remove_duplicates: false,
            max_jobs: None,
        }
    }
}

impl SweeperConfig {
    pub fn with_max_batch_size(mut self, n: i64) -> Self {
        self.max_batch_size = Some(n);
        self
    }

    pub fn with_entrypoint(mut self, name: impl Into<String>) -> Self {
        self.entrypoints.push(name.into());
        self
    }

    pub fn with_remove_duplicates(mut self, enabled: bool) -> Self {
        self.remove_duplicates = enabled;
        self
    }

    pub fn with_max_jobs(mut self, n: usize) -> Self {
        self.max_jobs = Some(n);
        self
    }

    /// Resolved chunk size; `None` means a single chunk.
    pub fn batch_limit(&self) -> SgResult<Option<usize>> {
        match self.max_batch_size {
            None | Some(UNBOUNDED_BATCH_SIZE) => Ok(None),
            Some(n) if n > 0 => Ok(Some(n as usize)),
            Some(n) => Err(config_error!(
                "max_batch_size must be positive or {UNBOUNDED_BATCH_SIZE}, got {n}"
            )),
        }
    }

    /// All entrypoint identifiers in invocation order; the legacy single
    /// entrypoint comes first.
    pub fn entrypoint_names(&self) -> Vec<String> {
        self.entrypoint
            .iter()
            .chain(self.entrypoints.iter())
            .cloned()
            .collect()
    }

    pub fn validate(&self) -> SgResult<()> {
        self.batch_limit()?;
        if self.max_jobs == Some(0) {
            return Err(config_error!("max_jobs must be positive"));
        }
        if let Some(name) = self.entrypoint_names().iter().find(|n| n.trim().is_empty()) {
            return Err(config_error!("entrypoint identifier '{name}' is empty"));
        }
        Ok(())
    }
}

/// Default sweep directory: `multirun/<date>/<time>`.
pub fn default_sweep_dir(now: DateTime<Local>) -> PathBuf {
    PathBuf::from("multirun")
        .join(now.format("%Y-%m-%d").to_string())
        .join(now.format("%H-%M-%S").to_string())
}
