//! Sweep orchestration.
//!
//! [`SweepController::sweep`] runs the whole pipeline: snapshot the config,
//! parse the override arguments, expand CLI axes, run entrypoints, build and
//! validate the job list, chunk it and hand every chunk to the launcher in
//! order. Chunks never overlap: each launch is awaited before the next one
//! starts, so job numbering is gap-free and results are ordered.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

use sg_types::{OverrideParser, SgResult};

use crate::batch::{BatchBuilder, RenderedOverrides};
use crate::chunk::BatchChunker;
use crate::config::{SweeperConfig, SNAPSHOT_FILE_NAME};
use crate::entrypoint::{EntrypointRegistry, EntrypointRunner};
use crate::expand::AxisExpander;
use crate::launcher::{JobReturn, Launcher};
use crate::validate::{BatchValidator, JobLimitValidator, KeyCollisionValidator};

/// Per-chunk launcher results, in dispatch order.
pub type SweepResult = Vec<Vec<JobReturn>>;

/// Resolved configuration written to `multirun.yaml`.
#[derive(Debug, Clone, Serialize)]
pub struct SweepSnapshot<'a> {
    pub sweep_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub sweep_dir: &'a Path,
    pub launcher: &'a str,
    pub sweeper: &'a SweeperConfig,
    pub overrides: &'a [String],
    pub config: &'a serde_json::Value,
}

pub struct SweepController {
    id: Uuid,
    config: SweeperConfig,
    sweep_dir: PathBuf,
    registry: EntrypointRegistry,
    launcher: Box<dyn Launcher>,
    validators: Vec<Box<dyn BatchValidator>>,
    host_config: serde_json::Value,
}

impl fmt::Display for SweepController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SweepController(max_batch_size={:?}, entrypoints={:?})",
            self.config.max_batch_size,
            self.config.entrypoint_names()
        )
    }
}

impl fmt::Debug for SweepController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SweepController")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("sweep_dir", &self.sweep_dir)
            .field("registry", &self.registry)
            .field("launcher", &self.launcher.name())
            .finish_non_exhaustive()
    }
}

impl SweepController {
    /// Create a controller; fails on an invalid sweeper config.
    pub fn new(
        config: SweeperConfig,
        sweep_dir: impl Into<PathBuf>,
        registry: EntrypointRegistry,
        launcher: Box<dyn Launcher>,
    ) -> SgResult<Self> {
        config.validate()?;

        let mut validators: Vec<Box<dyn BatchValidator>> = vec![Box::new(KeyCollisionValidator)];
        if let Some(max_jobs) = config.max_jobs {
            validators.push(Box::new(JobLimitValidator::new(max_jobs)));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            config,
            sweep_dir: sweep_dir.into(),
            registry,
            launcher,
            validators,
            host_config: serde_json::Value::Null,
        })
    }

    /// Opaque host configuration to include in the snapshot.
    pub fn with_host_config(mut self, host_config: serde_json::Value) -> Self {
        self.host_config = host_config;
        self
    }

    pub fn with_validator(mut self, validator: Box<dyn BatchValidator>) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn sweep_dir(&self) -> &Path {
        &self.sweep_dir
    }

    pub fn config(&self) -> &SweeperConfig {
        &self.config
    }

    /// Write the resolved configuration to `<sweep_dir>/multirun.yaml`.
    pub async fn save_sweep_config(&self, arguments: &[String]) -> SgResult<PathBuf> {
        tokio::fs::create_dir_all(&self.sweep_dir).await?;

        let snapshot = SweepSnapshot {
            sweep_id: self.id,
            created_at: Utc::now(),
            sweep_dir: &self.sweep_dir,
            launcher: self.launcher.name(),
            sweeper: &self.config,
            overrides: arguments,
            config: &self.host_config,
        };
        let path = self.sweep_dir.join(SNAPSHOT_FILE_NAME);
        tokio::fs::write(&path, serde_yaml::to_string(&snapshot)?).await?;
        debug!("Saved sweep config to {}", path.display());
        Ok(path)
    }

    /// Flat, validated job list for `arguments`, before chunking.
    pub fn build_batches(&self, arguments: &[String]) -> SgResult<Vec<RenderedOverrides>> {
        let specs = OverrideParser::create().parse_overrides(arguments)?;
        let cli = AxisExpander::new().combinations(&specs);
        let entry = EntrypointRunner::new(&self.registry).run(&self.config.entrypoint_names())?;
        let batches = BatchBuilder::new(self.config.remove_duplicates).build(&cli, &entry);
        info!(
            "Sweep has {} jobs ({} CLI combinations, {} entrypoint combinations)",
            batches.len(),
            cli.len(),
            entry.len()
        );

        for validator in &self.validators {
            debug!("Validating batch with {}", validator.name());
            validator.validate(&batches)?;
        }
        self.launcher.validate_batch(&batches)?;
        Ok(batches)
    }

    /// Jobs grouped into the chunks that would be launched; no side effects.
    pub fn plan(&self, arguments: &[String]) -> SgResult<Vec<Vec<RenderedOverrides>>> {
        let chunker = BatchChunker::from_config(&self.config)?;
        Ok(chunker.chunk(self.build_batches(arguments)?))
    }

    /// Run the sweep. Any error aborts it; results of chunks that already
    /// completed are dropped.
    pub async fn sweep(&mut self, arguments: &[String]) -> SgResult<SweepResult> {
        info!("{} sweeping", self);
        info!("Sweep output dir : {}", self.sweep_dir.display());

        self.save_sweep_config(arguments).await?;
        let chunks = self.plan(arguments)?;

        let mut returns = Vec::with_capacity(chunks.len());
        let mut initial_job_idx = 0;
        for (chunk_idx, batch) in chunks.iter().enumerate() {
            info!(
                "Dispatching chunk {}/{} ({} jobs, starting at #{})",
                chunk_idx + 1,
                chunks.len(),
                batch.len(),
                initial_job_idx
            );
            let results = self.launcher.launch(batch, initial_job_idx).await?;
            initial_job_idx += batch.len();
            returns.push(results);
        }
        info!("Sweep finished: {} jobs in {} chunks", initial_job_idx, returns.len());
        Ok(returns)
    }
}
