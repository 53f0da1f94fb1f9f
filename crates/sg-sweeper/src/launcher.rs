//! Launcher abstraction and the in-process launcher.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use sg_types::{BatchError, LaunchError, LaunchResult};

use crate::batch::RenderedOverrides;

/// Name of the per-job record of the overrides it ran with.
pub const JOB_OVERRIDES_FILE_NAME: &str = "overrides.yaml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Completed,
    Failed,
}

/// Result of a single launched job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobReturn {
    /// Global job number across the whole sweep.
    pub job_idx: usize,
    pub overrides: RenderedOverrides,
    pub status: JobStatus,
    pub return_value: Option<serde_json::Value>,
    pub working_dir: PathBuf,
    pub error: Option<String>,
}

impl JobReturn {
    pub fn completed(
        job_idx: usize,
        overrides: RenderedOverrides,
        working_dir: PathBuf,
        return_value: Option<serde_json::Value>,
    ) -> Self {
        Self {
            job_idx,
            overrides,
            status: JobStatus::Completed,
            return_value,
            working_dir,
            error: None,
        }
    }

    pub fn failed(
        job_idx: usize,
        overrides: RenderedOverrides,
        working_dir: PathBuf,
        error: String,
    ) -> Self {
        Self {
            job_idx,
            overrides,
            status: JobStatus::Failed,
            return_value: None,
            working_dir,
            error: Some(error),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == JobStatus::Completed
    }
}

/// Runs one chunk of jobs.
///
/// The sweep controller awaits every call before dispatching the next
/// chunk; implementations are free to run the jobs of one chunk in parallel
/// but must return results in job order.
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Launch `batch`, numbering jobs from `initial_job_idx`.
    async fn launch(
        &mut self,
        batch: &[RenderedOverrides],
        initial_job_idx: usize,
    ) -> LaunchResult<Vec<JobReturn>>;

    /// Launcher-imposed constraints on the whole job list.
    fn validate_batch(&self, _batches: &[RenderedOverrides]) -> Result<(), BatchError> {
        Ok(())
    }

    /// Human-readable launcher name.
    fn name(&self) -> &str;
}

/// Context handed to an in-process task.
#[derive(Debug, Clone, PartialEq)]
pub struct JobContext {
    pub job_idx: usize,
    pub overrides: RenderedOverrides,
    pub working_dir: PathBuf,
}

/// In-process task run once per job.
pub type TaskFn = dyn Fn(&JobContext) -> anyhow::Result<serde_json::Value> + Send + Sync;

/// Create `<sweep_dir>/<job_idx>` and record the job's overrides there.
pub async fn prepare_job_dir(
    sweep_dir: &Path,
    job_idx: usize,
    overrides: &[String],
) -> LaunchResult<PathBuf> {
    let job_dir_error = |message: String| LaunchError::JobDir { job_idx, message };

    let working_dir = sweep_dir.join(job_idx.to_string());
    tokio::fs::create_dir_all(&working_dir)
        .await
        .map_err(|e| job_dir_error(format!("{}: {e}", working_dir.display())))?;
    let yaml = serde_yaml::to_string(overrides).map_err(|e| job_dir_error(e.to_string()))?;
    tokio::fs::write(working_dir.join(JOB_OVERRIDES_FILE_NAME), yaml)
        .await
        .map_err(|e| job_dir_error(e.to_string()))?;
    Ok(working_dir)
}

/// Runs jobs sequentially in the current process.
///
/// A task error marks that job as failed; it does not abort the chunk.
#[derive(Clone)]
pub struct BasicLauncher {
    sweep_dir: PathBuf,
    task: Arc<TaskFn>,
}

impl fmt::Debug for BasicLauncher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicLauncher")
            .field("sweep_dir", &self.sweep_dir)
            .finish_non_exhaustive()
    }
}

impl BasicLauncher {
    pub fn new<F>(sweep_dir: impl Into<PathBuf>, task: F) -> Self
    where
        F: Fn(&JobContext) -> anyhow::Result<serde_json::Value> + Send + Sync + 'static,
    {
        Self {
            sweep_dir: sweep_dir.into(),
            task: Arc::new(task),
        }
    }
}

#[async_trait]
impl Launcher for BasicLauncher {
    async fn launch(
        &mut self,
        batch: &[RenderedOverrides],
        initial_job_idx: usize,
    ) -> LaunchResult<Vec<JobReturn>> {
        info!("Launching {} jobs locally", batch.len());

        let mut results = Vec::with_capacity(batch.len());
        for (offset, overrides) in batch.iter().enumerate() {
            let job_idx = initial_job_idx + offset;
            info!("\t#{} : {}", job_idx, overrides.join(" "));

            let working_dir = prepare_job_dir(&self.sweep_dir, job_idx, overrides).await?;
            let context = JobContext {
                job_idx,
                overrides: overrides.clone(),
                working_dir: working_dir.clone(),
            };
            let result = match (*self.task)(&context) {
                Ok(value) => {
                    JobReturn::completed(job_idx, overrides.clone(), working_dir, Some(value))
                }
                Err(err) => {
                    warn!("Job #{} failed: {:#}", job_idx, err);
                    let message = format!("{err:#}");
                    JobReturn::failed(job_idx, overrides.clone(), working_dir, message)
                }
            };
            results.push(result);
        }
        Ok(results)
    }

    fn name(&self) -> &str {
        "basic"
    }
}
