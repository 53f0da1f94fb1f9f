//! Launcher that runs each job as an external process.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use tokio::fs::File;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use sg_sweeper::{prepare_job_dir, JobReturn, Launcher, RenderedOverrides};
use sg_types::{config_error, LaunchError, LaunchResult, SgResult};

pub const STDOUT_FILE_NAME: &str = "stdout.log";
pub const STDERR_FILE_NAME: &str = "stderr.log";

/// Spawns `command <overrides...>` per job inside `<sweep_dir>/<job_idx>`.
///
/// Up to `parallelism` jobs of a chunk run at once. A non-zero exit marks
/// the job failed; failing to spawn aborts the chunk.
#[derive(Debug, Clone)]
pub struct CommandLauncher {
    sweep_dir: PathBuf,
    program: String,
    args: Vec<String>,
    parallelism: usize,
}

impl CommandLauncher {
    pub fn new(
        sweep_dir: impl Into<PathBuf>,
        command: &[String],
        parallelism: usize,
    ) -> SgResult<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| config_error!("launcher command is empty"))?;
        if parallelism == 0 {
            return Err(config_error!("launcher parallelism must be at least 1"));
        }
        Ok(Self {
            sweep_dir: sweep_dir.into(),
            program: program.clone(),
            args: args.to_vec(),
            parallelism,
        })
    }

    async fn spawn(
        &self,
        job_idx: usize,
        overrides: &[String],
    ) -> LaunchResult<(Child, PathBuf)> {
        let working_dir = prepare_job_dir(&self.sweep_dir, job_idx, overrides).await?;
        let spawn_error = |source| LaunchError::Spawn { job_idx, source };

        let stdout = File::create(working_dir.join(STDOUT_FILE_NAME))
            .await
            .map_err(spawn_error)?
            .into_std()
            .await;
        let stderr = File::create(working_dir.join(STDERR_FILE_NAME))
            .await
            .map_err(spawn_error)?
            .into_std()
            .await;
        let child = Command::new(&self.program)
            .args(&self.args)
            .args(overrides)
            .current_dir(&working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_error)?;
        debug!("Spawned job #{} in {}", job_idx, working_dir.display());
        Ok((child, working_dir))
    }
}

fn job_result(
    job_idx: usize,
    overrides: &[String],
    working_dir: PathBuf,
    status: ExitStatus,
) -> JobReturn {
    let overrides = overrides.to_vec();
    if status.success() {
        let value = serde_json::json!({ "exit_code": status.code() });
        JobReturn::completed(job_idx, overrides, working_dir, Some(value))
    } else {
        warn!("Job #{} exited with {}", job_idx, status);
        JobReturn::failed(job_idx, overrides, working_dir, status.to_string())
    }
}

#[async_trait]
impl Launcher for CommandLauncher {
    async fn launch(
        &mut self,
        batch: &[RenderedOverrides],
        initial_job_idx: usize,
    ) -> LaunchResult<Vec<JobReturn>> {
        info!("Launching {} jobs with {}", batch.len(), self.program);

        let mut results = Vec::with_capacity(batch.len());
        for (window_idx, window) in batch.chunks(self.parallelism).enumerate() {
            let first_idx = initial_job_idx + window_idx * self.parallelism;

            let mut running = Vec::with_capacity(window.len());
            for (offset, overrides) in window.iter().enumerate() {
                let job_idx = first_idx + offset;
                info!("\t#{} : {}", job_idx, overrides.join(" "));
                let (child, working_dir) = self.spawn(job_idx, overrides).await?;
                running.push((job_idx, overrides, working_dir, child));
            }

            for (job_idx, overrides, working_dir, mut child) in running {
                let status = child.wait().await.map_err(|e| LaunchError::ChunkFailed {
                    initial_job_idx,
                    message: format!("waiting for job {job_idx}: {e}"),
                })?;
                results.push(job_result(job_idx, overrides, working_dir, status));
            }
        }
        Ok(results)
    }

    fn name(&self) -> &str {
        "command"
    }
}
