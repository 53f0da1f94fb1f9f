//! # sg-sweeper
//!
//! Override sweep generation and dispatch for sweepgen.
//!
//! Expands command-line sweep axes, merges them with programmatic entrypoint
//! generators (CLI values take precedence), optionally removes duplicate
//! jobs, splits the result into bounded chunks and hands each chunk to a
//! [`Launcher`] in order.

mod batch;
mod chunk;
mod config;
mod controller;
mod entrypoint;
mod expand;
mod launcher;
mod validate;

pub use batch::{remove_duplicates, BatchBuilder, RenderedOverrides};
pub use chunk::BatchChunker;
pub use config::{default_sweep_dir, SweeperConfig, SNAPSHOT_FILE_NAME, UNBOUNDED_BATCH_SIZE};
pub use controller::{SweepController, SweepResult, SweepSnapshot};
pub use entrypoint::{
    compress_overrides, merge_overrides, EntrypointFn, EntrypointRegistry, EntrypointRunner,
};
pub use expand::{cartesian_product, AxisExpander};
pub use launcher::{
    prepare_job_dir, BasicLauncher, JobContext, JobReturn, JobStatus, Launcher, TaskFn,
    JOB_OVERRIDES_FILE_NAME,
};
pub use validate::{BatchValidator, JobLimitValidator, KeyCollisionValidator};
