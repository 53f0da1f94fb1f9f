//! `sweepgen`: expand override sweeps and run them in chunks.
//!
//! ```text
//! sweepgen --config sweep.yaml --entrypoint dropout lr=0.1,0.01 -- python train.py
//! ```

mod command;
mod config;
mod entrypoints;

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sg_sweeper::{
    default_sweep_dir, BasicLauncher, JobContext, Launcher, SweepController, SweepResult,
};

use crate::command::CommandLauncher;
use crate::config::CliConfig;

#[derive(Parser, Debug)]
#[command(name = "sweepgen", version, about = "Parameter sweep generator and batch runner")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, env = "SWEEPGEN_CONFIG")]
    config: Option<PathBuf>,

    /// Output directory for the sweep
    #[arg(long)]
    sweep_dir: Option<PathBuf>,

    /// Max jobs per launcher call, -1 for unbounded
    #[arg(long, allow_negative_numbers = true)]
    max_batch_size: Option<i64>,

    /// Entrypoint to merge into every job (repeatable)
    #[arg(long = "entrypoint", value_name = "NAME")]
    entrypoints: Vec<String>,

    /// Collapse identical jobs; `--remove-duplicates=false` turns it off
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    remove_duplicates: Option<bool>,

    /// Reject sweeps with more jobs than this
    #[arg(long)]
    max_jobs: Option<usize>,

    /// Jobs of one chunk run concurrently
    #[arg(long)]
    parallelism: Option<usize>,

    /// Print the planned chunks without launching anything
    #[arg(long)]
    dry_run: bool,

    /// Print registered entrypoints and exit
    #[arg(long)]
    list_entrypoints: bool,

    /// Sweep overrides such as `foo=1,2` or `+bar=range(0,3)`
    #[arg(value_name = "OVERRIDE")]
    overrides: Vec<String>,

    /// Command run per job, with the job's overrides appended
    #[arg(last = true, value_name = "COMMAND")]
    command: Vec<String>,
}

impl Cli {
    /// Flags win over the config file.
    fn apply(&self, config: &mut CliConfig) {
        if let Some(dir) = &self.sweep_dir {
            config.sweep_dir = Some(dir.clone());
        }
        if let Some(n) = self.max_batch_size {
            config.sweeper.max_batch_size = Some(n);
        }
        config
            .sweeper
            .entrypoints
            .extend(self.entrypoints.iter().cloned());
        if let Some(enabled) = self.remove_duplicates {
            config.sweeper.remove_duplicates = enabled;
        }
        if let Some(n) = self.max_jobs {
            config.sweeper.max_jobs = Some(n);
        }
        if let Some(n) = self.parallelism {
            config.launcher.parallelism = n;
        }
        if !self.command.is_empty() {
            config.launcher.command = self.command.clone();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let registry = entrypoints::builtin_registry();

    if cli.list_entrypoints {
        for name in registry.names() {
            println!("{name}");
        }
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };
    cli.apply(&mut config);

    let sweep_dir = config
        .sweep_dir
        .clone()
        .unwrap_or_else(|| default_sweep_dir(Local::now()));

    let launcher: Box<dyn Launcher> = if cli.dry_run {
        Box::new(BasicLauncher::new(&sweep_dir, |_: &JobContext| {
            Ok(serde_json::Value::Null)
        }))
    } else {
        Box::new(CommandLauncher::new(
            &sweep_dir,
            &config.launcher.command,
            config.launcher.parallelism,
        )?)
    };

    let host_config = serde_json::to_value(&config).context("serializing configuration")?;
    let mut controller =
        SweepController::new(config.sweeper.clone(), &sweep_dir, registry, launcher)?
            .with_host_config(host_config);
    info!("Starting {}", controller);

    if cli.dry_run {
        let chunks = controller.plan(&cli.overrides)?;
        let mut job_idx = 0;
        for (chunk_idx, chunk) in chunks.iter().enumerate() {
            println!("chunk {chunk_idx} ({} jobs)", chunk.len());
            for overrides in chunk {
                println!("  #{job_idx} {}", overrides.join(" "));
                job_idx += 1;
            }
        }
        return Ok(());
    }

    let result = controller.sweep(&cli.overrides).await?;
    report(&result);
    Ok(())
}

fn report(result: &SweepResult) {
    let jobs: Vec<_> = result.iter().flatten().collect();
    let failed = jobs.iter().filter(|job| !job.is_completed()).count();
    for job in &jobs {
        let status = if job.is_completed() { "ok" } else { "FAILED" };
        println!("#{} {status} {}", job.job_idx, job.overrides.join(" "));
    }
    println!(
        "{} jobs in {} chunks, {failed} failed",
        jobs.len(),
        result.len()
    );
    if failed > 0 {
        warn!("{} of {} jobs failed", failed, jobs.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_overrides_and_command() {
        let cli = Cli::try_parse_from([
            "sweepgen",
            "--max-batch-size",
            "-1",
            "--entrypoint",
            "dropout",
            "foo=1,2",
            "+bar=0",
            "--",
            "python",
            "train.py",
        ])
        .unwrap();

        assert_eq!(cli.max_batch_size, Some(-1));
        assert_eq!(cli.entrypoints, vec!["dropout"]);
        assert_eq!(cli.overrides, vec!["foo=1,2", "+bar=0"]);
        assert_eq!(cli.command, vec!["python", "train.py"]);
    }

    #[test]
    fn flags_override_config_file() {
        let cli = Cli::try_parse_from([
            "sweepgen",
            "--sweep-dir",
            "out",
            "--max-batch-size",
            "4",
            "--entrypoint",
            "dropout",
            "--parallelism",
            "2",
            "--",
            "echo",
        ])
        .unwrap();
        let mut config = CliConfig::from_yaml(
            "sweeper:\n  max_batch_size: 10\n  entrypoints: [multilayer]\nlauncher:\n  command: [python]\n",
        )
        .unwrap();

        cli.apply(&mut config);
        assert_eq!(config.sweep_dir, Some(PathBuf::from("out")));
        assert_eq!(config.sweeper.max_batch_size, Some(4));
        assert_eq!(config.sweeper.entrypoints, vec!["multilayer", "dropout"]);
        assert_eq!(config.launcher.command, vec!["echo"]);
        assert_eq!(config.launcher.parallelism, 2);
    }

    #[test]
    fn remove_duplicates_can_be_switched_either_way() {
        let cli = Cli::try_parse_from(["sweepgen", "--remove-duplicates=false", "foo=1"]).unwrap();
        assert_eq!(cli.overrides, vec!["foo=1"]);
        let mut config = CliConfig::from_yaml("sweeper:\n  remove_duplicates: true\n").unwrap();
        cli.apply(&mut config);
        assert!(!config.sweeper.remove_duplicates);

        let cli = Cli::try_parse_from(["sweepgen", "--remove-duplicates", "foo=1"]).unwrap();
        assert_eq!(cli.remove_duplicates, Some(true));
        assert_eq!(cli.overrides, vec!["foo=1"]);
        let mut config = CliConfig::default();
        cli.apply(&mut config);
        assert!(config.sweeper.remove_duplicates);

        assert!(Cli::try_parse_from(["sweepgen", "--remove-duplicates=maybe"]).is_err());
    }

    #[test]
    fn absent_flags_keep_config_values() {
        let cli = Cli::try_parse_from(["sweepgen"]).unwrap();
        let mut config =
            CliConfig::from_yaml("sweeper:\n  remove_duplicates: true\nlauncher:\n  command: [sh]\n")
                .unwrap();
        let before = config.clone();
        cli.apply(&mut config);
        assert_eq!(config, before);
    }
}
