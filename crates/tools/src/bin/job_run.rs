//!
//! Run and inspect jobs without the HTTP server.
//!
//! Usage:
//! - `job-run run "<prompt>"` runs a job in the foreground
//! - `job-run status <id>` prints a job as JSON
//! - `job-run list` lists jobs and their stages

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use rodforge_jobs::{JobId, JobOrchestrator, OrchestratorConfig, Stage};

#[derive(Parser, Debug)]
#[command(name = "job-run")]
#[command(about = "Run and inspect rodforge jobs")]
struct Args {
    /// YAML orchestrator configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Root directory for job directories (overrides the config file)
    #[arg(long = "generated-dir", global = true)]
    generated_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a job for the prompt and run it to completion
    Run { prompt: String },
    /// Print a job's state as JSON
    Status { id: String },
    /// List every job with its stage
    List,
}

#[tokio::main]
async fn main() {
    rodforge_tools::init_logging();

    let args = Args::parse();
    match run(args).await {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(err) => {
            error!("{err:#}");
            process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when a job ran but failed.
async fn run(args: Args) -> anyhow::Result<bool> {
    let mut config = match &args.config {
        Some(path) => OrchestratorConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => OrchestratorConfig::default(),
    };
    if let Some(dir) = args.generated_dir {
        config.generated_dir = dir;
    }
    let orchestrator = JobOrchestrator::from_config(config)?;

    match args.command {
        Command::Run { prompt } => {
            let job = orchestrator.store().create(&prompt).await?;
            info!("Job {} in {}", job.id, job.artifacts.dir.display());
            let job = orchestrator.run(&job.id).await?;
            match job.stage {
                Stage::Completed => {
                    info!("Animation: {}", job.artifacts.animation.display());
                    Ok(true)
                }
                _ => {
                    error!(
                        "Job {} failed: {}",
                        job.id,
                        job.last_error.as_deref().unwrap_or("unknown error")
                    );
                    Ok(false)
                }
            }
        }
        Command::Status { id } => {
            let id = JobId::parse(&id)?;
            let job = orchestrator.status(&id).await?;
            println!("{}", serde_json::to_string_pretty(&job)?);
            Ok(true)
        }
        Command::List => {
            for id in orchestrator.store().list().await? {
                match orchestrator.status(&id).await {
                    Ok(job) => println!("{id}\t{}", job.stage),
                    Err(err) => println!("{id}\t<{err}>"),
                }
            }
            Ok(true)
        }
    }
}
