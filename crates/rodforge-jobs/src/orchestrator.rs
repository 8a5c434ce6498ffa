//! The job pipeline: generate, compile, simulate, render.
//!
//! Each job runs as its own background task and touches only its own
//! directory. Stages run strictly in sequence. Any stage error is written to
//! the job's error log and ends the job in `failed`; artifacts produced by
//! earlier stages are left in place.

use std::sync::Arc;
use std::time::Duration;

use rodforge_compiler::{SceneCompiler, TRAJECTORY_FILE};
use rodforge_scene::{format_errors, MaterialsTable, ResolveOptions, SceneDocument};
use tokio::fs;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::{CommandSpec, ConfigError, OrchestratorConfig};
use crate::error::{JobError, StageError};
use crate::generate::{build_system_prompt, extract_json, CommandSceneGenerator, SceneGenerator};
use crate::job::{ArtifactPaths, Job, JobId, Stage, SCRIPT_FILE};
use crate::process::run_with_deadline;
use crate::spawner::{ProcessSpawner, RealProcessSpawner, SpawnRequest};
use crate::store::JobStore;

/// Trajectory-to-GIF script copied into each job directory before rendering.
const RENDER_SCRIPT: &str = include_str!("render/render_animation.py");

/// Interval between status polls in [`JobOrchestrator::wait_for_terminal`].
const POLL_INTERVAL: Duration = Duration::from_millis(100);

struct Inner {
    store: JobStore,
    compiler: SceneCompiler,
    generator: Arc<dyn SceneGenerator>,
    spawner: Arc<dyn ProcessSpawner>,
    config: OrchestratorConfig,
    system_prompt: String,
    admission: Option<Semaphore>,
}

/// Drives jobs through their stages.
///
/// Cloning is cheap; clones share the store, compiler and collaborators.
#[derive(Clone)]
pub struct JobOrchestrator {
    inner: Arc<Inner>,
}

impl JobOrchestrator {
    pub fn new(
        compiler: SceneCompiler,
        generator: Arc<dyn SceneGenerator>,
        spawner: Arc<dyn ProcessSpawner>,
        config: OrchestratorConfig,
    ) -> Self {
        let system_prompt = build_system_prompt(compiler.materials());
        let admission = config.max_concurrent_jobs.map(Semaphore::new);
        Self {
            inner: Arc::new(Inner {
                store: JobStore::new(&config.generated_dir),
                compiler,
                generator,
                spawner,
                config,
                system_prompt,
                admission,
            }),
        }
    }

    /// Production wiring: materials from the configured file (or the
    /// built-in table), the configured generator command and real processes.
    pub fn from_config(config: OrchestratorConfig) -> Result<Self, ConfigError> {
        let materials = match &config.materials_file {
            Some(path) => MaterialsTable::load(path)?,
            None => MaterialsTable::builtin(),
        };
        let compiler = SceneCompiler::new(Arc::new(materials)).with_options(ResolveOptions {
            strict_materials: config.strict_materials,
        });
        let generator = CommandSceneGenerator::new(
            config.generator.clone(),
            config.deadlines.generation(),
        );
        Ok(Self::new(
            compiler,
            Arc::new(generator),
            Arc::new(RealProcessSpawner),
            config,
        ))
    }

    pub fn store(&self) -> &JobStore {
        &self.inner.store
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    /// Creates a job and runs it in the background. Returns as soon as the
    /// job is recorded as `generating`.
    pub async fn submit(&self, prompt: &str) -> Result<Job, JobError> {
        let job = self.inner.store.create(prompt).await?;
        let this = self.clone();
        let id = job.id.clone();
        tokio::spawn(async move {
            if let Err(err) = this.run(&id).await {
                error!(job = %id, "job aborted: {err}");
            }
        });
        Ok(job)
    }

    pub async fn status(&self, id: &JobId) -> Result<Job, JobError> {
        self.inner.store.load(id).await
    }

    /// Runs a `generating` job to a terminal stage and returns it.
    pub async fn run(&self, id: &JobId) -> Result<Job, JobError> {
        let job = self.inner.store.load(id).await?;
        if job.stage != Stage::Generating {
            return Err(JobError::IllegalTransition {
                id: id.to_string(),
                from: job.stage,
                to: Stage::Compiling,
            });
        }

        let _permit = match &self.inner.admission {
            Some(semaphore) => semaphore.acquire().await.ok(),
            None => None,
        };

        match self.execute(&job).await {
            Ok(()) => {}
            Err(StageError::Job(err)) => {
                error!(job = %id, "bookkeeping failed: {err}");
                if let Err(fail_err) = self.inner.store.fail(id, &err.to_string()).await {
                    error!(job = %id, "could not record failure: {fail_err}");
                    return Err(err);
                }
            }
            Err(err) => {
                self.inner.store.fail(id, &err.to_string()).await?;
            }
        }
        self.inner.store.load(id).await
    }

    /// Polls until the job is terminal or `timeout` elapses, returning the
    /// last observed state either way.
    pub async fn wait_for_terminal(&self, id: &JobId, timeout: Duration) -> Result<Job, JobError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let job = self.inner.store.load(id).await?;
            if job.stage.is_terminal() || tokio::time::Instant::now() >= deadline {
                return Ok(job);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn execute(&self, job: &Job) -> Result<(), StageError> {
        let id = &job.id;
        let artifacts = &job.artifacts;
        let config = &self.inner.config;

        let doc = self.generate(artifacts).await?;
        self.inner.store.transition(id, Stage::Compiling).await?;

        let compiled = self
            .inner
            .compiler
            .compile(&doc)
            .map_err(|errors| StageError::Compile(format_errors(&errors)))?;
        for warning in &compiled.warnings {
            warn!(job = %id, "{warning}");
        }
        write(&artifacts.script, &compiled.source).await?;
        info!(
            job = %id,
            rods = compiled.program.rod_count(),
            steps = compiled.program.params.total_steps,
            "scene compiled"
        );
        self.inner.store.transition(id, Stage::Simulating).await?;

        let engine = request(&config.engine, SCRIPT_FILE, artifacts, &artifacts.simulation_log);
        run_with_deadline(&*self.inner.spawner, &engine, config.deadlines.simulation())
            .await
            .map_err(StageError::EngineExecution)?;
        if !exists(&artifacts.trajectory).await {
            return Err(StageError::EngineExecution(format!(
                "engine exited cleanly but produced no {TRAJECTORY_FILE}"
            )));
        }
        self.inner.store.transition(id, Stage::Rendering).await?;

        write(&artifacts.render_script, RENDER_SCRIPT).await?;

        let renderer = request(&config.renderer, TRAJECTORY_FILE, artifacts, &artifacts.render_log);
        run_with_deadline(&*self.inner.spawner, &renderer, config.deadlines.render())
            .await
            .map_err(StageError::Render)?;
        if !exists(&artifacts.animation).await {
            return Err(StageError::Render(
                "renderer exited cleanly but produced no animation".to_string(),
            ));
        }
        self.inner.store.transition(id, Stage::Completed).await?;
        Ok(())
    }

    /// Asks the generator for a document, keeps it as `scene.json` and
    /// parses it.
    async fn generate(&self, artifacts: &ArtifactPaths) -> Result<SceneDocument, StageError> {
        let prompt = fs::read_to_string(&artifacts.prompt)
            .await
            .map_err(|e| JobError::io(&artifacts.prompt, e))?;

        let reply = self
            .inner
            .generator
            .generate(&self.inner.system_prompt, &prompt)
            .await
            .map_err(StageError::Generation)?;
        let json = extract_json(&reply).ok_or_else(|| {
            StageError::Generation("generator reply contains no JSON object".to_string())
        })?;
        write(&artifacts.scene, json).await?;

        SceneDocument::from_json(json)
            .map_err(|e| StageError::Generation(format!("malformed scene document: {e}")))
    }
}

fn request(
    command: &CommandSpec,
    input: &str,
    artifacts: &ArtifactPaths,
    log_file: &std::path::Path,
) -> SpawnRequest {
    let mut args = command.args.clone();
    args.push(input.to_string());
    SpawnRequest {
        program: command.program.clone(),
        args,
        working_dir: artifacts.dir.clone(),
        log_file: log_file.to_path_buf(),
    }
}

async fn write(path: &std::path::Path, contents: &str) -> Result<(), JobError> {
    fs::write(path, contents)
        .await
        .map_err(|e| JobError::io(path, e))
}

async fn exists(path: &std::path::Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}
