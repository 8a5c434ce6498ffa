//! Orchestrator pipeline tests.
//!
//! Uses the mock generator and spawner so no engine, renderer or network is
//! involved. Placeholder processes are real (`true`, `false`, `sleep`).

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rodforge_compiler::SceneCompiler;
use rodforge_jobs::generate::mock::StaticSceneGenerator;
use rodforge_jobs::spawner::mock::{MockBehavior, MockProcessSpawner};
use rodforge_jobs::{JobError, JobOrchestrator, OrchestratorConfig, Stage};
use rodforge_scene::MaterialsTable;
use tempfile::TempDir;

const SCENE: &str = r#"{
    "objects": [
        {"type": "rod", "length": 1.0, "radius": 0.025, "material": "rubber", "n_elem": 50.0,
         "constraints": ["clamped_start"], "forces": ["gravity"]}
    ],
    "render": {"duration": 1.0, "fps": 30.0}
}"#;

fn config(root: &Path) -> OrchestratorConfig {
    OrchestratorConfig {
        generated_dir: root.to_path_buf(),
        ..OrchestratorConfig::default()
    }
}

fn orchestrator(
    root: &Path,
    generator: StaticSceneGenerator,
    spawner: Arc<MockProcessSpawner>,
) -> JobOrchestrator {
    orchestrator_with(config(root), generator, spawner)
}

fn orchestrator_with(
    config: OrchestratorConfig,
    generator: StaticSceneGenerator,
    spawner: Arc<MockProcessSpawner>,
) -> JobOrchestrator {
    JobOrchestrator::new(
        SceneCompiler::new(Arc::new(MaterialsTable::builtin())),
        Arc::new(generator),
        spawner,
        config,
    )
}

fn happy_spawner() -> Arc<MockProcessSpawner> {
    Arc::new(MockProcessSpawner::scripted(vec![
        MockBehavior::Succeeds {
            creates: vec!["simulation_data.pkl".to_string()],
        },
        MockBehavior::Succeeds {
            creates: vec!["simulation.gif".to_string()],
        },
    ]))
}

#[tokio::test]
async fn successful_job_reaches_completed() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let spawner = happy_spawner();
    let orch = orchestrator(temp.path(), StaticSceneGenerator::replying(SCENE), spawner.clone());

    let job = orch.store().create("a rubber rod hanging").await.unwrap();
    let done = orch.run(&job.id).await.unwrap();

    assert_eq!(done.stage, Stage::Completed);
    assert_eq!(done.last_error, None);
    let artifacts = &done.artifacts;
    for path in [
        &artifacts.prompt,
        &artifacts.scene,
        &artifacts.script,
        &artifacts.trajectory,
        &artifacts.animation,
    ] {
        assert!(path.exists(), "missing {}", path.display());
    }
    assert!(artifacts.render_script.exists());
    assert!(!artifacts.error_log.exists());

    let script = std::fs::read_to_string(&artifacts.script).unwrap();
    assert!(script.contains("clamp_node(sim, rod_0, 0)"));

    let spawned = spawner.spawned();
    assert_eq!(spawned.len(), 2);
    assert_eq!(spawned[0].program, "python3");
    assert_eq!(spawned[0].args, vec!["generated_simulation.py"]);
    assert_eq!(spawned[0].working_dir, artifacts.dir);
    assert_eq!(spawned[0].log_file, artifacts.simulation_log);
    assert_eq!(spawned[1].args, vec!["render_animation.py", "simulation_data.pkl"]);
    assert_eq!(spawned[1].log_file, artifacts.render_log);

    let status = std::fs::read_to_string(&artifacts.status).unwrap();
    let stages: Vec<String> = status
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap()["stage"].to_string())
        .collect();
    assert_eq!(
        stages,
        vec![
            "\"generating\"",
            "\"compiling\"",
            "\"simulating\"",
            "\"rendering\"",
            "\"completed\""
        ]
    );
}

#[tokio::test]
async fn generator_reply_in_fences_is_accepted() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let reply = format!("```json\n{SCENE}\n```");
    let orch = orchestrator(temp.path(), StaticSceneGenerator::replying(reply), happy_spawner());

    let job = orch.store().create("fenced").await.unwrap();
    let done = orch.run(&job.id).await.unwrap();
    assert_eq!(done.stage, Stage::Completed);
    let saved = std::fs::read_to_string(&done.artifacts.scene).unwrap();
    assert!(saved.starts_with('{') && saved.ends_with('}'));
}

#[tokio::test]
async fn generation_failure_fails_job() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let spawner = happy_spawner();
    let orch = orchestrator(
        temp.path(),
        StaticSceneGenerator::failing("upstream unavailable"),
        spawner.clone(),
    );

    let job = orch.store().create("anything").await.unwrap();
    let done = orch.run(&job.id).await.unwrap();

    assert_eq!(done.stage, Stage::Failed);
    assert_eq!(
        done.last_error.as_deref(),
        Some("generation error: upstream unavailable")
    );
    let log = std::fs::read_to_string(&done.artifacts.error_log).unwrap();
    assert_eq!(log, "generation error: upstream unavailable");
    assert!(spawner.spawned().is_empty());
}

#[tokio::test]
async fn malformed_document_is_a_generation_error() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let orch = orchestrator(
        temp.path(),
        StaticSceneGenerator::replying(r#"{"objects": "many"}"#),
        happy_spawner(),
    );

    let job = orch.store().create("anything").await.unwrap();
    let done = orch.run(&job.id).await.unwrap();
    assert_eq!(done.stage, Stage::Failed);
    assert!(done
        .last_error
        .unwrap()
        .starts_with("generation error: malformed scene document"));
    // the raw reply is still kept for inspection
    assert!(done.artifacts.scene.exists());
}

#[tokio::test]
async fn reply_without_json_is_a_generation_error() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let orch = orchestrator(
        temp.path(),
        StaticSceneGenerator::replying("I cannot help with that."),
        happy_spawner(),
    );

    let job = orch.store().create("anything").await.unwrap();
    let done = orch.run(&job.id).await.unwrap();
    assert_eq!(done.stage, Stage::Failed);
    assert!(done.last_error.unwrap().contains("no JSON object"));
}

#[tokio::test]
async fn compile_error_fails_before_simulation() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let spawner = happy_spawner();
    let orch = orchestrator(
        temp.path(),
        StaticSceneGenerator::replying(
            r#"{"objects": [{}, {}], "connections": [{"rod_a_index": 0.0, "rod_b_index": 5.0}]}"#,
        ),
        spawner.clone(),
    );

    let job = orch.store().create("two rods").await.unwrap();
    let done = orch.run(&job.id).await.unwrap();

    assert_eq!(done.stage, Stage::Failed);
    let error = done.last_error.unwrap();
    assert!(error.starts_with("compile error:"), "{error}");
    assert!(error.contains("dangling connection"), "{error}");
    assert!(!done.artifacts.script.exists());
    assert!(spawner.spawned().is_empty());
}

#[tokio::test]
async fn engine_nonzero_exit_keeps_script() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let spawner = Arc::new(MockProcessSpawner::new(MockBehavior::ExitsNonZero));
    let orch = orchestrator(temp.path(), StaticSceneGenerator::replying(SCENE), spawner.clone());

    let job = orch.store().create("a rod").await.unwrap();
    let done = orch.run(&job.id).await.unwrap();

    assert_eq!(done.stage, Stage::Failed);
    assert!(done
        .last_error
        .unwrap()
        .starts_with("engine execution error: python3 exited with"));
    assert!(done.artifacts.script.exists());
    assert_eq!(spawner.spawned().len(), 1);
}

#[tokio::test]
async fn engine_without_trajectory_fails() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let spawner = Arc::new(MockProcessSpawner::new(MockBehavior::SucceedsSilently));
    let orch = orchestrator(temp.path(), StaticSceneGenerator::replying(SCENE), spawner);

    let job = orch.store().create("a rod").await.unwrap();
    let done = orch.run(&job.id).await.unwrap();

    assert_eq!(done.stage, Stage::Failed);
    assert!(done.last_error.unwrap().contains("produced no simulation_data.pkl"));
}

#[tokio::test]
async fn runaway_engine_hits_deadline() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let mut config = config(temp.path());
    config.deadlines.simulation_secs = 1;
    let spawner = Arc::new(MockProcessSpawner::new(MockBehavior::Hangs));
    let orch = orchestrator_with(config, StaticSceneGenerator::replying(SCENE), spawner);

    let job = orch.store().create("a rod").await.unwrap();
    let done = orch.run(&job.id).await.unwrap();

    assert_eq!(done.stage, Stage::Failed);
    let error = done.last_error.unwrap();
    assert!(error.starts_with("engine execution error: deadline"), "{error}");
}

#[tokio::test]
async fn render_failure_keeps_trajectory() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let spawner = Arc::new(MockProcessSpawner::scripted(vec![
        MockBehavior::Succeeds {
            creates: vec!["simulation_data.pkl".to_string()],
        },
        MockBehavior::ExitsNonZero,
    ]));
    let orch = orchestrator(temp.path(), StaticSceneGenerator::replying(SCENE), spawner);

    let job = orch.store().create("a rod").await.unwrap();
    let done = orch.run(&job.id).await.unwrap();

    assert_eq!(done.stage, Stage::Failed);
    assert!(done.last_error.unwrap().starts_with("render error:"));
    assert!(done.artifacts.trajectory.exists());
    assert!(!done.artifacts.animation.exists());
}

#[tokio::test]
async fn renderer_spawn_failure_is_a_render_error() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let spawner = Arc::new(MockProcessSpawner::scripted(vec![
        MockBehavior::Succeeds {
            creates: vec!["simulation_data.pkl".to_string()],
        },
        MockBehavior::SpawnFails {
            error: "Failed to spawn python3: not found".to_string(),
        },
    ]));
    let orch = orchestrator(temp.path(), StaticSceneGenerator::replying(SCENE), spawner);

    let job = orch.store().create("a rod").await.unwrap();
    let done = orch.run(&job.id).await.unwrap();
    assert_eq!(
        done.last_error.as_deref(),
        Some("render error: Failed to spawn python3: not found")
    );
}

#[tokio::test]
async fn terminal_jobs_are_not_rerun() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let orch = orchestrator(temp.path(), StaticSceneGenerator::replying(SCENE), happy_spawner());

    let job = orch.store().create("a rod").await.unwrap();
    orch.run(&job.id).await.unwrap();
    assert!(matches!(
        orch.run(&job.id).await,
        Err(JobError::IllegalTransition {
            from: Stage::Completed,
            ..
        })
    ));
}

#[tokio::test]
async fn submitted_jobs_run_in_background() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let generator = StaticSceneGenerator::replying(SCENE);
    let spawner = Arc::new(MockProcessSpawner::new(MockBehavior::Succeeds {
        creates: vec![
            "simulation_data.pkl".to_string(),
            "simulation.gif".to_string(),
        ],
    }));
    let mut config = config(temp.path());
    config.max_concurrent_jobs = Some(1);
    let orch = orchestrator_with(config, generator, spawner);

    let first = orch.submit("first").await.unwrap();
    let second = orch.submit("second").await.unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(first.stage, Stage::Generating);

    for id in [&first.id, &second.id] {
        let job = orch
            .wait_for_terminal(id, Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(job.stage, Stage::Completed);
    }
    assert_eq!(orch.store().list().await.unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let orch = orchestrator(temp.path(), StaticSceneGenerator::replying(SCENE), happy_spawner());
    let id = rodforge_jobs::JobId::parse("20000101_000000").unwrap();
    assert!(matches!(orch.status(&id).await, Err(JobError::NotFound(_))));
}
