//! HTTP API tests driven through the router with `tower::ServiceExt`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use rodforge_compiler::SceneCompiler;
use rodforge_jobs::generate::mock::StaticSceneGenerator;
use rodforge_jobs::spawner::mock::{MockBehavior, MockProcessSpawner};
use rodforge_jobs::{JobId, JobOrchestrator, OrchestratorConfig, Stage};
use rodforge_scene::MaterialsTable;
use rodforge_server::state::{ApiResponse, GenerateResponse, StatusResponse};
use rodforge_server::{router, AppState};
use tempfile::TempDir;
use tower::ServiceExt;

const SCENE: &str = r#"{"objects": [{"n_elem": 20.0}], "render": {"duration": 0.5, "fps": 10.0}}"#;

fn orchestrator(root: &Path, generator: StaticSceneGenerator, behavior: MockBehavior) -> JobOrchestrator {
    JobOrchestrator::new(
        SceneCompiler::new(Arc::new(MaterialsTable::builtin())),
        Arc::new(generator),
        Arc::new(MockProcessSpawner::new(behavior)),
        OrchestratorConfig {
            generated_dir: root.to_path_buf(),
            ..OrchestratorConfig::default()
        },
    )
}

fn producing_everything() -> MockBehavior {
    MockBehavior::Succeeds {
        creates: vec![
            "simulation_data.pkl".to_string(),
            "simulation.gif".to_string(),
        ],
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    (status, body.to_vec())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_generate(prompt: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/generate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::json!({ "prompt": prompt }).to_string()))
        .unwrap()
}

async fn submit(app: &Router) -> GenerateResponse {
    let (status, body) = send(app, post_generate("a rod swinging")).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn generate_then_fetch_artifacts() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let orch = orchestrator(
        temp.path(),
        StaticSceneGenerator::replying(SCENE),
        producing_everything(),
    );
    let app = router(AppState::new(orch.clone()));

    let accepted = submit(&app).await;
    assert_eq!(accepted.status, Stage::Generating);

    let id = JobId::parse(&accepted.id).unwrap();
    let job = orch.wait_for_terminal(&id, Duration::from_secs(10)).await.unwrap();
    assert_eq!(job.stage, Stage::Completed);

    let (status, body) = send(&app, get(&format!("/api/status/{}", accepted.id))).await;
    assert_eq!(status, StatusCode::OK);
    let report: StatusResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(report.status, Stage::Completed);
    assert_eq!(report.error, None);
    assert_eq!(report.gif_url, Some(format!("/api/gif/{}", accepted.id)));

    let response = app
        .clone()
        .oneshot(get(&format!("/api/gif/{}", accepted.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/gif");

    let (status, body) = send(&app, get(&format!("/api/code/{}", accepted.id))).await;
    assert_eq!(status, StatusCode::OK);
    let code = String::from_utf8(body).unwrap();
    assert!(code.contains("def main():"));
    assert!(code.contains("rod_0 = make_rod("));
}

#[tokio::test]
async fn empty_prompt_is_rejected() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let app = router(AppState::new(orchestrator(
        temp.path(),
        StaticSceneGenerator::replying(SCENE),
        producing_everything(),
    )));

    let (status, body) = send(&app, post_generate("   ")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ApiResponse = serde_json::from_slice(&body).unwrap();
    assert!(!error.success);
}

#[tokio::test]
async fn unknown_ids_are_404() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let app = router(AppState::new(orchestrator(
        temp.path(),
        StaticSceneGenerator::replying(SCENE),
        producing_everything(),
    )));

    for uri in [
        "/api/status/20000101_000000",
        "/api/gif/20000101_000000",
        "/api/code/20000101_000000",
        "/api/status/..",
    ] {
        let (status, _) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn failed_job_reports_error_and_refuses_gif() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let orch = orchestrator(
        temp.path(),
        StaticSceneGenerator::replying(SCENE),
        MockBehavior::ExitsNonZero,
    );
    let app = router(AppState::new(orch.clone()));

    let accepted = submit(&app).await;
    let id = JobId::parse(&accepted.id).unwrap();
    orch.wait_for_terminal(&id, Duration::from_secs(10)).await.unwrap();

    let (status, body) = send(&app, get(&format!("/api/status/{}", accepted.id))).await;
    assert_eq!(status, StatusCode::OK);
    let report: StatusResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(report.status, Stage::Failed);
    assert!(report
        .error
        .unwrap()
        .starts_with("engine execution error:"));
    assert_eq!(report.gif_url, None);

    let (status, _) = send(&app, get(&format!("/api/gif/{}", accepted.id))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // compilation succeeded, so the script is still served
    let (status, _) = send(&app, get(&format!("/api/code/{}", accepted.id))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn gif_of_running_job_is_404() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let orch = orchestrator(
        temp.path(),
        StaticSceneGenerator::replying(SCENE),
        MockBehavior::Hangs,
    );
    let app = router(AppState::new(orch.clone()));

    let accepted = submit(&app).await;
    let id = JobId::parse(&accepted.id).unwrap();

    let mut stage = Stage::Generating;
    for _ in 0..100 {
        stage = orch.status(&id).await.unwrap().stage;
        if stage == Stage::Simulating {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(stage, Stage::Simulating);

    let (status, _) = send(&app, get(&format!("/api/gif/{}", accepted.id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
