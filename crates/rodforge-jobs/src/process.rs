//! Running external stages to completion under a deadline.

use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;
use tracing::{debug, error, info, warn};

use crate::spawner::{ProcessSpawner, SpawnRequest};

/// How long a killed process gets to exit before it is reported stuck.
const KILL_GRACE: Duration = Duration::from_secs(5);

/// Spawns `request` and waits for it to exit within `deadline`.
///
/// # Returns
/// - `Ok(())` if the process exited with status 0
/// - `Err(String)` if the spawn failed, the process exited non-zero, or the
///   deadline expired (the process is killed first)
pub async fn run_with_deadline(
    spawner: &dyn ProcessSpawner,
    request: &SpawnRequest,
    deadline: Duration,
) -> Result<(), String> {
    let mut child = spawner.spawn(request).await?;
    info!(
        program = %request.program,
        dir = %request.working_dir.display(),
        "process started"
    );

    match tokio::time::timeout(deadline, child.wait()).await {
        Ok(Ok(status)) => check_status(&request.program, status),
        Ok(Err(err)) => Err(format!("Error waiting for {}: {err}", request.program)),
        Err(_) => {
            warn!(program = %request.program, ?deadline, "deadline exceeded, killing process");
            if let Err(err) = kill(&mut child).await {
                error!("Failed to kill {}: {err}", request.program);
            }
            Err(format!("deadline of {deadline:?} exceeded"))
        }
    }
}

fn check_status(program: &str, status: ExitStatus) -> Result<(), String> {
    if status.success() {
        debug!(program, "process exited cleanly");
        Ok(())
    } else {
        Err(format!("{program} exited with {status}"))
    }
}

/// Kills `child` and waits briefly for it to exit.
async fn kill(child: &mut Child) -> Result<(), String> {
    child
        .kill()
        .await
        .map_err(|e| format!("Failed to kill process: {e}"))?;

    match tokio::time::timeout(KILL_GRACE, child.wait()).await {
        Ok(Ok(status)) => {
            info!("Process exited with status: {status}");
            Ok(())
        }
        Ok(Err(err)) => Err(format!("Error waiting for process to exit: {err}")),
        Err(_) => Err("Timeout waiting for process to exit - process may be stuck".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spawner::mock::{MockBehavior, MockProcessSpawner};
    use crate::spawner::RealProcessSpawner;
    use std::time::Instant;

    fn request() -> SpawnRequest {
        SpawnRequest {
            program: "engine".to_string(),
            args: vec![],
            working_dir: std::env::temp_dir(),
            log_file: std::env::temp_dir().join("unused.log"),
        }
    }

    #[tokio::test]
    async fn clean_exit_is_ok() {
        let spawner = MockProcessSpawner::new(MockBehavior::SucceedsSilently);
        run_with_deadline(&spawner, &request(), Duration::from_secs(5))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn nonzero_exit_is_an_error() {
        let spawner = MockProcessSpawner::new(MockBehavior::ExitsNonZero);
        let err = run_with_deadline(&spawner, &request(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.starts_with("engine exited with"), "{err}");
    }

    #[tokio::test]
    async fn hung_process_is_killed_at_deadline() {
        let spawner = MockProcessSpawner::new(MockBehavior::Hangs);
        let started = Instant::now();
        let err = run_with_deadline(&spawner, &request(), Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(err.contains("deadline"), "{err}");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn spawn_failure_passes_through() {
        let spawner = MockProcessSpawner::new(MockBehavior::SpawnFails {
            error: "no such program".to_string(),
        });
        let err = run_with_deadline(&spawner, &request(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err, "no such program");
    }

    #[tokio::test]
    async fn real_process_output_lands_in_the_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let request = SpawnRequest {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "echo out; echo err >&2".to_string()],
            working_dir: dir.path().to_path_buf(),
            log_file: dir.path().join("engine.log"),
        };
        run_with_deadline(&RealProcessSpawner, &request, Duration::from_secs(5))
            .await
            .unwrap();
        let log = std::fs::read_to_string(dir.path().join("engine.log")).unwrap();
        assert!(log.contains("out") && log.contains("err"), "{log}");
    }

    #[tokio::test]
    async fn unwritable_log_file_fails_the_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let request = SpawnRequest {
            program: "true".to_string(),
            args: vec![],
            working_dir: dir.path().to_path_buf(),
            log_file: dir.path().join("missing").join("engine.log"),
        };
        let err = run_with_deadline(&RealProcessSpawner, &request, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.starts_with("Failed to create log file"), "{err}");
    }
}
