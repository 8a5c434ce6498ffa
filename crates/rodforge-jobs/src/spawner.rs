//! Process spawning abstraction for testability.
//!
//! The engine and renderer are external programs. The orchestrator launches
//! them through [`ProcessSpawner`] so tests can substitute
//! [`mock::MockProcessSpawner`] without touching production code.

use std::path::PathBuf;
use std::process::Stdio;

use futures::future::BoxFuture;
use tokio::process::{Child, Command};

/// One external invocation: program, arguments, working directory and the
/// file that receives both stdout and stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub log_file: PathBuf,
}

/// Trait for spawning child processes.
///
/// Production code uses [`RealProcessSpawner`], tests use
/// [`mock::MockProcessSpawner`].
pub trait ProcessSpawner: Send + Sync {
    /// Spawns the requested process.
    ///
    /// # Returns
    /// - `Ok(Child)` with the spawned process handle
    /// - `Err(String)` with an error message if the spawn fails
    fn spawn<'a>(&'a self, request: &'a SpawnRequest) -> BoxFuture<'a, Result<Child, String>>;
}

/// Spawns real processes with `tokio::process::Command`.
pub struct RealProcessSpawner;

impl ProcessSpawner for RealProcessSpawner {
    fn spawn<'a>(&'a self, request: &'a SpawnRequest) -> BoxFuture<'a, Result<Child, String>> {
        Box::pin(async move {
            let log = tokio::fs::File::create(&request.log_file)
                .await
                .map_err(|e| {
                    format!("Failed to create log file {}: {e}", request.log_file.display())
                })?;
            let log_err = log
                .try_clone()
                .await
                .map_err(|e| format!("Failed to duplicate log handle: {e}"))?;

            Command::new(&request.program)
                .args(&request.args)
                .current_dir(&request.working_dir)
                .stdin(Stdio::null())
                .stdout(Stdio::from(log.into_std().await))
                .stderr(Stdio::from(log_err.into_std().await))
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| format!("Failed to spawn {}: {e}", request.program))
        })
    }
}

pub mod mock {
    //! Mock process spawner for testing.
    //!
    //! Available for integration tests and external test crates.

    use super::*;
    use std::sync::{Arc, Mutex};

    /// Behavior specification for mock spawned processes.
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Writes the named files into the working directory, then exits 0
        Succeeds { creates: Vec<String> },
        /// Exits 0 without producing anything
        SucceedsSilently,
        /// Exits non-zero
        ExitsNonZero,
        /// Never exits on its own
        Hangs,
        /// Spawn fails immediately
        SpawnFails { error: String },
    }

    /// Mock spawner following a script of behaviors, one per spawn. The last
    /// behavior repeats once the script runs out.
    pub struct MockProcessSpawner {
        script: Arc<Mutex<Vec<MockBehavior>>>,
        spawned: Arc<Mutex<Vec<SpawnRequest>>>,
    }

    impl MockProcessSpawner {
        pub fn new(behavior: MockBehavior) -> Self {
            Self::scripted(vec![behavior])
        }

        /// Behaviors applied to successive spawns, in order.
        pub fn scripted(script: Vec<MockBehavior>) -> Self {
            Self {
                script: Arc::new(Mutex::new(script)),
                spawned: Arc::new(Mutex::new(Vec::new())),
            }
        }

        /// Requests seen so far (for verification).
        pub fn spawned(&self) -> Vec<SpawnRequest> {
            self.spawned
                .lock()
                .expect("MockProcessSpawner spawned mutex poisoned")
                .clone()
        }

        /// Replaces the remaining script (for multi-stage tests).
        pub fn set_behavior(&self, behavior: MockBehavior) {
            *self
                .script
                .lock()
                .expect("MockProcessSpawner script mutex poisoned") = vec![behavior];
        }

        fn next_behavior(&self, call: usize) -> MockBehavior {
            let script = self
                .script
                .lock()
                .expect("MockProcessSpawner script mutex poisoned");
            let index = call.min(script.len().saturating_sub(1));
            script
                .get(index)
                .cloned()
                .unwrap_or(MockBehavior::SucceedsSilently)
        }
    }

    impl ProcessSpawner for MockProcessSpawner {
        fn spawn<'a>(
            &'a self,
            request: &'a SpawnRequest,
        ) -> BoxFuture<'a, Result<Child, String>> {
            Box::pin(async move { self.spawn_now(request) })
        }
    }

    impl MockProcessSpawner {
        fn spawn_now(&self, request: &SpawnRequest) -> Result<Child, String> {
            let call = {
                let mut spawned = self
                    .spawned
                    .lock()
                    .expect("MockProcessSpawner spawned mutex poisoned");
                spawned.push(request.clone());
                spawned.len() - 1
            };

            match self.next_behavior(call) {
                MockBehavior::SpawnFails { error } => Err(error),
                MockBehavior::Succeeds { creates } => {
                    for name in creates {
                        std::fs::write(request.working_dir.join(&name), b"mock").expect(
                            "MockProcessSpawner failed to write artifact - check test temp dir permissions",
                        );
                    }
                    Ok(spawn_placeholder("true", &[]))
                }
                MockBehavior::SucceedsSilently => Ok(spawn_placeholder("true", &[])),
                MockBehavior::ExitsNonZero => Ok(spawn_placeholder("false", &[])),
                MockBehavior::Hangs => Ok(spawn_placeholder("sleep", &["3600"])),
            }
        }
    }

    /// Spawns a real placeholder process so callers get a PID they can wait
    /// on and kill.
    fn spawn_placeholder(program: &str, args: &[&str]) -> Child {
        Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .spawn()
            .unwrap_or_else(|e| {
                panic!(
                    "MockProcessSpawner: Failed to spawn placeholder '{program}'. \
                     Error: {e}. Check system resources and PATH."
                )
            })
    }
}
