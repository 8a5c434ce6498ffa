//! Scene generation.
//!
//! The generator is an external collaborator that turns a natural-language
//! prompt into a scene document. [`SceneGenerator`] abstracts it so the
//! orchestrator can be tested without one; production uses
//! [`CommandSceneGenerator`], which delegates to a configured command.

use std::process::Stdio;
use std::time::Duration;

use futures::future::BoxFuture;
use rodforge_scene::MaterialsTable;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::config::CommandSpec;

const SYSTEM_PROMPT_TEMPLATE: &str = include_str!("generate/system_prompt.txt");

/// Builds the system prompt sent alongside every user prompt. It lists the
/// accepted tags and the materials the compiler knows.
pub fn build_system_prompt(materials: &MaterialsTable) -> String {
    SYSTEM_PROMPT_TEMPLATE.replace("{materials}", &materials.describe())
}

/// Trait for turning a prompt into scene document text.
pub trait SceneGenerator: Send + Sync {
    /// Returns the raw document text or an error message.
    fn generate<'a>(
        &'a self,
        system_prompt: &'a str,
        prompt: &'a str,
    ) -> BoxFuture<'a, Result<String, String>>;
}

/// Pulls the JSON object out of generator output, tolerating a markdown
/// fence or chatter around it.
pub fn extract_json(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (start < end).then(|| &raw[start..=end])
}

#[derive(Serialize)]
struct GenerationRequest<'a> {
    system: &'a str,
    prompt: &'a str,
}

/// Runs a command per request: `{"system", "prompt"}` JSON goes to stdin and
/// the scene document is read from stdout.
pub struct CommandSceneGenerator {
    command: CommandSpec,
    deadline: Duration,
}

impl CommandSceneGenerator {
    pub fn new(command: CommandSpec, deadline: Duration) -> Self {
        Self { command, deadline }
    }

    async fn run(&self, system_prompt: &str, prompt: &str) -> Result<String, String> {
        let request = serde_json::to_vec(&GenerationRequest {
            system: system_prompt,
            prompt,
        })
        .map_err(|e| format!("failed to encode generation request: {e}"))?;

        let mut child = Command::new(&self.command.program)
            .args(&self.command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("failed to spawn {}: {e}", self.command.program))?;

        let stdin = child.stdin.take();
        let program = &self.command.program;
        let exchange = async move {
            if let Some(mut stdin) = stdin {
                stdin
                    .write_all(&request)
                    .await
                    .map_err(|e| format!("failed to write generation request: {e}"))?;
            }
            child
                .wait_with_output()
                .await
                .map_err(|e| format!("failed to wait for {program}: {e}"))
        };

        // The deadline covers the request write as well as the reply.
        // Dropping the future on timeout drops the child, which kills it.
        let output = tokio::time::timeout(self.deadline, exchange)
            .await
            .map_err(|_| format!("deadline of {:?} exceeded", self.deadline))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "{} exited with {}: {}",
                self.command.program,
                output.status,
                stderr.trim()
            ));
        }
        let stdout = String::from_utf8(output.stdout)
            .map_err(|_| "generator output is not UTF-8".to_string())?;
        debug!(bytes = stdout.len(), "generator replied");
        Ok(stdout)
    }
}

impl SceneGenerator for CommandSceneGenerator {
    fn generate<'a>(
        &'a self,
        system_prompt: &'a str,
        prompt: &'a str,
    ) -> BoxFuture<'a, Result<String, String>> {
        Box::pin(self.run(system_prompt, prompt))
    }
}

pub mod mock {
    //! Canned scene generator for tests.

    use super::*;
    use std::sync::{Arc, Mutex};

    /// Replies with the same result to every prompt and records the prompts.
    pub struct StaticSceneGenerator {
        reply: Result<String, String>,
        prompts: Arc<Mutex<Vec<String>>>,
    }

    impl StaticSceneGenerator {
        pub fn replying(document: impl Into<String>) -> Self {
            Self {
                reply: Ok(document.into()),
                prompts: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn failing(error: impl Into<String>) -> Self {
            Self {
                reply: Err(error.into()),
                prompts: Arc::new(Mutex::new(Vec::new())),
            }
        }

        /// Prompts received so far.
        pub fn prompts(&self) -> Vec<String> {
            self.prompts
                .lock()
                .expect("StaticSceneGenerator prompts mutex poisoned")
                .clone()
        }
    }

    impl SceneGenerator for StaticSceneGenerator {
        fn generate<'a>(
            &'a self,
            _system_prompt: &'a str,
            prompt: &'a str,
        ) -> BoxFuture<'a, Result<String, String>> {
            self.prompts
                .lock()
                .expect("StaticSceneGenerator prompts mutex poisoned")
                .push(prompt.to_string());
            let reply = self.reply.clone();
            Box::pin(async move { reply })
        }
    }
}
