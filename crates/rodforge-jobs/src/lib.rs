//! Job lifecycle for rodforge.
//!
//! A job takes a natural-language prompt through four stages:
//!
//! ```text
//! generating -> compiling -> simulating -> rendering -> completed
//!      \____________\_____________\____________\______> failed
//! ```
//!
//! Every job owns a directory under the configured root. [`JobStore`] keeps
//! an append-only status record there and is the only reader of job state.
//! [`JobOrchestrator`] runs the stages, delegating scene generation to a
//! [`SceneGenerator`] and the engine and renderer to a [`ProcessSpawner`].

pub mod config;
pub mod error;
pub mod generate;
pub mod job;
pub mod orchestrator;
pub mod process;
pub mod spawner;
pub mod store;

pub use config::{CommandSpec, ConfigError, Deadlines, OrchestratorConfig};
pub use error::{JobError, StageError};
pub use generate::{build_system_prompt, CommandSceneGenerator, SceneGenerator};
pub use job::{ArtifactPaths, Job, JobId, Stage, StageRecord};
pub use orchestrator::JobOrchestrator;
pub use spawner::{ProcessSpawner, RealProcessSpawner, SpawnRequest};
pub use store::JobStore;
