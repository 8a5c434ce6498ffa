//! Job model: identity, stage machine and artifact layout.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::error::JobError;

pub const PROMPT_FILE: &str = "prompt.txt";
pub const SCENE_FILE: &str = "scene.json";
pub const SCRIPT_FILE: &str = "generated_simulation.py";
pub const SIMULATION_LOG_FILE: &str = "simulation.log";
pub const RENDER_SCRIPT_FILE: &str = "render_animation.py";
pub const RENDER_LOG_FILE: &str = "render.log";
pub const ANIMATION_FILE: &str = "simulation.gif";
pub const ERROR_LOG_FILE: &str = "error.log";
pub const STATUS_FILE: &str = "status.jsonl";

/// Job id timestamp format.
pub const ID_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Pipeline stage.
///
/// Stages advance strictly in declaration order. `Failed` can be entered
/// from any non-terminal stage; `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Generating,
    Compiling,
    Simulating,
    Rendering,
    Completed,
    Failed,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Generating => "generating",
            Stage::Compiling => "compiling",
            Stage::Simulating => "simulating",
            Stage::Rendering => "rendering",
            Stage::Completed => "completed",
            Stage::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Completed | Stage::Failed)
    }

    /// The stage reached on success, if any.
    pub fn successor(self) -> Option<Stage> {
        match self {
            Stage::Generating => Some(Stage::Compiling),
            Stage::Compiling => Some(Stage::Simulating),
            Stage::Simulating => Some(Stage::Rendering),
            Stage::Rendering => Some(Stage::Completed),
            Stage::Completed | Stage::Failed => None,
        }
    }

    pub fn can_transition_to(self, next: Stage) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == Stage::Failed || self.successor() == Some(next)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job identifier; also the job's directory name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Validates an id received from outside. Only `[A-Za-z0-9_-]` is
    /// accepted so an id can never name a path outside the jobs root.
    pub fn parse(raw: &str) -> Result<Self, JobError> {
        let valid = !raw.is_empty()
            && raw.len() <= 64
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(JobError::InvalidId(raw.to_string()))
        }
    }

    /// Timestamp id, with `_<attempt>` appended after the first attempt.
    pub fn from_timestamp(at: DateTime<Local>, attempt: u32) -> Self {
        let stamp = at.format(ID_FORMAT).to_string();
        if attempt == 0 {
            Self(stamp)
        } else {
            Self(format!("{stamp}_{attempt}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Locations of every file a job may produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactPaths {
    pub dir: PathBuf,
    pub prompt: PathBuf,
    pub scene: PathBuf,
    pub script: PathBuf,
    pub simulation_log: PathBuf,
    pub trajectory: PathBuf,
    pub render_script: PathBuf,
    pub render_log: PathBuf,
    pub animation: PathBuf,
    pub error_log: PathBuf,
    pub status: PathBuf,
}

impl ArtifactPaths {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            dir: dir.to_path_buf(),
            prompt: dir.join(PROMPT_FILE),
            scene: dir.join(SCENE_FILE),
            script: dir.join(SCRIPT_FILE),
            simulation_log: dir.join(SIMULATION_LOG_FILE),
            trajectory: dir.join(rodforge_compiler::TRAJECTORY_FILE),
            render_script: dir.join(RENDER_SCRIPT_FILE),
            render_log: dir.join(RENDER_LOG_FILE),
            animation: dir.join(ANIMATION_FILE),
            error_log: dir.join(ERROR_LOG_FILE),
            status: dir.join(STATUS_FILE),
        }
    }
}

/// One line of `status.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A job as folded from its status record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pub id: JobId,
    pub stage: Stage,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub artifacts: ArtifactPaths,
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn stages_advance_in_order() {
        assert!(Stage::Generating.can_transition_to(Stage::Compiling));
        assert!(Stage::Compiling.can_transition_to(Stage::Simulating));
        assert!(Stage::Simulating.can_transition_to(Stage::Rendering));
        assert!(Stage::Rendering.can_transition_to(Stage::Completed));
        assert!(!Stage::Generating.can_transition_to(Stage::Simulating));
        assert!(!Stage::Rendering.can_transition_to(Stage::Compiling));
    }

    #[test]
    fn failed_reachable_from_any_live_stage() {
        for stage in [
            Stage::Generating,
            Stage::Compiling,
            Stage::Simulating,
            Stage::Rendering,
        ] {
            assert!(stage.can_transition_to(Stage::Failed), "{stage}");
        }
    }

    #[test]
    fn terminal_stages_are_final() {
        for next in [Stage::Generating, Stage::Completed, Stage::Failed] {
            assert!(!Stage::Completed.can_transition_to(next));
            assert!(!Stage::Failed.can_transition_to(next));
        }
    }

    #[test]
    fn stage_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Stage::Simulating).unwrap(), "\"simulating\"");
    }

    #[test]
    fn id_rejects_path_characters() {
        assert!(JobId::parse("20260201_031106").is_ok());
        assert!(JobId::parse("20260201_031106_2").is_ok());
        assert!(JobId::parse("../etc").is_err());
        assert!(JobId::parse("a/b").is_err());
        assert!(JobId::parse("").is_err());
    }

    #[test]
    fn timestamp_ids() {
        let at = Local.with_ymd_and_hms(2026, 2, 1, 3, 11, 6).unwrap();
        assert_eq!(JobId::from_timestamp(at, 0).as_str(), "20260201_031106");
        assert_eq!(JobId::from_timestamp(at, 2).as_str(), "20260201_031106_2");
    }
}
