//! Orchestrator configuration.
//!
//! Loaded from an optional YAML file. Every field has a default, so an empty
//! file (or no file) gives a working local setup:
//!
//! ```yaml
//! generated_dir: generated
//! max_concurrent_jobs: 4
//! engine:
//!   program: python3
//! renderer:
//!   program: python3
//!   args: [render_animation.py]
//! deadlines:
//!   simulation_secs: 1800
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use rodforge_scene::MaterialsError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::job::RENDER_SCRIPT_FILE;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse the config YAML.
    #[error("failed to parse config YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// The configured materials file could not be loaded.
    #[error(transparent)]
    Materials(#[from] MaterialsError),

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// An external command: program plus leading arguments. Stage-specific
/// arguments (script or trajectory file) are appended when it runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// Per-stage time limits in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Deadlines {
    pub generation_secs: u64,
    pub simulation_secs: u64,
    pub render_secs: u64,
}

impl Default for Deadlines {
    fn default() -> Self {
        Self {
            generation_secs: 120,
            simulation_secs: 3600,
            render_secs: 600,
        }
    }
}

impl Deadlines {
    pub fn generation(&self) -> Duration {
        Duration::from_secs(self.generation_secs)
    }

    pub fn simulation(&self) -> Duration {
        Duration::from_secs(self.simulation_secs)
    }

    pub fn render(&self) -> Duration {
        Duration::from_secs(self.render_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Root directory for job directories
    pub generated_dir: PathBuf,
    /// YAML materials table; the built-in table when absent
    pub materials_file: Option<PathBuf>,
    /// Reject unknown material names instead of falling back to rubber
    pub strict_materials: bool,
    /// Jobs allowed to run at once; unbounded when absent
    pub max_concurrent_jobs: Option<usize>,
    /// Receives `{system, prompt}` JSON on stdin, prints the scene document
    pub generator: CommandSpec,
    /// Runs the generated script (path appended)
    pub engine: CommandSpec,
    /// Renders the trajectory (path appended). The default runs the
    /// bundled script, which is written into every job directory.
    pub renderer: CommandSpec,
    pub deadlines: Deadlines,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            generated_dir: PathBuf::from("generated"),
            materials_file: None,
            strict_materials: false,
            max_concurrent_jobs: None,
            generator: CommandSpec::new("rodforge-scene-generator"),
            engine: CommandSpec::new("python3"),
            renderer: CommandSpec::new("python3").arg(RENDER_SCRIPT_FILE),
            deadlines: Deadlines::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_jobs == Some(0) {
            return Err(ConfigError::Invalid(
                "max_concurrent_jobs must be at least 1".to_string(),
            ));
        }
        for (name, command) in [
            ("generator", &self.generator),
            ("engine", &self.engine),
            ("renderer", &self.renderer),
        ] {
            if command.program.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{name}.program is empty")));
            }
        }
        let d = &self.deadlines;
        if d.generation_secs == 0 || d.simulation_secs == 0 || d.render_secs == 0 {
            return Err(ConfigError::Invalid("deadlines must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_is_default() {
        let config = OrchestratorConfig::from_yaml("{}").unwrap();
        assert_eq!(config, OrchestratorConfig::default());
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let config = OrchestratorConfig::from_yaml(
            "generated_dir: /var/rodforge\nmax_concurrent_jobs: 2\ndeadlines:\n  simulation_secs: 60\n",
        )
        .unwrap();
        assert_eq!(config.generated_dir, PathBuf::from("/var/rodforge"));
        assert_eq!(config.max_concurrent_jobs, Some(2));
        assert_eq!(config.deadlines.simulation(), Duration::from_secs(60));
        assert_eq!(config.deadlines.render_secs, 600);
        assert_eq!(config.engine.program, "python3");
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        assert!(matches!(
            OrchestratorConfig::from_yaml("max_concurrent_jobs: 0"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn command_args_parse() {
        let config =
            OrchestratorConfig::from_yaml("renderer:\n  program: python\n  args: [render.py, --fast]\n")
                .unwrap();
        assert_eq!(config.renderer, CommandSpec::new("python").arg("render.py").arg("--fast"));
    }
}
