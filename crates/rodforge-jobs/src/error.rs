//! Job errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::job::Stage;

/// Errors from the job store and orchestrator bookkeeping.
#[derive(Debug, Error)]
pub enum JobError {
    /// Filesystem failure while reading or writing job state.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A job id contains characters outside `[A-Za-z0-9_-]`.
    #[error("invalid job id '{0}'")]
    InvalidId(String),

    /// No job directory or status record for the id.
    #[error("job '{0}' not found")]
    NotFound(String),

    /// The requested stage does not follow the current one.
    #[error("job '{id}': illegal transition {from} -> {to}")]
    IllegalTransition { id: String, from: Stage, to: Stage },

    /// The status record cannot be folded into a job.
    #[error("job '{id}': corrupt status record: {message}")]
    CorruptRecord { id: String, message: String },

    /// Failed to encode a status record.
    #[error("failed to encode status record: {0}")]
    Encode(#[from] serde_json::Error),
}

impl JobError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        JobError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Why a job failed. Recorded in the job's error log and status record.
#[derive(Debug, Error)]
pub enum StageError {
    /// Scene generation failed or returned an unusable document.
    #[error("generation error: {0}")]
    Generation(String),

    /// The generated scene was rejected by the compiler.
    #[error("compile error:\n{0}")]
    Compile(String),

    /// The engine exited non-zero, timed out or produced no trajectory.
    #[error("engine execution error: {0}")]
    EngineExecution(String),

    /// The renderer exited non-zero, timed out or produced no animation.
    #[error("render error: {0}")]
    Render(String),

    /// Job bookkeeping failed mid-run.
    #[error(transparent)]
    Job(#[from] JobError),
}
