//! Filesystem job store.
//!
//! Each job owns one directory under the store root, named by its id. Job
//! state lives in `status.jsonl`, an append-only log with one
//! [`StageRecord`] per transition. [`JobStore::load`] is the only way to
//! read state: it folds the log into a [`Job`]. Artifact files are payload
//! and never consulted to decide a job's stage.
//!
//! A reader racing the writer may see a final line without its newline.
//! Such a torn trailing line is skipped, so readers observe the previous
//! stage until the append completes.

use std::path::{Path, PathBuf};

use chrono::{Local, Utc};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::JobError;
use crate::job::{ArtifactPaths, Job, JobId, Stage, StageRecord};

/// Upper bound on same-second id suffixes before giving up.
const MAX_ID_ATTEMPTS: u32 = 1000;

#[derive(Debug, Clone)]
pub struct JobStore {
    root: PathBuf,
}

impl JobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artifacts(&self, id: &JobId) -> ArtifactPaths {
        ArtifactPaths::new(self.root.join(id.as_str()))
    }

    /// Allocate a fresh job directory, save the prompt and record
    /// `generating`.
    pub async fn create(&self, prompt: &str) -> Result<Job, JobError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| JobError::io(&self.root, e))?;

        let now = Local::now();
        let mut attempt = 0;
        let id = loop {
            let candidate = JobId::from_timestamp(now, attempt);
            let dir = self.root.join(candidate.as_str());
            match fs::create_dir(&dir).await {
                Ok(()) => break candidate,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    attempt += 1;
                    if attempt >= MAX_ID_ATTEMPTS {
                        return Err(JobError::io(dir, e));
                    }
                }
                Err(e) => return Err(JobError::io(dir, e)),
            }
        };

        let artifacts = self.artifacts(&id);
        fs::write(&artifacts.prompt, prompt)
            .await
            .map_err(|e| JobError::io(&artifacts.prompt, e))?;
        self.append(&artifacts.status, &record(Stage::Generating, None))
            .await?;

        info!(job = %id, "job created");
        self.load(&id).await
    }

    /// Read a job's current state.
    pub async fn load(&self, id: &JobId) -> Result<Job, JobError> {
        let artifacts = self.artifacts(id);
        let content = match fs::read_to_string(&artifacts.status).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(JobError::NotFound(id.to_string()))
            }
            Err(e) => return Err(JobError::io(&artifacts.status, e)),
        };
        fold(id, artifacts, &content)
    }

    /// Advance a job to `to`, refusing anything but a legal transition.
    pub async fn transition(&self, id: &JobId, to: Stage) -> Result<Job, JobError> {
        let job = self.load(id).await?;
        if !job.stage.can_transition_to(to) {
            return Err(JobError::IllegalTransition {
                id: id.to_string(),
                from: job.stage,
                to,
            });
        }
        self.append(&job.artifacts.status, &record(to, None)).await?;
        info!(job = %id, from = %job.stage, to = %to, "stage transition");
        self.load(id).await
    }

    /// Record a failure: write the error log, then append `failed`.
    pub async fn fail(&self, id: &JobId, error: &str) -> Result<Job, JobError> {
        let job = self.load(id).await?;
        if !job.stage.can_transition_to(Stage::Failed) {
            return Err(JobError::IllegalTransition {
                id: id.to_string(),
                from: job.stage,
                to: Stage::Failed,
            });
        }
        fs::write(&job.artifacts.error_log, error)
            .await
            .map_err(|e| JobError::io(&job.artifacts.error_log, e))?;
        self.append(&job.artifacts.status, &record(Stage::Failed, Some(error)))
            .await?;
        warn!(job = %id, stage = %job.stage, "job failed: {error}");
        self.load(id).await
    }

    /// Ids of every job directory with a status record, oldest first.
    pub async fn list(&self) -> Result<Vec<JobId>, JobError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(JobError::io(&self.root, e)),
        };
        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| JobError::io(&self.root, e))?
        {
            let name = entry.file_name();
            let Some(id) = name.to_str().and_then(|n| JobId::parse(n).ok()) else {
                continue;
            };
            if fs::try_exists(self.artifacts(&id).status)
                .await
                .unwrap_or(false)
            {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    async fn append(&self, path: &Path, record: &StageRecord) -> Result<(), JobError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| JobError::io(path, e))?;
        // Single write so a line is never interleaved with another append.
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| JobError::io(path, e))?;
        file.flush().await.map_err(|e| JobError::io(path, e))?;
        debug!(path = %path.display(), stage = %record.stage, "status appended");
        Ok(())
    }
}

fn record(stage: Stage, error: Option<&str>) -> StageRecord {
    StageRecord {
        stage,
        at: Utc::now(),
        error: error.map(str::to_string),
    }
}

/// Fold a status log into a job.
fn fold(id: &JobId, artifacts: ArtifactPaths, content: &str) -> Result<Job, JobError> {
    let corrupt = |message: String| JobError::CorruptRecord {
        id: id.to_string(),
        message,
    };

    let complete = match content.rfind('\n') {
        Some(end) => &content[..end],
        None => "",
    };

    let mut job: Option<Job> = None;
    for (number, line) in complete.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: StageRecord = serde_json::from_str(line)
            .map_err(|e| corrupt(format!("line {}: {e}", number + 1)))?;
        match job.as_mut() {
            None if record.stage == Stage::Generating => {
                job = Some(Job {
                    id: id.clone(),
                    stage: record.stage,
                    created_at: record.at,
                    updated_at: record.at,
                    artifacts: artifacts.clone(),
                    last_error: None,
                });
            }
            None => {
                return Err(corrupt(format!(
                    "first record is '{}', expected 'generating'",
                    record.stage
                )))
            }
            Some(job) => {
                if !job.stage.can_transition_to(record.stage) {
                    return Err(corrupt(format!(
                        "line {}: illegal transition {} -> {}",
                        number + 1,
                        job.stage,
                        record.stage
                    )));
                }
                job.stage = record.stage;
                job.updated_at = record.at;
                if record.error.is_some() {
                    job.last_error = record.error;
                }
            }
        }
    }
    // A record with only a torn first line is a job still being created.
    job.ok_or_else(|| JobError::NotFound(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> JobId {
        JobId::parse("20260201_031106").unwrap()
    }

    fn line(stage: &str) -> String {
        format!("{{\"stage\":\"{stage}\",\"at\":\"2026-02-01T03:11:06Z\"}}\n")
    }

    #[test]
    fn fold_tracks_last_stage() {
        let content = [line("generating"), line("compiling"), line("simulating")].concat();
        let job = fold(&id(), ArtifactPaths::new("/tmp/x"), &content).unwrap();
        assert_eq!(job.stage, Stage::Simulating);
        assert_eq!(job.last_error, None);
    }

    #[test]
    fn fold_ignores_torn_trailing_line() {
        let mut content = [line("generating"), line("compiling")].concat();
        content.push_str("{\"stage\":\"simul");
        let job = fold(&id(), ArtifactPaths::new("/tmp/x"), &content).unwrap();
        assert_eq!(job.stage, Stage::Compiling);
    }

    #[test]
    fn fold_rejects_backwards_transition() {
        let content = [line("generating"), line("simulating")].concat();
        assert!(matches!(
            fold(&id(), ArtifactPaths::new("/tmp/x"), &content),
            Err(JobError::CorruptRecord { .. })
        ));
    }

    #[test]
    fn fold_keeps_failure_message() {
        let content = format!(
            "{}{{\"stage\":\"failed\",\"at\":\"2026-02-01T03:11:07Z\",\"error\":\"boom\"}}\n",
            line("generating")
        );
        let job = fold(&id(), ArtifactPaths::new("/tmp/x"), &content).unwrap();
        assert_eq!(job.stage, Stage::Failed);
        assert_eq!(job.last_error.as_deref(), Some("boom"));
    }

    #[test]
    fn fold_of_empty_record_is_not_found() {
        assert!(matches!(
            fold(&id(), ArtifactPaths::new("/tmp/x"), ""),
            Err(JobError::NotFound(_))
        ));
    }
}
