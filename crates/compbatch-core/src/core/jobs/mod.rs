//! Job Store Module
//!
//! Persistent record of batch jobs for external pollers. The store is a
//! JSON file under the dashboard directory, written atomically and guarded
//! by an advisory file lock: the orchestrator marks jobs processing/failed
//! while the independent output watcher marks them done, and the two run in
//! separate processes.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{
    batch::BatchRow, fs::atomic_write_json_pretty, new_id, CoreError, CoreResult, JobId,
};

/// Job store file name under the dashboard directory
pub const JOB_STORE_FILE: &str = "render_jobs.json";

/// Advisory lock file beside the store
pub const JOB_STORE_LOCK_FILE: &str = "render_jobs.json.lock";

// =============================================================================
// Job Model
// =============================================================================

/// Lifecycle state of a batch job
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum JobState {
    /// Waiting to be picked up by a run
    #[default]
    Pending,
    /// A run is instantiating/rendering this job
    Processing,
    /// An output file for this job appeared
    Done,
    /// The run gave up on this job, with the reason why
    Failed { reason: String },
}

impl JobState {
    /// Terminal states are never revisited by the watcher
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed { .. })
    }
}

/// One persisted batch job
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderJob {
    /// Unique job ID
    pub id: JobId,
    /// Template scene name
    pub template_name: String,
    /// Output name (the render/watch key)
    pub output_name: String,
    /// Raw column values of the batch row
    pub values: HashMap<String, String>,
    /// Current state
    pub status: JobState,
    /// Where the finished output landed, once known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    /// Creation timestamp (ISO 8601)
    pub created_at: String,
    /// Last state change timestamp (ISO 8601)
    pub updated_at: String,
}

impl RenderJob {
    /// Creates a pending job from a parsed batch row
    pub fn from_row(row: &BatchRow) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: new_id(),
            template_name: row.template_name.clone(),
            output_name: row.output_name.clone(),
            values: row.values.clone(),
            status: JobState::Pending,
            output_path: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

// =============================================================================
// Job Store
// =============================================================================

/// File-backed job store
#[derive(Clone, Debug)]
pub struct JobStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl JobStore {
    /// Creates a store rooted at the dashboard directory
    pub fn new(dashboard_dir: &Path) -> Self {
        Self {
            path: dashboard_dir.join(JOB_STORE_FILE),
            lock_path: dashboard_dir.join(JOB_STORE_LOCK_FILE),
        }
    }

    /// Reads all jobs; a missing store file is an empty store
    pub fn jobs(&self) -> CoreResult<Vec<RenderJob>> {
        if !self.path.exists() {
            return Ok(vec![]);
        }
        let text = std::fs::read_to_string(&self.path)?;
        serde_json::from_str(&text).map_err(|e| CoreError::JobStoreCorrupted(e.to_string()))
    }

    /// Creates a pending job for a batch row and returns it
    pub fn create(&self, row: &BatchRow) -> CoreResult<RenderJob> {
        let job = RenderJob::from_row(row);
        let created = job.clone();
        self.with_lock(|jobs| {
            jobs.push(job);
        })?;
        debug!(job_id = %created.id, output = %created.output_name, "job created");
        Ok(created)
    }

    /// Updates the state of a job
    pub fn set_state(&self, id: &JobId, state: JobState) -> CoreResult<()> {
        let target = id.clone();
        let found = self.with_lock(move |jobs| {
            if let Some(job) = jobs.iter_mut().find(|j| j.id == target) {
                job.status = state;
                job.updated_at = chrono::Utc::now().to_rfc3339();
                true
            } else {
                false
            }
        })?;

        if found {
            Ok(())
        } else {
            Err(CoreError::JobNotFound(id.clone()))
        }
    }

    /// Marks the first non-terminal job with the given output name as done
    /// and records the output path. Returns the updated job, or `None` when
    /// no such job exists (already done, or the file belongs to nobody).
    pub fn mark_done_by_output(
        &self,
        output_name: &str,
        output_path: &Path,
    ) -> CoreResult<Option<RenderJob>> {
        let output_name = output_name.to_string();
        let output_path = output_path.to_path_buf();
        self.with_lock(move |jobs| {
            let job = jobs
                .iter_mut()
                .find(|j| j.output_name == output_name && !j.status.is_terminal())?;
            job.status = JobState::Done;
            job.output_path = Some(output_path);
            job.updated_at = chrono::Utc::now().to_rfc3339();
            Some(job.clone())
        })
    }

    /// Removes every terminal job; returns how many were dropped
    pub fn clear_finished(&self) -> CoreResult<usize> {
        self.with_lock(|jobs| {
            let before = jobs.len();
            jobs.retain(|j| !j.status.is_terminal());
            before - jobs.len()
        })
    }

    /// Load-modify-save under the advisory lock
    fn with_lock<R>(&self, f: impl FnOnce(&mut Vec<RenderJob>) -> R) -> CoreResult<R> {
        if let Some(parent) = self.lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&self.lock_path)?;
        lock_file.lock_exclusive()?;

        let result = (|| {
            let mut jobs = self.jobs()?;
            let out = f(&mut jobs);
            atomic_write_json_pretty(&self.path, &jobs)?;
            Ok(out)
        })();

        let _ = FileExt::unlock(&lock_file);
        result
    }
}
