//! Status & Run Log Module
//!
//! The run's observable side effects for external pollers: a small status
//! file rewritten on every state change and an append-only text log. Both
//! live under `<dashboard>/tmp/` and are best-effort: a failing status or
//! log write must never take down a batch run.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::{fs::atomic_write_json_pretty, CoreError, CoreResult};

/// Dashboard subdirectory holding run artifacts
pub const TMP_DIR: &str = "tmp";

/// Status file name
pub const STATUS_FILE: &str = "system_status.json";

/// Run log file name
pub const RUN_LOG_FILE: &str = "batch_run.log";

// =============================================================================
// System Status
// =============================================================================

/// Coarse run state for external pollers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Run is initializing
    Starting,
    /// Jobs are being processed
    Running,
    /// Queue execution is in progress
    Rendering,
    /// Run finished (with or without per-job failures)
    Stopped,
    /// Run could not proceed at all
    Error,
}

/// The status record persisted for pollers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    /// Current run state
    pub status: RunStatus,
    /// Human-readable detail
    pub message: String,
    /// Unix seconds, fractional
    pub timestamp: f64,
}

/// Writes the status file under `<dashboard>/tmp/`.
///
/// Constructed without a dashboard directory, every update is a no-op; the
/// engine works the same with or without an observable dashboard.
#[derive(Clone, Debug)]
pub struct StatusWriter {
    path: Option<PathBuf>,
}

impl StatusWriter {
    /// Creates a writer targeting the dashboard's status file
    pub fn new(dashboard_dir: Option<&Path>) -> Self {
        Self {
            path: dashboard_dir.map(|d| d.join(TMP_DIR).join(STATUS_FILE)),
        }
    }

    /// Creates a writer that drops every update
    pub fn disabled() -> Self {
        Self { path: None }
    }

    /// Rewrites the status file; failures are logged and swallowed
    pub fn update(&self, status: RunStatus, message: &str) {
        let Some(path) = &self.path else {
            return;
        };

        let record = SystemStatus {
            status,
            message: message.to_string(),
            timestamp: Utc::now().timestamp_millis() as f64 / 1000.0,
        };
        if let Err(e) = atomic_write_json_pretty(path, &record) {
            warn!(path = %path.display(), error = %e, "failed to update status file");
        }
    }

    /// Reads a status file back (for pollers and the CLI)
    pub fn read(path: &Path) -> CoreResult<SystemStatus> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(CoreError::JsonError)
    }
}

// =============================================================================
// Run Log
// =============================================================================

/// Append-only, timestamped run log under `<dashboard>/tmp/`.
///
/// Like the status writer, appends are best-effort no-ops without a
/// dashboard directory.
#[derive(Clone, Debug)]
pub struct RunLog {
    path: Option<PathBuf>,
}

impl RunLog {
    /// Creates a log targeting the dashboard's run log file
    pub fn new(dashboard_dir: Option<&Path>) -> Self {
        Self {
            path: dashboard_dir.map(|d| d.join(TMP_DIR).join(RUN_LOG_FILE)),
        }
    }

    /// Creates a log that drops every line
    pub fn disabled() -> Self {
        Self { path: None }
    }

    /// Appends one timestamped line; failures are logged and swallowed
    pub fn append(&self, message: &str) {
        let Some(path) = &self.path else {
            return;
        };

        if let Err(e) = self.append_inner(path, message) {
            warn!(path = %path.display(), error = %e, "failed to append run log");
        }
    }

    fn append_inner(&self, path: &Path, message: &str) -> CoreResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}: {}", Local::now().format("%H:%M:%S"), message)?;
        Ok(())
    }
}
