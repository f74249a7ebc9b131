//! Run Phases & Reports
//!
//! The orchestrator's observable state machine and the aggregated outcome
//! values it returns instead of raising per-job errors.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::{
    batch::SkippedRow, duplicate::LayerOutcome, render::RenderSummary, ItemId,
};

// =============================================================================
// Phases
// =============================================================================

/// Orchestrator state machine.
///
/// `Terminated` is always reached: render and archive failures are logged,
/// never propagated past the terminal transition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunPhase {
    /// No run started yet
    #[default]
    Idle,
    /// The enclosing transaction is open; jobs are being processed
    TransactionOpen,
    /// The job loop finished and the transaction was committed
    TransactionClosed,
    /// The render queue is executing
    Rendering,
    /// The archival copy is being written
    Archiving,
    /// The run is over and shutdown was signalled
    Terminated,
}

// =============================================================================
// Per-Job Outcomes
// =============================================================================

/// How one job ended
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum JobResult {
    /// The clone was built and submitted to the render queue
    Enqueued {
        scene_id: ItemId,
        #[serde(skip_serializing_if = "Option::is_none")]
        output_path: Option<PathBuf>,
    },
    /// No scene in the library carries the template name
    TemplateNotFound,
    /// Duplication could not even start (template id vanished mid-run or
    /// names a non-scene)
    DuplicationFailed { reason: String },
}

/// Everything recorded about one job of the run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOutcome {
    /// Batch file line of the row
    pub line: usize,
    /// Template scene name
    pub template_name: String,
    /// Output name
    pub output_name: String,
    /// How the job ended
    pub result: JobResult,
    /// Per-layer actions taken while duplicating
    pub layers: Vec<LayerOutcome>,
}

impl JobOutcome {
    /// Returns true when the job made it into the render queue
    pub fn is_enqueued(&self) -> bool {
        matches!(self.result, JobResult::Enqueued { .. })
    }
}

// =============================================================================
// Run Report
// =============================================================================

/// Aggregated outcome of a whole batch run
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Final phase (always `Terminated` for a completed call)
    pub phase: RunPhase,
    /// Outcomes per processed row, in batch order
    pub jobs: Vec<JobOutcome>,
    /// Rows dropped by the parser
    pub skipped_rows: Vec<SkippedRow>,
    /// Render queue execution totals
    pub render: RenderSummary,
    /// Where the archival copy landed, when archiving succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_path: Option<PathBuf>,
    /// Whether the caller should terminate the host process
    pub shutdown_requested: bool,
    /// Setup failure that prevented the job loop (unreadable batch file or
    /// document); per-job failures are never reported here
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunReport {
    /// Number of jobs that reached the render queue
    pub fn enqueued_count(&self) -> usize {
        self.jobs.iter().filter(|j| j.is_enqueued()).count()
    }
}
