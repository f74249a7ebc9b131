//! Batch Runner
//!
//! Executes a whole batch run synchronously, one job at a time:
//! `Idle -> TransactionOpen -> (per job: resolve, duplicate, enqueue) ->
//! TransactionClosed -> Rendering -> Archiving -> Terminated`.
//!
//! Failure policy: rows and jobs degrade to recorded skips, render and
//! archive failures degrade to log lines, and the terminal transition runs
//! unconditionally. An unattended run must never leave the host lingering.

use std::path::Path;

use tracing::{info, warn};

use crate::core::{
    batch::{parse_batch, BatchRow},
    duplicate::duplicate_for_job,
    jobs::{JobState, JobStore, RenderJob},
    library::SceneLibrary,
    project::{archive_versioned, ProjectDocument, Transaction},
    render::{resolve_render_dir, RenderHost, RenderQueue},
    status::{RunLog, RunStatus, StatusWriter},
    FolderId,
};

use super::{JobOutcome, JobResult, RunConfig, RunPhase, RunReport};

/// Drives one batch run against a render host
pub struct BatchRunner<H: RenderHost> {
    config: RunConfig,
    host: H,
    phase: RunPhase,
}

impl<H: RenderHost> BatchRunner<H> {
    /// Creates a runner; the config is normalized on the way in
    pub fn new(mut config: RunConfig, host: H) -> Self {
        config.normalize();
        Self {
            config,
            host,
            phase: RunPhase::Idle,
        }
    }

    /// Current phase of the state machine
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Runs the whole batch and returns the aggregated report.
    ///
    /// This call blocks until every queued render finished or failed. It
    /// never returns early: the terminal phase and the final status write
    /// happen regardless of what the run itself did.
    pub fn run(mut self) -> RunReport {
        let dashboard = self.config.dashboard_dir();
        let status = StatusWriter::new(dashboard.as_deref());
        let log = RunLog::new(dashboard.as_deref());
        let store = dashboard.as_deref().map(JobStore::new);

        status.update(RunStatus::Starting, "Initializing batch run...");
        log.append("---------------------------------------------------");
        log.append("Batch run started.");

        let mut report = self.run_inner(&status, &log, store.as_ref());

        // Terminal transition. Runs even when rendering or archiving failed
        // above; only the status message differs on a setup failure.
        self.phase = RunPhase::Terminated;
        report.phase = RunPhase::Terminated;
        report.shutdown_requested = self.config.request_shutdown;
        if report.error.is_none() {
            status.update(RunStatus::Stopped, "Render session finished");
        }
        log.append("Shutting down host session.");

        report
    }

    fn run_inner(
        &mut self,
        status: &StatusWriter,
        log: &RunLog,
        store: Option<&JobStore>,
    ) -> RunReport {
        let mut report = RunReport::default();

        let text = match std::fs::read_to_string(&self.config.batch_path) {
            Ok(text) => text,
            Err(e) => {
                return self.setup_failure(
                    report,
                    status,
                    log,
                    format!(
                        "failed to read batch file {}: {e}",
                        self.config.batch_path.display()
                    ),
                );
            }
        };

        let parsed = parse_batch(&text, self.config.delimiter);
        for skipped in &parsed.skipped {
            log.append(&format!(
                "Row {} skipped: {}",
                skipped.line, skipped.reason
            ));
        }
        report.skipped_rows = parsed.skipped.clone();

        let mut doc = match ProjectDocument::open(&self.config.project_path) {
            Ok(doc) => doc,
            Err(e) => {
                return self.setup_failure(report, status, log, format!("failed to open document: {e}"));
            }
        };

        status.update(RunStatus::Running, "Processing jobs...");

        // One enclosing transaction around the whole job loop. Per-job
        // failures only skip that job; the transaction always commits.
        let txn = Transaction::begin("Process batch rows", &doc.library);
        self.phase = RunPhase::TransactionOpen;

        let container = doc.library.add_folder(&self.config.container_name);
        let render_dir = resolve_render_dir(
            self.config.output_base_dir.as_deref(),
            doc.path.as_deref(),
        );
        let mut queue = RenderQueue::new();

        for row in &parsed.rows {
            let outcome = self.process_row(
                row,
                &mut doc.library,
                &container,
                render_dir.as_deref(),
                &mut queue,
                log,
                store,
            );
            report.jobs.push(outcome);
        }

        txn.commit();
        self.phase = RunPhase::TransactionClosed;
        info!(
            jobs = report.jobs.len(),
            enqueued = report.enqueued_count(),
            "job loop finished"
        );

        if queue.is_empty() {
            log.append("Render queue empty.");
        } else {
            self.phase = RunPhase::Rendering;
            status.update(RunStatus::Rendering, "Executing render queue...");
            log.append(&format!("Queue has {} items. Rendering...", queue.len()));

            report.render = queue.render_all(&mut self.host, &doc.library);
            log.append(&format!(
                "Render phase done: {} rendered, {} failed.",
                report.render.rendered, report.render.failed
            ));
        }

        // Archival is independent of the render outcome.
        self.phase = RunPhase::Archiving;
        match archive_versioned(&doc) {
            Ok(path) => {
                log.append(&format!("Saved archive copy: {}", path.display()));
                report.archive_path = Some(path);
            }
            Err(e) => {
                warn!(error = %e, "archive save failed");
                log.append(&format!("Archive save failed: {e}"));
            }
        }

        report
    }

    /// One job: resolve, duplicate, enqueue. Every exit path returns an
    /// outcome value; nothing propagates.
    #[allow(clippy::too_many_arguments)]
    fn process_row(
        &mut self,
        row: &BatchRow,
        library: &mut SceneLibrary,
        container: &FolderId,
        render_dir: Option<&Path>,
        queue: &mut RenderQueue,
        log: &RunLog,
        store: Option<&JobStore>,
    ) -> JobOutcome {
        let job = self.register_job(row, store);

        let Some(template_id) = library.find_scene_by_name(&row.template_name) else {
            let reason = format!("template not found: {}", row.template_name);
            log.append(&format!("Row {}: {reason}", row.line));
            self.fail_job(store, job.as_ref(), &reason);
            return JobOutcome {
                line: row.line,
                template_name: row.template_name.clone(),
                output_name: row.output_name.clone(),
                result: JobResult::TemplateNotFound,
                layers: vec![],
            };
        };

        match duplicate_for_job(library, &template_id, row, &self.config.bindings, container) {
            Ok(outcome) => {
                let entry = queue.submit(outcome.clone_id.clone(), &row.output_name, render_dir);
                let output_path = entry.output_path;
                log.append(&format!(
                    "Row {}: '{}' duplicated as '{}' and enqueued.",
                    row.line, row.template_name, row.output_name
                ));
                JobOutcome {
                    line: row.line,
                    template_name: row.template_name.clone(),
                    output_name: row.output_name.clone(),
                    result: JobResult::Enqueued {
                        scene_id: outcome.clone_id,
                        output_path,
                    },
                    layers: outcome.layers,
                }
            }
            Err(e) => {
                let reason = e.to_string();
                log.append(&format!("Row {}: duplication failed: {reason}", row.line));
                self.fail_job(store, job.as_ref(), &reason);
                JobOutcome {
                    line: row.line,
                    template_name: row.template_name.clone(),
                    output_name: row.output_name.clone(),
                    result: JobResult::DuplicationFailed { reason },
                    layers: vec![],
                }
            }
        }
    }

    /// Records the row in the job store and marks it processing.
    /// Store failures are logged; the run continues without the record.
    fn register_job(&self, row: &BatchRow, store: Option<&JobStore>) -> Option<RenderJob> {
        let store = store?;
        let job = match store.create(row) {
            Ok(job) => job,
            Err(e) => {
                warn!(error = %e, "failed to record job in store");
                return None;
            }
        };
        if let Err(e) = store.set_state(&job.id, JobState::Processing) {
            warn!(error = %e, job_id = %job.id, "failed to mark job processing");
        }
        Some(job)
    }

    /// Marks a stored job failed with an explicit reason: an observable
    /// terminal state instead of a job stuck pending forever.
    fn fail_job(&self, store: Option<&JobStore>, job: Option<&RenderJob>, reason: &str) {
        if let (Some(store), Some(job)) = (store, job) {
            if let Err(e) = store.set_state(
                &job.id,
                JobState::Failed {
                    reason: reason.to_string(),
                },
            ) {
                warn!(error = %e, job_id = %job.id, "failed to mark job failed");
            }
        }
    }

    fn setup_failure(
        &mut self,
        mut report: RunReport,
        status: &StatusWriter,
        log: &RunLog,
        message: String,
    ) -> RunReport {
        warn!(error = %message, "batch run could not start");
        status.update(RunStatus::Error, &message);
        log.append(&message);
        report.error = Some(message);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::duplicate::SubstitutionBindings;
    use crate::core::jobs::JOB_STORE_FILE;
    use crate::core::library::{Item, Layer, LayerSource, Scene, SceneLibrary};
    use crate::core::render::{RenderQueueEntry, SnapshotRenderer};
    use crate::core::status::{StatusWriter, RUN_LOG_FILE, STATUS_FILE, TMP_DIR};
    use crate::core::CoreResult;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Dashboard layout on disk: `<root>/projects/show.cbproj` plus batch
    /// file, with `Trailer` referencing `PrecompA` twice (directly and via
    /// `PrecompB`).
    struct Fixture {
        _root: TempDir,
        dashboard: PathBuf,
        project_path: PathBuf,
        batch_path: PathBuf,
    }

    fn fixture(batch_text: &str) -> Fixture {
        let root = TempDir::new().unwrap();
        let dashboard = root.path().to_path_buf();
        let projects = dashboard.join("projects");
        std::fs::create_dir_all(&projects).unwrap();

        let mut doc = ProjectDocument::new("show");
        let precomp_a = doc.library.add_item(Item::scene(
            "PrecompA",
            Scene::default().with_layer(Layer::text("TuneIn", "someday")),
        ));
        let precomp_b = doc.library.add_item(Item::scene(
            "PrecompB",
            Scene::default().with_layer(Layer::scene_ref("InnerA", precomp_a.clone())),
        ));
        doc.library.add_item(Item::scene(
            "Trailer",
            Scene::default()
                .with_layer(Layer::text("Titel1", "placeholder").with_locked(true))
                .with_layer(Layer::text("Video", "stub").with_locked(false))
                .with_layer(Layer::scene_ref("DirectA", precomp_a))
                .with_layer(Layer::scene_ref("ViaB", precomp_b)),
        ));

        let project_path = projects.join("show.cbproj");
        doc.save_as(&project_path).unwrap();

        let batch_path = dashboard.join("batch.txt");
        std::fs::write(&batch_path, batch_text).unwrap();

        Fixture {
            _root: root,
            dashboard,
            project_path,
            batch_path,
        }
    }

    fn run_fixture(fx: &Fixture) -> RunReport {
        let config = RunConfig::new(fx.project_path.clone(), fx.batch_path.clone());
        BatchRunner::new(config, SnapshotRenderer).run()
    }

    // =========================================================================
    // End-To-End
    // =========================================================================

    #[test]
    fn test_end_to_end_run() {
        let fx = fixture("Comp\tNewComp\tTitel1\nTrailer\tPromo1\tHello\n");
        let report = run_fixture(&fx);

        assert_eq!(report.phase, RunPhase::Terminated);
        assert!(report.error.is_none());
        assert_eq!(report.jobs.len(), 1);
        assert!(report.jobs[0].is_enqueued());
        assert_eq!(report.render.rendered, 1);
        assert_eq!(report.render.failed, 0);
        assert!(report.shutdown_requested);

        // Queue destination ends in /Promo1; the snapshot landed beside it.
        let JobResult::Enqueued { output_path, .. } = &report.jobs[0].result else {
            panic!("expected enqueued job");
        };
        let output_path = output_path.as_ref().unwrap();
        assert!(output_path.ends_with("Promo1"));
        assert_eq!(
            output_path.parent().unwrap(),
            fx.dashboard.join("_Renderings")
        );
        assert!(output_path.with_extension("json").exists());

        // Archive copy next to the original, original untouched.
        let archive = report.archive_path.as_ref().unwrap();
        assert_eq!(archive.parent().unwrap(), fx.project_path.parent().unwrap());
        assert!(fx.project_path.exists());

        // The archived document holds the clone set; the working document
        // on disk does not.
        let archived = ProjectDocument::open(archive).unwrap();
        let promo = archived.library.find_scene_by_name("Promo1").unwrap();
        let layer = archived.library.scene(&promo).unwrap().layer("Titel1").unwrap().clone();
        assert_eq!(
            layer.source,
            LayerSource::Text {
                text: "Hello".to_string()
            }
        );
        let working = ProjectDocument::open(&fx.project_path).unwrap();
        assert!(working.library.find_scene_by_name("Promo1").is_none());

        // Status file reports a finished session; the run log is non-empty.
        let status =
            StatusWriter::read(&fx.dashboard.join(TMP_DIR).join(STATUS_FILE)).unwrap();
        assert_eq!(status.status, RunStatus::Stopped);
        let log_text =
            std::fs::read_to_string(fx.dashboard.join(TMP_DIR).join(RUN_LOG_FILE)).unwrap();
        assert!(log_text.contains("enqueued"));

        // Job store: the job stays processing until the watcher sees the
        // output file.
        let store = JobStore::new(&fx.dashboard);
        let jobs = store.jobs().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].status, JobState::Processing);
    }

    #[test]
    fn test_shared_precomp_share_survives_the_whole_pipeline() {
        let fx = fixture("Comp\tNewComp\nTrailer\tPromo1\n");
        let report = run_fixture(&fx);

        let archive = report.archive_path.as_ref().unwrap();
        let archived = ProjectDocument::open(archive).unwrap();
        let promo = archived.library.find_scene_by_name("Promo1").unwrap();

        let scene = archived.library.scene(&promo).unwrap();
        let direct = scene.layer("DirectA").unwrap().scene_target().unwrap().clone();
        let via_b_scene = scene.layer("ViaB").unwrap().scene_target().unwrap().clone();
        let inner = archived
            .library
            .scene(&via_b_scene)
            .unwrap()
            .layer("InnerA")
            .unwrap()
            .scene_target()
            .unwrap()
            .clone();
        assert_eq!(direct, inner);
    }

    // =========================================================================
    // Degradation Paths
    // =========================================================================

    #[test]
    fn test_unknown_template_skips_job_and_marks_store() {
        let fx = fixture("Comp\tNewComp\nNoSuchScene\tPromoX\nTrailer\tPromo1\n");
        let report = run_fixture(&fx);

        assert_eq!(report.jobs.len(), 2);
        assert_eq!(report.jobs[0].result, JobResult::TemplateNotFound);
        assert!(report.jobs[1].is_enqueued());
        assert_eq!(report.render.rendered, 1);

        let store = JobStore::new(&fx.dashboard);
        let jobs = store.jobs().unwrap();
        assert!(matches!(
            &jobs[0].status,
            JobState::Failed { reason } if reason.contains("NoSuchScene")
        ));
    }

    #[test]
    fn test_dropped_rows_are_reported_not_fatal() {
        let fx = fixture("Comp\tNewComp\n\tPromoX\nTrailer\t\nTrailer\tPromo1\n");
        let report = run_fixture(&fx);

        assert_eq!(report.skipped_rows.len(), 2);
        assert_eq!(report.jobs.len(), 1);
        assert!(report.jobs[0].is_enqueued());
    }

    #[test]
    fn test_empty_queue_still_archives_and_terminates() {
        let fx = fixture("Comp\tNewComp\nNoSuchScene\tPromoX\n");
        let report = run_fixture(&fx);

        assert_eq!(report.phase, RunPhase::Terminated);
        assert_eq!(report.render.rendered, 0);
        assert!(report.archive_path.is_some());
    }

    #[test]
    fn test_missing_batch_file_reaches_terminal_phase() {
        let fx = fixture("Comp\tNewComp\n");
        std::fs::remove_file(&fx.batch_path).unwrap();
        let report = run_fixture(&fx);

        assert_eq!(report.phase, RunPhase::Terminated);
        assert!(report.error.as_ref().unwrap().contains("batch file"));
        assert!(report.jobs.is_empty());

        let status =
            StatusWriter::read(&fx.dashboard.join(TMP_DIR).join(STATUS_FILE)).unwrap();
        assert_eq!(status.status, RunStatus::Error);
    }

    #[test]
    fn test_render_failures_do_not_prevent_archival() {
        /// Host that refuses every entry
        struct FailingHost;
        impl RenderHost for FailingHost {
            fn render(
                &mut self,
                _library: &SceneLibrary,
                entry: &RenderQueueEntry,
            ) -> CoreResult<()> {
                Err(crate::core::CoreError::RenderFailed(format!(
                    "no encoder for {}",
                    entry.scene_name
                )))
            }
        }

        let fx = fixture("Comp\tNewComp\nTrailer\tPromo1\n");
        let config = RunConfig::new(fx.project_path.clone(), fx.batch_path.clone());
        let report = BatchRunner::new(config, FailingHost).run();

        assert_eq!(report.render.failed, 1);
        assert!(report.archive_path.is_some());
        assert_eq!(report.phase, RunPhase::Terminated);
    }

    #[test]
    fn test_two_jobs_get_disjoint_clone_sets() {
        let fx = fixture("Comp\tNewComp\tTitel1\nTrailer\tPromo1\tOne\nTrailer\tPromo2\tTwo\n");
        let report = run_fixture(&fx);
        assert_eq!(report.enqueued_count(), 2);

        let archive = report.archive_path.as_ref().unwrap();
        let archived = ProjectDocument::open(archive).unwrap();
        let p1 = archived.library.find_scene_by_name("Promo1").unwrap();
        let p2 = archived.library.find_scene_by_name("Promo2").unwrap();

        let a1 = archived.library.scene(&p1).unwrap().layer("DirectA").unwrap().scene_target().unwrap().clone();
        let a2 = archived.library.scene(&p2).unwrap().layer("DirectA").unwrap().scene_target().unwrap().clone();
        assert_ne!(a1, a2);
    }

    #[test]
    fn test_explicit_output_dir_overrides_document_relative() {
        let out = TempDir::new().unwrap();
        let fx = fixture("Comp\tNewComp\nTrailer\tPromo1\n");

        let mut config = RunConfig::new(fx.project_path.clone(), fx.batch_path.clone());
        config.output_base_dir = Some(out.path().to_path_buf());
        let report = BatchRunner::new(config, SnapshotRenderer).run();

        let JobResult::Enqueued { output_path, .. } = &report.jobs[0].result else {
            panic!("expected enqueued job");
        };
        assert_eq!(
            output_path.as_ref().unwrap().parent().unwrap(),
            out.path().join("_Renderings")
        );
    }

    #[test]
    fn test_no_shutdown_request_is_propagated() {
        let fx = fixture("Comp\tNewComp\nTrailer\tPromo1\n");
        let mut config = RunConfig::new(fx.project_path.clone(), fx.batch_path.clone());
        config.request_shutdown = false;
        let report = BatchRunner::new(config, SnapshotRenderer).run();
        assert!(!report.shutdown_requested);
    }

    #[test]
    fn test_custom_bindings_rename_columns() {
        let fx = fixture("Comp\tNewComp\tHeadline\nTrailer\tPromo1\tBreaking\n");
        let mut config = RunConfig::new(fx.project_path.clone(), fx.batch_path.clone());
        config.bindings = SubstitutionBindings::empty().with_text("Titel1", "Headline");
        let report = BatchRunner::new(config, SnapshotRenderer).run();

        let archive = report.archive_path.as_ref().unwrap();
        let archived = ProjectDocument::open(archive).unwrap();
        let promo = archived.library.find_scene_by_name("Promo1").unwrap();
        let layer = archived.library.scene(&promo).unwrap().layer("Titel1").unwrap().clone();
        assert_eq!(
            layer.source,
            LayerSource::Text {
                text: "Breaking".to_string()
            }
        );
    }

    #[test]
    fn test_job_store_file_lands_under_dashboard() {
        let fx = fixture("Comp\tNewComp\nTrailer\tPromo1\n");
        run_fixture(&fx);
        assert!(fx.dashboard.join(JOB_STORE_FILE).exists());
    }
}
