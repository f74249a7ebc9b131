//! Render Output Watcher
//!
//! Watches the render output directory and marks jobs done when their
//! output file appears. Completion is detected out-of-band: the duplication
//! engine never signals it, an output file landing on disk does. Matching
//! is by file stem against the job's output name.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use tracing::{debug, warn};

use crate::core::{
    fs::ensure_dir,
    jobs::{JobStore, RenderJob},
    CoreError, CoreResult,
};

/// Debounce window for output files still being written
const DEBOUNCE: Duration = Duration::from_millis(500);

/// Events emitted by the watcher
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// An output file matched an open job; the job is now done
    JobCompleted { job: RenderJob, path: PathBuf },
    /// An output file matched no open job (already done, or foreign)
    Unmatched { path: PathBuf },
}

/// File system watcher over the render output directory
pub struct RenderWatcher {
    /// Stop signal sender; dropping this stops the watcher
    stop_tx: Option<mpsc::Sender<()>>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl RenderWatcher {
    /// Starts watching `render_dir` (top level only, no subdirectories).
    ///
    /// Files already present are processed immediately, so outputs of a run
    /// that finished while no watcher was alive still complete their jobs.
    /// Matches are sent through `event_tx` after the job store update.
    pub fn start(
        render_dir: PathBuf,
        store: JobStore,
        event_tx: mpsc::Sender<WatchEvent>,
    ) -> CoreResult<Self> {
        ensure_dir(&render_dir)?;

        // Catch up on files that appeared before this watcher existed.
        for dir_entry in std::fs::read_dir(&render_dir)? {
            let path = dir_entry?.path();
            if path.is_file() {
                handle_output_file(&store, &path, &event_tx);
            }
        }

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let (tx, rx) = mpsc::channel();
        let mut debouncer = new_debouncer(DEBOUNCE, tx)
            .map_err(|e| CoreError::WatcherFailed(format!("failed to create watcher: {e}")))?;

        debouncer
            .watcher()
            .watch(&render_dir, notify::RecursiveMode::NonRecursive)
            .map_err(|e| CoreError::WatcherFailed(format!("failed to watch directory: {e}")))?;

        let handle = std::thread::spawn(move || {
            // Keep the debouncer alive for the thread's lifetime.
            let _debouncer = debouncer;

            loop {
                if stop_rx.try_recv().is_ok() {
                    debug!("render watcher stopped by signal");
                    break;
                }

                match rx.recv_timeout(Duration::from_millis(200)) {
                    Ok(Ok(events)) => {
                        for event in events {
                            // Ongoing writes surface later as a plain event
                            // once the debounce window closes.
                            if event.kind != DebouncedEventKind::Any {
                                continue;
                            }
                            if event.path.is_file() {
                                handle_output_file(&store, &event.path, &event_tx);
                            }
                        }
                    }
                    Ok(Err(error)) => {
                        warn!(error = %error, "render watcher error");
                    }
                    Err(mpsc::RecvTimeoutError::Timeout) => {
                        // Normal timeout, continue loop
                    }
                    Err(mpsc::RecvTimeoutError::Disconnected) => {
                        debug!("render watcher channel disconnected, stopping");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Stops the watcher and waits for its thread to exit
    pub fn stop(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for RenderWatcher {
    fn drop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Matches one output file against the job store and reports the result.
/// Store failures are logged and swallowed; the watcher must outlive them.
fn handle_output_file(store: &JobStore, path: &Path, event_tx: &mpsc::Sender<WatchEvent>) {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
        return;
    };
    // Hidden and in-flight temp files are not outputs.
    if name.starts_with('.') || name.ends_with(".tmp") || name.ends_with(".bak") {
        return;
    }

    let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
        return;
    };

    match store.mark_done_by_output(&stem, path) {
        Ok(Some(job)) => {
            debug!(job_id = %job.id, output = %stem, "job marked done");
            let _ = event_tx.send(WatchEvent::JobCompleted {
                job,
                path: path.to_path_buf(),
            });
        }
        Ok(None) => {
            debug!(output = %stem, "no open job for output file");
            let _ = event_tx.send(WatchEvent::Unmatched {
                path: path.to_path_buf(),
            });
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to update job store");
        }
    }
}
