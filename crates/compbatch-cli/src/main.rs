//! Compbatch CLI
//!
//! Headless front end for the batch engine: run a batch sheet against a
//! project document, inspect parsed sheets, watch the render output
//! directory, or poll the run status file.

use std::path::{Path, PathBuf};
use std::sync::mpsc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use compbatch_core::{
    batch::{parse_batch, DEFAULT_DELIMITER},
    jobs::JobStore,
    orchestrator::{BatchRunner, RunConfig},
    render::{SnapshotRenderer, RENDERINGS_DIR},
    status::{StatusWriter, STATUS_FILE, TMP_DIR},
    watch::{RenderWatcher, WatchEvent},
};

#[derive(Parser)]
#[command(
    name = "compbatch",
    version,
    about = "Batch template instantiation and render automation"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process a batch sheet against a project document and render the queue
    Run {
        /// Project document to open
        #[arg(long)]
        project: PathBuf,
        /// Batch sheet to process
        #[arg(long)]
        batch: PathBuf,
        /// Dashboard directory (default: grandparent of the project file)
        #[arg(long)]
        dashboard: Option<PathBuf>,
        /// Explicit render output base directory
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Batch sheet field delimiter
        #[arg(long, default_value_t = DEFAULT_DELIMITER)]
        delimiter: char,
        /// Keep the host session alive after the run
        #[arg(long)]
        no_shutdown: bool,
    },
    /// Parse a batch sheet and print the rows as JSON
    Parse {
        /// Batch sheet to parse
        #[arg(long)]
        batch: PathBuf,
        /// Batch sheet field delimiter
        #[arg(long, default_value_t = DEFAULT_DELIMITER)]
        delimiter: char,
    },
    /// Watch the render output directory and mark jobs done
    Watch {
        /// Dashboard directory holding the job store
        #[arg(long)]
        dashboard: PathBuf,
    },
    /// Print the current run status
    Status {
        /// Dashboard directory holding the status file
        #[arg(long)]
        dashboard: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Diagnostic logs go to stderr and, for run/watch, to a file under the
    // dashboard tmp directory.
    let log_dir = match &cli.command {
        Command::Run {
            project, dashboard, ..
        } => dashboard
            .clone()
            .or_else(|| Some(project.parent()?.parent()?.to_path_buf()))
            .map(|d| d.join(TMP_DIR)),
        Command::Watch { dashboard } => Some(dashboard.join(TMP_DIR)),
        _ => None,
    };
    let _guard = init_tracing(log_dir.as_deref());

    match cli.command {
        Command::Run {
            project,
            batch,
            dashboard,
            output_dir,
            delimiter,
            no_shutdown,
        } => run(project, batch, dashboard, output_dir, delimiter, no_shutdown),
        Command::Parse { batch, delimiter } => parse(&batch, delimiter),
        Command::Watch { dashboard } => watch(&dashboard),
        Command::Status { dashboard } => status(&dashboard),
    }
}

fn init_tracing(log_dir: Option<&Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if let Some(dir) = log_dir {
        if std::fs::create_dir_all(dir).is_ok() {
            let appender = tracing_appender::rolling::never(dir, "compbatch.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            return Some(guard);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    None
}

fn run(
    project: PathBuf,
    batch: PathBuf,
    dashboard: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    delimiter: char,
    no_shutdown: bool,
) -> Result<()> {
    let mut config = RunConfig::new(project, batch);
    config.dashboard_dir = dashboard;
    config.output_base_dir = output_dir;
    config.delimiter = delimiter;
    config.request_shutdown = !no_shutdown;

    let report = BatchRunner::new(config, SnapshotRenderer).run();
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(error) = report.error {
        bail!("batch run failed: {error}");
    }
    Ok(())
}

fn parse(batch: &Path, delimiter: char) -> Result<()> {
    let text = std::fs::read_to_string(batch)
        .with_context(|| format!("failed to read batch file {}", batch.display()))?;
    let parsed = parse_batch(&text, delimiter);
    println!("{}", serde_json::to_string_pretty(&parsed)?);
    Ok(())
}

fn watch(dashboard: &Path) -> Result<()> {
    let render_dir = dashboard.join(RENDERINGS_DIR);
    let store = JobStore::new(dashboard);
    let (tx, rx) = mpsc::channel();

    let _watcher = RenderWatcher::start(render_dir.clone(), store, tx)
        .with_context(|| format!("failed to watch {}", render_dir.display()))?;
    eprintln!("Watching {} (Ctrl+C to stop)", render_dir.display());

    // Runs until interrupted; each event is one JSON line on stdout.
    for event in rx {
        match event {
            WatchEvent::JobCompleted { job, path } => {
                println!(
                    "{}",
                    serde_json::json!({
                        "event": "done",
                        "jobId": job.id,
                        "outputName": job.output_name,
                        "path": path,
                    })
                );
            }
            WatchEvent::Unmatched { path } => {
                println!(
                    "{}",
                    serde_json::json!({ "event": "unmatched", "path": path })
                );
            }
        }
    }
    Ok(())
}

fn status(dashboard: &Path) -> Result<()> {
    let path = dashboard.join(TMP_DIR).join(STATUS_FILE);
    let status = StatusWriter::read(&path)
        .with_context(|| format!("failed to read status file {}", path.display()))?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
