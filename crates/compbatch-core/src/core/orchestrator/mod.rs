//! Batch Orchestrator Module
//!
//! Drives a whole batch run: parse rows, open the single transaction,
//! resolve/duplicate/enqueue per job, execute the render queue, archive the
//! document and terminate. Every failure class degrades to skip-and-continue
//! or log-and-continue; the terminal phase is always reached.

mod config;
mod report;
mod runner;

pub use config::*;
pub use report::*;
pub use runner::*;
