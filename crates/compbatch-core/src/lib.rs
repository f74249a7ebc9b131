//! Compbatch Core Library
//!
//! Batch template instantiation engine for compositing projects: parses a
//! spreadsheet-like batch description, clones a named template scene per job
//! (deduplicating shared sub-scenes), substitutes text and footage into named
//! layers, and submits the finished clones to a render queue.

pub mod core;

pub use crate::core::*;
