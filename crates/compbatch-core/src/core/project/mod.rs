//! Project Document Module
//!
//! Handles the working document (metadata + scene library), its on-disk
//! JSON format, the single batch transaction boundary and timestamped
//! archival copies.

mod archive;
mod document;
mod transaction;

pub use archive::*;
pub use document::*;
pub use transaction::*;
