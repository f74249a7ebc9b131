//! Graph Duplication Module
//!
//! Clones a template scene and every nested scene it references into
//! independent per-job copies, preserving the template's sharing topology:
//! a sub-scene referenced from multiple sites is cloned exactly once per job
//! and every referencing site is repointed to that single clone.

mod bindings;
mod cache;
mod engine;

pub use bindings::*;
pub use cache::*;
pub use engine::*;
