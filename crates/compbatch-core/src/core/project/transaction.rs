//! Transaction Boundary
//!
//! A batch run mutates the library in place (clones, imports, renames). The
//! whole run happens inside one enclosing transaction: a full library
//! snapshot taken at `begin`, discarded at `commit` or restored at
//! `rollback`. This is the only undo scope the engine supports.

use tracing::debug;

use crate::core::library::SceneLibrary;

/// A single open transaction over the scene library
#[derive(Debug)]
pub struct Transaction {
    label: String,
    snapshot: SceneLibrary,
}

impl Transaction {
    /// Opens a transaction by snapshotting the library
    pub fn begin(label: &str, library: &SceneLibrary) -> Self {
        debug!(label, items = library.len(), "transaction opened");
        Self {
            label: label.to_string(),
            snapshot: library.clone(),
        }
    }

    /// The label given at `begin`
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Closes the transaction, keeping all mutations
    pub fn commit(self) {
        debug!(label = %self.label, "transaction committed");
    }

    /// Closes the transaction, restoring the library to its state at `begin`
    pub fn rollback(self, library: &mut SceneLibrary) {
        debug!(label = %self.label, "transaction rolled back");
        *library = self.snapshot;
    }
}
