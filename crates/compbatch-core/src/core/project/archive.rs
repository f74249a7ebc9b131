//! Archival Copies
//!
//! After a batch run, the mutated document (clones included) is saved as a
//! full copy next to the original, named `<stem>_<D-M-YYYY>_<H-M-S>.<ext>`.
//! The working document on disk is never overwritten by a run.

use std::path::PathBuf;

use chrono::{Datelike, Local, Timelike};
use tracing::info;

use crate::core::{CoreError, CoreResult};

use super::ProjectDocument;

/// Saves a timestamped archival copy of the document into the directory of
/// the original file and returns the archive path.
pub fn archive_versioned(doc: &ProjectDocument) -> CoreResult<PathBuf> {
    let path = doc.path.clone().ok_or(CoreError::DocumentUnsaved)?;

    let dir = path
        .parent()
        .ok_or_else(|| CoreError::DocumentSaveFailed("document has no parent directory".into()))?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| doc.meta.name.clone());
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_else(|| "cbproj".to_string());

    let archive_path = dir.join(format!("{}_{}.{}", stem, local_stamp(), ext));
    doc.save_copy(&archive_path)?;

    info!(path = %archive_path.display(), "archived document copy");
    Ok(archive_path)
}

/// Day-month-year plus hour-minute-second, dash-separated and unpadded
fn local_stamp() -> String {
    let now = Local::now();
    format!(
        "{}-{}-{}_{}-{}-{}",
        now.day(),
        now.month(),
        now.year(),
        now.hour(),
        now.minute(),
        now.second()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_archive_lands_next_to_original() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("show.cbproj");

        let mut doc = ProjectDocument::new("show");
        doc.save_as(&path).unwrap();

        let archive = archive_versioned(&doc).unwrap();
        assert_eq!(archive.parent(), Some(dir.path()));
        assert!(archive.exists());

        let name = archive.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("show_"));
        assert!(name.ends_with(".cbproj"));
        // Original file is untouched.
        assert!(path.exists());
        assert_ne!(archive, path);
    }

    #[test]
    fn test_archive_unsaved_document_fails() {
        let doc = ProjectDocument::new("scratch");
        assert!(matches!(
            archive_versioned(&doc),
            Err(CoreError::DocumentUnsaved)
        ));
    }
}
